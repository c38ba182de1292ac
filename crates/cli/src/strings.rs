// Prompts and labels shown on the terminal.

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer concisely and accurately.";

pub fn deployment_prompt(default: &str) -> String {
    format!(
        "Enter deployment name (e.g. '{d}') or press 'enter' for default '{d}':",
        d = default
    )
}

pub const CLIENT_PROMPT: &str = "Use CustomDialClient (raw HTTP) instead of SDK client? (y/N):";
pub const SYSTEM_PROMPT_PROMPT: &str = "Provide System prompt or press 'enter' to continue.";
pub const LOOP_HINT: &str = "Type your question or 'exit' to quit.";
pub const INPUT_MARKER: &str = "> ";
pub const AI_PREFIX: &str = "AI: ";
pub const GOODBYE: &str = "Exiting the chat. Goodbye!";
pub const EXIT_COMMAND: &str = "exit";
