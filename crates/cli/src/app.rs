use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use dial_core::{CompletionClient, Conversation, Message};
use providers::ClientKind;
use tracing::{info, warn};

use crate::strings::{
    deployment_prompt, AI_PREFIX, CLIENT_PROMPT, EXIT_COMMAND, GOODBYE, INPUT_MARKER, LOOP_HINT,
    SYSTEM_PROMPT_PROMPT,
};

/// Answers collected before the chat loop starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSetup {
    pub deployment: String,
    pub kind: ClientKind,
    pub system_prompt: String,
}

/// Values used when a setup prompt is skipped or answered with an empty line.
#[derive(Clone, Debug, Default)]
pub struct SetupDefaults {
    pub deployment: String,
    pub system_prompt: String,
    /// Answers that were already given on the command line.
    pub preset_deployment: Option<String>,
    pub preset_kind: Option<ClientKind>,
}

// Reads one line; `None` at end of input.
fn read_input<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).context("read stdin")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<String> {
    writeln!(out, "{}", question)?;
    write!(out, "{}", INPUT_MARKER)?;
    out.flush()?;
    Ok(read_input(input)?.unwrap_or_default())
}

pub fn prompt_setup<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    defaults: &SetupDefaults,
) -> Result<SessionSetup> {
    let deployment = match &defaults.preset_deployment {
        Some(d) => d.clone(),
        None => {
            let answer = ask(input, out, &deployment_prompt(&defaults.deployment))?;
            if answer.is_empty() {
                defaults.deployment.clone()
            } else {
                answer
            }
        }
    };

    let kind = match defaults.preset_kind {
        Some(k) => k,
        None => {
            let answer = ask(input, out, CLIENT_PROMPT)?;
            if answer.eq_ignore_ascii_case("y") {
                ClientKind::Raw
            } else {
                ClientKind::Sdk
            }
        }
    };

    let answer = ask(input, out, SYSTEM_PROMPT_PROMPT)?;
    let system_prompt = if answer.is_empty() {
        defaults.system_prompt.clone()
    } else {
        answer
    };

    Ok(SessionSetup {
        deployment,
        kind,
        system_prompt,
    })
}

/// Runs the question/answer loop until `exit` or end of input.
///
/// Returns the number of completed exchanges. A failed request ends the
/// session with that error.
pub async fn run_chat<C, R, W>(
    client: &C,
    conversation: &mut Conversation,
    input: &mut R,
    out: &mut W,
    stream: bool,
) -> Result<usize>
where
    C: CompletionClient,
    R: BufRead,
    W: Write,
{
    writeln!(out)?;
    writeln!(out, "{}", LOOP_HINT)?;
    let mut turns = 0usize;
    loop {
        write!(out, "{}", INPUT_MARKER)?;
        out.flush()?;
        let Some(text) = read_input(input)? else {
            break;
        };
        if text.eq_ignore_ascii_case(EXIT_COMMAND) {
            writeln!(out, "{}", GOODBYE)?;
            break;
        }
        if text.is_empty() {
            continue;
        }

        conversation.add_message(Message::user(text.as_str()));
        info!(target: "cli", "submit: deployment={} stream={} input_len={} history={}",
            client.deployment(), stream, text.len(), conversation.len());

        let reply = if stream {
            write!(out, "{}", AI_PREFIX)?;
            out.flush()?;
            let mut write_failed = false;
            let reply = client
                .stream_completion(conversation.get_messages(), |t| {
                    if write_failed {
                        return;
                    }
                    if let Err(e) = write!(out, "{}", t).and_then(|_| out.flush()) {
                        warn!(target: "cli", "output write failed, dropping fragments: {}", e);
                        write_failed = true;
                    }
                })
                .await
                .context("streaming completion failed")?;
            writeln!(out)?;
            reply
        } else {
            let reply = client
                .get_completion(conversation.get_messages())
                .await
                .context("completion failed")?;
            writeln!(out, "{}{}", AI_PREFIX, reply.content())?;
            reply
        };
        conversation.add_message(reply);
        turns += 1;
    }
    Ok(turns)
}
