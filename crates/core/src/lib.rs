pub mod conversation;
pub mod llm;
pub mod message;

pub use conversation::Conversation;
pub use llm::{accumulate, ChatDelta, ChatError, ChatStream, CompletionClient};
pub use message::{Message, Role};
