use std::pin::Pin;

use futures::{Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::message::Message;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatDelta {
    Text(String),
    /// End-of-stream marker seen on the wire. Informational only: readers keep
    /// going until the underlying body ends.
    Finish(Option<String>),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("No choices in response found")]
    EmptyChoices,
    #[error("network: {0}")]
    Network(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Error object returned by the service when the status code itself is
    /// not available to the caller.
    #[error("api error: {0}")]
    Api(String),
    #[error("sdk: {0}")]
    Sdk(String),
}

impl ChatError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ChatStream<'a> = Pin<Box<dyn Stream<Item = Result<ChatDelta, ChatError>> + Send + 'a>>;

/// A chat completion backend bound to one deployment.
///
/// Implementations send the whole history on every call and never retry.
/// `stream_chat` must report a failed status as `Err` before handing back the
/// stream; anything that goes wrong afterwards arrives as an `Err` item.
#[allow(async_fn_in_trait)]
pub trait CompletionClient: Send + Sync {
    fn deployment(&self) -> &str;

    async fn get_completion(&self, msgs: &[Message]) -> Result<Message, ChatError>;

    async fn stream_chat<'a>(&'a self, msgs: &[Message]) -> Result<ChatStream<'a>, ChatError>;

    /// Streams a reply, passing every non-empty fragment to `on_fragment` in
    /// arrival order, and returns the concatenation as an assistant message.
    async fn stream_completion<F>(&self, msgs: &[Message], on_fragment: F) -> Result<Message, ChatError>
    where
        F: FnMut(&str),
    {
        let stream = self.stream_chat(msgs).await?;
        Ok(accumulate(stream, on_fragment).await)
    }
}

/// Drains a delta stream into a single assistant message.
///
/// An error item ends the stream; whatever arrived before it is kept.
pub async fn accumulate<F>(mut stream: ChatStream<'_>, mut on_fragment: F) -> Message
where
    F: FnMut(&str),
{
    let mut contents: Vec<String> = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(ChatDelta::Text(t)) => {
                if t.is_empty() {
                    continue;
                }
                on_fragment(&t);
                contents.push(t);
            }
            Ok(ChatDelta::Finish(reason)) => {
                debug!(target: "core::llm", "stream finish marker reason={:?}", reason);
            }
            Err(e) => {
                warn!(
                    target: "core::llm",
                    "stream interrupted after {} fragments, keeping partial reply: {}",
                    contents.len(),
                    e
                );
                break;
            }
        }
    }
    Message::assistant(contents.concat())
}
