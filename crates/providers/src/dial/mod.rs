pub mod config;
pub mod decoder;
pub mod raw;
pub mod sdk;

pub use config::{DialConfig, DialFileConfig};
pub use raw::RawDialClient;
pub use sdk::SdkDialClient;

use dial_core::llm::{ChatError, ChatStream, CompletionClient};
use dial_core::Message;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientKind {
    Sdk,
    Raw,
}

/// Either client variant behind one concrete type.
#[derive(Clone)]
pub enum DialClient {
    Sdk(SdkDialClient),
    Raw(RawDialClient),
}

impl DialClient {
    pub fn new(kind: ClientKind, cfg: &DialConfig, deployment: &str) -> anyhow::Result<Self> {
        Ok(match kind {
            ClientKind::Sdk => DialClient::Sdk(SdkDialClient::new(cfg, deployment)),
            ClientKind::Raw => DialClient::Raw(RawDialClient::new(cfg, deployment)?),
        })
    }

    pub fn kind(&self) -> ClientKind {
        match self {
            DialClient::Sdk(_) => ClientKind::Sdk,
            DialClient::Raw(_) => ClientKind::Raw,
        }
    }
}

impl CompletionClient for DialClient {
    fn deployment(&self) -> &str {
        match self {
            DialClient::Sdk(c) => c.deployment(),
            DialClient::Raw(c) => c.deployment(),
        }
    }

    async fn get_completion(&self, msgs: &[Message]) -> Result<Message, ChatError> {
        match self {
            DialClient::Sdk(c) => c.get_completion(msgs).await,
            DialClient::Raw(c) => c.get_completion(msgs).await,
        }
    }

    async fn stream_chat<'a>(&'a self, msgs: &[Message]) -> Result<ChatStream<'a>, ChatError> {
        match self {
            DialClient::Sdk(c) => c.stream_chat(msgs).await,
            DialClient::Raw(c) => c.stream_chat(msgs).await,
        }
    }
}
