use crate::dial::config::DialConfig;
use async_openai::{
    config::AzureConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionStreamResponse,
    },
    Client,
};
use dial_core::llm::{ChatDelta, ChatError, ChatStream, CompletionClient};
use dial_core::{Message, Role};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, error, info};

/// DIAL client built on the `async-openai` SDK in its Azure mode, which
/// matches DIAL's `api-key` header and deployment-scoped URLs.
#[derive(Clone)]
pub struct SdkDialClient {
    client: Client<AzureConfig>,
    deployment: String,
}

impl SdkDialClient {
    pub fn new(cfg: &DialConfig, deployment: impl Into<String>) -> Self {
        let deployment = deployment.into();
        let azure = AzureConfig::new()
            .with_api_base(cfg.endpoint.trim_end_matches('/'))
            .with_api_version(cfg.api_version.as_str())
            .with_deployment_id(deployment.as_str())
            .with_api_key(cfg.api_key.as_str());
        // The SDK resends rate-limited requests by default; a zero elapsed
        // budget turns every failure into a final one.
        let no_retry = backoff::ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Self {
            client: Client::with_config(azure).with_backoff(no_retry),
            deployment,
        }
    }

    fn build_request(
        &self,
        msgs: &[Message],
        stream: bool,
    ) -> Result<CreateChatCompletionRequest, ChatError> {
        let messages = msgs
            .iter()
            .map(to_sdk_message)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sdk_err)?;
        CreateChatCompletionRequestArgs::default()
            // Azure routes by deployment; the model field is informational.
            .model(self.deployment.as_str())
            .messages(messages)
            .stream(stream)
            .build()
            .map_err(map_sdk_err)
    }
}

fn to_sdk_message(m: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = m.content().to_string();
    Ok(match m.role() {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    })
}

fn chunk_deltas(chunk: CreateChatCompletionStreamResponse) -> Vec<ChatDelta> {
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if let Some(t) = choice.delta.content.filter(|t| !t.is_empty()) {
        out.push(ChatDelta::Text(t));
    }
    if let Some(reason) = choice.finish_reason {
        let reason = serde_json::to_value(reason)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string));
        out.push(ChatDelta::Finish(reason));
    }
    out
}

impl CompletionClient for SdkDialClient {
    fn deployment(&self) -> &str {
        &self.deployment
    }

    async fn get_completion(&self, msgs: &[Message]) -> Result<Message, ChatError> {
        let request = self.build_request(msgs, false)?;
        info!(target:"providers::dial","sdk completion deployment={} messages={}", self.deployment, msgs.len());
        let completion = self.client.chat().create(request).await.map_err(|e| {
            error!(target:"providers::dial","sdk completion failed: {}", e);
            map_sdk_err(e)
        })?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(ChatError::EmptyChoices)?;
        let content = choice.message.content.unwrap_or_default();
        debug!(target:"providers::dial","sdk completion chars={}", content.len());
        Ok(Message::assistant(content))
    }

    async fn stream_chat<'a>(&'a self, msgs: &[Message]) -> Result<ChatStream<'a>, ChatError> {
        let request = self.build_request(msgs, true)?;
        info!(target:"providers::dial","sdk stream deployment={} messages={}", self.deployment, msgs.len());
        let mut chunks = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(map_sdk_err)?;
        // The SDK reports a rejected request as the first stream item; surface
        // it here so both clients fail before any content is shown.
        let first = match chunks.next().await {
            Some(Err(e)) => {
                error!(target:"providers::dial","sdk stream start failed: {}", e);
                return Err(map_sdk_err(e));
            }
            other => other,
        };
        let s = async_stream::stream! {
            if let Some(Ok(chunk)) = first {
                for d in chunk_deltas(chunk) {
                    yield Ok(d);
                }
            } else {
                return;
            }
            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        for d in chunk_deltas(chunk) {
                            yield Ok(d);
                        }
                    }
                    Err(e) => {
                        yield Err(map_sdk_err(e));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(s))
    }
}

pub(crate) fn map_sdk_err(e: OpenAIError) -> ChatError {
    match e {
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => ChatError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            },
            None if e.is_timeout() => ChatError::Timeout(e.to_string()),
            None => ChatError::Network(e.to_string()),
        },
        // The SDK drops the status code once it has parsed the error object.
        OpenAIError::ApiError(api) => ChatError::Api(api.to_string()),
        OpenAIError::JSONDeserialize(e) => ChatError::Decode(e.to_string()),
        OpenAIError::InvalidArgument(s) => ChatError::InvalidRequest(s),
        OpenAIError::StreamError(msg) => match stream_status(&msg) {
            Some(status) => ChatError::Status { status, body: msg },
            None => ChatError::Network(msg),
        },
        other => ChatError::Sdk(other.to_string()),
    }
}

// Event-source rejections only survive as text: "Invalid status code: 401 Unauthorized".
fn stream_status(msg: &str) -> Option<u16> {
    msg.strip_prefix("Invalid status code: ")?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}
