use crate::dial::config::DialConfig;
use crate::dial::decoder::{classify_line, LineBuffer, LineEvent};
use dial_core::llm::{ChatDelta, ChatError, ChatStream, CompletionClient};
use dial_core::Message;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// Talks to the DIAL chat completions endpoint with plain HTTP and decodes
/// the event stream itself.
#[derive(Clone)]
pub struct RawDialClient {
    http: Client,
    url: String,
    deployment: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl RawDialClient {
    pub fn new(cfg: &DialConfig, deployment: impl Into<String>) -> anyhow::Result<Self> {
        let deployment = deployment.into();
        let mut headers = header::HeaderMap::new();
        headers.insert("api-key", header::HeaderValue::from_str(&cfg.api_key)?);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_max_idle_per_host(2);
        if let Some(t) = cfg.timeout {
            builder = builder.timeout(t);
        }
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            url: cfg.chat_completions_url(&deployment),
            deployment,
        })
    }

    fn request_body(msgs: &[Message], stream: bool) -> serde_json::Value {
        let messages = msgs.iter().map(Message::to_wire).collect::<Vec<_>>();
        if stream {
            serde_json::json!({ "stream": true, "messages": messages })
        } else {
            serde_json::json!({ "messages": messages })
        }
    }

    async fn post(&self, body: &serde_json::Value) -> Result<reqwest::Response, ChatError> {
        let resp = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if resp.status() != StatusCode::OK {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target:"providers::dial","raw non-200 status={} body={:?}", status, text);
            return Err(map_status_err(status, text));
        }
        Ok(resp)
    }
}

impl CompletionClient for RawDialClient {
    fn deployment(&self) -> &str {
        &self.deployment
    }

    async fn get_completion(&self, msgs: &[Message]) -> Result<Message, ChatError> {
        let body = Self::request_body(msgs, false);
        info!(target:"providers::dial","raw completion deployment={} messages={}", self.deployment, msgs.len());
        debug!(target:"providers::dial","raw request url={} body={}", self.url, body);
        let resp = self.post(&body).await?;
        let text = resp.text().await.map_err(map_reqwest_err)?;
        debug!(target:"providers::dial","raw response body={}", text);
        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| ChatError::Decode(e.to_string()))?;
        let choice = parsed
            .choices
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(ChatError::EmptyChoices)?;
        let content = choice
            .message
            .and_then(|m| m.content)
            .unwrap_or_default();
        Ok(Message::assistant(content))
    }

    async fn stream_chat<'a>(&'a self, msgs: &[Message]) -> Result<ChatStream<'a>, ChatError> {
        let body = Self::request_body(msgs, true);
        info!(target:"providers::dial","raw stream deployment={} messages={}", self.deployment, msgs.len());
        debug!(target:"providers::dial","raw stream request url={} body={}", self.url, body);
        let resp = self.post(&body).await?;
        let mut chunks = Box::pin(resp.bytes_stream());
        let s = async_stream::stream! {
            let mut lines = LineBuffer::new();
            loop {
                match chunks.next().await {
                    Some(Ok(b)) => {
                        lines.extend(&b);
                        while let Some(line) = lines.next_line() {
                            if let Some(d) = line_delta(&line) {
                                yield Ok(d);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(target:"providers::dial","raw stream body error: {}", e);
                        yield Err(map_reqwest_err(e));
                        break;
                    }
                    None => {
                        if let Some(d) = lines.finish().as_deref().and_then(line_delta) {
                            yield Ok(d);
                        }
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(s))
    }
}

fn line_delta(line: &str) -> Option<ChatDelta> {
    match classify_line(line) {
        LineEvent::Fragment(t) => Some(ChatDelta::Text(t)),
        LineEvent::Done => Some(ChatDelta::Finish(None)),
        LineEvent::Skip => None,
    }
}

pub(crate) fn map_reqwest_err(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout(e.to_string())
    } else if e.is_decode() {
        ChatError::Decode(e.to_string())
    } else if e.is_builder() {
        ChatError::InvalidRequest(e.to_string())
    } else {
        ChatError::Network(e.to_string())
    }
}

pub(crate) fn map_status_err(status: StatusCode, body: String) -> ChatError {
    ChatError::Status {
        status: status.as_u16(),
        body,
    }
}
