use std::io::{self, Cursor, Write};
use std::sync::Mutex;

use dial_chat::strings::LOOP_HINT;
use dial_chat::{prompt_setup, run_chat, SessionSetup, SetupDefaults};
use dial_core::{ChatDelta, ChatError, ChatStream, CompletionClient, Conversation, Message, Role};
use futures::stream;
use providers::ClientKind;

/// Replies with a fixed text, split into two fragments when streaming, and
/// records how many messages each request carried.
struct FakeClient {
    reply: &'static str,
    fail: bool,
    seen: Mutex<Vec<usize>>,
}

impl FakeClient {
    fn new(reply: &'static str) -> Self {
        Self {
            reply,
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl CompletionClient for FakeClient {
    fn deployment(&self) -> &str {
        "fake"
    }

    async fn get_completion(&self, msgs: &[Message]) -> Result<Message, ChatError> {
        self.seen.lock().unwrap().push(msgs.len());
        if self.fail {
            return Err(ChatError::EmptyChoices);
        }
        Ok(Message::assistant(self.reply))
    }

    async fn stream_chat<'a>(&'a self, msgs: &[Message]) -> Result<ChatStream<'a>, ChatError> {
        self.seen.lock().unwrap().push(msgs.len());
        if self.fail {
            return Err(ChatError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        let (a, b) = self.reply.split_at(self.reply.len() / 2);
        Ok(Box::pin(stream::iter(vec![
            Ok(ChatDelta::Text(a.to_string())),
            Ok(ChatDelta::Text(b.to_string())),
            Ok(ChatDelta::Finish(None)),
        ])))
    }
}

/// Accepts `limit` bytes, then fails every write like a closed pipe.
struct ClosingWriter {
    written: Vec<u8>,
    limit: usize,
}

impl Write for ClosingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written.len() + buf.len() > self.limit {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn defaults() -> SetupDefaults {
    SetupDefaults {
        deployment: "gpt-4o".into(),
        system_prompt: "default prompt".into(),
        ..Default::default()
    }
}

#[test]
fn test_setup_defaults_on_empty_answers() {
    let mut input = Cursor::new("\n\n\n");
    let mut out = Vec::new();
    let setup = prompt_setup(&mut input, &mut out, &defaults()).unwrap();
    assert_eq!(
        setup,
        SessionSetup {
            deployment: "gpt-4o".into(),
            kind: ClientKind::Sdk,
            system_prompt: "default prompt".into(),
        }
    );
    let shown = String::from_utf8(out).unwrap();
    assert!(shown.contains("default 'gpt-4o'"));
    assert!(shown.contains("(y/N)"));
}

#[test]
fn test_setup_custom_answers() {
    let mut input = Cursor::new("  my-deployment \nY\nBe a pirate.\n");
    let mut out = Vec::new();
    let setup = prompt_setup(&mut input, &mut out, &defaults()).unwrap();
    assert_eq!(setup.deployment, "my-deployment");
    assert_eq!(setup.kind, ClientKind::Raw);
    assert_eq!(setup.system_prompt, "Be a pirate.");
}

#[test]
fn test_setup_presets_skip_prompts() {
    let mut input = Cursor::new("system text\n");
    let mut out = Vec::new();
    let d = SetupDefaults {
        preset_deployment: Some("from-flag".into()),
        preset_kind: Some(ClientKind::Raw),
        ..defaults()
    };
    let setup = prompt_setup(&mut input, &mut out, &d).unwrap();
    assert_eq!(setup.deployment, "from-flag");
    assert_eq!(setup.kind, ClientKind::Raw);
    assert_eq!(setup.system_prompt, "system text");
    let shown = String::from_utf8(out).unwrap();
    assert!(!shown.contains("deployment name"));
}

#[tokio::test]
async fn test_streaming_loop_builds_history() {
    let client = FakeClient::new("Hello there");
    let mut conv = Conversation::new();
    conv.add_message(Message::system("sys"));
    let mut input = Cursor::new("first\n\n   \nsecond\nEXIT\nnever read\n");
    let mut out = Vec::new();

    let turns = run_chat(&client, &mut conv, &mut input, &mut out, true)
        .await
        .unwrap();
    assert_eq!(turns, 2);

    let roles: Vec<Role> = conv.get_messages().iter().map(|m| m.role()).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(conv.get_messages()[1].content(), "first");
    assert_eq!(conv.get_messages()[2].content(), "Hello there");
    assert_eq!(conv.get_messages()[3].content(), "second");
    // Each request carries the whole history so far.
    assert_eq!(*client.seen.lock().unwrap(), vec![2, 4]);

    let shown = String::from_utf8(out).unwrap();
    assert!(shown.contains("AI: Hello there\n"));
    assert!(shown.contains("Exiting the chat. Goodbye!"));
}

#[tokio::test]
async fn test_blocking_loop_prints_reply() {
    let client = FakeClient::new("Plain answer");
    let mut conv = Conversation::new();
    let mut input = Cursor::new("question\nexit\n");
    let mut out = Vec::new();

    let turns = run_chat(&client, &mut conv, &mut input, &mut out, false)
        .await
        .unwrap();
    assert_eq!(turns, 1);
    assert_eq!(conv.len(), 2);
    let shown = String::from_utf8(out).unwrap();
    assert!(shown.contains("AI: Plain answer\n"));
}

#[tokio::test]
async fn test_end_of_input_stops_loop() {
    let client = FakeClient::new("x");
    let mut conv = Conversation::new();
    let mut input = Cursor::new("only question\n");
    let mut out = Vec::new();
    let turns = run_chat(&client, &mut conv, &mut input, &mut out, true)
        .await
        .unwrap();
    assert_eq!(turns, 1);
    assert!(!String::from_utf8(out).unwrap().contains("Goodbye"));
}

#[tokio::test]
async fn test_failed_request_ends_session() {
    let mut client = FakeClient::new("unused");
    client.fail = true;
    let mut conv = Conversation::new();
    let mut input = Cursor::new("question\nexit\n");
    let mut out = Vec::new();

    let err = run_chat(&client, &mut conv, &mut input, &mut out, true)
        .await
        .unwrap_err();
    let root = err.root_cause().to_string();
    assert_eq!(root, "HTTP 500: boom");
    // The question stays in history; nothing was appended for the reply.
    assert_eq!(conv.len(), 1);

    let mut conv = Conversation::new();
    let mut input = Cursor::new("question\n");
    let err = run_chat(&client, &mut conv, &mut input, &mut Vec::<u8>::new(), false)
        .await
        .unwrap_err();
    assert_eq!(err.root_cause().to_string(), "No choices in response found");
}

#[tokio::test]
async fn test_closed_output_ends_session() {
    let client = FakeClient::new("Hello there");
    let mut conv = Conversation::new();
    let mut input = Cursor::new("first\nsecond\n");
    let banner = format!("\n{}\n", LOOP_HINT);
    // Room for the banner, the input marker and the reply prefix only.
    let mut out = ClosingWriter {
        written: Vec::new(),
        limit: banner.len() + "> AI: ".len(),
    };

    let err = run_chat(&client, &mut conv, &mut input, &mut out, true)
        .await
        .unwrap_err();
    let io_err = err.root_cause().downcast_ref::<io::Error>().unwrap();
    assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(out.written, format!("{}> AI: ", banner).into_bytes());
    // One request went out; the second line was never read.
    assert_eq!(*client.seen.lock().unwrap(), vec![1]);
}
