use std::io;

use anyhow::Result;
use clap::Parser;
use dial_chat::{logging, prompt_setup, run_chat, strings::DEFAULT_SYSTEM_PROMPT, SetupDefaults};
use dial_core::{Conversation, Message};
use providers::dial::{config::DEFAULT_DEPLOYMENT, DialFileConfig};
use providers::{ClientKind, DialClient, DialConfig};
use tracing::info;

/// Interactive chat against a DIAL deployment.
#[derive(Parser)]
#[command(name = "dial-chat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Wait for the full reply instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Deployment to talk to; skips the deployment prompt
    #[arg(short, long)]
    deployment: Option<String>,

    /// Use the raw HTTP client; skips the client prompt
    #[arg(long)]
    raw: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init(cli.verbose)?;

    let file = DialFileConfig::load()?.unwrap_or_default();
    let cfg = DialConfig::from_env(&file)?;
    let stream = !cli.no_stream && file.stream.unwrap_or(true);

    let defaults = SetupDefaults {
        deployment: file
            .deployment
            .clone()
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
        system_prompt: file
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        preset_deployment: cli.deployment,
        preset_kind: cli.raw.then_some(ClientKind::Raw),
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let setup = prompt_setup(&mut input, &mut out, &defaults)?;
    info!(target: "cli", "session start endpoint={} deployment={} client={:?} stream={}",
        cfg.endpoint, setup.deployment, setup.kind, stream);

    let client = DialClient::new(setup.kind, &cfg, &setup.deployment)?;
    let mut conversation = Conversation::new();
    conversation.add_message(Message::system(setup.system_prompt));

    let turns = run_chat(&client, &mut conversation, &mut input, &mut out, stream).await?;
    info!(target: "cli", "session end turns={} messages={}", turns, conversation.len());
    Ok(())
}
