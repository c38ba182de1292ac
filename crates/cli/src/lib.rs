pub mod app;
pub mod logging;
pub mod strings;

pub use app::{prompt_setup, run_chat, SessionSetup, SetupDefaults};
