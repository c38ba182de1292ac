pub mod dial;

pub use dial::{ClientKind, DialClient, DialConfig, RawDialClient, SdkDialClient};
