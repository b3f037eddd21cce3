//! Amazon Lex provider.
//!
//! Model-building calls go to `models.lex.<region>.amazonaws.com`, predictions
//! to `runtime.lex.<region>.amazonaws.com`. Both are signed with SigV4.

pub mod backend;
pub mod client;
pub mod payload;
pub mod settings;
pub mod sigv4;

pub use backend::{BotConfiguration, LexBackend, LexImport, CONFLICT_DELAY, RATE_LIMIT_DELAY};
pub use client::LexClient;
pub use settings::{AwsCredentials, LexConfig, LexSettings};
