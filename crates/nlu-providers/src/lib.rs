//! NLU Providers
//!
//! Amazon Lex and LUIS implementations of the training capability traits:
//! - REST clients (`lex::LexClient` with SigV4 signing, `luis::LuisClient`)
//! - Import document builders for each provider
//! - `ProvisioningBackend` and `PredictionClient` implementations
//! - A factory resolving a provider from configuration

pub mod error;
pub mod factory;
pub mod http;
pub mod json;
pub mod lex;
pub mod luis;

pub use error::{ProviderError, ProviderResult};
pub use factory::{Provider, ProviderKind, ProvidersConfig};
pub use lex::{LexBackend, LexConfig, LexSettings};
pub use luis::{LuisBackend, LuisConfig, LuisSettings};
