//! LUIS provider (v2 authoring and prediction APIs).

pub mod backend;
pub mod client;
pub mod payload;
pub mod settings;

pub use backend::{LuisBackend, TrainingTarget, AUTHORING_THROTTLE_DELAY, QUERY_THROTTLE_DELAY, TRAIN_STATUS_DELAY};
pub use client::LuisClient;
pub use settings::{LuisConfig, LuisSettings, DEFAULT_VERSION_ID};
