pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod observability;

pub use config::Config;
pub use domain::{DecisionInput, EngineConfig, Verdict};
pub use engine::{DecisionClient, DecisionEngine, EngineError};
