pub mod engine_config;
pub mod input;
pub mod verdict;

pub use engine_config::EngineConfig;
pub use input::DecisionInput;
pub use verdict::Verdict;
