pub mod client;
pub mod error;
pub mod http;
pub mod mock;
pub mod traits;

pub use client::DecisionClient;
pub use error::EngineError;
pub use http::HttpEngine;
pub use mock::MockEngine;
pub use traits::DecisionEngine;
