//! Execution gateway: typed operations against the remote runner

pub mod http;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export key types for convenience
pub use http::HttpExecutionGateway;
pub use mock::{GatewayCall, MockGateway};
pub use traits::ExecutionGateway;
pub use types::{CancelRequest, InputRequest, RemoteStatus, StartRequest, StatusFrame};
