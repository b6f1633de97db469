pub mod client;
pub mod error;
pub mod types;

pub use client::{ViewerClient, WorkflowService};
pub use types::{QueueStatusBody, ServiceResponse, error_message};
