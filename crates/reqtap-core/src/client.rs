//! Client side of the capture message channel.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::{Request, Response};

/// Failure of one request/response exchange with the capture service.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("capture service is not running")]
    Closed,
    #[error("no response from capture service within {0:?}")]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
    #[error("transport: {0}")]
    Transport(String),
}

/// Anything that can carry a [`Request`] to the capture service and bring back
/// its [`Response`]. Implementations own their timeout and cancellation.
pub trait CaptureClient {
    fn send(&self, request: Request) -> impl Future<Output = Result<Response, ChannelError>> + Send;
}
