use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BaseLayerError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    #[error("contract call error: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("failed to build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl BaseLayerError {
    /// Whether retrying the same call can succeed: connectivity problems,
    /// timeouts and server-side 5xx responses. Node-level rejections
    /// (`ErrorResp`) and serialization mismatches are not transient.
    pub fn is_transient(&self) -> bool {
        match self {
            BaseLayerError::Rpc(error) => rpc_error_is_transient(error),
            BaseLayerError::Contract(alloy::contract::Error::TransportError(error)) => {
                rpc_error_is_transient(error)
            }
            BaseLayerError::Contract(_) => false,
            BaseLayerError::HttpClient(_) => false,
        }
    }

    /// Whether the node rejected a submission because its nonce was already
    /// used. Matched on the error message; there is no standardized code.
    pub fn is_nonce_too_low(&self) -> bool {
        match self {
            BaseLayerError::Rpc(RpcError::ErrorResp(payload)) => {
                let message = payload.message.to_lowercase();
                message.contains("nonce too low") || message.contains("nonce is too low")
            }
            _ => false,
        }
    }
}

fn rpc_error_is_transient(error: &RpcError<TransportErrorKind>) -> bool {
    matches!(error, RpcError::Transport(_) | RpcError::NullResp)
}
