use worktrack_core::{CatalogError, TaskError};
use worktrack_store::StoreError;

use crate::rpc::{self, RpcResponse};

/// Failures surfaced by RPC handlers.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HandlerError {
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidParams(_) | Self::Catalog(_) | Self::Task(_) => rpc::INVALID_PARAMS,
            Self::NotFound(_) => rpc::NOT_FOUND,
            Self::Json(_) => rpc::INTERNAL_ERROR,
            Self::Store(e) => match e {
                StoreError::NotFound(_) => rpc::NOT_FOUND,
                StoreError::Conflict(_) => rpc::CONFLICT,
                StoreError::UnboundedFilter
                | StoreError::InvalidFilter(_)
                | StoreError::InvalidPatch(_)
                | StoreError::InvalidDocument(_)
                | StoreError::Task(_) => rpc::INVALID_PARAMS,
                StoreError::Database(_)
                | StoreError::Serialization(_)
                | StoreError::Io(_)
                | StoreError::CorruptRow { .. } => rpc::INTERNAL_ERROR,
            },
        }
    }

    pub fn into_response(self, id: Option<serde_json::Value>) -> RpcResponse {
        let code = self.code();
        if code == rpc::INTERNAL_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        RpcResponse::error(id, code, self.to_string())
    }
}
