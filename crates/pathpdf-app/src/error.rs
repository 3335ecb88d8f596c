use pathpdf_core::{NodeId, StatusField};
use pathpdf_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Node {0} is not part of this roadmap")]
    UnknownNode(NodeId),
    #[error("Failed to save {field:?} for {id}: {message}")]
    WriteFailed {
        id: NodeId,
        field: StatusField,
        message: String,
    },
    #[error("Roadmap session is closed")]
    Closed,
}
