//! Review queue errors

use thiserror::Error;

use crate::item::{ItemId, ReviewState};

/// Errors that can occur in review queue operations
///
/// All of these are recoverable: the queue is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Unknown queue item: {0}")]
    UnknownQueueItem(ItemId),

    #[error("Invalid transition for {id}: cannot {action} from {from}")]
    InvalidTransition {
        id: ItemId,
        from: ReviewState,
        action: &'static str,
    },

    #[error("Queue item {id} already resolved as {state}")]
    AlreadyResolved { id: ItemId, state: ReviewState },
}

/// Result type for review operations
pub type ReviewResult<T> = Result<T, ReviewError>;
