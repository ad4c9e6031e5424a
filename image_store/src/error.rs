use std::path::PathBuf;
use acq_index::acq_order::IndexError;
use acq_index::config::ConfigError;
use acq_index::plan::PlanError;
use thiserror::Error;

#[derive(Error,Debug)]
pub enum StoreError {
    #[error("frame shape {found:?} does not match the plan's frame shape {expected:?}")]
    FrameShapeMismatch {
        expected:[usize;2],
        found:[usize;2],
    },
    #[error("invalid {axis} index set: {reason}")]
    InvalidIndexSet {
        axis:&'static str,
        reason:String,
    },
    #[error("journal already holds all {0} frames of the plan")]
    JournalFull(usize),
    #[error("journal is empty; nothing to reconstruct")]
    EmptyJournal,
    #[error("the store has no dataset directory to persist to")]
    NoDirectory,
    #[error("{0} (re-run with force to override)")]
    ConfirmationRequired(String),
    #[error("dataset {0:?} is unreadable: {1}")]
    Unreadable(PathBuf,String),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal record cannot be encoded: {0}")]
    Json(#[from] serde_json::Error),
}
