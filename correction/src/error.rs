use acq_index::config::ConfigError;
use image_store::StoreError;
use thiserror::Error;

#[derive(Error,Debug)]
pub enum CorrectionError {
    #[error("{0} needs a z-stack but the corrected store has a single slice")]
    MissingZStack(String),
    #[error("{0} (re-run with force to override)")]
    ConfirmationRequired(String),
    #[error("focus window of {window} slices does not fit in {slices} slices")]
    WindowTooLarge {
        window:usize,
        slices:usize,
    },
    #[error("{name} returned a stack of shape {found:?}, expected {expected:?}")]
    ShapeChanged {
        name:String,
        expected:[usize;3],
        found:[usize;3],
    },
    #[error("channel {0} is not in the corrected store")]
    UnknownChannel(String),
    #[error("no transform supplied for {0}")]
    NoTransform(String),
    #[error("{name} failed: {reason}")]
    Transform {
        name:String,
        reason:String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("correction io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest cannot be encoded: {0}")]
    Json(#[from] serde_json::Error),
}
