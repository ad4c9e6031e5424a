pub mod dataset;
pub mod error;
pub mod file_order;
pub mod indices;
pub mod journal;
pub mod metadata;
pub mod raw_io;
pub mod reconstruct;
pub mod store;

pub use error::StoreError;
