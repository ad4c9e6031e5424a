pub mod args;
pub mod commands;
pub mod corrected_store;
pub mod corrections;
pub mod error;
pub mod export;
pub mod flat_field;
pub mod pipeline;
pub mod refocus;
pub mod registration;
pub mod settings;
pub mod transform;
