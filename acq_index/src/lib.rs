pub mod acq_order;
pub mod config;
pub mod coordinate;
pub mod plan;
