pub mod acq_manager;
pub mod args;
pub mod clock;
pub mod commands;
pub mod driver;
pub mod run;
