pub mod catalog;
pub mod configuration;
pub mod controller;
pub mod data_capture;
pub mod error_handling;
pub mod run_lock;
pub mod storage;

pub use controller::{Controller, RunOutcome, RunSummary};
