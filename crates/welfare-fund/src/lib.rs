//! Student welfare fund core: application review workflow and the fund ledger.

pub mod categories;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod money;
pub mod repository;
pub mod review;
pub mod telemetry;

pub use error::AppError;
