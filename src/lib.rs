//! Reconciles an Esoteric SACD ISO library with its extracted DSF copy:
//! reports missing albums and discs and repairs the structural mistakes
//! extraction tools leave behind.

pub mod config;
pub mod discs;
pub mod error;
pub mod findings;
pub mod inventory;
pub mod matcher;
pub mod naming;
pub mod planner;
pub mod repair;
pub mod report;
pub mod scanner;
pub mod validate;

pub use config::Config;
pub use error::{ConfigError, RepairError};
pub use findings::{Finding, Warning};
pub use planner::{plan_album, AlbumPlan};
pub use repair::{Apply, RepairAction, RepairBackend, Simulate};
pub use report::Report;
pub use validate::{AlbumOutcome, Validator};
