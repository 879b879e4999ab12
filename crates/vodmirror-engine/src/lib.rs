//! The resumable transfer engine and the orchestration entry point.
//!
//! One admission producer feeds a fixed worker pool over a bounded queue,
//! under origin rate pacing and a wall-clock budget. The `mirror` entry
//! operation ties validation, parsing, inventory diffing, the transfer pass,
//! and completion classification together.

pub mod budget;
pub mod mirror;
pub mod pacing;
pub mod transfer;

pub use budget::TimeBudget;
pub use mirror::mirror;
pub use pacing::AdmissionPacer;
pub use transfer::{TransferEngine, TransferSummary};
