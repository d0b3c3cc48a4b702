//! Binary-log segment discovery.
//!
//! MySQL writes its binary log as a sequence of numbered files
//! (`mysql-bin.000001`, `mysql-bin.000002`, ...) next to an index file.
//! This crate lists those segments as typed, ordered identifiers and
//! computes the inclusive windows of segments an incremental backup covers.

mod lister;
mod types;

pub use lister::{SegmentLister, closed_before};
pub use types::{CaptureWindow, SegmentId};
