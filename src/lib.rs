//! Report model for duplicated-code findings.
//!
//! A [`ScanReport`](report::ScanReport) owns findings and
//! [`DuplicationGroup`](report::duplication::DuplicationGroup)s. Each group
//! lists its member findings, and each member points back at its group
//! through the finding's side-channel slot. Reports written by older releases
//! are read through [`report::loader`], which upgrades every group record via
//! [`report::legacy`].

pub mod config;
pub mod report;
pub mod rules;
