//! Shared infrastructure utilities for ferrule.
//!
//! This crate provides cross-cutting utilities that multiple ferrule crates need
//! but that don't belong in the domain-pure `ferrule-types` crate:
//!
//! - **`atomic_write`**: Crash-safe document saves (temp + rename)
//! - **`diff`**: Line diffs turned into text edits, and unified diff rendering

pub mod atomic_write;
pub mod diff;

pub use atomic_write::atomic_write;
pub use diff::{compute_diff_stats, format_unified_diff, text_edits};
