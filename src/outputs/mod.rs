//! Files and reports produced by the migration tasks.
//!
//! # Submodules
//!
//! - [`json`]: the export file (load, merge new posts, pretty write)
//! - [`report`]: counters printed at the end of import and clean
//!
//! # Output Structure
//!
//! ```text
//! exports/
//! └── actualites.json   # JSON array of WordPress posts, newest first
//! ```

pub mod json;
pub mod report;
