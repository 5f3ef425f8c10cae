//! The commands the binary runs.
//!
//! # Submodules
//!
//! - [`export`]: copy actualités from the legacy site into the export file,
//!   recovering bodies from the public pages when the API has none
//! - [`import`]: create the exported posts on the new site
//! - [`clean`]: delete what an import created
//! - [`diagnose`]: connection, authentication, ACF and extraction checks
//! - [`browse`]: read-only listings through the front-end helpers
//!
//! Tasks process posts one at a time with a pause in between; a failure on
//! one post is logged and counted but never aborts the run.

pub mod browse;
pub mod clean;
pub mod diagnose;
pub mod export;
pub mod import;

/// Collection the legacy site exposes actualités under.
pub const ACTUALITES: &str = "actualites";
/// Standard posts collection.
pub const POSTS: &str = "posts";
