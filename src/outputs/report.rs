//! Counters printed at the end of import and clean runs.

use std::fmt;

/// Outcome counters for a run over the exported posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success: usize,
    pub errors: usize,
    pub not_found: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.success + self.errors + self.not_found
    }

    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.success, self.errors)?;
        if self.not_found > 0 {
            write!(f, ", {} not found", self.not_found)?;
        }
        write!(f, " (of {})", self.total())
    }
}
