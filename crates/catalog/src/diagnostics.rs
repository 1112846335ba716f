//! Run-level record of units that were skipped instead of aborting the run.

use derive_more::Display;
use std::slice::Iter;

/// Pipeline stage that dropped a unit.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// A category or entry in the source document had the wrong shape.
    #[display("parse")]
    Parse,
    /// An episode's structured sub-object could not be used for grouping.
    #[display("regroup")]
    Regroup,
}

/// Why a single unit was skipped.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("[{stage}] {category}#{position}: {reason}")]
pub struct Diagnostic {
    pub stage: Stage,
    /// Owning main-category (empty when the category itself was skipped).
    pub category: String,
    /// Entry title, when one could be read.
    pub title: Option<String>,
    /// Position of the unit within its parent list. For regrouping that is
    /// the flat record list.
    pub position: usize,
    pub reason: String,
}
impl Diagnostic {
    pub fn new(stage: Stage, category: impl Into<String>, position: usize, reason: impl Into<String>) -> Self {
        Self {
            stage,
            category: category.into(),
            title: None,
            position,
            reason: reason.into(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

/// Ordered list of [`Diagnostic`]s collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);
impl Diagnostics {
    /// Record (and log) a skipped unit.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            stage = %diagnostic.stage,
            category = %diagnostic.category,
            title = diagnostic.title.as_deref().unwrap_or_default(),
            position = diagnostic.position,
            reason = %diagnostic.reason,
            "Skipping catalog unit",
        );
        self.0.push(diagnostic);
    }

    /// Total number of skipped units.
    pub fn skipped(&self) -> usize {
        self.0.len()
    }

    /// Number of units skipped by the given stage.
    pub fn skipped_in(&self, stage: Stage) -> usize {
        self.0.iter().filter(|d| d.stage == stage).count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, Diagnostic> {
        self.0.iter()
    }
}
impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = Iter<'a, Diagnostic>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
