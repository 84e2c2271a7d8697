//! Per-package score results.

use super::Package;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which stage produced a result's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreOrigin {
    /// The public OpenSSF snapshot
    PublicLatest,
    /// The caller's own table
    PrivateTable,
    /// Computed during this run
    Generated,
}

impl fmt::Display for ScoreOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicLatest => write!(f, "public-latest"),
            Self::PrivateTable => write!(f, "private-table"),
            Self::Generated => write!(f, "generated"),
        }
    }
}

/// Where a result is in its lifecycle. Transitions only move forward.
///
/// `Unscored` is terminal: it is only reported by
/// [`ScoreResult::final_state`], once every stage has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultState {
    Unresolved,
    RepositoryKnown,
    ScoredFromPublic,
    ScoredFromPrivate,
    ScoredGenerated,
    Unscored,
}

/// The score known for one BOM package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub package: Package,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ScoreOrigin>,
}

impl ScoreResult {
    /// A fresh, unresolved result for a package.
    #[must_use]
    pub const fn new(package: Package) -> Self {
        Self {
            package,
            repository: None,
            score: None,
            date: None,
            source: None,
        }
    }

    /// Attach a repository. Empty strings count as unresolved.
    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        let repository = repository.into();
        if !repository.is_empty() {
            self.repository = Some(repository);
        }
        self
    }

    /// The resolved repository, if any.
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref().filter(|r| !r.is_empty())
    }

    #[must_use]
    pub const fn has_score(&self) -> bool {
        self.score.is_some()
    }

    /// Record a score and the stage it came from.
    pub fn set_score(&mut self, score: f64, date: NaiveDate, origin: ScoreOrigin) {
        self.score = Some(score);
        self.date = Some(date);
        self.source = Some(origin);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ResultState {
        match (self.repository(), self.source) {
            (None, _) => ResultState::Unresolved,
            (Some(_), None) => ResultState::RepositoryKnown,
            (Some(_), Some(ScoreOrigin::PublicLatest)) => ResultState::ScoredFromPublic,
            (Some(_), Some(ScoreOrigin::PrivateTable)) => ResultState::ScoredFromPrivate,
            (Some(_), Some(ScoreOrigin::Generated)) => ResultState::ScoredGenerated,
        }
    }

    /// State after the pipeline has finished: a known repository that no
    /// stage scored is `Unscored`.
    #[must_use]
    pub fn final_state(&self) -> ResultState {
        match self.state() {
            ResultState::RepositoryKnown => ResultState::Unscored,
            state => state,
        }
    }
}
