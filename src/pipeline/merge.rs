//! Folding source rows into the result list.

use crate::model::{ScoreOrigin, ScoreResult};
use crate::scorecard::ScoreRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a source's rows combine with scores already on a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Only results without a score take the row
    FillGaps,
    /// Every result with a matching row takes it
    Overwrite,
}

/// Apply `rows` (keyed by repository) to `results` under `policy`.
///
/// Order, package, and repository of every result are untouched and no
/// result is ever dropped. Returns the number of results whose score was
/// set.
pub fn merge(
    results: &mut [ScoreResult],
    rows: &HashMap<String, ScoreRow>,
    policy: MergePolicy,
    origin: ScoreOrigin,
) -> usize {
    if rows.is_empty() {
        return 0;
    }

    let mut applied = 0;
    for result in results.iter_mut() {
        if policy == MergePolicy::FillGaps && result.has_score() {
            continue;
        }
        let Some(row) = result.repository().and_then(|repo| rows.get(repo)) else {
            continue;
        };
        result.set_score(row.score, row.date, origin);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Package, PackageType};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn result(name: &str, repo: Option<&str>) -> ScoreResult {
        let r = ScoreResult::new(Package::new(PackageType::Npm, name, "1.0.0"));
        match repo {
            Some(repo) => r.with_repository(repo),
            None => r,
        }
    }

    fn rows(entries: &[(&str, f64)]) -> HashMap<String, ScoreRow> {
        entries
            .iter()
            .map(|(repo, score)| ((*repo).to_string(), ScoreRow::new(*repo, *score, day(1))))
            .collect()
    }

    #[test]
    fn test_fill_gaps_keeps_existing_scores() {
        let mut results = vec![result("a", Some("github.com/a/a")), result("b", Some("github.com/b/b"))];
        results[0].set_score(3.0, day(2), ScoreOrigin::PublicLatest);

        let applied = merge(
            &mut results,
            &rows(&[("github.com/a/a", 9.0), ("github.com/b/b", 4.0)]),
            MergePolicy::FillGaps,
            ScoreOrigin::Generated,
        );

        assert_eq!(applied, 1);
        assert_eq!(results[0].score, Some(3.0));
        assert_eq!(results[0].source, Some(ScoreOrigin::PublicLatest));
        assert_eq!(results[1].score, Some(4.0));
        assert_eq!(results[1].source, Some(ScoreOrigin::Generated));
    }

    #[test]
    fn test_overwrite_replaces_scores() {
        let mut results = vec![result("a", Some("github.com/a/a"))];
        results[0].set_score(5.0, day(2), ScoreOrigin::PublicLatest);

        merge(
            &mut results,
            &rows(&[("github.com/a/a", 7.0)]),
            MergePolicy::Overwrite,
            ScoreOrigin::PrivateTable,
        );

        assert_eq!(results[0].score, Some(7.0));
        assert_eq!(results[0].date, Some(day(1)));
        assert_eq!(results[0].source, Some(ScoreOrigin::PrivateTable));
    }

    #[test]
    fn test_overwrite_without_row_keeps_score() {
        let mut results = vec![result("a", Some("github.com/a/a"))];
        results[0].set_score(5.0, day(2), ScoreOrigin::PublicLatest);

        merge(
            &mut results,
            &rows(&[("github.com/other/other", 1.0)]),
            MergePolicy::Overwrite,
            ScoreOrigin::PrivateTable,
        );

        assert_eq!(results[0].score, Some(5.0));
    }

    #[test]
    fn test_unresolved_results_are_kept_untouched() {
        let mut results = vec![
            result("a", None),
            result("b", Some("github.com/b/b")),
            result("c", None),
        ];
        let before: Vec<_> = results.iter().map(|r| r.package.clone()).collect();

        merge(
            &mut results,
            &rows(&[("github.com/b/b", 6.5)]),
            MergePolicy::FillGaps,
            ScoreOrigin::PublicLatest,
        );

        let after: Vec<_> = results.iter().map(|r| r.package.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(results[0].score, None);
        assert_eq!(results[1].score, Some(6.5));
        assert_eq!(results[2].score, None);
    }

    #[test]
    fn test_duplicate_repositories_all_receive_the_row() {
        let mut results = vec![
            result("a", Some("github.com/mono/repo")),
            result("b", Some("github.com/mono/repo")),
        ];
        let applied = merge(
            &mut results,
            &rows(&[("github.com/mono/repo", 8.1)]),
            MergePolicy::FillGaps,
            ScoreOrigin::PublicLatest,
        );
        assert_eq!(applied, 2);
        assert!(results.iter().all(|r| r.score == Some(8.1)));
    }
}
