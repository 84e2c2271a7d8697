//! Property-based tests for parsing and merging.
//!
//! Ensures parsers handle arbitrary input without panicking, and that the
//! merge and ordering invariants hold across random inputs.

use chrono::NaiveDate;
use proptest::prelude::*;
use scorecard_tally::bom::package_from_purl;
use scorecard_tally::context::RunContext;
use scorecard_tally::model::{Package, PackageType, ScoreOrigin, ScoreResult};
use scorecard_tally::pipeline::{merge, MergePolicy, Pipeline};
use scorecard_tally::resolve::RepositoryResolver;
use scorecard_tally::scorecard::{latest_by_repository, ScoreRow, TableRef};
use std::collections::HashMap;

fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(offset))
}

fn repo_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,3}".prop_map(|name| format!("github.com/org/{name}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn purl_parsing_doesnt_panic(s in "\\PC{0,200}") {
        let _ = package_from_purl(&s, None);
        let _ = package_from_purl(&format!("pkg:{s}"), Some("1.0.0"));
    }

    #[test]
    fn table_ref_parsing_doesnt_panic(s in "\\PC{0,100}") {
        let _ = TableRef::parse(&s, Some("p"));
        let _ = TableRef::parse(&s, None);
    }

    #[test]
    fn three_part_table_ref_roundtrips(
        project in "[a-z][a-z0-9-]{0,20}",
        dataset in "[a-z_][a-z0-9_]{0,20}",
        table in "[a-z_][a-z0-9_-]{0,20}",
    ) {
        let reference = format!("{project}.{dataset}.{table}");
        let parsed = TableRef::parse(&reference, None).unwrap();
        prop_assert_eq!(parsed.to_string(), reference);
    }

    #[test]
    fn pypi_names_normalize_once(name in "[A-Za-z0-9][A-Za-z0-9._-]{0,30}[A-Za-z0-9]") {
        let first = package_from_purl(&format!("pkg:pypi/{name}"), None).unwrap();
        let second = package_from_purl(&format!("pkg:pypi/{}", first.name), None).unwrap();
        prop_assert_eq!(&first.name, &second.name);
        prop_assert!(!first.name.contains('_') && !first.name.contains('.'));
        prop_assert_eq!(first.name.to_lowercase(), first.name.clone());
    }

    #[test]
    fn latest_row_has_the_newest_date(
        rows in prop::collection::vec((repo_strategy(), 0.0f64..10.0, 0u32..60), 0..40)
    ) {
        let rows: Vec<ScoreRow> = rows
            .into_iter()
            .map(|(repo, score, offset)| ScoreRow::new(repo, score, day(offset)))
            .collect();
        let latest = latest_by_repository(rows.clone());

        for row in &rows {
            let kept = &latest[&row.repository];
            prop_assert!(kept.date >= row.date);
        }
        prop_assert!(latest.values().all(|kept| rows.contains(kept)));
    }

    #[test]
    fn fill_gaps_never_replaces_a_score(
        scored in prop::collection::vec(any::<bool>(), 1..30),
        known in prop::collection::hash_set(0usize..30, 0..30),
    ) {
        let mut results: Vec<ScoreResult> = scored
            .iter()
            .enumerate()
            .map(|(i, has_score)| {
                let mut result = ScoreResult::new(Package::new(PackageType::Npm, format!("p{i}"), "1"))
                    .with_repository(format!("github.com/org/r{i}"));
                if *has_score {
                    result.set_score(1.0, day(0), ScoreOrigin::PublicLatest);
                }
                result
            })
            .collect();
        let before = results.clone();

        let rows: HashMap<String, ScoreRow> = known
            .iter()
            .map(|i| {
                let repo = format!("github.com/org/r{i}");
                (repo.clone(), ScoreRow::new(repo, 9.0, day(1)))
            })
            .collect();
        let applied = merge(&mut results, &rows, MergePolicy::FillGaps, ScoreOrigin::PrivateTable);

        let mut expected_applied = 0;
        for (old, new) in before.iter().zip(&results) {
            prop_assert_eq!(&old.package, &new.package);
            if old.has_score() {
                prop_assert_eq!(old, new);
            } else if rows.contains_key(old.repository().unwrap()) {
                prop_assert_eq!(new.score, Some(9.0));
                expected_applied += 1;
            } else {
                prop_assert!(!new.has_score());
            }
        }
        prop_assert_eq!(applied, expected_applied);
    }

    #[test]
    fn pipeline_preserves_package_order(repos in prop::collection::vec(repo_strategy(), 0..25)) {
        let packages: Vec<Package> = repos
            .iter()
            .map(|repo| Package::new(PackageType::Golang, repo.clone(), "v1.0.0"))
            .collect();

        let output = Pipeline::new(RepositoryResolver::derive_only())
            .run(&RunContext::new(), &packages)
            .unwrap();

        let names: Vec<&str> = output.results.iter().map(|r| r.package.name.as_str()).collect();
        let expected: Vec<&str> = repos.iter().map(String::as_str).collect();
        prop_assert_eq!(names, expected);
        prop_assert!(output.results.iter().all(|r| r.repository() == Some(r.package.name.as_str())));
    }
}
