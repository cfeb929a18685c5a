//! Variability and aggregation analysis.
//!
//! Repeated runs of the same test rarely cover exactly the same files and lines. The functions here operate on a time
//! series of reports (one per test run, in run order) to separate files which come and go from stable ones, accumulate
//! coverage across runs, and measure how much the coverage still changes from one step to the next.

use compare::{compare, compare_all, ComparisonMatrix, Different, PairKey};
use diff::{DiffMode, Names};
use error::{Error, Result};
use report::{Covered, Level, Report};

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Source files of a series split by whether they are covered by every report.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct FileVariability {
    /// Files present in every report.
    pub stable: BTreeSet<String>,
    /// Files present in some reports but not all.
    pub variable: BTreeSet<String>,
}

/// Classifies the source files of a series.
pub fn classify<T>(series: &[Report<T>]) -> FileVariability {
    let mut reports = series.iter();
    let mut stable: BTreeSet<String> = match reports.next() {
        Some(first) => first.source_files.keys().cloned().collect(),
        None => return FileVariability::default(),
    };
    let mut seen = stable.clone();
    for report in reports {
        stable.retain(|file| report.source_files.contains_key(file));
        seen.extend(report.source_files.keys().cloned());
    }
    let variable = &seen - &stable;
    FileVariability { stable, variable }
}

/// How variable source files are resolved.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum VariabilityPolicy {
    /// Every report gets an empty line set for each variable file it lacks.
    Pad,
    /// Variable files are deleted from every report.
    Remove,
}

impl Default for VariabilityPolicy {
    fn default() -> VariabilityPolicy {
        VariabilityPolicy::Pad
    }
}

impl FromStr for VariabilityPolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<VariabilityPolicy> {
        Ok(match s {
            "pad" => VariabilityPolicy::Pad,
            "remove" => VariabilityPolicy::Remove,
            _ => bail!("unknown variability policy `{}`, expecting `pad` or `remove`", s),
        })
    }
}

/// Resolves file-level variability, so that every report of the returned series has the same source files.
pub fn filter_file_variability<T: Covered>(series: &[Report<T>], policy: VariabilityPolicy) -> Vec<Report<T>> {
    let variability = classify(series);
    debug!("stable files: {:?}", variability.stable);
    debug!("variable files: {:?}", variability.variable);

    if variability.variable.is_empty() {
        return series.to_vec();
    }

    series
        .iter()
        .map(|report| {
            let mut report = report.clone();
            match policy {
                VariabilityPolicy::Remove => report.source_files.retain(|file, _| variability.stable.contains(file)),
                VariabilityPolicy::Pad => for file in &variability.variable {
                    report.source_files.entry(file.clone()).or_insert_with(BTreeSet::new);
                },
            }
            report
        })
        .collect()
}

/// Adds the coverage of `src` into `dest`.
pub fn aggregate_into<T: Covered>(dest: &mut Report<T>, src: &Report<T>) {
    for (file, lines) in &src.source_files {
        dest.source_files.entry(file.clone()).or_insert_with(BTreeSet::new).extend(lines.iter().cloned());
    }
}

/// Accumulates coverage along the series.
///
/// Returns one snapshot per report: snapshot `i` is the union of reports `0..=i`. The first report is taken as-is,
/// including its test metadata, which all later snapshots keep.
pub fn aggregate<T: Covered>(series: &[Report<T>]) -> Vec<Report<T>> {
    let mut snapshots: Vec<Report<T>> = Vec::with_capacity(series.len());
    for report in series {
        let snapshot = match snapshots.last() {
            Some(previous) => {
                let mut snapshot = previous.clone();
                aggregate_into(&mut snapshot, report);
                snapshot
            },
            None => report.clone(),
        };
        snapshots.push(snapshot);
    }
    snapshots
}

/// Line-level differences between every report and the one following it, keyed `"{i}-{i+1}"`.
pub fn consecutive_differences<T: Covered>(series: &[Report<T>], names: &Names) -> Result<BTreeMap<PairKey, Different<T>>> {
    series
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let comparison = compare(&pair[0], &pair[1], Level::Line, names, DiffMode::Directional)?;
            Ok((PairKey(i, i + 1), comparison.different))
        })
        .collect()
}

/// Compares every report of the series with every other report.
pub fn all_differences<T: Covered>(series: &[Report<T>], names: &Names, level: Level) -> Result<ComparisonMatrix<T>> {
    compare_all(series, series, level, names, DiffMode::Directional)
}

/// Number of lines hit in each source file at each step. A file absent at some step counts zero lines there.
pub fn lines_per_file<T: Covered>(series: &[Report<T>]) -> BTreeMap<String, Vec<usize>> {
    let mut counts = BTreeMap::new();
    for (step, report) in series.iter().enumerate() {
        for (file, lines) in &report.source_files {
            let steps = counts.entry(file.clone()).or_insert_with(Vec::new);
            steps.resize(step, 0);
            steps.push(lines.len());
        }
    }
    for steps in counts.values_mut() {
        steps.resize(series.len(), 0);
    }
    counts
}

/// Keeps the files whose line count changes by an amount within `low..=high` at least once between two steps.
///
/// The first step is compared with itself, so a `low` of zero keeps every file.
pub fn within_threshold(counts: &BTreeMap<String, Vec<usize>>, (low, high): (f64, f64)) -> BTreeMap<String, Vec<usize>> {
    counts
        .iter()
        .filter(|&(_, steps)| {
            let mut previous = match steps.first() {
                Some(&count) => count,
                None => return false,
            };
            steps.iter().any(|&count| {
                let change = (count as f64 - previous as f64).abs();
                previous = count;
                low <= change && change <= high
            })
        })
        .map(|(file, steps)| (file.clone(), steps.clone()))
        .collect()
}

/// Mean change of line counts per step across files.
///
/// Each file's counts are centred on their mean, and flipped when the first centred value is negative so that all
/// files start from the same side. The result is the per-step mean of the centred counts.
pub fn line_change_profile(counts: &BTreeMap<String, Vec<usize>>) -> Vec<f64> {
    let series = counts.values().filter(|steps| !steps.is_empty()).collect::<Vec<_>>();
    let step_count = series.iter().map(|steps| steps.len()).max().unwrap_or(0);
    let mut sums = vec![0.0; step_count];

    for steps in &series {
        let mean = steps.iter().sum::<usize>() as f64 / steps.len() as f64;
        let flip = if (steps[0] as f64) < mean { -1.0 } else { 1.0 };
        for (sum, &count) in sums.iter_mut().zip(steps.iter()) {
            *sum += flip * (count as f64 - mean);
        }
    }

    let file_count = series.len() as f64;
    sums.into_iter().map(|sum| sum / file_count).collect()
}

/// Stability of a per-step series, `100 / ((max - min) + 1)`. A flat series scores 100.
///
/// Returns `None` for an empty series.
pub fn stability_score(values: &[f64]) -> Option<f64> {
    let mut values = values.iter().cloned();
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(min, max), value| (min.min(value), max.max(value)));
    Some(100.0 / ((max - min) + 1.0))
}

/// Summary of how the coverage of a series changes over time.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Stability {
    /// Lines hit per file per step, for files within the change threshold.
    pub lines_per_file: BTreeMap<String, Vec<usize>>,
    /// Mean change of line counts per step.
    pub profile: Vec<f64>,
    /// Stability score of the profile.
    pub score: Option<f64>,
}

/// Computes the [`Stability`] of a series, considering the files whose line count changes within `threshold`.
///
/// [`Stability`]: ./struct.Stability.html
pub fn stability<T: Covered>(series: &[Report<T>], threshold: (f64, f64)) -> Stability {
    let lines_per_file = within_threshold(&lines_per_file(series), threshold);
    let profile = line_change_profile(&lines_per_file);
    let score = stability_score(&profile);
    Stability {
        lines_per_file,
        profile,
        score,
    }
}

#[cfg(test)]
fn series_of(files: Vec<Vec<(&str, Vec<u32>)>>) -> Vec<Report<u32>> {
    files.into_iter().map(Report::from_files).collect()
}

#[test]
fn test_classify() {
    let series = series_of(vec![
        vec![("f1", vec![1]), ("f2", vec![2])],
        vec![("f1", vec![1]), ("f3", vec![2])],
        vec![("f1", vec![1]), ("f2", vec![2])],
    ]);
    let variability = classify(&series);
    assert_eq!(variability.stable.into_iter().collect::<Vec<_>>(), vec!["f1"]);
    assert_eq!(variability.variable.into_iter().collect::<Vec<_>>(), vec!["f2", "f3"]);

    assert_eq!(classify::<u32>(&[]), FileVariability::default());
}

#[test]
fn test_filter_file_variability_pad() {
    let series = series_of(vec![
        vec![("f1", vec![1])],
        vec![("f1", vec![1, 2]), ("f2", vec![4])],
        vec![("f1", vec![1])],
    ]);
    let padded = filter_file_variability(&series, VariabilityPolicy::Pad);
    assert_eq!(padded.len(), 3);
    for report in &padded {
        assert_eq!(report.file_names().into_iter().collect::<Vec<_>>(), vec!["f1", "f2"]);
    }
    assert!(padded[0].lines("f2").unwrap().is_empty());
    assert_eq!(padded[1].lines("f2").unwrap().len(), 1);
    assert!(padded[2].lines("f2").unwrap().is_empty());
}

#[test]
fn test_filter_file_variability_remove() {
    let series = series_of(vec![
        vec![("f1", vec![1])],
        vec![("f1", vec![1, 2]), ("f2", vec![4])],
    ]);
    let removed = filter_file_variability(&series, VariabilityPolicy::Remove);
    assert_eq!(removed.len(), 2);
    assert!(removed.iter().all(|report| report.file_names().into_iter().collect::<Vec<_>>() == vec!["f1"]));

    assert_eq!("remove".parse::<VariabilityPolicy>().unwrap(), VariabilityPolicy::Remove);
    assert!("drop".parse::<VariabilityPolicy>().is_err());
}

#[test]
fn test_aggregate() {
    let mut series = series_of(vec![
        vec![("f1", vec![1])],
        vec![("f1", vec![2]), ("f2", vec![4])],
        vec![("f1", vec![1, 3])],
    ]);
    series[0].test = "first".to_owned();
    series[1].test = "second".to_owned();

    let snapshots = aggregate(&series);
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0], series[0]);
    assert_eq!(snapshots[2].test, "first");
    assert_eq!(snapshots[2].lines("f1").unwrap().iter().cloned().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(snapshots[2].lines("f2").unwrap().iter().cloned().collect::<Vec<_>>(), vec![4]);

    let names = Names::new("browser_foo.js-1", "browser_foo.js-2").unwrap();
    let differences = consecutive_differences(&snapshots, &names).unwrap();
    assert_eq!(differences.keys().cloned().collect::<Vec<_>>(), vec![PairKey(0, 1), PairKey(1, 2)]);
    let step = differences[&PairKey(1, 2)].lines().unwrap();
    assert_eq!(step["f1"].get("browser_foo.js-2-browser_foo.js-1").unwrap().iter().cloned().collect::<Vec<_>>(), vec![3]);
    assert!(step["f2"].all().is_empty());
}

#[test]
fn test_all_differences() {
    let series = series_of(vec![vec![("f1", vec![1])], vec![("f1", vec![2])]]);
    let names = Names::new("t-1", "t-2").unwrap();
    let matrix = all_differences(&series, &names, Level::Line).unwrap();
    assert_eq!(matrix.len(), 4);
}

#[test]
fn test_lines_per_file() {
    let series = series_of(vec![
        vec![("f1", vec![1])],
        vec![("f2", vec![1, 2])],
        vec![("f1", vec![1, 2, 3])],
    ]);
    let counts = lines_per_file(&series);
    assert_eq!(counts["f1"], vec![1, 0, 3]);
    assert_eq!(counts["f2"], vec![0, 2, 0]);

    let kept = within_threshold(&counts, (3.0, 10.0));
    assert_eq!(kept.keys().collect::<Vec<_>>(), vec!["f1"]);
    assert_eq!(within_threshold(&counts, (0.0, 50000.0)).len(), 2);
}

#[test]
fn test_stability() {
    let mut counts = BTreeMap::new();
    counts.insert("a".to_owned(), vec![1, 2, 3]);
    counts.insert("b".to_owned(), vec![3, 3, 3]);
    assert_eq!(line_change_profile(&counts), vec![0.5, 0.0, -0.5]);

    assert_eq!(stability_score(&[0.5, 0.0, -0.5]), Some(50.0));
    assert_eq!(stability_score(&[4.0, 4.0]), Some(100.0));
    assert_eq!(stability_score(&[]), None);

    let series = series_of(vec![vec![("f1", vec![1])], vec![("f1", vec![1])]]);
    assert_eq!(stability(&series, (0.0, 50000.0)).score, Some(100.0));
}
