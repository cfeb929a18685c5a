//! Comparison of coverage reports.
//!
//! Two reports are compared at [`Level::File`] (which source files are covered) or [`Level::Line`] (which lines of
//! each source file are covered). At line level, a file covered by one side only is reported as if all its lines were
//! different, so a single result describes both appearing/disappearing files and changed lines:
//!
//! ```json
//! {
//!     "common": {"f1": [1, 2]},
//!     "different": {
//!         "f1": {"A-B": [3], "B-A": []},
//!         "f2": {"A-B": [5]},
//!         "f3": {"B-A": [9]}
//!     }
//! }
//! ```
//!
//! [`Level::File`]: ../report/enum.Level.html#variant.File
//! [`Level::Line`]: ../report/enum.Level.html#variant.Line

use diff::{diff, DiffMode, Difference, Names};
use error::{ErrorKind, Result};
use report::{Covered, Level, Report};

use serde::{Serialize, Serializer};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name of the subject in baseline correction.
pub const SUBJECT_NAME: &str = "ccov";

/// Name of the baseline in baseline correction.
pub const BASELINE_NAME: &str = "base";

/// Entities common to both sides of a comparison.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(untagged)]
pub enum Common<T> {
    /// Source files covered by both.
    Files(BTreeSet<String>),
    /// For every source file covered by both, the lines covered by both.
    Lines(BTreeMap<String, BTreeSet<T>>),
}

impl<T> Common<T> {
    pub fn files(&self) -> Option<&BTreeSet<String>> {
        match *self {
            Common::Files(ref files) => Some(files),
            Common::Lines(_) => None,
        }
    }

    pub fn lines(&self) -> Option<&BTreeMap<String, BTreeSet<T>>> {
        match *self {
            Common::Files(_) => None,
            Common::Lines(ref lines) => Some(lines),
        }
    }
}

/// Entities differing between the two sides of a comparison.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(untagged)]
pub enum Different<T> {
    /// Source files covered by one side only.
    Files(Difference<String>),
    /// Line differences of every source file covered by either side.
    Lines(BTreeMap<String, Difference<T>>),
}

impl<T> Different<T> {
    pub fn files(&self) -> Option<&Difference<String>> {
        match *self {
            Different::Files(ref files) => Some(files),
            Different::Lines(_) => None,
        }
    }

    pub fn lines(&self) -> Option<&BTreeMap<String, Difference<T>>> {
        match *self {
            Different::Files(_) => None,
            Different::Lines(ref lines) => Some(lines),
        }
    }
}

/// Result of comparing two reports.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Comparison<T> {
    pub common: Common<T>,
    pub different: Different<T>,
}

/// Compares the sets of source files of two reports. The difference is always directional.
fn compare_files<T>(first: &Report<T>, second: &Report<T>, names: &Names) -> (BTreeSet<String>, Difference<String>) {
    let first_files: BTreeSet<String> = first.source_files.keys().cloned().collect();
    let second_files: BTreeSet<String> = second.source_files.keys().cloned().collect();
    diff(&first_files, &second_files, names, DiffMode::Directional)
}

/// Compares the covered lines of two reports.
///
/// `line_mode` only applies to files covered by both sides. A file covered by one side only always gets a single
/// directional entry containing all of its lines.
fn compare_lines<T: Covered>(first: &Report<T>, second: &Report<T>, names: &Names, line_mode: DiffMode) -> (BTreeMap<String, BTreeSet<T>>, BTreeMap<String, Difference<T>>) {
    let (common_files, different_files) = compare_files(first, second, names);

    let mut common = BTreeMap::new();
    let mut different = BTreeMap::new();
    for file in &common_files {
        let (common_lines, different_lines) = diff(&first.source_files[file], &second.source_files[file], names, line_mode);
        common.insert(file.clone(), common_lines);
        different.insert(file.clone(), different_lines);
    }

    for &(report, key) in &[(first, names.forward()), (second, names.backward())] {
        for file in different_files.get(key).into_iter().flat_map(|files| files) {
            let lines = report.source_files[file].clone();
            different.insert(file.clone(), Difference::one_sided(key, lines));
        }
    }

    (common, different)
}

/// Compares two reports at file or line level.
///
/// # Errors
///
/// Returns [`UnsupportedLevel`] if `level` is [`Level::Hits`]. Reports with hit counts are compared at line level.
///
/// [`UnsupportedLevel`]: ../error/enum.ErrorKind.html#variant.UnsupportedLevel
/// [`Level::Hits`]: ../report/enum.Level.html#variant.Hits
pub fn compare<T: Covered>(first: &Report<T>, second: &Report<T>, level: Level, names: &Names, line_mode: DiffMode) -> Result<Comparison<T>> {
    Ok(match level {
        Level::File => {
            let (common, different) = compare_files(first, second, names);
            Comparison {
                common: Common::Files(common),
                different: Different::Files(different),
            }
        },
        Level::Line => {
            let (common, different) = compare_lines(first, second, names, line_mode);
            Comparison {
                common: Common::Lines(common),
                different: Different::Lines(different),
            }
        },
        Level::Hits => bail!(ErrorKind::UnsupportedLevel(level.to_string())),
    })
}

fn baseline_names() -> Result<Names> {
    Names::new(SUBJECT_NAME, BASELINE_NAME)
}

/// Source files covered by `subject` but not by `baseline`.
pub fn unique_files<T>(subject: &Report<T>, baseline: &Report<T>) -> Result<BTreeSet<String>> {
    let names = baseline_names()?;
    let (_, different) = compare_files(subject, baseline, &names);
    Ok(different.into_direction(names.forward()).unwrap_or_default())
}

/// Lines covered by `subject` but not by `baseline`, as a report with the metadata of `subject`.
///
/// Source files without any unique line are dropped.
pub fn unique_lines<T: Covered>(subject: &Report<T>, baseline: &Report<T>) -> Result<Report<T>> {
    let names = baseline_names()?;
    let (_, different) = compare_lines(subject, baseline, &names, DiffMode::Directional);
    let source_files = different
        .into_iter()
        .filter_map(|(file, difference)| {
            difference
                .into_direction(names.forward())
                .and_then(|lines| if lines.is_empty() { None } else { Some((file, lines)) })
        })
        .collect();
    Ok(subject.with_source_files(source_files))
}

/// Coverage unique to a subject after baseline correction.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(untagged)]
pub enum Correction<T> {
    /// Source files unique to the subject.
    Files(BTreeSet<String>),
    /// Lines unique to the subject, in the canonical report shape.
    Lines(Report<T>),
}

impl<T: Covered> Correction<T> {
    /// Turns the correction of `subject` back into a report with its metadata.
    ///
    /// A file-level correction keeps all lines of `subject` in each unique file.
    pub fn into_report(self, subject: &Report<T>) -> Report<T> {
        match self {
            Correction::Files(files) => subject.with_source_files(
                subject
                    .source_files
                    .iter()
                    .filter(|&(file, _)| files.contains(file))
                    .map(|(file, lines)| (file.clone(), lines.clone()))
                    .collect(),
            ),
            Correction::Lines(report) => report,
        }
    }
}

/// Subtracts the `baseline` coverage from the `subject` coverage at file or line level.
///
/// # Errors
///
/// Returns [`UnsupportedLevel`] if `level` is [`Level::Hits`].
///
/// [`UnsupportedLevel`]: ../error/enum.ErrorKind.html#variant.UnsupportedLevel
/// [`Level::Hits`]: ../report/enum.Level.html#variant.Hits
pub fn correct_for_baseline<T: Covered>(subject: &Report<T>, baseline: &Report<T>, level: Level) -> Result<Correction<T>> {
    Ok(match level {
        Level::File => Correction::Files(unique_files(subject, baseline)?),
        Level::Line => Correction::Lines(unique_lines(subject, baseline)?),
        Level::Hits => bail!(ErrorKind::UnsupportedLevel(level.to_string())),
    })
}

/// Position of a pair in a [`ComparisonMatrix`], serialized as `"{i}-{j}"`.
///
/// [`ComparisonMatrix`]: ./struct.ComparisonMatrix.html
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PairKey(pub usize, pub usize);

impl fmt::Display for PairKey {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}-{}", self.0, self.1)
    }
}

impl Serialize for PairKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Results of comparing every report of one list with every report of another.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ComparisonMatrix<T> {
    pub common: BTreeMap<PairKey, Common<T>>,
    pub different: BTreeMap<PairKey, Different<T>>,
}

impl<T> Default for ComparisonMatrix<T> {
    fn default() -> ComparisonMatrix<T> {
        ComparisonMatrix {
            common: BTreeMap::new(),
            different: BTreeMap::new(),
        }
    }
}

impl<T> ComparisonMatrix<T> {
    /// Number of compared pairs.
    pub fn len(&self) -> usize {
        self.common.len()
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty()
    }
}

/// Compares every report in `firsts` with every report in `seconds`.
///
/// All pairs are computed, including a report compared with itself.
///
/// # Errors
///
/// Returns [`UnsupportedLevel`] if `level` is [`Level::Hits`], even when either list is empty.
///
/// [`UnsupportedLevel`]: ../error/enum.ErrorKind.html#variant.UnsupportedLevel
/// [`Level::Hits`]: ../report/enum.Level.html#variant.Hits
pub fn compare_all<T: Covered>(firsts: &[Report<T>], seconds: &[Report<T>], level: Level, names: &Names, line_mode: DiffMode) -> Result<ComparisonMatrix<T>> {
    level.ensure_comparable()?;

    let mut matrix = ComparisonMatrix::default();
    for (i, first) in firsts.iter().enumerate() {
        for (j, second) in seconds.iter().enumerate() {
            let Comparison { common, different } = compare(first, second, level, names, line_mode)?;
            let key = PairKey(i, j);
            trace!("compared pair {} ({} vs {})", key, first.test, second.test);
            matrix.common.insert(key, common);
            matrix.different.insert(key, different);
        }
    }
    Ok(matrix)
}

#[cfg(test)]
fn scenario_reports() -> (Report<u32>, Report<u32>) {
    let a = Report::from_files(vec![("f1", vec![1, 2, 3]), ("f2", vec![5])]);
    let b = Report::from_files(vec![("f1", vec![1, 2]), ("f3", vec![9])]);
    (a, b)
}

#[test]
fn test_compare_file_level() {
    let (a, b) = scenario_reports();
    let names = Names::new("A", "B").unwrap();
    let comparison = compare(&a, &b, Level::File, &names, DiffMode::Directional).unwrap();
    assert_eq!(
        ::serde_json::to_value(&comparison).unwrap(),
        json!({
            "common": ["f1"],
            "different": {"A-B": ["f2"], "B-A": ["f3"]},
        })
    );
}

#[test]
fn test_compare_line_level() {
    let (a, b) = scenario_reports();
    let names = Names::new("A", "B").unwrap();
    let comparison = compare(&a, &b, Level::Line, &names, DiffMode::Directional).unwrap();
    assert_eq!(
        ::serde_json::to_value(&comparison).unwrap(),
        json!({
            "common": {"f1": [1, 2]},
            "different": {
                "f1": {"A-B": [3], "B-A": []},
                "f2": {"A-B": [5]},
                "f3": {"B-A": [9]},
            },
        })
    );
}

#[test]
fn test_compare_line_level_merged() {
    let (a, b) = scenario_reports();
    let names = Names::new("A", "B").unwrap();
    let comparison = compare(&a, &b, Level::Line, &names, DiffMode::Merged).unwrap();
    assert_eq!(
        ::serde_json::to_value(&comparison.different).unwrap(),
        json!({
            "f1": [3],
            "f2": {"A-B": [5]},
            "f3": {"B-A": [9]},
        })
    );
}

#[test]
fn test_compare_line_level_reconstructs_first() {
    let (a, b) = scenario_reports();
    let names = Names::new("A", "B").unwrap();
    let comparison = compare(&a, &b, Level::Line, &names, DiffMode::Directional).unwrap();
    let common = comparison.common.lines().unwrap();
    let different = comparison.different.lines().unwrap();

    let mut rebuilt = BTreeMap::new();
    for (file, lines) in common {
        rebuilt.entry(file.clone()).or_insert_with(BTreeSet::new).extend(lines.iter().cloned());
    }
    for (file, difference) in different {
        if let Some(lines) = difference.forward(&names) {
            rebuilt.entry(file.clone()).or_insert_with(BTreeSet::new).extend(lines.iter().cloned());
        }
    }
    assert_eq!(rebuilt, a.source_files);
}

#[test]
fn test_compare_hits_level_is_rejected() {
    let (a, b) = scenario_reports();
    let names = Names::new("A", "B").unwrap();
    assert!(compare(&a, &b, Level::Hits, &names, DiffMode::Directional).is_err());
    assert!(compare_all::<u32>(&[], &[], Level::Hits, &names, DiffMode::Directional).is_err());
}

#[test]
fn test_correct_for_baseline() {
    let subject = Report::<u32>::from_files(vec![("f1", vec![1, 2, 3]), ("f2", vec![4]), ("f3", vec![7])]);
    let baseline = Report::<u32>::from_files(vec![("f1", vec![1, 2]), ("f2", vec![4]), ("f4", vec![1])]);

    match correct_for_baseline(&subject, &baseline, Level::Line).unwrap() {
        Correction::Lines(corrected) => {
            let expected = Report::<u32>::from_files(vec![("f1", vec![3]), ("f3", vec![7])]);
            assert_eq!(corrected, expected);
        },
        other => panic!("unexpected {:?}", other),
    }

    match correct_for_baseline(&subject, &baseline, Level::File).unwrap() {
        Correction::Files(files) => assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["f3"]),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_correct_for_empty_baseline() {
    let (mut subject, _) = scenario_reports();
    subject.test = "browser_foo.js".to_owned();
    let corrected = unique_lines(&subject, &Report::new()).unwrap();
    assert_eq!(corrected, subject);
}

#[test]
fn test_correction_into_report() {
    let mut subject = Report::from_files(vec![("f1", vec![1, 2]), ("f2", vec![7])]);
    subject.test = "browser_foo.js".to_owned();
    let baseline = Report::from_files(vec![("f1", vec![1])]);

    let report = correct_for_baseline(&subject, &baseline, Level::File).unwrap().into_report(&subject);
    assert_eq!(report.test, "browser_foo.js");
    assert_eq!(report.file_names().into_iter().collect::<Vec<_>>(), vec!["f2"]);
    assert_eq!(report.lines("f2").unwrap().iter().cloned().collect::<Vec<_>>(), vec![7]);

    let report = correct_for_baseline(&subject, &baseline, Level::Line).unwrap().into_report(&subject);
    assert_eq!(report.file_names().into_iter().collect::<Vec<_>>(), vec!["f1", "f2"]);
    assert_eq!(report.lines("f1").unwrap().iter().cloned().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_compare_all() {
    let (a, b) = scenario_reports();
    let names = Names::new("jsdcov", "jsvm").unwrap();
    let matrix = compare_all(&[a.clone()], &[a.clone(), b.clone(), a], Level::File, &names, DiffMode::Directional).unwrap();
    assert_eq!(matrix.len(), 3);

    let value = ::serde_json::to_value(&matrix).unwrap();
    assert_eq!(value["common"]["0-1"], json!(["f1"]));
    assert_eq!(value["different"]["0-2"], json!({"jsdcov-jsvm": [], "jsvm-jsdcov": []}));
}
