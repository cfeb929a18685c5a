//! Implementations of the subcommands.

use argparse::{CompareConfig, VariabilityConfig};
use artifacts;
use error::Result;
use utils::Output;

use ptcov::filter::{filter_line_range, filter_sources, filter_tests, group_tests, split_file_types, tests_with_no_data};
use ptcov::variability::{self, aggregate, all_differences, classify, consecutive_differences, filter_file_variability};
use ptcov::{compare, compare_all, correct_for_baseline, ComparisonMatrix, Correction, Different, FileVariability, Format, Level, LineReport, PairKey, ScoreSelection, Stability};

use std::collections::BTreeMap;
use std::path::Path;
#[cfg(test)]
use std::path::PathBuf;

/// Entry point of the `compare` subcommand.
pub fn run_compare(config: &CompareConfig, output: &Output) -> Result<()> {
    let first = artifacts::load::<u32>(config.first, config.first_format, config.scores)?;
    let second = artifacts::load::<u32>(config.second, config.second_format, config.scores)?;
    let comparison = compare(&first, &second, config.level, &config.names, config.line_mode)?;

    if let Some(files) = comparison.common.files() {
        progress!("Compared", "{} files in common", files.len());
    } else if let Some(lines) = comparison.common.lines() {
        progress!("Compared", "{} lines in common", lines.values().map(|lines| lines.len()).sum::<usize>());
    }
    output.write("comparison", &comparison)
}

/// Entry point of the `baseline` subcommand.
pub fn run_baseline(config: &CompareConfig, output: &Output) -> Result<()> {
    let subject = artifacts::load::<u32>(config.first, config.first_format, config.scores)?;
    let baseline = artifacts::load::<u32>(config.second, config.second_format, config.scores)?;
    let correction = correct_for_baseline(&subject, &baseline, config.level)?;

    match correction {
        Correction::Files(ref files) => progress!("Corrected", "{} files unique to `{}`", files.len(), subject.test),
        Correction::Lines(ref report) => progress!("Corrected", "{} lines unique to `{}`", report.total_lines(), subject.test),
    }
    output.write("baseline-corrected", &correction)
}

/// Loads all artifacts of one side of a cross comparison, subtracting the baseline from each if given.
///
/// The baseline artifact is read in the same format as the side itself. At [`Level::File`], a corrected report keeps
/// only the files not covered by the baseline, with all their lines.
///
/// [`Level::File`]: ../../ptcov/report/enum.Level.html#variant.File
fn load_side(dir: &Path, format: Format, scores: ScoreSelection, baseline: Option<&Path>, level: Level) -> Result<Vec<LineReport>> {
    let reports = artifacts::load_all::<u32>(dir, format, scores)?;
    let baseline = match baseline {
        Some(path) => artifacts::load::<u32>(path, format, scores)?,
        None => return Ok(reports),
    };
    reports
        .iter()
        .map(|report| -> Result<LineReport> {
            let correction = correct_for_baseline(report, &baseline, level)?;
            Ok(correction.into_report(report))
        })
        .collect()
}

/// Entry point of the `cross` subcommand.
pub fn run_cross(config: &CompareConfig, output: &Output) -> Result<()> {
    let firsts = load_side(config.first, config.first_format, config.scores, config.first_baseline, config.level)?;
    let seconds = load_side(config.second, config.second_format, config.scores, config.second_baseline, config.level)?;
    let matrix = compare_all(&firsts, &seconds, config.level, &config.names, config.line_mode)?;
    progress!("Compared", "{} pairs", matrix.len());
    output.write("cross", &matrix)
}

/// Differences between the runs of a series.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Differences {
    /// Line differences between every run and the next one.
    Consecutive(BTreeMap<PairKey, Different<u32>>),
    /// Comparisons of every pair of runs.
    All(ComparisonMatrix<u32>),
}

/// Result of analyzing the runs of one test.
#[derive(Clone, Debug, Serialize)]
pub struct SeriesAnalysis<'a> {
    pub test: &'a str,
    pub runs: usize,
    /// Files of the raw runs, by whether they are covered in every run.
    pub files: FileVariability,
    /// Lines hit by every run after resolving variability (and aggregating if requested).
    pub total_lines: Vec<usize>,
    pub differences: Differences,
    pub stability: Stability,
}

/// Analyzes the runs of one test, in run order.
pub fn analyze_series<'a>(test: &'a str, series: &[LineReport], config: &VariabilityConfig) -> Result<SeriesAnalysis<'a>> {
    let files = classify(series);
    if !files.variable.is_empty() {
        debug!("{}: {} variable files, resolved with {:?}", test, files.variable.len(), config.policy);
    }

    let mut series = filter_file_variability(series, config.policy);
    if config.aggregate {
        series = aggregate(&series);
    }

    let differences = if config.save_all {
        Differences::All(all_differences(&series, &config.names, Level::Line)?)
    } else {
        Differences::Consecutive(consecutive_differences(&series, &config.names)?)
    };

    Ok(SeriesAnalysis {
        test,
        runs: series.len(),
        files,
        total_lines: series.iter().map(LineReport::total_lines).collect(),
        differences,
        stability: variability::stability(&series, config.threshold),
    })
}

/// Selects the reports and source files to analyze, and groups the reports into the runs of each test.
pub fn select_series(reports: Vec<LineReport>, config: &VariabilityConfig) -> BTreeMap<String, Vec<LineReport>> {
    let reports = filter_tests(reports, config.tests.as_ref().map(Vec::as_slice));
    if let Some(ref tests) = config.tests {
        for test in tests_with_no_data(&reports, tests) {
            warning!("no coverage data found for test `{}`", test);
        }
    }
    let reports = filter_sources(reports, config.sources.as_ref().map(Vec::as_slice));
    let reports = filter_line_range(reports, config.line_range);
    let reports = match config.split_types {
        Some(types) => split_file_types(&reports, types),
        None => reports,
    };

    group_tests(reports)
}

/// Entry point of the `variability` subcommand.
pub fn run_variability(config: &VariabilityConfig, output: &Output) -> Result<()> {
    let reports = artifacts::load_all::<u32>(config.dir, config.format, config.scores)?;
    let groups = select_series(reports, config);
    if groups.is_empty() {
        warning!("no reports left after filtering");
        return Ok(());
    }

    let mut analyses = BTreeMap::new();
    for (test, series) in &groups {
        let analysis = analyze_series(test, series, config)?;
        match analysis.stability.score {
            Some(score) => progress!("Analyzed", "{} ({} runs, stability {:.2})", test, analysis.runs, score),
            None => progress!("Analyzed", "{} ({} runs)", test, analysis.runs),
        }
        analyses.insert(test.clone(), analysis);
    }
    output.write_each(&analyses)
}

#[cfg(test)]
fn test_data_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../ptcov/test-data").join(name)
}

#[cfg(test)]
fn series_config(dir: &Path) -> VariabilityConfig {
    VariabilityConfig {
        dir,
        format: Format::StdPtc,
        scores: ScoreSelection::Test,
        tests: None,
        sources: None,
        line_range: None,
        split_types: None,
        policy: ::ptcov::VariabilityPolicy::Pad,
        threshold: (0.0, 50000.0),
        aggregate: true,
        save_all: false,
        names: ::ptcov::Names::new("before", "after").unwrap(),
    }
}

#[test]
fn test_analyze_series() {
    let series = vec![
        LineReport::from_files(vec![("f1", vec![1])]),
        LineReport::from_files(vec![("f1", vec![1, 2]), ("f2", vec![4])]),
        LineReport::from_files(vec![("f1", vec![1])]),
    ];
    let analysis = analyze_series("browser_foo.js", &series, &series_config(Path::new("."))).unwrap();

    assert_eq!(analysis.runs, 3);
    assert_eq!(analysis.files.variable.iter().collect::<Vec<_>>(), vec!["f2"]);
    assert_eq!(analysis.total_lines, vec![1, 3, 3]);
    assert_eq!(analysis.stability.lines_per_file["f1"], vec![1, 2, 2]);
    assert!((analysis.stability.score.unwrap() - 50.0).abs() < 1e-9);

    match analysis.differences {
        Differences::Consecutive(ref differences) => {
            assert_eq!(differences.len(), 2);
            let last = differences[&PairKey(1, 2)].lines().unwrap();
            assert!(last.values().all(|difference| difference.is_empty()));
        },
        Differences::All(_) => panic!("expected consecutive differences"),
    }
}

#[test]
fn test_analyze_series_save_all() {
    let series = vec![LineReport::from_files(vec![("f1", vec![1])]), LineReport::from_files(vec![("f1", vec![2])])];
    let config = VariabilityConfig {
        save_all: true,
        aggregate: false,
        ..series_config(Path::new("."))
    };
    let analysis = analyze_series("t", &series, &config).unwrap();
    match analysis.differences {
        Differences::All(ref matrix) => assert_eq!(matrix.len(), 4),
        Differences::Consecutive(_) => panic!("expected all differences"),
    }
}

#[cfg(test)]
fn read_json(path: &Path) -> ::serde_json::Value {
    ::serde_json::from_reader(::std::fs::File::open(path).unwrap()).unwrap()
}

#[test]
fn test_load_side_with_baseline() {
    let dir = test_data_dir("cross.analyze");
    let baseline = dir.join("baseline.json");

    // `f1` is covered by the baseline, so it is not unique at file level even though line 2 is.
    let firsts = load_side(&dir.join("first"), Format::StdPtc, ScoreSelection::Test, Some(baseline.as_path()), Level::File).unwrap();
    assert_eq!(firsts.len(), 1);
    assert_eq!(firsts[0].test, "browser_foo.js");
    assert_eq!(firsts[0].file_names().into_iter().collect::<Vec<_>>(), vec!["f2"]);

    let firsts = load_side(&dir.join("first"), Format::StdPtc, ScoreSelection::Test, Some(baseline.as_path()), Level::Line).unwrap();
    assert_eq!(firsts[0].file_names().into_iter().collect::<Vec<_>>(), vec!["f1", "f2"]);
    assert_eq!(firsts[0].lines("f1").unwrap().iter().cloned().collect::<Vec<_>>(), vec![2]);

    let seconds = load_side(&dir.join("second"), Format::StdPtc, ScoreSelection::Test, None, Level::File).unwrap();
    assert_eq!(seconds.iter().map(|report| report.test.as_str()).collect::<Vec<_>>(), vec!["browser_foo.js", "browser_bar.js"]);
    assert_eq!(seconds[0].file_names().into_iter().collect::<Vec<_>>(), vec!["f1", "f3"]);
}

#[test]
fn test_run_cross_file_level() {
    use ptcov::{DiffMode, Names};
    use std::env::temp_dir;
    use std::fs::remove_dir_all;

    let dir = test_data_dir("cross.analyze");
    let (first, second, baseline) = (dir.join("first"), dir.join("second"), dir.join("baseline.json"));
    let out = temp_dir().join("ptcov-analyze-test-cross");
    let _ = remove_dir_all(&out);

    let config = CompareConfig {
        first: &first,
        second: &second,
        first_format: Format::StdPtc,
        second_format: Format::StdPtc,
        scores: ScoreSelection::Test,
        first_baseline: None,
        second_baseline: Some(baseline.as_path()),
        level: Level::File,
        line_mode: DiffMode::Directional,
        names: Names::new("A", "B").unwrap(),
    };
    run_cross(&config, &Output::new(Some(out.as_path())).unwrap()).unwrap();

    let value = read_json(&out.join("cross.json"));
    assert_eq!(value["common"]["0-0"], json!([]));
    assert_eq!(value["common"]["0-1"], json!(["f2"]));
    assert_eq!(value["different"]["0-0"], json!({"A-B": ["f1", "f2"], "B-A": ["f3"]}));
    assert_eq!(value["different"]["0-1"], json!({"A-B": ["f1"], "B-A": []}));
    remove_dir_all(&out).unwrap();
}

#[test]
fn test_select_series() {
    use ptcov::FileType;

    let dir = test_data_dir("pipeline.analyze");
    let config = VariabilityConfig {
        tests: Some(vec!["browser_".to_owned(), "missing_test".to_owned()]),
        sources: Some(vec!["dom/".to_owned()]),
        line_range: Some((1, 10)),
        split_types: Some(FileType::C | FileType::JS),
        ..series_config(&dir)
    };
    let reports = artifacts::load_all::<u32>(&dir, config.format, config.scores).unwrap();
    assert_eq!(reports.len(), 5);

    let groups = select_series(reports, &config);
    assert_eq!(groups.keys().map(String::as_str).collect::<Vec<_>>(), vec!["browser_foo.js-c", "browser_foo.js-js"]);

    let c = &groups["browser_foo.js-c"];
    assert_eq!(c.iter().map(LineReport::total_lines).collect::<Vec<_>>(), vec![2, 3]);
    assert!(c.iter().all(|report| report.file_names().into_iter().collect::<Vec<_>>() == vec!["dom/a.cpp"]));
    let js = &groups["browser_foo.js-js"];
    assert_eq!(js.iter().map(LineReport::total_lines).collect::<Vec<_>>(), vec![1, 1]);
}

#[test]
fn test_run_variability() {
    use std::env::temp_dir;
    use std::fs::{read_dir, remove_dir_all};

    let dir = test_data_dir("pipeline.analyze");
    let out = temp_dir().join("ptcov-analyze-test-variability");
    let _ = remove_dir_all(&out);

    let config = VariabilityConfig {
        sources: Some(vec!["dom/".to_owned()]),
        ..series_config(&dir)
    };
    run_variability(&config, &Output::new(Some(out.as_path())).unwrap()).unwrap();

    let mut names = read_dir(&out)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["browser_baz.js.json", "browser_foo.js.json", "test_bar.html.json"]);

    let value = read_json(&out.join("browser_foo.js.json"));
    assert_eq!(value["test"], json!("browser_foo.js"));
    assert_eq!(value["runs"], json!(2));
    assert_eq!(value["total_lines"], json!([3, 4]));
    assert_eq!(value["differences"]["0-1"]["dom/a.cpp"], json!({"before-after": [], "after-before": [3]}));
    remove_dir_all(&out).unwrap();
}
