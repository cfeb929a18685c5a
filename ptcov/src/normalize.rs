//! Normalizer of raw coverage artifacts.
//!
//! Every supported artifact format is converted into the canonical [`Report`]. Individual malformed entries are
//! skipped (with a warning), while an artifact whose top-level shape is wrong is rejected.
//!
//! [`Report`]: ../report/struct.Report.html

use error::{Error, ErrorKind, Result, ResultExt};
use report::{Covered, Report};

use serde_json::{self, Map, Value};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, Read};
use std::path::Path;
use std::str::FromStr;

/// Formats of raw coverage artifacts.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Format {
    /// Per-test JSON report, `{"test", "suite", "report": {"source_files": [{"name", "coverage"}]}}`.
    PerTest,
    /// Per-test JSON report whose coverage entries are `[hit_count, score]` pairs, read with a [`ScoreSelection`].
    ///
    /// [`ScoreSelection`]: ./enum.ScoreSelection.html
    PerTestScored,
    /// Line-coverage text format, with `SF:<file>` and `DA:<line>,<hits>` records.
    Lcov,
    /// JS debugger coverage, a list of `{"sourceFile", "covered"}` records.
    Jsdcov,
    /// The canonical stored report, see [`Report`](../report/struct.Report.html).
    StdPtc,
    /// Rows of `[file, [lines]]` returned by a data warehouse query.
    ActiveData,
}

impl Format {
    /// All formats.
    pub fn all() -> &'static [Format] {
        const ALL: &[Format] = &[Format::PerTest, Format::PerTestScored, Format::Lcov, Format::Jsdcov, Format::StdPtc, Format::ActiveData];
        ALL
    }

    /// The name of the format, accepted by `from_str()`.
    pub fn name(self) -> &'static str {
        match self {
            Format::PerTest => "pertestreport",
            Format::PerTestScored => "pertestreport-scored",
            Format::Lcov => "lcov",
            Format::Jsdcov => "jsdcov",
            Format::StdPtc => "std-ptc-format",
            Format::ActiveData => "activedata",
        }
    }

    /// Checks whether a file at `path` may contain an artifact of this format, judging by its file name.
    pub fn matches_path(self, path: &Path) -> bool {
        let patterns: &[&str] = match self {
            Format::PerTest | Format::PerTestScored | Format::Jsdcov | Format::ActiveData => &[".json"],
            Format::Lcov => &[".info"],
            Format::StdPtc => &["std-ptc-format.json"],
        };
        let file_name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => return false,
        };
        patterns.iter().any(|pattern| file_name.contains(pattern))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;
    fn from_str(s: &str) -> Result<Format> {
        match Format::all().iter().find(|format| format.name() == s) {
            Some(format) => Ok(*format),
            None => bail!(ErrorKind::UnsupportedFormat(s.to_owned())),
        }
    }
}

/// Which lines of a scored per-test report are selected.
///
/// Each line of a scored report is a `[hit_count, score]` pair, where the score was computed upstream against a
/// baseline. A line without a score is unique to the test.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ScoreSelection {
    /// Lines unique to the test: no score, and a positive hit count.
    Test,
    /// Lines shared with the baseline: a hit count, and the score -1.
    Baseline,
    /// Lines having a hit count and a score within `low..=high`. Unique lines are included only if `include_unique`.
    Range {
        low: f64,
        high: f64,
        include_unique: bool,
    },
}

impl Default for ScoreSelection {
    fn default() -> ScoreSelection {
        ScoreSelection::Test
    }
}

impl<T: Covered> Report<T> {
    /// Reads and normalizes an artifact file.
    pub fn open<P: AsRef<Path>>(path: P, format: Format) -> Result<Report<T>> {
        Report::open_with(path, format, ScoreSelection::default())
    }

    /// Reads and normalizes an artifact file, selecting the lines of a scored report with `selection`.
    pub fn open_with<P: AsRef<Path>>(path: P, format: Format, selection: ScoreSelection) -> Result<Report<T>> {
        let path = path.as_ref();
        let mut content = Vec::new();
        File::open(path)?.read_to_end(&mut content)?;
        normalize_with(&content, format, selection).chain_err(|| format!("cannot read {} artifact `{}`", format, path.display()))
    }
}

/// Normalizes the content of an artifact. Scored reports select the lines unique to the test.
pub fn normalize<T: Covered>(content: &[u8], format: Format) -> Result<Report<T>> {
    normalize_with(content, format, ScoreSelection::default())
}

/// Normalizes the content of an artifact. `selection` is only used by [`Format::PerTestScored`].
///
/// [`Format::PerTestScored`]: ./enum.Format.html#variant.PerTestScored
pub fn normalize_with<T: Covered>(content: &[u8], format: Format, selection: ScoreSelection) -> Result<Report<T>> {
    if format == Format::Lcov {
        return parse_lcov(content);
    }

    let value = serde_json::from_slice::<Value>(content)?;
    match format {
        Format::PerTest => parse_per_test(&value),
        Format::PerTestScored => parse_per_test_scored(&value, selection),
        Format::Jsdcov => parse_jsdcov(&value),
        Format::StdPtc => parse_std_ptc(&value),
        Format::ActiveData => parse_activedata(&value),
        Format::Lcov => unreachable!(),
    }
}

/// Parses the line-coverage text format.
///
/// Only lines with a positive hit count are recorded, so a source file without any hit line never appears.
///
/// # Errors
///
/// * Returns [`MalformedLcov`] if a `DA:` record cannot be parsed.
/// * Returns [`Io`] on I/O failure.
///
/// [`MalformedLcov`]: ../error/enum.ErrorKind.html#variant.MalformedLcov
/// [`Io`]: ../error/enum.ErrorKind.html#variant.Io
pub fn parse_lcov<T: Covered, R: BufRead>(reader: R) -> Result<Report<T>> {
    let mut source_files = BTreeMap::new();
    let mut current_file = String::new();

    for (index, record) in reader.lines().enumerate() {
        let record = record?;
        let record = record.trim_end_matches('\r');
        let line_number = index + 1;

        if record.starts_with("SF:") {
            current_file = record["SF:".len()..].to_owned();
        } else if record.starts_with("DA:") {
            let (line, count) = parse_lcov_data(&record["DA:".len()..]).chain_err(|| ErrorKind::MalformedLcov(line_number))?;
            if count <= 0 {
                continue;
            }
            if line == 0 {
                warn!("lcov record at line {} refers to line 0, skipped", line_number);
                continue;
            }
            source_files
                .entry(current_file.clone())
                .or_insert_with(BTreeSet::new)
                .insert(T::from_hits(line, count as u64));
        }
    }

    Ok(Report {
        source_files,
        ..Report::default()
    })
}

/// Parses the `<line>,<hits>[,<checksum>]` part of a `DA:` record.
fn parse_lcov_data(data: &str) -> Result<(u32, i64)> {
    let mut fields = data.split(',');
    let line = fields.next().ok_or("missing line number")?.trim().parse()?;
    let count = fields.next().ok_or("missing hit count")?.trim().parse()?;
    Ok((line, count))
}

/// Reads a non-negative hit count. Returns `None` for anything else, including `null`.
fn hit_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
}

/// Reads a 1-indexed line number, given either as a number or a numeric string.
fn line_number(value: &Value) -> Option<u32> {
    let line = match *value {
        Value::Number(ref n) => n.as_u64().map(|n| n as u32),
        Value::String(ref s) => s.trim().parse().ok(),
        _ => None,
    };
    line.filter(|&line| line > 0)
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object.get(key).and_then(Value::as_str).unwrap_or_default().to_owned()
}

/// Iterates the `report.source_files` entries of a per-test report as `(name, coverage)`. Entries lacking either key
/// are skipped.
fn per_test_entries<'a>(object: &'a Map<String, Value>) -> Vec<(&'a str, &'a [Value])> {
    let entries = match object.get("report").and_then(|report| report.get("source_files")).and_then(Value::as_array) {
        Some(entries) => entries,
        None => {
            warn!("per-test report has no `report.source_files` list");
            return Vec::new();
        },
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name").and_then(Value::as_str);
            let coverage = entry.get("coverage").and_then(Value::as_array);
            match (name, coverage) {
                (Some(name), Some(coverage)) => Some((name, &coverage[..])),
                _ => {
                    trace!("skipped partial source file entry {}", entry);
                    None
                },
            }
        })
        .collect()
}

/// Parses a per-test JSON report.
///
/// The `coverage` list of each source file holds the hit count of line `index + 1`. Lines with a `null` or zero hit
/// count are not covered. Source files without any covered line are kept with an empty set.
///
/// # Errors
///
/// Returns [`NotAnObject`] if `value` is not a JSON object.
///
/// [`NotAnObject`]: ../error/enum.ErrorKind.html#variant.NotAnObject
pub fn parse_per_test<T: Covered>(value: &Value) -> Result<Report<T>> {
    let object = value.as_object().ok_or(ErrorKind::NotAnObject("per-test report"))?;
    let mut report = Report::new();
    report.test = string_field(object, "test");
    report.suite = string_field(object, "suite");

    for (name, coverage) in per_test_entries(object) {
        let lines = coverage
            .iter()
            .enumerate()
            .filter_map(|(index, count)| match hit_count(count) {
                Some(count) if count > 0 => Some(T::from_hits(index as u32 + 1, count)),
                _ => None,
            })
            .collect();
        report.source_files.insert(name.to_owned(), lines);
    }

    Ok(report)
}

/// Parses a per-test JSON report whose coverage entries are `[hit_count, score]` pairs.
///
/// Entries which are not pairs are skipped, and the names of their source files are reported in a warning. Source
/// files left without lines are dropped, except when selecting [`Baseline`] lines.
///
/// # Errors
///
/// Returns [`NotAnObject`] if `value` is not a JSON object.
///
/// [`Baseline`]: ./enum.ScoreSelection.html#variant.Baseline
/// [`NotAnObject`]: ../error/enum.ErrorKind.html#variant.NotAnObject
pub fn parse_per_test_scored<T: Covered>(value: &Value, selection: ScoreSelection) -> Result<Report<T>> {
    let object = value.as_object().ok_or(ErrorKind::NotAnObject("scored per-test report"))?;
    let mut report = Report::new();
    report.test = string_field(object, "test");
    report.suite = string_field(object, "suite");

    let mut broken = BTreeSet::new();
    for (name, coverage) in per_test_entries(object) {
        let mut lines = BTreeSet::new();
        for (index, entry) in coverage.iter().enumerate() {
            let pair = match entry.as_array() {
                Some(pair) if pair.len() >= 2 => pair,
                _ => {
                    broken.insert(name);
                    continue;
                },
            };
            let hits = hit_count(&pair[0]);
            let score = pair[1].as_f64();

            let selected = match selection {
                ScoreSelection::Test => score.is_none() && hits.map_or(false, |hits| hits > 0),
                ScoreSelection::Baseline => hits.is_some() && score == Some(-1.0),
                ScoreSelection::Range { low, high, include_unique } => match (hits, score) {
                    (None, _) => false,
                    (Some(_), None) => include_unique,
                    (Some(_), Some(score)) => low <= score && score <= high,
                },
            };
            if selected {
                lines.insert(T::from_hits(index as u32 + 1, hits.unwrap_or(0)));
            }
        }

        if lines.is_empty() && selection != ScoreSelection::Baseline {
            continue;
        }
        report.source_files.insert(name.to_owned(), lines);
    }

    if !broken.is_empty() {
        warn!("skipped malformed coverage entries, broken on: {}", broken.into_iter().collect::<Vec<_>>().join(", "));
    }

    Ok(report)
}

/// Parses JS debugger coverage.
///
/// Records without `sourceFile` are skipped. The first `testUrl` found becomes the test name. Hit counts are not
/// recorded by this format, every covered line counts as hit once.
///
/// # Errors
///
/// Returns [`NotAnArray`] if `value` is not a JSON array.
///
/// [`NotAnArray`]: ../error/enum.ErrorKind.html#variant.NotAnArray
pub fn parse_jsdcov<T: Covered>(value: &Value) -> Result<Report<T>> {
    let records = value.as_array().ok_or(ErrorKind::NotAnArray("jsdcov"))?;
    let mut report = Report::new();

    for record in records {
        let source_file = match record.get("sourceFile").and_then(Value::as_str) {
            Some(source_file) => source_file,
            None => continue,
        };
        if report.test.is_empty() {
            if let Some(test_url) = record.get("testUrl").and_then(Value::as_str) {
                report.test = test_url.to_owned();
            }
        }

        let lines = report.source_files.entry(source_file.to_owned()).or_insert_with(BTreeSet::new);
        if let Some(covered) = record.get("covered").and_then(Value::as_array) {
            lines.extend(covered.iter().filter_map(line_number).map(|line| T::from_hits(line, 1)));
        }
    }

    Ok(report)
}

/// Parses rows of `[file, [lines]]` returned by a data warehouse coverage query.
///
/// # Errors
///
/// Returns [`NotAnArray`] if `value` is not a JSON array.
///
/// [`NotAnArray`]: ../error/enum.ErrorKind.html#variant.NotAnArray
pub fn parse_activedata<T: Covered>(value: &Value) -> Result<Report<T>> {
    let rows = value.as_array().ok_or(ErrorKind::NotAnArray("activedata response"))?;
    let mut report = Report::new();

    for (index, row) in rows.iter().enumerate() {
        let (name, lines) = match row.as_array().map(|row| &row[..]) {
            Some(&[Value::String(ref name), Value::Array(ref lines), ..]) => (name, lines),
            _ => {
                warn!("skipped malformed activedata row #{}", index);
                continue;
            },
        };
        report
            .source_files
            .entry(name.clone())
            .or_insert_with(BTreeSet::new)
            .extend(lines.iter().filter_map(line_number).map(|line| T::from_hits(line, 1)));
    }

    Ok(report)
}

/// Parses a stored canonical report.
///
/// A missing or malformed `source_files` member is treated as a report without any file, and a source file whose
/// lines cannot be decoded is skipped, so that a series of reports can still be processed as a whole.
///
/// # Errors
///
/// Returns [`NotAnObject`] if `value` is not a JSON object.
///
/// [`NotAnObject`]: ../error/enum.ErrorKind.html#variant.NotAnObject
pub fn parse_std_ptc<T: Covered>(value: &Value) -> Result<Report<T>> {
    let object = value.as_object().ok_or(ErrorKind::NotAnObject("std-ptc report"))?;
    let mut report = Report::new();
    report.test = string_field(object, "test");
    report.suite = string_field(object, "suite");

    match object.get("source_files") {
        Some(&Value::Object(ref files)) => {
            for (name, lines) in files {
                match serde_json::from_value::<BTreeSet<T>>(lines.clone()) {
                    Ok(lines) => {
                        report.source_files.insert(name.clone(), lines);
                    },
                    Err(e) => warn!("skipped source file `{}` of test `{}`: {}", name, report.test, e),
                }
            }
        },
        Some(_) => warn!("test `{}` has malformed source files, treated as empty", report.test),
        None => debug!("test `{}` has no source files", report.test),
    }

    Ok(report)
}

#[cfg(test)]
fn lines_of<T: Covered>(report: &Report<T>, file: &str) -> Vec<T> {
    report.lines(file).map(|lines| lines.iter().cloned().collect()).unwrap_or_default()
}

#[test]
fn test_parse_lcov() {
    use report::Hit;

    let content = "TN:\r\nSF:dom/a.cpp\r\nDA:1,5\r\nDA:2,0\r\nDA:3,1,abcdef\r\nend_of_record\r\nSF:dom/b.cpp\nDA:4,0\nend_of_record\nSF:js/c.js\nDA:10,2\n";
    let report = parse_lcov::<u32, _>(content.as_bytes()).unwrap();
    assert_eq!(report.file_names().into_iter().collect::<Vec<_>>(), vec!["dom/a.cpp", "js/c.js"]);
    assert_eq!(lines_of(&report, "dom/a.cpp"), vec![1, 3]);

    let report = parse_lcov::<Hit, _>(content.as_bytes()).unwrap();
    assert_eq!(lines_of(&report, "js/c.js"), vec![Hit(10, 2)]);
}

#[test]
fn test_parse_lcov_malformed() {
    let content = "SF:a.cpp\nDA:1,1\nDA:x,1\n";
    let error = parse_lcov::<u32, _>(content.as_bytes()).unwrap_err();
    match *error.kind() {
        ErrorKind::MalformedLcov(3) => {},
        ref kind => panic!("unexpected error {:?}", kind),
    }
}

#[test]
fn test_parse_per_test() {
    use report::Hit;

    let value = json!({
        "test": "browser_foo.js",
        "suite": "mochitest",
        "report": {
            "source_files": [
                {"name": "a.cpp", "coverage": [null, 0, 3, 1, null]},
                {"name": "partial.cpp"},
                {"coverage": [1, 1]},
                {"name": "b.cpp", "coverage": [0, null]}
            ]
        }
    });
    let report = parse_per_test::<u32>(&value).unwrap();
    assert_eq!(report.test, "browser_foo.js");
    assert_eq!(report.suite, "mochitest");
    assert_eq!(lines_of(&report, "a.cpp"), vec![3, 4]);
    assert!(report.lines("b.cpp").unwrap().is_empty());
    assert!(report.lines("partial.cpp").is_none());

    let report = parse_per_test::<Hit>(&value).unwrap();
    assert_eq!(lines_of(&report, "a.cpp"), vec![Hit(3, 3), Hit(4, 1)]);

    assert!(parse_per_test::<u32>(&json!([1, 2])).is_err());
}

#[test]
fn test_parse_per_test_scored() {
    let value = json!({
        "test": "t",
        "suite": "s",
        "report": {
            "source_files": [
                {"name": "a.cpp", "coverage": [[2, null], [1, -1], [0, null], [3, 0.5], null, [null, 0.2], [4, 0.9]]},
                {"name": "b.cpp", "coverage": [[null, null]]}
            ]
        }
    });

    let report = parse_per_test_scored::<u32>(&value, ScoreSelection::Test).unwrap();
    assert_eq!(lines_of(&report, "a.cpp"), vec![1]);
    assert!(report.lines("b.cpp").is_none());

    let report = parse_per_test_scored::<u32>(&value, ScoreSelection::Baseline).unwrap();
    assert_eq!(lines_of(&report, "a.cpp"), vec![2]);
    assert!(report.lines("b.cpp").unwrap().is_empty());

    let range = ScoreSelection::Range {
        low: 0.0,
        high: 0.6,
        include_unique: false,
    };
    let report = parse_per_test_scored::<u32>(&value, range).unwrap();
    assert_eq!(lines_of(&report, "a.cpp"), vec![4]);

    let range = ScoreSelection::Range {
        low: 0.0,
        high: 0.6,
        include_unique: true,
    };
    let report = parse_per_test_scored::<u32>(&value, range).unwrap();
    assert_eq!(lines_of(&report, "a.cpp"), vec![1, 3, 4]);
}

#[test]
fn test_parse_jsdcov() {
    let value = json!([
        {"sourceFile": "a.js", "covered": [1, 2, 3]},
        {"covered": [4]},
        {"sourceFile": "b.js", "covered": [7], "testUrl": "http://example/test_b.html"},
        {"sourceFile": "a.js", "covered": [9]}
    ]);
    let report = parse_jsdcov::<u32>(&value).unwrap();
    assert_eq!(report.test, "http://example/test_b.html");
    assert_eq!(lines_of(&report, "a.js"), vec![1, 2, 3, 9]);
    assert_eq!(lines_of(&report, "b.js"), vec![7]);

    assert!(parse_jsdcov::<u32>(&json!({"sourceFile": "a.js"})).is_err());
}

#[test]
fn test_parse_activedata() {
    let value = json!([["a.js", [1, "2", 3]], ["broken"], ["b.js", []]]);
    let report = parse_activedata::<u32>(&value).unwrap();
    assert_eq!(lines_of(&report, "a.js"), vec![1, 2, 3]);
    assert!(report.lines("b.js").unwrap().is_empty());
}

#[test]
fn test_parse_std_ptc() {
    let report = parse_std_ptc::<u32>(&json!({"test": "t", "source_files": {"a.js": [3, 1], "b.js": "oops"}})).unwrap();
    assert_eq!(report.test, "t");
    assert_eq!(lines_of(&report, "a.js"), vec![1, 3]);
    assert!(report.lines("b.js").is_none());

    let report = parse_std_ptc::<u32>(&json!({"test": "t"})).unwrap();
    assert!(report.is_empty());
    let report = parse_std_ptc::<u32>(&json!({"test": "t", "source_files": 12})).unwrap();
    assert!(report.is_empty());

    assert!(parse_std_ptc::<u32>(&json!("t")).is_err());
}

#[test]
fn test_format() {
    assert_eq!("lcov".parse::<Format>().unwrap(), Format::Lcov);
    assert_eq!("std-ptc-format".parse::<Format>().unwrap(), Format::StdPtc);
    assert!("grcov".parse::<Format>().is_err());

    assert!(Format::Lcov.matches_path(Path::new("/tmp/code-coverage-grcov.info")));
    assert!(!Format::Lcov.matches_path(Path::new("/tmp/per-test.json")));
    assert!(Format::StdPtc.matches_path(Path::new("run_1_std-ptc-format.json")));
    assert!(!Format::StdPtc.matches_path(Path::new("run_1.json")));
    assert!(Format::PerTestScored.matches_path(Path::new("browser_foo.js.json")));
}

#[test]
fn test_normalize_scored() {
    let content = br#"{"test": "t", "report": {"source_files": [{"name": "a.cpp", "coverage": [[2, null], [1, -1], [3, 0.5]]}]}}"#;

    let report = normalize::<u32>(content, Format::PerTestScored).unwrap();
    assert_eq!(lines_of(&report, "a.cpp"), vec![1]);

    let report = normalize_with::<u32>(content, Format::PerTestScored, ScoreSelection::Baseline).unwrap();
    assert_eq!(lines_of(&report, "a.cpp"), vec![2]);

    // Plain per-test reports ignore the selection and read every hit entry as a hit count.
    assert!(normalize_with::<u32>(content, Format::PerTest, ScoreSelection::Baseline).is_ok());
}
