//! Selection and regrouping of reports.
//!
//! Matchers are plain substrings: a name is selected if it contains any of the matchers. A missing matcher list
//! selects everything.

use error::{Error, Result};
use report::{Covered, Report};

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

const C_EXTENSIONS: &[&str] = &["cpp", "h", "c", "cc", "hh", "tcc"];
const JS_EXTENSIONS: &[&str] = &["js", "jsm"];

bitflags! {
    /// Kinds of source files, judged by extension.
    pub struct FileType: u8 {
        const C = 1;
        const JS = 2;
        const OTHER = 4;
    }
}

impl FileType {
    /// The kind of the source file at `path`.
    pub fn of(path: &str) -> FileType {
        let extension = path.rsplit('.').next().unwrap_or("");
        if C_EXTENSIONS.contains(&extension) {
            FileType::C
        } else if JS_EXTENSIONS.contains(&extension) {
            FileType::JS
        } else {
            FileType::OTHER
        }
    }

    pub fn from_multi_str<'a, I>(strings: I) -> Result<FileType>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut res = FileType::empty();
        for s in strings {
            res |= s.parse()?;
        }
        Ok(res)
    }

    /// Suffix appended to the test name of a report split by file type.
    pub fn suffix(self) -> &'static str {
        match self {
            FileType::C => "-c",
            FileType::JS => "-js",
            _ => "-etc",
        }
    }
}

impl FromStr for FileType {
    type Err = Error;
    fn from_str(s: &str) -> Result<FileType> {
        Ok(match s {
            "c" => FileType::C,
            "js" => FileType::JS,
            "other" => FileType::OTHER,
            "all" => FileType::all(),
            _ => bail!("unsupported file type `{}`, expecting `c`, `js`, `other` or `all`", s),
        })
    }
}

/// Checks whether `name` contains any of the `matchers`.
pub fn matches_any<S: AsRef<str>>(name: &str, matchers: Option<&[S]>) -> bool {
    match matchers {
        Some(matchers) => matchers.iter().any(|matcher| name.contains(matcher.as_ref())),
        None => true,
    }
}

/// Keeps the reports whose test name matches.
pub fn filter_tests<T, S: AsRef<str>>(reports: Vec<Report<T>>, matchers: Option<&[S]>) -> Vec<Report<T>> {
    reports.into_iter().filter(|report| matches_any(&report.test, matchers)).collect()
}

/// Keeps the source files whose name matches. Reports left without any source file are dropped.
pub fn filter_sources<T, S: AsRef<str>>(reports: Vec<Report<T>>, matchers: Option<&[S]>) -> Vec<Report<T>> {
    reports
        .into_iter()
        .filter_map(|mut report| {
            report.source_files.retain(|file, _| matches_any(file, matchers));
            if report.source_files.is_empty() {
                debug!("dropping test `{}` without matching source files", report.test);
                None
            } else {
                Some(report)
            }
        })
        .collect()
}

/// Keeps the reports whose total number of lines hit lies within `low..=high`.
pub fn filter_line_range<T: Covered>(reports: Vec<Report<T>>, range: Option<(usize, usize)>) -> Vec<Report<T>> {
    let (low, high) = match range {
        Some(range) => range,
        None => return reports,
    };
    reports
        .into_iter()
        .filter(|report| {
            let total = report.total_lines();
            low <= total && total <= high
        })
        .collect()
}

/// Splits every report into one report per included file type.
///
/// Each part keeps the suite name, and the test name suffixed by the file type, e.g. `browser_foo.js-c`. A part is
/// produced for every included type even when it has no source files.
pub fn split_file_types<T: Covered>(reports: &[Report<T>], include: FileType) -> Vec<Report<T>> {
    let mut result = Vec::new();
    for report in reports {
        for &file_type in &[FileType::C, FileType::JS, FileType::OTHER] {
            if !include.contains(file_type) {
                continue;
            }
            let source_files = report
                .source_files
                .iter()
                .filter(|&(file, _)| FileType::of(file) == file_type)
                .map(|(file, lines)| (file.clone(), lines.clone()))
                .collect();
            let mut part = report.with_source_files(source_files);
            part.test.push_str(file_type.suffix());
            result.push(part);
        }
    }
    result
}

/// Groups reports by test name, keeping the order of the reports within each group.
pub fn group_tests<T>(reports: Vec<Report<T>>) -> BTreeMap<String, Vec<Report<T>>> {
    let mut groups = BTreeMap::new();
    for report in reports {
        groups.entry(report.test.clone()).or_insert_with(Vec::new).push(report);
    }
    groups
}

/// The `wanted` matchers which match no report having coverage data.
pub fn tests_with_no_data<T: Covered>(reports: &[Report<T>], wanted: &[String]) -> BTreeSet<String> {
    wanted
        .iter()
        .filter(|matcher| !reports.iter().any(|report| !report.is_empty() && report.test.contains(matcher.as_str())))
        .cloned()
        .collect()
}

#[cfg(test)]
fn named(test: &str, files: Vec<(&str, Vec<u32>)>) -> Report<u32> {
    let mut report = Report::from_files(files);
    report.test = test.to_owned();
    report
}

#[test]
fn test_file_type() {
    assert_eq!(FileType::of("dom/base/nsDocument.cpp"), FileType::C);
    assert_eq!(FileType::of("dom/base/nsDocument.h"), FileType::C);
    assert_eq!(FileType::of("browser/base/content/browser.js"), FileType::JS);
    assert_eq!(FileType::of("toolkit/modules/Services.jsm"), FileType::JS);
    assert_eq!(FileType::of("layout/style/res/html.css"), FileType::OTHER);
    assert_eq!(FileType::of("Makefile"), FileType::OTHER);

    assert_eq!(FileType::from_multi_str(vec!["c", "js"]).unwrap(), FileType::C | FileType::JS);
    assert_eq!("all".parse::<FileType>().unwrap(), FileType::all());
    assert!("rust".parse::<FileType>().is_err());
}

#[test]
fn test_filter_tests_and_sources() {
    let reports = vec![
        named("browser_foo.js", vec![("a.cpp", vec![1]), ("b.js", vec![2])]),
        named("test_bar.html", vec![("c.cpp", vec![3])]),
    ];

    let tests = filter_tests(reports.clone(), Some(&["browser_"][..]));
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0].test, "browser_foo.js");
    assert_eq!(filter_tests::<u32, &str>(reports.clone(), None).len(), 2);

    let sources = filter_sources(reports, Some(&["a.cpp"][..]));
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].file_names().into_iter().collect::<Vec<_>>(), vec!["a.cpp"]);
}

#[test]
fn test_filter_line_range() {
    let reports = vec![
        named("one", vec![("a.cpp", vec![1])]),
        named("three", vec![("a.cpp", vec![1, 2]), ("b.js", vec![5])]),
    ];
    let kept = filter_line_range(reports.clone(), Some((2, 10)));
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].test, "three");
    assert_eq!(filter_line_range(reports, None).len(), 2);
}

#[test]
fn test_split_file_types() {
    let mut report = named("browser_foo.js", vec![("a.cpp", vec![1]), ("b.js", vec![2]), ("c.css", vec![3])]);
    report.suite = "mochitest".to_owned();

    let parts = split_file_types(&[report], FileType::C | FileType::OTHER);
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].test, "browser_foo.js-c");
    assert_eq!(parts[0].suite, "mochitest");
    assert_eq!(parts[0].file_names().into_iter().collect::<Vec<_>>(), vec!["a.cpp"]);
    assert_eq!(parts[1].test, "browser_foo.js-etc");
    assert_eq!(parts[1].file_names().into_iter().collect::<Vec<_>>(), vec!["c.css"]);
}

#[test]
fn test_group_tests() {
    let reports = vec![
        named("b", vec![("x", vec![1])]),
        named("a", vec![("x", vec![2])]),
        named("b", vec![("x", vec![3])]),
    ];
    let groups = group_tests(reports);
    assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(groups["b"][0].lines("x").unwrap().iter().cloned().collect::<Vec<_>>(), vec![1]);
    assert_eq!(groups["b"][1].lines("x").unwrap().iter().cloned().collect::<Vec<_>>(), vec![3]);
}

#[test]
fn test_tests_with_no_data() {
    let reports = vec![named("browser_foo.js", vec![("a.cpp", vec![1])]), named("test_empty.html", vec![])];
    let wanted = vec!["foo".to_owned(), "empty".to_owned(), "missing".to_owned()];
    let missing = tests_with_no_data(&reports, &wanted);
    assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["empty", "missing"]);
}
