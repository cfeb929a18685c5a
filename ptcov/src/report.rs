//! Coverage report.
//!
//! The [`Report`] structure is the canonical, format-independent shape every raw artifact is normalized into: a map
//! from the source file name to the set of lines covered in that file. It can be serialized via serde into the
//! "std-ptc" JSON layout consumed by the analysis scripts:
//!
//! ```json
//! {
//!     "test": "dom/base/test/browser_foo.js",
//!     "suite": "mochitest-browser-chrome",
//!     "source_files": {
//!         "dom/base/nsDocument.cpp": [12, 13, 27]
//!     }
//! }
//! ```
//!
//! [`Report`]: ./struct.Report.html

use error::{Error, ErrorKind, Result};

use serde::Serialize;
use serde::de::DeserializeOwned;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// An element of the covered line set of a source file.
///
/// This is either a plain line number (`u32`, hit counts discarded) or a [`Hit`] (hit counts retained).
///
/// [`Hit`]: ./struct.Hit.html
pub trait Covered: Ord + Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Creates the entry from a 1-indexed line number and the number of times it is executed.
    fn from_hits(line: u32, count: u64) -> Self;

    /// The 1-indexed line number.
    fn line(&self) -> u32;
}

impl Covered for u32 {
    fn from_hits(line: u32, _: u64) -> u32 {
        line
    }

    fn line(&self) -> u32 {
        *self
    }
}

/// A covered line together with its hit count, serialized as `[line, count]`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Hit(pub u32, pub u64);

impl Covered for Hit {
    fn from_hits(line: u32, count: u64) -> Hit {
        Hit(line, count)
    }

    fn line(&self) -> u32 {
        self.0
    }
}

/// Coverage of a single test or artifact.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Covered"))]
pub struct Report<T = u32> {
    /// Name of the test. Empty if the artifact is not attributed to a single test.
    #[serde(default)]
    pub test: String,

    /// Name of the test suite. Empty if not applicable.
    #[serde(default)]
    pub suite: String,

    /// Covered lines of every source file.
    #[serde(default)]
    pub source_files: BTreeMap<String, BTreeSet<T>>,
}

/// A report without hit counts.
pub type LineReport = Report<u32>;

/// A report retaining hit counts.
pub type HitReport = Report<Hit>;

impl<T> Default for Report<T> {
    fn default() -> Report<T> {
        Report {
            test: String::new(),
            suite: String::new(),
            source_files: BTreeMap::new(),
        }
    }
}

impl<T: Covered> Report<T> {
    /// Creates an empty report.
    pub fn new() -> Report<T> {
        Report::default()
    }

    /// Creates a report without test metadata from `(file name, lines)` pairs.
    pub fn from_files<I, S, L>(files: I) -> Report<T>
    where
        I: IntoIterator<Item = (S, L)>,
        S: Into<String>,
        L: IntoIterator<Item = T>,
    {
        Report {
            source_files: files.into_iter().map(|(name, lines)| (name.into(), lines.into_iter().collect())).collect(),
            ..Report::default()
        }
    }

    /// The set of source file names in this report.
    pub fn file_names(&self) -> BTreeSet<String> {
        self.source_files.keys().cloned().collect()
    }

    /// The covered lines of a source file.
    pub fn lines(&self, file: &str) -> Option<&BTreeSet<T>> {
        self.source_files.get(file)
    }

    /// Total number of line entries across all files.
    pub fn total_lines(&self) -> usize {
        self.source_files.values().map(BTreeSet::len).sum()
    }

    /// Whether the report contains no source files at all.
    pub fn is_empty(&self) -> bool {
        self.source_files.is_empty()
    }

    /// Removes source files which have no covered lines.
    pub fn retain_covered(&mut self) {
        self.source_files.retain(|_, lines| !lines.is_empty());
    }

    /// Creates a report with the same test metadata but different source files.
    pub fn with_source_files<U>(&self, source_files: BTreeMap<String, BTreeSet<U>>) -> Report<U> {
        Report {
            test: self.test.clone(),
            suite: self.suite.clone(),
            source_files,
        }
    }
}

impl Report<Hit> {
    /// Discards the hit counts.
    pub fn lower_to_lines(&self) -> LineReport {
        let source_files = self.source_files
            .iter()
            .map(|(name, hits)| (name.clone(), hits.iter().map(Covered::line).collect()))
            .collect();
        self.with_source_files(source_files)
    }
}

/// Granularity of coverage data, and of comparisons.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Level {
    /// Which files are covered.
    File,
    /// Which lines within each file are covered.
    Line,
    /// Which lines are covered, and how many times.
    Hits,
}

impl Level {
    /// Checks whether two reports can be compared at this level. Only `File` and `Line` are comparison levels; hit
    /// count data is compared at the `Line` level.
    pub fn ensure_comparable(self) -> Result<()> {
        match self {
            Level::File | Level::Line => Ok(()),
            Level::Hits => Err(ErrorKind::UnsupportedLevel(self.to_string()).into()),
        }
    }
}

impl Default for Level {
    fn default() -> Level {
        Level::File
    }
}

impl fmt::Display for Level {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            Level::File => "file",
            Level::Line => "line",
            Level::Hits => "hits",
        })
    }
}

impl FromStr for Level {
    type Err = Error;
    fn from_str(s: &str) -> Result<Level> {
        Ok(match s {
            "file" => Level::File,
            "line" => Level::Line,
            "hits" => Level::Hits,
            _ => bail!(ErrorKind::UnsupportedLevel(s.to_owned())),
        })
    }
}

#[test]
fn test_report_from_files() {
    let report = LineReport::from_files(vec![("a.cpp", vec![3, 1, 2, 3]), ("b.js", vec![])]);
    assert_eq!(report.file_names().into_iter().collect::<Vec<_>>(), vec!["a.cpp", "b.js"]);
    assert_eq!(report.total_lines(), 3);

    let mut report = report;
    report.retain_covered();
    assert_eq!(report.source_files.len(), 1);
    assert!(report.lines("b.js").is_none());
}

#[test]
fn test_lower_to_lines() {
    let mut report = HitReport::from_files(vec![("a.cpp", vec![Hit(1, 4), Hit(7, 1)])]);
    report.test = "test_a".to_owned();
    let lowered = report.lower_to_lines();
    assert_eq!(lowered.test, "test_a");
    assert_eq!(lowered.lines("a.cpp").unwrap().iter().cloned().collect::<Vec<_>>(), vec![1, 7]);
}

#[test]
fn test_parse_level() {
    assert_eq!("file".parse::<Level>().unwrap(), Level::File);
    assert_eq!("line".parse::<Level>().unwrap(), Level::Line);
    assert!("lines".parse::<Level>().is_err());
    assert!(Level::Hits.ensure_comparable().is_err());
    assert!(Level::Line.ensure_comparable().is_ok());
}

#[test]
fn test_deserialize_report_defaults() {
    let report: HitReport = ::serde_json::from_str(r#"{"source_files": {"a.js": [[2, 5], [1, 1]]}}"#).unwrap();
    assert_eq!(report.test, "");
    assert_eq!(report.lines("a.js").unwrap().iter().next(), Some(&Hit(1, 1)));
}
