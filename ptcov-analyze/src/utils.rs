//! Additional methods for libstd and external crates.

use error::Result;

use natord::compare_iter;
use serde::Serialize;
use serde_json;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{create_dir_all, File};
use std::io::{stdout, BufWriter, Write};
#[cfg(unix)]
use std::os::unix::ffi::OsStrExt;
#[cfg(windows)]
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};

macro_rules! do_compare {
    ($lhs:expr, $rhs:expr) => {
        compare_iter($lhs, $rhs, |_| false, |a, b| a.cmp(b), |c| match *c {
            b @ 0x30..=0x39 => Some(b as isize - 0x30),
            _ => None,
        })
    };
}

/// Compares two paths using natural sorting, so that `run_2` comes before `run_10`.
#[cfg(unix)]
pub fn compare_naturally(lhs: &Path, rhs: &Path) -> Ordering {
    let lhs = lhs.as_os_str().as_bytes().iter().cloned();
    let rhs = rhs.as_os_str().as_bytes().iter().cloned();
    do_compare!(lhs, rhs)
}

/// Compares two paths using natural sorting, so that `run_2` comes before `run_10`.
#[cfg(windows)]
pub fn compare_naturally(lhs: &Path, rhs: &Path) -> Ordering {
    let lhs = lhs.as_os_str().encode_wide();
    let rhs = rhs.as_os_str().encode_wide();
    do_compare!(lhs, rhs)
}

/// Turns a test name such as `dom/base/test/browser_foo.js` into a string usable as a file name.
pub fn file_stem_of(name: &str) -> String {
    let stem = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>();
    if stem.is_empty() {
        "unnamed".to_owned()
    } else {
        stem
    }
}

/// File stems for every name in `names`, in the same order.
///
/// Names mapping to an already used stem get a numeric suffix, e.g. `a_b.js` and `a_b.js-2` for `a/b.js` and
/// `a_b.js`.
pub fn unique_stems<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Vec<String> {
    let mut used = BTreeSet::new();
    let mut stems = Vec::new();
    for name in names {
        let base = file_stem_of(name);
        let mut stem = base.clone();
        let mut counter = 1;
        while used.contains(&stem) {
            counter += 1;
            stem = format!("{}-{}", base, counter);
        }
        if counter > 1 {
            warning!("results of `{}` are written as `{}.json` to avoid overwriting other results", name, stem);
        }
        used.insert(stem.clone());
        stems.push(stem);
    }
    stems
}

/// Destination of the JSON results.
#[derive(Debug)]
pub struct Output {
    dir: Option<PathBuf>,
}

impl Output {
    /// Writes results as files into `dir`, or to `stdout` if `None`.
    pub fn new(dir: Option<&Path>) -> Result<Output> {
        if let Some(dir) = dir {
            create_dir_all(dir)?;
        }
        Ok(Output {
            dir: dir.map(Path::to_owned),
        })
    }

    /// Writes one result, named `name`.
    pub fn write<S: Serialize>(&self, name: &str, value: &S) -> Result<()> {
        match self.dir {
            Some(ref dir) => {
                let path = dir.join(format!("{}.json", file_stem_of(name)));
                progress!("Writing", "{}", path.display());
                let mut writer = BufWriter::new(File::create(&path)?);
                serde_json::to_writer(&mut writer, value)?;
                writer.flush()?;
            },
            None => {
                let stdout = stdout();
                let mut lock = stdout.lock();
                serde_json::to_writer_pretty(&mut lock, value)?;
                writeln!(lock)?;
            },
        }
        Ok(())
    }

    /// Writes a result per name. Into a directory, every result gets its own file. On `stdout`, all results form a
    /// single JSON object keyed by name.
    pub fn write_each<S: Serialize>(&self, values: &BTreeMap<String, S>) -> Result<()> {
        match self.dir {
            Some(_) => {
                let stems = unique_stems(values.keys().map(String::as_str));
                for (stem, value) in stems.iter().zip(values.values()) {
                    self.write(stem, value)?;
                }
                Ok(())
            },
            None => self.write("", values),
        }
    }
}

#[test]
fn test_compare_naturally() {
    let mut paths = vec![Path::new("runs/run_10.json"), Path::new("runs/run_2.json"), Path::new("runs/run_1.json")];
    paths.sort_by(|a, b| compare_naturally(a, b));
    assert_eq!(paths, vec![Path::new("runs/run_1.json"), Path::new("runs/run_2.json"), Path::new("runs/run_10.json")]);
}

#[test]
fn test_file_stem_of() {
    assert_eq!(file_stem_of("dom/base/test/browser_foo.js"), "dom_base_test_browser_foo.js");
    assert_eq!(file_stem_of("test_bar.html-c"), "test_bar.html-c");
    assert_eq!(file_stem_of(""), "unnamed");
}

#[test]
fn test_unique_stems() {
    let stems = unique_stems(vec!["a/b.js", "a_b.js", "a?b.js", "c.js"]);
    assert_eq!(stems, vec!["a_b.js", "a_b.js-2", "a_b.js-3", "c.js"]);

    // A generated suffix never collides with a real name.
    let stems = unique_stems(vec!["a/b", "a_b-2", "a_b"]);
    assert_eq!(stems, vec!["a_b", "a_b-2", "a_b-3"]);
}

#[test]
fn test_write_each() {
    use serde_json::Value;
    use std::env::temp_dir;
    use std::fs::{read_dir, remove_dir_all};

    let dir = temp_dir().join("ptcov-analyze-test-write-each");
    let _ = remove_dir_all(&dir);
    let output = Output::new(Some(dir.as_path())).unwrap();

    let mut values = BTreeMap::new();
    values.insert("a/b.js".to_owned(), 1);
    values.insert("a_b.js".to_owned(), 2);
    output.write_each(&values).unwrap();

    let mut names = read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["a_b.js-2.json", "a_b.js.json"]);

    let value: Value = serde_json::from_reader(File::open(dir.join("a_b.js-2.json")).unwrap()).unwrap();
    assert_eq!(value, Value::from(2));
    remove_dir_all(&dir).unwrap();
}
