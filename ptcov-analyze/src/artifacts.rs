//! Discovery and loading of coverage artifacts.

use error::{ErrorKind, Result, ResultExt};
use utils::compare_naturally;

use ptcov::{Covered, Format, Report, ScoreSelection};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

/// Finds all files under `dir` which may contain artifacts of `format`, in natural order of their paths.
///
/// Hidden files and directories are skipped.
///
/// # Errors
///
/// Returns [`NoArtifacts`] if nothing is found.
///
/// [`NoArtifacts`]: ../error/enum.ErrorKind.html#variant.NoArtifacts
pub fn find(dir: &Path, format: Format) -> Result<Vec<PathBuf>> {
    let it = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        entry.depth() == 0 || !entry.file_name().to_str().map_or(false, |name| name.starts_with('.'))
    });

    let mut paths = Vec::new();
    for entry in it {
        let entry = entry?;
        if entry.file_type().is_file() && format.matches_path(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    ensure!(!paths.is_empty(), ErrorKind::NoArtifacts(dir.to_owned()));
    paths.sort_by(|a, b| compare_naturally(a, b));
    trace!("found {} {} artifacts in {:?}", paths.len(), format, dir);
    Ok(paths)
}

/// Loads a single artifact. `scores` selects the lines of a scored per-test report.
pub fn load<T: Covered>(path: &Path, format: Format, scores: ScoreSelection) -> Result<Report<T>> {
    progress!("Loading", "{}", path.display());
    Ok(Report::open_with(path, format, scores)?)
}

/// Loads all artifacts found under `dir`, in natural order of their paths.
///
/// An artifact which cannot be read is skipped with a warning, unless none can be read at all.
pub fn load_all<T: Covered>(dir: &Path, format: Format, scores: ScoreSelection) -> Result<Vec<Report<T>>> {
    let paths = find(dir, format)?;
    progress!("Loading", "{} artifacts in {}", paths.len(), dir.display());

    let mut reports = Vec::with_capacity(paths.len());
    let mut last_error = None;
    for path in &paths {
        match Report::open_with(path, format, scores) {
            Ok(report) => reports.push(report),
            Err(e) => {
                warning!("skipped `{}`: {}", path.display(), e);
                last_error = Some(e);
            },
        }
    }

    if let (true, Some(e)) = (reports.is_empty(), last_error) {
        return Err(e).chain_err(|| ErrorKind::NoArtifacts(dir.to_owned()));
    }
    Ok(reports)
}

#[cfg(test)]
fn test_data_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../ptcov/test-data").join(name)
}

#[test]
fn test_find_in_natural_order() {
    let paths = find(&test_data_dir("repeated.variability"), Format::Jsdcov).unwrap();
    let names = paths.iter().map(|path| path.file_name().unwrap().to_str().unwrap()).collect::<Vec<_>>();
    assert_eq!(names, vec!["0.json", "1.json", "2.json", "expected.json"]);

    assert!(find(&test_data_dir("repeated.variability"), Format::Lcov).is_err());
}

#[test]
fn test_load_all() {
    let reports = load_all::<u32>(&test_data_dir("basic.line"), Format::StdPtc, ScoreSelection::Test);
    // The canonical format only matches `std-ptc-format.json` files.
    assert!(reports.is_err());

    let reports = load_all::<u32>(&test_data_dir("mixed.lcov"), Format::Lcov, ScoreSelection::Test).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].total_lines(), 3);
}

#[test]
fn test_load_scored() {
    let path = test_data_dir("scored.analyze").join("browser_foo.js.json");
    let report = load::<u32>(&path, Format::PerTestScored, ScoreSelection::Test).unwrap();
    assert_eq!(report.test, "browser_foo.js");
    assert_eq!(report.file_names().into_iter().collect::<Vec<_>>(), vec!["dom/a.cpp"]);

    let range = ScoreSelection::Range {
        low: 0.0,
        high: 1.0,
        include_unique: false,
    };
    let report = load::<u32>(&path, Format::PerTestScored, range).unwrap();
    assert_eq!(report.lines("dom/b.cpp").unwrap().iter().cloned().collect::<Vec<_>>(), vec![2]);
}
