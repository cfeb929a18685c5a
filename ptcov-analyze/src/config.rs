//! The optional TOML configuration file.
//!
//! ```toml
//! [filter]
//! tests = ["browser_foo.js"]
//! sources = ["dom/"]
//! line-range = [10, 5000]
//! split-types = ["c", "js"]
//!
//! [variability]
//! policy = "pad"
//! threshold = [0.0, 50000.0]
//! save-all = false
//! aggregate = true
//!
//! [names]
//! first = "jsdcov"
//! second = "jsvm"
//!
//! [scores]
//! range = [0.0, 0.5]
//! include-unique = true
//! ```
//!
//! Every key is optional. Command line options take precedence over the file.

use error::{Result, ResultExt};

use toml::de::from_slice;

use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub filter: FilterConfig,
    pub variability: VariabilityConfig,
    pub names: NamesConfig,
    pub scores: ScoresConfig,
}

/// Selection of reports and source files.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilterConfig {
    /// Substrings of the test names to keep.
    pub tests: Option<Vec<String>>,
    /// Substrings of the source file names to keep.
    pub sources: Option<Vec<String>>,
    /// Inclusive range of the total number of lines hit by a kept report.
    pub line_range: Option<(usize, usize)>,
    /// File types to split every report into.
    pub split_types: Option<Vec<String>>,
}

#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct VariabilityConfig {
    /// `"pad"` or `"remove"`.
    pub policy: Option<String>,
    pub threshold: Option<(f64, f64)>,
    /// Compare every pair of runs instead of consecutive runs only.
    pub save_all: bool,
    /// Accumulate the coverage of the runs before comparing them.
    pub aggregate: bool,
}

/// Names of the two sides of a comparison.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamesConfig {
    pub first: Option<String>,
    pub second: Option<String>,
}

/// Line selection of `pertestreport-scored` artifacts.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScoresConfig {
    /// `"test"` or `"baseline"`. Ignored when `range` is given.
    pub select: Option<String>,
    /// Inclusive range of the scores of the selected lines.
    pub range: Option<(f64, f64)>,
    /// Whether lines unique to the test are selected together with `range`.
    pub include_unique: bool,
}

impl Config {
    /// Reads the configuration file. Without a path, returns the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(path) => path,
            None => return Ok(Config::default()),
        };
        let mut content = Vec::new();
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut content))
            .chain_err(|| format!("Cannot open configuration `{}`", path.display()))?;
        let config: Config = from_slice(&content).chain_err(|| format!("Cannot read configuration `{}`", path.display()))?;
        debug!("config = {:?}", config);
        Ok(config)
    }
}

#[test]
fn test_parse_config() {
    let config: Config = from_slice(
        br#"
            [filter]
            tests = ["browser_foo.js"]
            line-range = [10, 5000]

            [variability]
            policy = "remove"
            threshold = [1.0, 20.0]
            aggregate = true

            [names]
            first = "jsdcov"

            [scores]
            range = [0.0, 0.5]
        "#,
    ).unwrap();

    assert_eq!(config.filter.tests, Some(vec!["browser_foo.js".to_owned()]));
    assert_eq!(config.filter.sources, None);
    assert_eq!(config.filter.line_range, Some((10, 5000)));
    assert_eq!(config.variability.policy.as_ref().map(String::as_str), Some("remove"));
    assert_eq!(config.variability.threshold, Some((1.0, 20.0)));
    assert!(config.variability.aggregate);
    assert!(!config.variability.save_all);
    assert_eq!(config.names.first.as_ref().map(String::as_str), Some("jsdcov"));
    assert_eq!(config.names.second, None);
    assert_eq!(config.scores.range, Some((0.0, 0.5)));
    assert!(!config.scores.include_unique);
}

#[test]
fn test_default_config() {
    assert_eq!(Config::load(None).unwrap(), Config::default());
    assert!(from_slice::<Config>(b"[filter]\nunknown = 1\n").is_err());
}
