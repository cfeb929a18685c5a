//! Extra functions for command line argument parsing.
//!
//! Every option read here may also come from the [configuration file](../config/index.html). A value given on the
//! command line always wins.

use config::Config;
use error::{ErrorKind, Result};

use clap::ArgMatches;
use ptcov::{DiffMode, FileType, Format, Level, Names, ScoreSelection, VariabilityPolicy};

use std::path::Path;
use std::str::FromStr;

lazy_static! {
    /// Names of all artifact formats, for `--format`.
    pub static ref FORMAT_NAMES: Vec<&'static str> = Format::all().iter().map(|format| format.name()).collect();
}

/// Default names of the sides of a two-way comparison.
const DEFAULT_NAMES: (&str, &str) = ("A", "B");

/// Default names of the earlier and later run when comparing the runs of a series.
const DEFAULT_SERIES_NAMES: (&str, &str) = ("before", "after");

/// Default range of step-to-step line count changes considered by the stability analysis.
const DEFAULT_THRESHOLD: (f64, f64) = (0.0, 50000.0);

/// Parses an optional argument with `FromStr`.
fn parse_value<T: FromStr>(matches: &ArgMatches, name: &'static str) -> Result<Option<T>> {
    match matches.value_of(name) {
        Some(value) => value.parse().map(Some).map_err(|_| ErrorKind::InvalidArgument(name, value.to_owned()).into()),
        None => Ok(None),
    }
}

/// Parses a pair of values given either as `LOW,HIGH` on the command line, or as a two-element array in the
/// configuration.
fn parse_pair<T: FromStr + PartialOrd + Copy>(matches: &ArgMatches, name: &'static str, fallback: Option<(T, T)>) -> Result<Option<(T, T)>> {
    let values = match matches.values_of(name) {
        Some(values) => values.collect::<Vec<_>>(),
        None => return Ok(fallback),
    };
    let invalid = || ErrorKind::InvalidArgument(name, values.join(","));
    let pair = match values.as_slice() {
        [low, high] => (low.parse().map_err(|_| invalid())?, high.parse().map_err(|_| invalid())?),
        _ => bail!(invalid()),
    };
    ensure!(pair.0 <= pair.1, invalid());
    Ok(Some(pair))
}

/// Splits a `first,second` string of names.
pub fn split_names(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.splitn(2, ',');
    match (parts.next(), parts.next()) {
        (Some(first), Some(second)) if !first.is_empty() && !second.is_empty() && !second.contains(',') => Some((first, second)),
        _ => None,
    }
}

/// Reads the comparison names from `--names`, the configuration, or the defaults in that order.
fn parse_names(matches: &ArgMatches, config: &Config, default: (&str, &str)) -> Result<Names> {
    let (first, second) = match matches.value_of("names") {
        Some(value) => split_names(value).ok_or_else(|| ErrorKind::InvalidArgument("names", value.to_owned()))?,
        None => (
            config.names.first.as_ref().map_or(default.0, String::as_str),
            config.names.second.as_ref().map_or(default.1, String::as_str),
        ),
    };
    Ok(Names::new(first, second)?)
}

fn parse_format(matches: &ArgMatches, name: &'static str) -> Result<Format> {
    Ok(parse_value(matches, name)?.unwrap_or(Format::StdPtc))
}

/// Reads which lines of scored reports are selected, from `--scores` and `--include-unique` or the configuration.
/// Without a score range, the lines unique to the test are selected.
fn parse_scores(matches: &ArgMatches, config: &Config) -> Result<ScoreSelection> {
    let include_unique = matches.is_present("include_unique") || config.scores.include_unique;
    if let Some((low, high)) = parse_pair(matches, "scores", config.scores.range)? {
        return Ok(ScoreSelection::Range { low, high, include_unique });
    }
    Ok(match config.scores.select.as_ref().map(String::as_str) {
        None | Some("test") => ScoreSelection::Test,
        Some("baseline") => ScoreSelection::Baseline,
        Some(other) => bail!(ErrorKind::InvalidArgument("select", other.to_owned())),
    })
}

/// Options of the `compare`, `baseline` and `cross` subcommands.
#[derive(Clone, Debug)]
pub struct CompareConfig<'a> {
    pub first: &'a Path,
    pub second: &'a Path,
    pub first_format: Format,
    pub second_format: Format,
    pub scores: ScoreSelection,
    pub first_baseline: Option<&'a Path>,
    pub second_baseline: Option<&'a Path>,
    pub level: Level,
    pub line_mode: DiffMode,
    pub names: Names,
}

impl<'a> CompareConfig<'a> {
    /// Reads the options. `first` and `second` are the names of the positional arguments of the subcommand.
    pub fn parse(matches: &'a ArgMatches, config: &Config, first: &'static str, second: &'static str) -> Result<CompareConfig<'a>> {
        let format = parse_format(matches, "format")?;
        Ok(CompareConfig {
            first: Path::new(matches.value_of_os(first).unwrap_or_default()),
            second: Path::new(matches.value_of_os(second).unwrap_or_default()),
            first_format: parse_value(matches, "format_a")?.unwrap_or(format),
            second_format: parse_value(matches, "format_b")?.unwrap_or(format),
            scores: parse_scores(matches, config)?,
            first_baseline: matches.value_of_os("baseline_a").map(Path::new),
            second_baseline: matches.value_of_os("baseline_b").map(Path::new),
            level: parse_value(matches, "level")?.unwrap_or_default(),
            line_mode: DiffMode::from_merge_flag(matches.is_present("merge_lines")),
            names: parse_names(matches, config, DEFAULT_NAMES)?,
        })
    }
}

/// Options of the `variability` subcommand.
#[derive(Clone, Debug)]
pub struct VariabilityConfig<'a> {
    pub dir: &'a Path,
    pub format: Format,
    pub scores: ScoreSelection,
    pub tests: Option<Vec<String>>,
    pub sources: Option<Vec<String>>,
    pub line_range: Option<(usize, usize)>,
    pub split_types: Option<FileType>,
    pub policy: VariabilityPolicy,
    pub threshold: (f64, f64),
    pub aggregate: bool,
    pub save_all: bool,
    pub names: Names,
}

impl<'a> VariabilityConfig<'a> {
    pub fn parse(matches: &'a ArgMatches, config: &Config) -> Result<VariabilityConfig<'a>> {
        let list = |name: &str, fallback: &Option<Vec<String>>| match matches.values_of(name) {
            Some(values) => Some(values.map(str::to_owned).collect::<Vec<_>>()),
            None => fallback.clone(),
        };

        let split_types = match list("split_types", &config.filter.split_types) {
            Some(types) => Some(FileType::from_multi_str(types.iter().map(String::as_str))?),
            None => None,
        };

        let policy = match matches.value_of("policy").or_else(|| config.variability.policy.as_ref().map(String::as_str)) {
            Some(policy) => policy.parse()?,
            None => VariabilityPolicy::default(),
        };

        Ok(VariabilityConfig {
            dir: Path::new(matches.value_of_os("dir").unwrap_or_default()),
            format: parse_format(matches, "format")?,
            scores: parse_scores(matches, config)?,
            tests: list("tests", &config.filter.tests),
            sources: list("sources", &config.filter.sources),
            line_range: parse_pair(matches, "line_range", config.filter.line_range)?,
            split_types,
            policy,
            threshold: parse_pair(matches, "threshold", config.variability.threshold)?.unwrap_or(DEFAULT_THRESHOLD),
            aggregate: matches.is_present("aggregate") || config.variability.aggregate,
            save_all: matches.is_present("save_all") || config.variability.save_all,
            names: parse_names(matches, config, DEFAULT_SERIES_NAMES)?,
        })
    }
}

#[test]
fn test_split_names() {
    assert_eq!(split_names("jsdcov,jsvm"), Some(("jsdcov", "jsvm")));
    assert_eq!(split_names("jsdcov"), None);
    assert_eq!(split_names("jsdcov,"), None);
    assert_eq!(split_names("a,b,c"), None);
}

#[test]
fn test_parse_scores() {
    use config::ScoresConfig;

    let app = || clap_app!(scores => (@arg scores: --scores [LOW_HIGH] +use_delimiter) (@arg include_unique: --("include-unique")));
    let config = Config::default();

    let matches = app().get_matches_from(vec!["scores"]);
    assert_eq!(parse_scores(&matches, &config).unwrap(), ScoreSelection::Test);

    let matches = app().get_matches_from(vec!["scores", "--scores", "0,0.5", "--include-unique"]);
    let range = ScoreSelection::Range {
        low: 0.0,
        high: 0.5,
        include_unique: true,
    };
    assert_eq!(parse_scores(&matches, &config).unwrap(), range);

    let matches = app().get_matches_from(vec!["scores", "--scores", "0.5,0"]);
    assert!(parse_scores(&matches, &config).is_err());

    let config = Config {
        scores: ScoresConfig {
            select: Some("baseline".to_owned()),
            ..ScoresConfig::default()
        },
        ..Config::default()
    };
    let matches = app().get_matches_from(vec!["scores"]);
    assert_eq!(parse_scores(&matches, &config).unwrap(), ScoreSelection::Baseline);
}

#[test]
fn test_format_names() {
    assert!(FORMAT_NAMES.contains(&"lcov"));
    assert!(FORMAT_NAMES.contains(&"std-ptc-format"));
    assert_eq!(FORMAT_NAMES.len(), Format::all().len());
}
