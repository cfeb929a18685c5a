//! `ptcov-analyze` compares per-test coverage artifacts collected by CI runs, and analyzes how the coverage of a test
//! varies between repeated runs.
//!
//! All results are JSON, written to `stdout` or into the directory given by `--output`.

#![recursion_limit = "128"] // needed for error_chain.
#![allow(unknown_lints, dangerous_implicit_autorefs)] // triggered inside clap 2 `crate_authors!`.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;
extern crate env_logger;
extern crate natord;
extern crate ptcov;
extern crate serde;
#[cfg_attr(test, macro_use)]
extern crate serde_json;
extern crate termcolor;
extern crate toml;
extern crate walkdir;

#[macro_use]
mod ui;
mod analysis;
mod argparse;
mod artifacts;
mod config;
mod error;
mod utils;

use argparse::{CompareConfig, VariabilityConfig, FORMAT_NAMES};
use clap::ArgMatches;
use config::Config;
use error::Result;
use utils::Output;

use std::path::Path;
use std::process::exit;

/// Program entry. Calls [`run()`] and prints any error returned to `stderr`.
///
/// [`run()`]: ./fn.run.html
fn main() {
    if let Err(error) = run() {
        ui::print_error(&error).expect("error while printing error 🤷");
        exit(1);
    }
}

/// Runs the `ptcov-analyze` program.
fn run() -> Result<()> {
    let matches = parse_args();
    env_logger::init();
    debug!("matches = {:?}", matches);

    let (subcommand, sub_matches) = matches.subcommand();
    let sub_matches = match sub_matches {
        Some(sub_matches) => sub_matches,
        None => return Ok(()),
    };

    // Global options may appear before or after the subcommand.
    let global = |name: &str| sub_matches.value_of_os(name).or_else(|| matches.value_of_os(name)).map(Path::new);
    let config = Config::load(global("config"))?;
    let output = Output::new(global("output"))?;

    // Please do not pass ArgMatches as a whole to the receiver functions.
    match subcommand {
        "compare" => analysis::run_compare(&CompareConfig::parse(sub_matches, &config, "first", "second")?, &output),
        "baseline" => analysis::run_baseline(&CompareConfig::parse(sub_matches, &config, "subject", "baseline")?, &output),
        "cross" => analysis::run_cross(&CompareConfig::parse(sub_matches, &config, "dir_a", "dir_b")?, &output),
        "variability" => analysis::run_variability(&VariabilityConfig::parse(sub_matches, &config)?, &output),
        _ => unreachable!("unknown subcommand {}", subcommand),
    }
}

/// Parses the command line arguments using `clap`.
fn parse_args() -> ArgMatches<'static> {
    clap_app!(("ptcov-analyze") =>
        (author: crate_authors!(", "))
        (about: crate_description!())
        (version: crate_version!())
        (@setting DeriveDisplayOrder)
        (@setting SubcommandRequiredElseHelp)
        (@setting GlobalVersion)
        (@setting VersionlessSubcommands)
        (@arg config: --config [FILE] +global "TOML configuration file")
        (@arg output: --output -o [DIR] +global "The directory to store the JSON results, default to stdout")
        (@subcommand compare =>
            (about: "Compares two coverage artifacts")
            (@arg first: +required "The first artifact")
            (@arg second: +required "The second artifact")
            (@arg format: --format [FORMAT] possible_values(&FORMAT_NAMES) "Format of the artifacts, default to `std-ptc-format`")
            (@arg scores: --scores [LOW_HIGH] +use_delimiter "Inclusive range of scores of the lines read from `pertestreport-scored` artifacts")
            (@arg include_unique: --("include-unique") "With `--scores`, also read the lines unique to the test")
            (@arg level: --level [LEVEL] possible_values(&["file", "line"]) "Comparison level, default to `file`")
            (@arg merge_lines: --("merge-lines") "Merge the line differences of files covered by both sides")
            (@arg names: --names [NAMES] "Names of the two sides as `FIRST,SECOND`, default to `A,B`")
        )
        (@subcommand baseline =>
            (about: "Removes the coverage of a baseline from a test's coverage")
            (@arg subject: +required "The test artifact")
            (@arg baseline: +required "The baseline artifact")
            (@arg format: --format [FORMAT] possible_values(&FORMAT_NAMES) "Format of the artifacts, default to `std-ptc-format`")
            (@arg scores: --scores [LOW_HIGH] +use_delimiter "Inclusive range of scores of the lines read from `pertestreport-scored` artifacts")
            (@arg include_unique: --("include-unique") "With `--scores`, also read the lines unique to the test")
            (@arg level: --level [LEVEL] possible_values(&["file", "line"]) "Correction level, default to `file`")
        )
        (@subcommand cross =>
            (about: "Compares every artifact in a directory with every artifact in another")
            (@arg dir_a: +required "The directory of the first artifacts")
            (@arg dir_b: +required "The directory of the second artifacts")
            (@arg format: --format [FORMAT] possible_values(&FORMAT_NAMES) "Format of both sides, default to `std-ptc-format`")
            (@arg format_a: --("format-a") [FORMAT] possible_values(&FORMAT_NAMES) "Format of the first artifacts")
            (@arg format_b: --("format-b") [FORMAT] possible_values(&FORMAT_NAMES) "Format of the second artifacts")
            (@arg baseline_a: --("baseline-a") [FILE] "Baseline to remove from every first artifact")
            (@arg baseline_b: --("baseline-b") [FILE] "Baseline to remove from every second artifact")
            (@arg scores: --scores [LOW_HIGH] +use_delimiter "Inclusive range of scores of the lines read from `pertestreport-scored` artifacts")
            (@arg include_unique: --("include-unique") "With `--scores`, also read the lines unique to the test")
            (@arg level: --level [LEVEL] possible_values(&["file", "line"]) "Comparison level, default to `file`")
            (@arg merge_lines: --("merge-lines") "Merge the line differences of files covered by both sides")
            (@arg names: --names [NAMES] "Names of the two sides as `FIRST,SECOND`, default to `A,B`")
        )
        (@subcommand variability =>
            (about: "Analyzes the variability of coverage between repeated runs of each test")
            (@arg dir: +required "The directory of the artifacts, one per test run")
            (@arg format: --format [FORMAT] possible_values(&FORMAT_NAMES) "Format of the artifacts, default to `std-ptc-format`")
            (@arg scores: --scores [LOW_HIGH] +use_delimiter "Inclusive range of scores of the lines read from `pertestreport-scored` artifacts")
            (@arg include_unique: --("include-unique") "With `--scores`, also read the lines unique to the test")
            (@arg policy: --policy [POLICY] possible_values(&["pad", "remove"]) "How files missing from some runs are handled, default to `pad`")
            (@arg aggregate: --aggregate "Accumulate the coverage of the runs before comparing them")
            (@arg save_all: --("save-all") "Compare every pair of runs, not only consecutive runs")
            (@arg threshold: --threshold [LOW_HIGH] +use_delimiter "Range of line count changes between runs to consider, default to `0,50000`")
            (@arg tests: --tests [PATTERN]... +use_delimiter "Only analyze tests whose name contains any of the patterns")
            (@arg sources: --sources [PATTERN]... +use_delimiter "Only keep source files whose name contains any of the patterns")
            (@arg line_range: --("line-range") [LOW_HIGH] +use_delimiter "Only keep runs whose number of lines hit is within the range")
            (@arg split_types: --("split-types") [TYPES]... +use_delimiter possible_values(&["c", "js", "other", "all"]) "Analyze each type of source files separately")
            (@arg names: --names [NAMES] "Names of the earlier and later run in differences, default to `before,after`")
        )
    ).get_matches()
}
