extern crate diff;
extern crate env_logger;
extern crate ptcov;
extern crate serde_json;
extern crate termcolor;

use ptcov::*;
use ptcov::variability::{classify, consecutive_differences, filter_file_variability};
use serde_json::{Value, from_reader, to_value, to_string_pretty};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use std::ffi::OsStr;
use std::fs::{File, read_dir};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

fn main() {
    env_logger::init();
    run().expect("IO");
}

fn run() -> io::Result<()> {
    let allowed_extensions = ["file", "line", "merged", "baseline", "lcov", "pertest", "variability"];
    let mut failed_tests = 0;

    let stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut lock = stdout.lock();

    let mut paths = Vec::new();
    for entry in read_dir("test-data")? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    for path in paths {
        let operation = match path.extension().and_then(OsStr::to_str) {
            Some(extension) if allowed_extensions.contains(&extension) => extension.to_owned(),
            _ => continue,
        };
        write!(lock, "test {} ... ", path.display())?;
        lock.flush()?;
        if !print_test_result(&mut lock, test(&path, &operation))? {
            failed_tests += 1;
        }
    }

    if failed_tests != 0 {
        writeln!(lock, "\ntest result: {} failed.\n", failed_tests)?;
        exit(101);
    } else {
        writeln!(lock, "\ntest result: ok.\n")?;
    }

    Ok(())
}

/// Paths of the `.json` inputs of a scenario, except the expected output, in name order.
fn inputs(path: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in read_dir(path)? {
        let input = entry?.path();
        if input.extension() == Some(OsStr::new("json")) && input.file_name() != Some(OsStr::new("expected.json")) {
            inputs.push(input);
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn test(path: &Path, operation: &str) -> Result<(Value, Value)> {
    let names = Names::new("A", "B")?;
    let actual = match operation {
        "file" | "line" | "merged" => {
            let a = LineReport::open(path.join("a.json"), Format::StdPtc)?;
            let b = LineReport::open(path.join("b.json"), Format::StdPtc)?;
            let level = if operation == "file" { Level::File } else { Level::Line };
            let mode = DiffMode::from_merge_flag(operation == "merged");
            to_value(compare(&a, &b, level, &names, mode)?)?
        },
        "baseline" => {
            let subject = LineReport::open(path.join("subject.json"), Format::StdPtc)?;
            let baseline = LineReport::open(path.join("baseline.json"), Format::StdPtc)?;
            to_value(correct_for_baseline(&subject, &baseline, Level::Line)?)?
        },
        "lcov" => to_value(LineReport::open(path.join("coverage.info"), Format::Lcov)?)?,
        "pertest" => to_value(LineReport::open(path.join("report.json"), Format::PerTest)?)?,
        "variability" => {
            let series = inputs(path)?
                .into_iter()
                .map(|input| LineReport::open(input, Format::StdPtc))
                .collect::<Result<Vec<_>>>()?;
            let padded = filter_file_variability(&series, VariabilityPolicy::Pad);
            let names = Names::new("before", "after")?;
            let mut actual = serde_json::Map::new();
            actual.insert("variability".to_owned(), to_value(classify(&series))?);
            actual.insert("differences".to_owned(), to_value(consecutive_differences(&padded, &names)?)?);
            Value::Object(actual)
        },
        _ => unreachable!(),
    };

    let expected = from_reader(File::open(path.join("expected.json"))?)?;
    Ok((actual, expected))
}

fn print_test_result<W: Write + WriteColor>(mut lock: W, result: Result<(Value, Value)>) -> io::Result<bool> {
    Ok(match result {
        Ok((actual, expected)) => {
            let success = actual == expected;
            if success {
                lock.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                writeln!(lock, "ok")?;
            } else {
                lock.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                writeln!(lock, "FAILED")?;
                let actual = to_string_pretty(&actual).expect("JSON");
                let expected = to_string_pretty(&expected).expect("JSON");
                for d in diff::lines(&actual, &expected) {
                    let (color, prefix, line) = match d {
                        diff::Result::Left(line) => (Color::Green, '+', line),
                        diff::Result::Both(line, _) => (Color::White, ' ', line),
                        diff::Result::Right(line) => (Color::Red, '-', line),
                    };
                    lock.set_color(ColorSpec::new().set_fg(Some(color)))?;
                    writeln!(lock, "{} {}", prefix, line)?;
                }
                writeln!(lock)?;
            }
            lock.reset()?;
            success
        },
        Err(e) => {
            lock.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            writeln!(lock, "ERRORED")?;
            lock.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_intense(true).set_bold(true))?;
            write!(lock, "error: ")?;
            lock.reset()?;
            writeln!(lock, "{}\n", e)?;
            false
        },
    })
}
