//! Colored status messages on `stderr`.
//!
//! Results are written as JSON to `stdout` or to files, so everything meant for a human goes to `stderr` in the style
//! of `cargo`.

use error::Error;

use termcolor::*;

use std::fmt;
use std::io::{Result, Write};

/// Prints a progress message with a right-aligned green tag, e.g. `     Loading run_1.json`.
macro_rules! progress {
    ($tag:expr, $($args:tt)+) => {
        $crate::ui::print_tagged(::termcolor::Color::Green, &format!("{:>12} ", $tag), format_args!($($args)+))
    }
}

/// Prints a warning (yellow tag).
macro_rules! warning {
    ($($args:tt)+) => {
        $crate::ui::print_tagged(::termcolor::Color::Yellow, "warning: ", format_args!($($args)+))
    }
}

/// Prints a message after a colored tag. Failure to write to `stderr` is logged and otherwise ignored.
pub fn print_tagged(color: Color, tag: &str, message: fmt::Arguments) {
    let stream = StandardStream::stderr(ColorChoice::Auto);
    let mut lock = stream.lock();
    let mut print = || -> Result<()> {
        lock.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(lock, "{}", tag)?;
        lock.reset()?;
        writeln!(lock, "{}", message)
    };
    if let Err(e) = print() {
        debug!("cannot print to stderr: {}", e);
    }
}

/// Prints an error and the causes.
pub fn print_error(error: &Error) -> Result<()> {
    let stream = StandardStream::stderr(ColorChoice::Auto);
    let mut lock = stream.lock();

    for (i, e) in error.iter().enumerate() {
        let (spec, tag) = if i == 0 {
            (ColorSpec::new().set_fg(Some(Color::Red)).set_intense(true).set_bold(true).clone(), "error: ")
        } else {
            (ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true).clone(), "caused by: ")
        };
        lock.set_color(&spec)?;
        write!(lock, "{}", tag)?;
        lock.reset()?;
        writeln!(lock, "{}", e)?;
    }
    if let Some(backtrace) = error.backtrace() {
        writeln!(lock, "\n{:?}", backtrace)?;
    }
    Ok(())
}
