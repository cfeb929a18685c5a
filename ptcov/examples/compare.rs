#[macro_use]
extern crate error_chain;
extern crate env_logger;
extern crate ptcov;
extern crate serde_json;

use ptcov::{compare, DiffMode, Format, Level, LineReport, Names, Result};

use std::env;
use std::io::stdout;

quick_main!(run);

fn run() -> Result<()> {
    env_logger::init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let (format, first, second) = match args.as_slice() {
        [format, first, second] => (format.parse::<Format>()?, first, second),
        _ => bail!("usage: compare <format> <first-artifact> <second-artifact>"),
    };

    let first = LineReport::open(first, format)?;
    let second = LineReport::open(second, format)?;
    let names = Names::new("first", "second")?;
    let comparison = compare(&first, &second, Level::Line, &names, DiffMode::Directional)?;

    serde_json::to_writer_pretty(stdout(), &comparison)?;
    Ok(())
}
