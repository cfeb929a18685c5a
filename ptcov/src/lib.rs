//! Per-test coverage comparison engine.
//!
//! `ptcov` reads coverage artifacts produced by CI test runs (lcov text, per-test JSON reports, JS debugger
//! coverage, ...) into one canonical [`Report`] shape, and compares such reports at file or line granularity.
//!
//! ```rust
//! use ptcov::{compare, DiffMode, Level, LineReport, Names};
//! # use ptcov::Result;
//! # fn main() { run().unwrap(); }
//! # fn run() -> Result<()> {
//! let a = LineReport::from_files(vec![("f1", vec![1, 2, 3]), ("f2", vec![5])]);
//! let b = LineReport::from_files(vec![("f1", vec![1, 2]), ("f3", vec![9])]);
//!
//! let names = Names::new("A", "B")?;
//! let comparison = compare(&a, &b, Level::File, &names, DiffMode::Directional)?;
//! assert!(comparison.common.files().unwrap().contains("f1"));
//! # Ok(()) }
//! ```
//!
//! [`Report`]: ./report/struct.Report.html

#![recursion_limit = "128"] // needed for error_chain.

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;
#[cfg_attr(test, macro_use)]
extern crate serde_json;

pub mod error;
pub mod report;
pub mod normalize;
pub mod diff;
pub mod compare;
pub mod variability;
pub mod filter;

pub use compare::{compare, compare_all, correct_for_baseline, Common, Comparison, ComparisonMatrix, Correction, Different, PairKey};
pub use diff::{diff, DiffMode, Difference, Names};
pub use error::{ErrorKind, Result};
pub use filter::FileType;
pub use normalize::{Format, ScoreSelection};
pub use report::{Covered, Hit, HitReport, Level, LineReport, Report};
pub use variability::{FileVariability, Stability, VariabilityPolicy};
