//! Errors related to the `ptcov` crate.
//!
//! Please see documentation of the [`error-chain` crate](https://docs.rs/error-chain/0.12.0/error_chain/) for detailed
//! usage.

use std::io;
use std::num::ParseIntError;

error_chain! {
    foreign_links {
        Io(io::Error) /** Wrapper of standard I/O error. */;
        Json(::serde_json::Error) /** Wrapper of JSON error. */;
        ParseInt(ParseIntError) /** Wrapper of integer parse error. */;
    }

    errors {
        /// The raw artifact is expected to be a JSON object at the top level.
        NotAnObject(what: &'static str) {
            description("not a JSON object")
            display("{} artifact is not a JSON object", what)
        }

        /// The raw artifact is expected to be a JSON array at the top level.
        NotAnArray(what: &'static str) {
            description("not a JSON array")
            display("{} artifact is not a JSON array", what)
        }

        /// A `DA:` record of an lcov file cannot be parsed.
        MalformedLcov(line_number: usize) {
            description("malformed lcov record")
            display("malformed lcov record at line {}", line_number)
        }

        /// The comparison level is not `file` or `line`.
        UnsupportedLevel(level: String) {
            description("unsupported comparison level")
            display("unsupported comparison level `{}`, expecting `file` or `line`", level)
        }

        /// The artifact format name is not recognized.
        UnsupportedFormat(format: String) {
            description("unsupported artifact format")
            display("unsupported artifact format `{}`", format)
        }

        /// The names of both sides of a comparison produce the same forward and backward difference key.
        CollidingNames(key: String) {
            description("colliding comparison names")
            display("forward and backward differences are both named `{}`", key)
        }
    }
}
