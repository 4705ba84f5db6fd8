//! Command-line handling for the wrapper.

mod args;

pub use args::parse_args;
