//! CLI command implementations.

pub mod args;
pub mod output;

pub mod bundle;
pub mod exclude;
pub mod images;
pub mod inspect;
pub mod sync;

pub use args::{Cli, Commands};
pub use output::Output;
