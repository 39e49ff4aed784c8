//! Configuration types and loading for stylefit

mod error;
mod loader;
mod options;

pub use error::OptionsError;
pub use loader::{DiffConfig, FormatterConfig, SearchConfig, StylefitConfig};
pub use options::{Candidate, OptionEntry, load_options};
