//! CLI module for stylefit
//!
//! This module provides:
//! - Command implementations (infer, doctor)
//! - Output handlers (console, JSON, quiet)
//!
//! # Example
//!
//! ```ignore
//! use stylefit::cli::{commands, output};
//!
//! let handler = output::create_handler(output::OutputMode::Console, false, false);
//! let exit_code = commands::infer(&inputs, &config, false, &*handler).await?;
//! ```

pub mod commands;
pub mod output;

pub use commands::{doctor, infer};
pub use output::{OutputEvent, OutputHandler, OutputMode, create_handler};
