pub mod boundary;
pub mod builder;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod matrix;
pub mod notes;
pub mod oracle;
pub mod publish;
pub mod ui;

pub use error::{ReleaseError, Result};
