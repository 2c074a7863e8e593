//! TerraHub component configuration library
//!
//! This module exports the configuration resolver for the command-line tool
//! and for embedding.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod paths;
