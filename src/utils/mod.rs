/// Utility modules for the analyzer
///
/// This module contains statistics helpers, file handling, and output
/// formatting of the report bundle.

pub mod file_utils;
pub mod output_formatter;
pub mod stats;
