/// Core module for dataset analysis
///
/// This module contains the pipeline stages: loading, profiling, chart
/// rendering and narrative generation, plus the data types they share.

pub mod analysis;
pub mod charts;
pub mod loader;
pub mod narrator;
pub mod profiler;
pub mod table;
