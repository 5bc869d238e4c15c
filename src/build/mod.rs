// src/build/mod.rs

pub mod pipeline;

pub use pipeline::{check_required_tools, run_build, run_pipeline, swap_artifacts};
