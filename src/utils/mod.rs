//! Utility functions for code generation.
//!
//! - [`code_generator`] - Short code generation and alias validation

pub mod code_generator;
