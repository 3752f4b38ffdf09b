//! Game detection for the foreground window.
//!
//! This module provides:
//! - Window tree inspection (`inspect`)
//! - Pattern-based classification (`classify`, `Classifier::decide`)

pub mod classifier;
pub mod inspector;

pub use classifier::{ClassificationRule, Classifier, Decision};
pub use inspector::inspect;
