#![allow(clippy::missing_docs_in_private_items)]

pub mod context;
pub mod grading;
pub mod instructions;
pub mod questions;
pub mod reference_set;
pub mod scoring;
pub mod technical;

pub use reference_set::ReferenceSet;
pub use technical::{TechnicalEvaluation, TechnicalEvaluator, TechnicalQuestion};
