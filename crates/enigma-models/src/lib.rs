//! Model implementations for Enigma.
//!
//! This crate provides concrete implementations of the `Classifier` trait and
//! the factory that maps configured kinds to them.
//!
//! # Supported Kinds
//!
//! - **baseline** (alias `logistic`): standardised multinomial logistic regression

pub mod baseline;
pub mod factory;

pub use baseline::{BASELINE_KIND, BaselineClassifier, LogisticParams};
pub use factory::{BuildFn, DecodeFn, ModelEnvelope, ModelFactory, ModelParams};
