//! # no-more-finals
//!
//! Strips `final` from selected classes (and their public final methods) in a
//! directory of compiled JVM class files, copying everything else unchanged.
//!
//! ## Architecture
//!
//! - **access**: Typed class, nested-class and method access flags
//! - **constant_pool**: Constant pool entries kept in encoded form
//! - **descriptor**: Mutable model of one class (identity, flags, methods)
//! - **classfile**: Stateless parse / serialize pair for class files
//! - **rules**: Include/exclude decision for a class name and package
//! - **mutate**: Clears final flags on an in-scope class
//! - **transform**: Tree walker mirroring input to output with fallback copies
//! - **config**: JSON filter configuration and its resolution
//! - **cli**: Command-line definitions

pub mod access;
pub mod classfile;
pub mod cli;
pub mod config;
pub mod constant_pool;
pub mod descriptor;
pub mod error;
pub mod mutate;
pub mod rules;
pub mod transform;

pub use config::FilterConfig;
pub use descriptor::{ClassDescriptor, MethodDescriptor};
pub use error::ClassFormatError;
pub use rules::{Decision, FilterRules};
pub use transform::{RunReport, Transformer, run};
