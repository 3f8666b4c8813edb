//! Formloom schema expansion.
//!
//! This crate provides the core pipeline for expanding a compact tabular form
//! schema into its full flat form: the compact-schema parser, the directive
//! expander, the template host that renders the directives, and the pre- and
//! post-expansion validators.

pub mod catalog;
pub mod expanding;
pub mod extvars;
pub mod model;
pub mod parsing;
pub mod qualifier;
pub mod rendering;
pub mod tabular;
pub mod validation;

pub use catalog::*;
pub use expanding::*;
pub use extvars::*;
pub use model::*;
pub use parsing::*;
pub use qualifier::*;
pub use rendering::*;
pub use tabular::*;
pub use validation::*;
