//! Atomic edit steps over Vellum document trees.
//!
//! A [`Step`] is an invertible edit: insert, delete, replace, add mark,
//! remove mark. Steps carry flat positions valid against one specific tree
//! version; [`Mapping`] transforms positions (and whole steps) across the
//! steps they did not account for, which is what makes concurrent editing
//! converge.

pub mod map;
pub mod rebase;
pub mod step;

pub use map::{Bias, MapResult, Mapping, StepMap};
pub use rebase::{rebase_batch, RebasedBatch};
pub use step::Step;
