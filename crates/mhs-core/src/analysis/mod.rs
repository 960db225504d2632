//! Analysis engines.
//!
//! Every engine takes the shared clean frame by reference, clones it
//! before deriving any helper column, computes a plain result value,
//! and leaves persistence to the pipeline. The engines are independent
//! of each other and may run in any order.

pub mod compare;
pub mod descriptives;
pub mod design;
pub mod factor;
pub mod linalg;
pub mod logistic;
pub mod regression;
pub mod risk;
