//! Expression evaluation.
//!
//! - [`Value`] / [`ValueType`]: dynamic values and their type tags.
//! - [`Environment`]: observable variables an expression reads.
//! - [`Evaluator`]: the evaluation seam, with [`StandardEvaluator`] and the
//!   non-computing [`SpoofingEvaluator`].
//! - [`ObservableEvaluator`]: incremental evaluation into observables.

pub mod env;
pub mod evaluator;
pub mod observable;
mod ops;
pub mod spoof;
pub mod value;

pub use env::{EnvId, Environment};
pub use evaluator::{evaluate_with, EvaluationResult, Evaluator, StandardEvaluator};
pub use observable::ObservableEvaluator;
pub use spoof::SpoofingEvaluator;
pub use value::{Value, ValueType};
