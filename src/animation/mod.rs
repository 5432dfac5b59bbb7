//! Animation queue and its background driver thread.

pub mod scheduler;
pub mod traits;

pub use scheduler::{AnimationId, AnimationScheduler};
pub use traits::{Animation, AnimationStatus};
