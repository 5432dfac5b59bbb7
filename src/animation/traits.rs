//! The Animation trait.

use std::time::Duration;

use crate::error::Result;

/// What an animation wants after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    /// Call again after `next_frame`.
    Running { next_frame: Duration },
    /// Remove the animation.
    Finished,
}

impl AnimationStatus {
    /// Running, asking for the next frame after `next_frame`.
    pub const fn running(next_frame: Duration) -> Self {
        Self::Running { next_frame }
    }
}

/// Something advanced periodically by an
/// [`AnimationScheduler`](super::AnimationScheduler).
///
/// `elapsed` is the time since the animation was queued. Returning an error
/// (or panicking) removes the animation; the scheduler keeps running.
pub trait Animation: Send {
    fn update(&mut self, elapsed: Duration) -> Result<AnimationStatus>;
}

impl<F> Animation for F
where
    F: FnMut(Duration) -> Result<AnimationStatus> + Send,
{
    fn update(&mut self, elapsed: Duration) -> Result<AnimationStatus> {
        self(elapsed)
    }
}
