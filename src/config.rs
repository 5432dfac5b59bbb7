//! Configuration for the layout solver and the animation driver.
//!
//! [`CoreConfig`] bundles both and is what a [`crate::dom::Document`] is
//! built from.

use std::time::Duration;

// ---------------------------------------------------------------------------
// LayoutConfig
// ---------------------------------------------------------------------------

/// Tuning for [`crate::layout::SpringLayoutSolver`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Relaxation sweeps before the solver gives up and returns its best
    /// approximation.
    pub max_iterations: usize,
    /// A sweep in which no edge moved farther than this is converged.
    pub epsilon: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            epsilon: 0.01,
        }
    }
}

impl LayoutConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sweep cap (builder).
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance (builder).
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

// ---------------------------------------------------------------------------
// AnimationConfig
// ---------------------------------------------------------------------------

/// Timing for the [`crate::animation::AnimationScheduler`] driver thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationConfig {
    /// Longest the driver sleeps between passes.
    pub max_interval: Duration,
    /// Shortest the driver sleeps between passes.
    pub min_interval: Duration,
    /// Name given to the driver thread.
    pub thread_name: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            max_interval: Duration::from_secs(1),
            min_interval: Duration::from_millis(10),
            thread_name: "muis-animation".to_string(),
        }
    }
}

impl AnimationConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the longest sleep (builder).
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the shortest sleep (builder).
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the driver thread name (builder).
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Clamp a requested frame interval into `[min_interval, max_interval]`.
    pub fn clamp_interval(&self, requested: Duration) -> Duration {
        requested.clamp(self.min_interval, self.max_interval.max(self.min_interval))
    }
}

// ---------------------------------------------------------------------------
// CoreConfig
// ---------------------------------------------------------------------------

/// Configuration for a whole document session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoreConfig {
    pub layout: LayoutConfig,
    pub animation: AnimationConfig,
}

impl CoreConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the layout config (builder).
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the animation config (builder).
    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }
}
