//! Animation registry and its background driver.
//!
//! [`AnimationScheduler::tick`] runs one pass over the queued animations:
//! every animation whose frame is due is updated, finished and failing ones
//! are dropped, and the time until the next due frame is returned. The
//! driver started by [`AnimationScheduler::start`] is a named thread running
//! a current-thread tokio runtime that calls `tick` and then sleeps for the
//! returned interval, waking early when an animation is queued or the
//! scheduler is stopped.

use std::any::Any;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, error, trace};

use super::traits::{Animation, AnimationStatus};
use crate::config::AnimationConfig;
use crate::error::{Error, Result};

/// Handle to a queued animation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "animation#{}", self.0)
    }
}

struct Entry {
    id: AnimationId,
    animation: Box<dyn Animation>,
    started: Instant,
    due: Instant,
}

struct Shared {
    config: AnimationConfig,
    entries: Mutex<Vec<Entry>>,
    /// Cancellations of animations that were being updated at the time.
    cancelled: Mutex<Vec<AnimationId>>,
    /// Serializes passes between the driver and direct `tick` calls.
    pass: Mutex<()>,
    running: AtomicBool,
    notify: Notify,
    next_id: AtomicU64,
}

impl Shared {
    fn tick(&self) -> Duration {
        let _pass = self.pass.lock();
        let now = Instant::now();
        let pending = mem::take(&mut *self.entries.lock());

        let mut survivors = Vec::with_capacity(pending.len());
        let mut updated = 0usize;
        for mut entry in pending {
            if entry.due > now {
                survivors.push(entry);
                continue;
            }
            updated += 1;
            let elapsed = now.saturating_duration_since(entry.started);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry.animation.update(elapsed)));
            match outcome {
                Ok(Ok(AnimationStatus::Running { next_frame })) => {
                    entry.due = now + next_frame;
                    survivors.push(entry);
                }
                Ok(Ok(AnimationStatus::Finished)) => {
                    debug!(animation = %entry.id, "animation finished");
                }
                Ok(Err(err)) => {
                    error!(animation = %entry.id, error = %err, "animation update failed, removing it");
                }
                Err(payload) => {
                    error!(
                        animation = %entry.id,
                        panic = %panic_message(payload.as_ref()),
                        "animation update panicked, removing it"
                    );
                }
            }
        }

        let mut entries = self.entries.lock();
        let cancelled = mem::take(&mut *self.cancelled.lock());
        survivors.retain(|e| !cancelled.contains(&e.id));
        // Animations queued during the pass run after the survivors.
        survivors.append(&mut entries);
        *entries = survivors;

        let wait = entries
            .iter()
            .map(|e| e.due.saturating_duration_since(now))
            .min()
            .map_or(self.config.max_interval, |d| self.config.clamp_interval(d));
        trace!(updated, remaining = entries.len(), wait_ms = wait.as_millis() as u64, "animation pass");
        wait
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Queue of animations with an optional background driver.
///
/// The scheduler is owned by whoever needs it (a [`crate::dom::Document`]
/// owns one); dropping it stops the driver.
pub struct AnimationScheduler {
    shared: Arc<Shared>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("animations", &self.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

impl AnimationScheduler {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                entries: Mutex::new(Vec::new()),
                cancelled: Mutex::new(Vec::new()),
                pass: Mutex::new(()),
                running: AtomicBool::new(false),
                notify: Notify::new(),
                next_id: AtomicU64::new(1),
            }),
            driver: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.shared.config
    }

    /// Queue `animation`. Its first update is due immediately.
    pub fn queue(&self, animation: impl Animation + 'static) -> AnimationId {
        let id = AnimationId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Instant::now();
        self.shared.entries.lock().push(Entry {
            id,
            animation: Box::new(animation),
            started: now,
            due: now,
        });
        self.shared.notify.notify_one();
        id
    }

    /// Remove a queued animation. An animation in the middle of an update is
    /// removed when that update returns.
    pub fn cancel(&self, id: AnimationId) {
        let mut entries = self.shared.entries.lock();
        if let Some(pos) = entries.iter().position(|e| e.id == id) {
            entries.remove(pos);
        } else {
            self.shared.cancelled.lock().push(id);
        }
    }

    /// Run one pass now. Returns how long until the next frame is due,
    /// clamped to the configured interval bounds.
    pub fn tick(&self) -> Duration {
        self.shared.tick()
    }

    /// Number of queued animations.
    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Start the driver thread. Starting a running scheduler does nothing.
    pub fn start(&self) -> Result<()> {
        let mut driver = self.driver.lock();
        if driver.is_some() {
            return Ok(());
        }
        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.shared.config.thread_name.clone())
            .spawn(move || run_driver(&shared));
        match spawned {
            Ok(handle) => {
                *driver = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                Err(Error::driver(format!("failed to spawn driver thread: {err}")))
            }
        }
    }

    /// Stop the driver thread and wait for it to exit. Queued animations
    /// stay queued.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.notify.notify_one();
        let Some(handle) = self.driver.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Stopped from inside an update; the loop exits after this pass.
            return;
        }
        debug!("waiting for animation driver to exit");
        if let Err(e) = handle.join() {
            error!("animation driver panicked: {:?}", e);
        }
    }
}

impl Drop for AnimationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_driver(shared: &Shared) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to build animation runtime");
            shared.running.store(false, Ordering::Release);
            return;
        }
    };
    debug!(thread = %shared.config.thread_name, "animation driver started");
    runtime.block_on(async {
        while shared.running.load(Ordering::Acquire) {
            let wait = shared.tick();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shared.notify.notified() => {}
            }
        }
    });
    debug!(thread = %shared.config.thread_name, "animation driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let c = Arc::new(AtomicUsize::new(0));
        (Arc::clone(&c), c)
    }

    fn finishes_after(frames: usize, count: Arc<AtomicUsize>) -> impl Animation {
        move |_elapsed: Duration| -> Result<AnimationStatus> {
            let n = count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(if n >= frames {
                AnimationStatus::Finished
            } else {
                AnimationStatus::running(Duration::ZERO)
            })
        }
    }

    #[test]
    fn finished_animations_are_removed() {
        let scheduler = AnimationScheduler::default();
        let (count, seen) = counter();
        scheduler.queue(finishes_after(3, count));
        assert_eq!(scheduler.len(), 1);
        scheduler.tick();
        scheduler.tick();
        assert_eq!(scheduler.len(), 1);
        scheduler.tick();
        assert!(scheduler.is_empty());
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failing_and_panicking_animations_are_dropped() {
        let scheduler = AnimationScheduler::default();
        let (count, seen) = counter();
        scheduler.queue(|_: Duration| -> Result<AnimationStatus> {
            Err(Error::evaluation("broken frame"))
        });
        scheduler.queue(|_: Duration| -> Result<AnimationStatus> { panic!("frame exploded") });
        scheduler.queue(finishes_after(10, count));
        scheduler.tick();
        assert_eq!(scheduler.len(), 1);
        scheduler.tick();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn frames_wait_until_due() {
        let scheduler = AnimationScheduler::default();
        let (count, seen) = counter();
        scheduler.queue(move |_: Duration| -> Result<AnimationStatus> {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(AnimationStatus::running(Duration::from_secs(3600)))
        });
        scheduler.tick();
        scheduler.tick();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tick_clamps_the_next_wait() {
        let scheduler = AnimationScheduler::default();
        assert_eq!(scheduler.tick(), Duration::from_secs(1));

        scheduler.queue(|_: Duration| -> Result<AnimationStatus> {
            Ok(AnimationStatus::running(Duration::from_secs(30)))
        });
        assert_eq!(scheduler.tick(), Duration::from_secs(1));

        let quick = AnimationScheduler::default();
        quick.queue(|_: Duration| -> Result<AnimationStatus> {
            Ok(AnimationStatus::running(Duration::from_millis(1)))
        });
        assert_eq!(quick.tick(), Duration::from_millis(10));
    }

    #[test]
    fn cancel_removes_queued_animation() {
        let scheduler = AnimationScheduler::default();
        let (count, seen) = counter();
        let id = scheduler.queue(finishes_after(5, count));
        scheduler.cancel(id);
        scheduler.tick();
        assert!(scheduler.is_empty());
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn driver_runs_animations_in_the_background() {
        let config = AnimationConfig::new()
            .with_min_interval(Duration::from_millis(1))
            .with_thread_name("anim-test");
        let scheduler = AnimationScheduler::new(config);
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        let (tx, rx) = mpsc::channel();
        scheduler.queue(|_: Duration| -> Result<AnimationStatus> { panic!("first") });
        scheduler.queue(move |_: Duration| -> Result<AnimationStatus> {
            let name = thread::current().name().map(str::to_string);
            let _ = tx.send(name);
            Ok(AnimationStatus::Finished)
        });
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("anim-test"));

        scheduler.stop();
        assert!(!scheduler.is_running());
        scheduler.stop();
    }

    #[test]
    fn start_twice_is_harmless() {
        let scheduler = AnimationScheduler::default();
        scheduler.start().unwrap();
        scheduler.start().unwrap();
        drop(scheduler);
    }
}
