//! Cancellable scheduled tasks
//!
//! Tasks are keyed by a caller-chosen value and fire from `poll`, which the
//! owner calls once per tick. Nothing runs on its own: a cancelled or
//! dropped scheduler can never invoke anything again.

use std::time::Duration;

use aether_core::FrameTime;

/// Handle returned for every scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Task<K> {
    handle: TaskHandle,
    key: K,
    due: FrameTime,
    period: Option<Duration>,
}

/// Scheduler for one-shot and periodic tasks
#[derive(Debug)]
pub struct TaskScheduler<K> {
    tasks: Vec<Task<K>>,
    next_handle: u64,
}

impl<K: Clone> TaskScheduler<K> {
    pub fn new() -> Self {
        TaskScheduler {
            tasks: Vec::new(),
            next_handle: 1,
        }
    }

    /// Fire `key` once, `delay` after `now`
    pub fn schedule_once(&mut self, now: FrameTime, delay: Duration, key: K) -> TaskHandle {
        self.insert(now + delay, None, key)
    }

    /// Fire `key` every `period`, first at `now + period`
    pub fn schedule_every(&mut self, now: FrameTime, period: Duration, key: K) -> TaskHandle {
        // A zero period would fire on every poll forever
        let period = period.max(Duration::from_micros(1));
        self.insert(now + period, Some(period), key)
    }

    fn insert(&mut self, due: FrameTime, period: Option<Duration>, key: K) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.push(Task {
            handle,
            key,
            due,
            period,
        });
        handle
    }

    /// Cancel a task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    /// Cancel everything (teardown)
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.tasks.len();
        self.tasks.clear();
        if cancelled > 0 {
            tracing::debug!(cancelled, "scheduled tasks cancelled");
        }
        cancelled
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle)
    }

    /// Collect keys of tasks due at `now`, in due order.
    ///
    /// A periodic task fires at most once per poll. If the poll came late
    /// by more than one period, the missed firings are skipped rather than
    /// replayed in a burst.
    pub fn poll(&mut self, now: FrameTime) -> Vec<K> {
        let mut due: Vec<(FrameTime, u64, K)> = Vec::new();

        self.tasks.retain_mut(|task| {
            if task.due > now {
                return true;
            }
            due.push((task.due, task.handle.0, task.key.clone()));
            match task.period {
                Some(period) => {
                    task.due = task.due + period;
                    if task.due <= now {
                        let behind = now.since(task.due).as_micros() as u64;
                        let step = period.as_micros() as u64;
                        let skipped = behind / step + 1;
                        task.due = FrameTime::from_micros(task.due.as_micros() + skipped * step);
                    }
                    true
                }
                None => false,
            }
        });

        due.sort_by_key(|(at, handle, _)| (*at, *handle));
        due.into_iter().map(|(_, _, key)| key).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<K: Clone> Default for TaskScheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}
