//! Single-threaded cooperative scheduler driven by the host's clock.
//!
//! The host calls [`CooperativeScheduler::advance`] with a monotonic
//! timestamp and [`CooperativeScheduler::take_frame`] once per display frame;
//! both hand back due task values for the owner to dispatch. Tests drive the
//! same type with synthetic timestamps.

use std::time::Duration;

use advent_platform::{Scheduler, TaskHandle};

/// Work the calendar schedules on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Reevaluate,
    ConfettiFrame,
}

#[derive(Debug)]
struct Repeating<T> {
    handle: TaskHandle,
    interval: Duration,
    next_due: Duration,
    task: T,
}

#[derive(Debug)]
pub struct CooperativeScheduler<T> {
    next_id: u64,
    now: Duration,
    repeating: Vec<Repeating<T>>,
    frames: Vec<(TaskHandle, T)>,
}

impl<T> Default for CooperativeScheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            now: Duration::ZERO,
            repeating: Vec::new(),
            frames: Vec::new(),
        }
    }
}

impl<T: Clone> CooperativeScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Moves the clock to `now` and returns every repeating task that came due.
    ///
    /// A task that missed several intervals fires once and is rescheduled
    /// relative to `now`; the clock never moves backwards.
    pub fn advance(&mut self, now: Duration) -> Vec<T> {
        self.now = self.now.max(now);
        let mut due = Vec::new();
        for entry in &mut self.repeating {
            if entry.next_due <= self.now {
                due.push(entry.task.clone());
                entry.next_due = self.now + entry.interval;
            }
        }
        due
    }

    /// Drains frame tasks queued so far. Tasks scheduled while dispatching
    /// these land on the next frame.
    pub fn take_frame(&mut self) -> Vec<T> {
        std::mem::take(&mut self.frames)
            .into_iter()
            .map(|(_, task)| task)
            .collect()
    }

    pub fn has_frame_pending(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Earliest instant at which [`advance`](Self::advance) has work to return.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.repeating.iter().map(|entry| entry.next_due).min()
    }

    pub fn repeating_count(&self) -> usize {
        self.repeating.len()
    }

    fn allocate(&mut self) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        handle
    }
}

impl<T: Clone> Scheduler<T> for CooperativeScheduler<T> {
    fn schedule_repeating(&mut self, interval: Duration, task: T) -> TaskHandle {
        let handle = self.allocate();
        let interval = interval.max(Duration::from_millis(1));
        self.repeating.push(Repeating {
            handle,
            interval,
            next_due: self.now + interval,
            task,
        });
        handle
    }

    fn schedule_frame(&mut self, task: T) -> TaskHandle {
        let handle = self.allocate();
        self.frames.push((handle, task));
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.repeating.len() + self.frames.len();
        self.repeating.retain(|entry| entry.handle != handle);
        self.frames.retain(|(h, _)| *h != handle);
        before != self.repeating.len() + self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn repeating_fires_on_interval_and_coalesces_missed_ticks() {
        let mut scheduler = CooperativeScheduler::new();
        scheduler.schedule_repeating(ms(1000), "tick");

        assert!(scheduler.advance(ms(999)).is_empty());
        assert_eq!(scheduler.advance(ms(1000)), ["tick"]);
        assert!(scheduler.advance(ms(1500)).is_empty());
        // Ten seconds asleep still yields a single firing.
        assert_eq!(scheduler.advance(ms(12_000)), ["tick"]);
        assert_eq!(scheduler.next_deadline(), Some(ms(13_000)));
    }

    #[test]
    fn frame_tasks_are_one_shot() {
        let mut scheduler = CooperativeScheduler::new();
        scheduler.schedule_frame(1);
        scheduler.schedule_frame(2);
        assert!(scheduler.has_frame_pending());
        assert_eq!(scheduler.take_frame(), [1, 2]);
        assert!(!scheduler.has_frame_pending());
        assert!(scheduler.take_frame().is_empty());
    }

    #[test]
    fn cancel_removes_only_the_named_task() {
        let mut scheduler = CooperativeScheduler::new();
        let slow = scheduler.schedule_repeating(ms(500), "slow");
        let frame = scheduler.schedule_frame("frame");
        scheduler.schedule_repeating(ms(500), "other");

        assert!(scheduler.cancel(slow));
        assert!(!scheduler.cancel(slow));
        assert!(scheduler.cancel(frame));
        assert_eq!(scheduler.advance(ms(500)), ["other"]);
        assert!(scheduler.take_frame().is_empty());
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut scheduler = CooperativeScheduler::<()>::new();
        scheduler.advance(ms(2000));
        scheduler.advance(ms(10));
        assert_eq!(scheduler.now(), ms(2000));
        scheduler.schedule_repeating(ms(100), ());
        assert_eq!(scheduler.next_deadline(), Some(ms(2100)));
    }
}
