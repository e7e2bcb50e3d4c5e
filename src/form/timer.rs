use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable};
use futures::task::{LocalSpawn, LocalSpawnExt};
use futures_timer::Delay;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TimerStatus {
    Pending,
    Fired,
    Cancelled,
}

/// Handle to one scheduled task.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    status: Rc<Cell<TimerStatus>>,
    abort: Option<AbortHandle>,
}

impl TimerHandle {
    pub fn new() -> Self {
        Self {
            status: Rc::new(Cell::new(TimerStatus::Pending)),
            abort: None,
        }
    }

    fn with_abort(abort: AbortHandle) -> Self {
        Self {
            abort: Some(abort),
            ..Self::new()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status.get() == TimerStatus::Pending
    }

    /// Returns whether the task was still pending.
    pub fn cancel(&self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status.set(TimerStatus::Cancelled);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
        true
    }

    /// Called by a [`Scheduler`] right before it runs the task; `false`
    /// means the task was cancelled or already ran and must be skipped.
    pub fn begin_fire(&self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status.set(TimerStatus::Fired);
        true
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle;
}

/// Trailing-edge debounce: each call replaces the pending task, so only the
/// last one runs, `delay` after it was scheduled.
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    delay: Duration,
    pending: RefCell<Option<TimerHandle>>,
}

impl Debouncer {
    pub fn new(scheduler: Rc<dyn Scheduler>, delay: Duration) -> Self {
        Self {
            scheduler,
            delay,
            pending: RefCell::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&self, task: Box<dyn FnOnce()>) {
        let superseded = self.pending.borrow_mut().take();
        if let Some(previous) = superseded {
            previous.cancel();
        }
        let handle = self.scheduler.schedule(self.delay, task);
        *self.pending.borrow_mut() = Some(handle);
    }

    pub fn cancel(&self) -> bool {
        let pending = self.pending.borrow_mut().take();
        pending.is_some_and(|handle| handle.cancel())
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .is_some_and(TimerHandle::is_pending)
    }
}

struct ScheduledTask {
    deadline: Duration,
    sequence: u64,
    handle: TimerHandle,
    task: Box<dyn FnOnce()>,
}

/// Deterministic clock for tests and headless hosts; time only moves when
/// [`ManualScheduler::advance`] is called.
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    next_sequence: Cell<u64>,
    queue: RefCell<Vec<ScheduledTask>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending_count(&self) -> usize {
        self.queue
            .borrow()
            .iter()
            .filter(|task| task.handle.is_pending())
            .count()
    }

    /// Moves the clock forward, running due tasks in deadline order.
    /// Tasks scheduled by a running task are picked up if they fall due
    /// within the same window. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut fired = 0;
        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                queue.retain(|task| task.handle.is_pending());
                let due = queue
                    .iter()
                    .enumerate()
                    .filter(|(_, task)| task.deadline <= target)
                    .min_by_key(|(_, task)| (task.deadline, task.sequence))
                    .map(|(index, _)| index);
                due.map(|index| queue.remove(index))
            };
            let Some(task) = next else {
                break;
            };
            self.now.set(task.deadline.max(self.now.get()));
            if task.handle.begin_fire() {
                (task.task)();
                fired += 1;
            }
        }
        self.now.set(target);
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle {
        let handle = TimerHandle::new();
        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence + 1);
        self.queue.borrow_mut().push(ScheduledTask {
            deadline: self.now.get() + delay,
            sequence,
            handle: handle.clone(),
            task,
        });
        handle
    }
}

/// Real-time timers driven by a local executor.
pub struct DelayScheduler<S> {
    spawner: S,
}

impl<S> DelayScheduler<S>
where
    S: LocalSpawn,
{
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

impl<S> Scheduler for DelayScheduler<S>
where
    S: LocalSpawn,
{
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle {
        let (abort, registration) = AbortHandle::new_pair();
        let handle = TimerHandle::with_abort(abort);
        let fire = handle.clone();
        let timer = Abortable::new(
            async move {
                Delay::new(delay).await;
                if fire.begin_fire() {
                    task();
                }
            },
            registration,
        );
        if let Err(error) = self.spawner.spawn_local(async move {
            let _ = timer.await;
        }) {
            tracing::warn!(%error, "failed to spawn timer");
            handle.cancel();
        }
        handle
    }
}
