//! Cooperative task scheduler: single, delayed, periodic and on-date
//! callbacks driven by `process()` from one thread, with an optional
//! background-thread mode.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::*;

use crate::core::clock::Clock;
use crate::core::common::POISONED_MUTEX;

/// Callback invoked with the task handle so it can reschedule itself
pub type TaskCallback = Box<dyn FnMut(&Arc<Task>) + Send>;

//==================================================================================================
/// Timing modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskType {
    /// Runs on the next drain
    Single,
    /// Runs once after a delay
    DelayedSingle,
    /// Runs every period
    Periodic,
    /// Runs every period after an initial delay
    DelayedPeriodic,
    /// Runs once at an absolute timestamp
    OnDate,
    /// Runs every period starting at an absolute timestamp
    PeriodicOnDate,
}

//==================================================================================================
struct TaskSched {
    period_ms: i64,
    /// Absolute execution timestamp for the on-date modes
    timestamp_ms: i64,
    /// Next slot for the periodic modes
    start_time: i64,
    /// Next slot for the delayed modes
    next_execution_time: i64,
    /// Pending reschedule for Single tasks; 0 = none
    reschedule_time: i64,
    /// Timestamp the last firing was due at
    execution_time: i64,
}

/// A scheduled unit of work.  Tasks never run concurrently with themselves;
/// missed periodic slots are collapsed into a single firing.
pub struct Task {
    kind: TaskType,
    clock: Arc<dyn Clock>,
    callback: Mutex<Option<TaskCallback>>,
    sched: Mutex<TaskSched>,
    completed: AtomicBool,
    force_execute: AtomicBool,
    shutdown: AtomicBool,
}

impl Task {
    fn new(
        kind: TaskType,
        clock: Arc<dyn Clock>,
        callback: TaskCallback,
        delay_ms: i64,
        period_ms: i64,
        timestamp_ms: i64,
    ) -> Self {
        let now = clock.now_ms();
        Task {
            kind,
            clock,
            callback: Mutex::new(Some(callback)),
            sched: Mutex::new(TaskSched {
                period_ms,
                timestamp_ms,
                start_time: now + period_ms,
                next_execution_time: now + delay_ms,
                reschedule_time: 0,
                execution_time: 0,
            }),
            completed: AtomicBool::new(false),
            force_execute: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Reschedules the task to fire at an absolute timestamp.  Re-arms
    /// completed Single tasks.
    pub fn reschedule_at(&self, new_time_ms: i64) {
        if self.shutdown.load(Ordering::Acquire) {
            return;
        }
        let mut sched = self.sched.lock().expect(POISONED_MUTEX);
        sched.next_execution_time = new_time_ms;
        sched.start_time = new_time_ms;
        sched.timestamp_ms = new_time_ms;
        sched.reschedule_time = new_time_ms;
        self.completed.store(false, Ordering::Release);
    }

    //----------------------------------------------------------------------------------------------
    /// Reschedules the task to fire after a relative delay
    pub fn reschedule_in(&self, new_delay_ms: i64) {
        self.reschedule_at(self.clock.now_ms() + new_delay_ms);
    }

    //----------------------------------------------------------------------------------------------
    pub fn set_period(&self, new_period_ms: i64) {
        let mut sched = self.sched.lock().expect(POISONED_MUTEX);
        sched.start_time -= sched.period_ms;
        sched.period_ms = new_period_ms;
        sched.start_time += sched.period_ms;
    }

    //----------------------------------------------------------------------------------------------
    /// Pushes every slot one period forward and clears a pending reschedule
    pub fn reset_timer(&self) {
        let mut sched = self.sched.lock().expect(POISONED_MUTEX);
        sched.next_execution_time += sched.period_ms;
        sched.start_time += sched.period_ms;
        sched.timestamp_ms += sched.period_ms;
        sched.reschedule_time = 0;
    }

    //----------------------------------------------------------------------------------------------
    pub fn is_ready(&self) -> bool {
        if self.completed.load(Ordering::Acquire) {
            return false;
        }
        if self.force_execute.load(Ordering::Acquire) || self.shutdown.load(Ordering::Acquire) {
            return true;
        }
        let now = self.clock.now_ms();
        let sched = self.sched.lock().expect(POISONED_MUTEX);
        match self.kind {
            TaskType::Single => now >= sched.reschedule_time,
            TaskType::DelayedSingle => now >= sched.next_execution_time,
            TaskType::Periodic => now >= sched.start_time,
            TaskType::DelayedPeriodic => now >= sched.next_execution_time,
            TaskType::OnDate => now >= sched.timestamp_ms,
            TaskType::PeriodicOnDate => now >= sched.timestamp_ms,
        }
    }

    //----------------------------------------------------------------------------------------------
    pub fn force_execute(&self) {
        self.force_execute.store(true, Ordering::Release);
    }

    //----------------------------------------------------------------------------------------------
    pub fn is_periodic(&self) -> bool {
        self.kind == TaskType::Periodic
            || self.kind == TaskType::DelayedPeriodic
            || self.kind == TaskType::PeriodicOnDate
    }

    //----------------------------------------------------------------------------------------------
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    //----------------------------------------------------------------------------------------------
    pub fn is_force_execute(&self) -> bool {
        self.force_execute.load(Ordering::Acquire)
    }

    //----------------------------------------------------------------------------------------------
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    //----------------------------------------------------------------------------------------------
    /// Timestamp the last firing was due at
    pub fn execution_time(&self) -> i64 {
        self.sched.lock().expect(POISONED_MUTEX).execution_time
    }

    //----------------------------------------------------------------------------------------------
    /// Lag between the due timestamp and now
    pub fn delay(&self) -> i64 {
        self.clock.now_ms() - self.execution_time()
    }

    //----------------------------------------------------------------------------------------------
    /// Marks the task for one final firing; the manager removes it after
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    //----------------------------------------------------------------------------------------------
    fn process(task: &Arc<Task>, now_ms: i64) {
        if task.completed.load(Ordering::Acquire) {
            return;
        }
        let force = task.force_execute.load(Ordering::Acquire);
        let shutdown = task.shutdown.load(Ordering::Acquire);
        let mut fire = false;
        {
            let mut sched = task.sched.lock().expect(POISONED_MUTEX);
            match task.kind {
                TaskType::Single => {
                    sched.execution_time = if sched.reschedule_time != 0 {
                        sched.reschedule_time
                    } else {
                        sched.start_time
                    };
                    if now_ms >= sched.reschedule_time || force || shutdown {
                        sched.reschedule_time = 0;
                        task.completed.store(true, Ordering::Release);
                        fire = true;
                    }
                }
                TaskType::DelayedSingle => {
                    sched.execution_time = sched.next_execution_time;
                    if now_ms >= sched.next_execution_time || force || shutdown {
                        task.completed.store(true, Ordering::Release);
                        fire = true;
                    }
                }
                TaskType::Periodic => {
                    sched.execution_time = sched.start_time;
                    if now_ms >= sched.start_time || force || shutdown {
                        // collapse missed slots so a stall yields one firing
                        if sched.period_ms > 0 {
                            while now_ms >= sched.start_time {
                                sched.start_time += sched.period_ms;
                            }
                        } else {
                            sched.start_time = now_ms + 1;
                        }
                        fire = true;
                    }
                }
                TaskType::DelayedPeriodic => {
                    sched.execution_time = sched.next_execution_time;
                    if now_ms >= sched.next_execution_time || force || shutdown {
                        if sched.period_ms > 0 {
                            while now_ms >= sched.next_execution_time {
                                sched.next_execution_time += sched.period_ms;
                            }
                        } else {
                            sched.next_execution_time = now_ms + 1;
                        }
                        fire = true;
                    }
                }
                TaskType::OnDate => {
                    sched.execution_time = sched.timestamp_ms;
                    if now_ms >= sched.timestamp_ms || force || shutdown {
                        task.completed.store(true, Ordering::Release);
                        fire = true;
                    }
                }
                TaskType::PeriodicOnDate => {
                    sched.execution_time = sched.timestamp_ms;
                    if now_ms >= sched.timestamp_ms || force || shutdown {
                        if sched.period_ms > 0 {
                            while now_ms >= sched.timestamp_ms {
                                sched.timestamp_ms += sched.period_ms;
                            }
                        } else {
                            sched.timestamp_ms = now_ms + 1;
                        }
                        fire = true;
                    }
                }
            }
        }
        if fire {
            Task::invoke_callback(task);
        }
        task.force_execute.store(false, Ordering::Release);
        if shutdown {
            task.completed.store(true, Ordering::Release);
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Runs the callback outside the scheduling lock.  The callback slot is
    /// taken for the duration, which is what prevents a task from running
    /// concurrently with itself.
    fn invoke_callback(task: &Arc<Task>) {
        let callback = { task.callback.lock().expect(POISONED_MUTEX).take() };
        if let Some(mut callback) = callback {
            if catch_unwind(AssertUnwindSafe(|| callback(task))).is_err() {
                error!("scheduled task callback panicked");
            }
            let mut slot = task.callback.lock().expect(POISONED_MUTEX);
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}

//==================================================================================================
struct TaskManagerShared {
    clock: Arc<dyn Clock>,
    pending_tasks: Mutex<Vec<Arc<Task>>>,
    cv: Condvar,
    tasks: Mutex<Vec<Arc<Task>>>,
    force_execute: AtomicBool,
    shutdown: AtomicBool,
    task_count: AtomicUsize,
}

/// Schedules and executes tasks.  `process()` runs on a single driving
/// thread; `run()` moves that loop onto a background thread woken by a
/// condition variable or a 1 ms tick.
pub struct TaskManager {
    shared: Arc<TaskManagerShared>,
    worker_thread: Option<JoinHandle<()>>,
}

impl TaskManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        TaskManager {
            shared: Arc::new(TaskManagerShared {
                clock,
                pending_tasks: Mutex::new(Vec::new()),
                cv: Condvar::new(),
                tasks: Mutex::new(Vec::new()),
                force_execute: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                task_count: AtomicUsize::new(0),
            }),
            worker_thread: None,
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Adds a task that runs on the next drain
    pub fn add_single_task(&self, callback: TaskCallback) -> Option<Arc<Task>> {
        self.add_task(TaskType::Single, callback, 0, 0, 0)
    }

    //----------------------------------------------------------------------------------------------
    /// Adds a task that runs once after `delay_ms`
    pub fn add_delayed_task(&self, delay_ms: i64, callback: TaskCallback) -> Option<Arc<Task>> {
        self.add_task(TaskType::DelayedSingle, callback, delay_ms, 0, 0)
    }

    //----------------------------------------------------------------------------------------------
    /// Adds a task that runs every `period_ms`
    pub fn add_periodic_task(&self, period_ms: i64, callback: TaskCallback) -> Option<Arc<Task>> {
        self.add_task(TaskType::Periodic, callback, 0, period_ms, 0)
    }

    //----------------------------------------------------------------------------------------------
    /// Adds a periodic task with an initial delay
    pub fn add_delayed_periodic_task(
        &self,
        delay_ms: i64,
        period_ms: i64,
        callback: TaskCallback,
    ) -> Option<Arc<Task>> {
        self.add_task(TaskType::DelayedPeriodic, callback, delay_ms, period_ms, 0)
    }

    //----------------------------------------------------------------------------------------------
    /// Adds a task that runs once at `timestamp_ms`
    pub fn add_on_date_task(&self, timestamp_ms: i64, callback: TaskCallback) -> Option<Arc<Task>> {
        self.add_task(TaskType::OnDate, callback, 0, 0, timestamp_ms)
    }

    //----------------------------------------------------------------------------------------------
    /// Adds a periodic task anchored at `timestamp_ms`
    pub fn add_periodic_on_date_task(
        &self,
        timestamp_ms: i64,
        period_ms: i64,
        callback: TaskCallback,
    ) -> Option<Arc<Task>> {
        self.add_task(TaskType::PeriodicOnDate, callback, 0, period_ms, timestamp_ms)
    }

    //----------------------------------------------------------------------------------------------
    fn add_task(
        &self,
        kind: TaskType,
        callback: TaskCallback,
        delay_ms: i64,
        period_ms: i64,
        timestamp_ms: i64,
    ) -> Option<Arc<Task>> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return None;
        }
        let task = Arc::new(Task::new(
            kind,
            self.shared.clock.clone(),
            callback,
            delay_ms,
            period_ms,
            timestamp_ms,
        ));
        {
            let mut pending = self.shared.pending_tasks.lock().expect(POISONED_MUTEX);
            pending.push(task.clone());
        }
        self.shared.cv.notify_one();
        Some(task)
    }

    //----------------------------------------------------------------------------------------------
    /// Drains pending tasks into the active list and runs every ready task.
    /// Tasks added from inside a callback wait for the next drain.
    pub fn process(&self) {
        Self::process_shared(&self.shared);
    }

    fn process_shared(shared: &TaskManagerShared) {
        let drained: Vec<Arc<Task>> = {
            let mut pending = shared.pending_tasks.lock().expect(POISONED_MUTEX);
            std::mem::take(&mut *pending)
        };

        let mut tasks = shared.tasks.lock().expect(POISONED_MUTEX);
        tasks.extend(drained);

        let now = shared.clock.now_ms();
        let force = shared.force_execute.load(Ordering::Acquire);
        let shutdown = shared.shutdown.load(Ordering::Acquire);

        for task in tasks.iter() {
            if force {
                task.force_execute();
            }
            if shutdown {
                task.shutdown();
            }
            if !task.is_completed() {
                Task::process(task, now);
            }
        }

        shared.force_execute.store(false, Ordering::Release);

        tasks.retain(|task| !task.is_completed());
        shared.task_count.store(tasks.len(), Ordering::Release);
    }

    //----------------------------------------------------------------------------------------------
    /// Starts processing on a background thread.  The thread wakes on task
    /// submission or every millisecond.
    pub fn run(&mut self) {
        if self.worker_thread.is_some() {
            return;
        }
        let shared = self.shared.clone();
        self.worker_thread = Some(std::thread::spawn(move || {
            debug!("task manager worker started");
            while !shared.shutdown.load(Ordering::Acquire) {
                {
                    let pending = shared.pending_tasks.lock().expect(POISONED_MUTEX);
                    let _unused = shared
                        .cv
                        .wait_timeout(pending, Duration::from_millis(1))
                        .expect(POISONED_MUTEX);
                }
                Self::process_shared(&shared);
            }
            Self::process_shared(&shared);
            debug!("task manager worker stopped");
        }));
    }

    //----------------------------------------------------------------------------------------------
    /// Marks every task for a final firing and drains them.  The manager is
    /// reusable afterwards.
    pub fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker_thread.take() {
            self.shared.cv.notify_all();
            if worker.join().is_err() {
                error!("task manager worker thread panicked");
            }
        } else {
            Self::process_shared(&self.shared);
        }
        self.shared.shutdown.store(false, Ordering::Release);
    }

    //----------------------------------------------------------------------------------------------
    /// Forces every task to fire on the next drain
    pub fn force_execute(&self) {
        self.shared.force_execute.store(true, Ordering::Release);
    }

    //----------------------------------------------------------------------------------------------
    pub fn active_task_count(&self) -> usize {
        self.shared.task_count.load(Ordering::Acquire)
    }

    //----------------------------------------------------------------------------------------------
    pub fn has_active_tasks(&self) -> bool {
        self.active_task_count() > 0
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
