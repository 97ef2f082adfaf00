//! Tasks
use core::fmt;

use crate::{
    error::{
        ActivateTaskError, BadIdError, CallLevelError, ChainTaskError, GetTaskStateError,
        LimitError, ScheduleError, TerminateTaskError,
    },
    event::EventMask,
    hook::{ErrorInfo, ServiceId},
    Kernel, Port,
};

#[doc(hidden)]
pub mod readyqueue;
use self::readyqueue::ScheduleDecision;

/// A task priority. Numerically higher values are more urgent.
pub type TaskPriority = u8;

/// Identifies a statically configured task. The value is the task's index in
/// [`Cfg::tasks`](crate::Cfg::tasks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Task state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// The task has no pending activation.
    Suspended,
    /// The task is in a ready queue, waiting for the processor.
    Ready,
    /// The task owns the processor.
    Running,
    /// The task is blocked on a semaphore or on events.
    Waiting,
}

bitflags::bitflags! {
    /// Static properties of a task.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TaskFlags: u8 {
        /// The task owns an event mask and may call `wait_event`.
        const EXTENDED = 1 << 0;
        /// The task is activated by [`Kernel::start`].
        const AUTOSTART = 1 << 1;
        /// Wake-ups never preempt the task while it's running. It gives up
        /// the processor only at `schedule`, `terminate_task`, `chain_task`,
        /// or a blocking call.
        const NON_PREEMPTABLE = 1 << 2;
    }
}

/// The static properties of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskAttr {
    /// The name used by debug output.
    pub name: &'static str,

    /// The static priority of the task.
    pub priority: TaskPriority,

    /// The maximum number of pending activations. A value other than `1`
    /// forbids the task from blocking on a semaphore.
    pub max_activate_count: u32,

    pub flags: TaskFlags,
}

impl TaskAttr {
    /// Construct a `TaskAttr` for a basic, preemptable task with a single
    /// activation.
    pub const fn new(name: &'static str, priority: TaskPriority) -> Self {
        Self {
            name,
            priority,
            max_activate_count: 1,
            flags: TaskFlags::empty(),
        }
    }

    pub const fn max_activate_count(self, max_activate_count: u32) -> Self {
        Self {
            max_activate_count,
            ..self
        }
    }

    pub const fn extended(self) -> Self {
        Self {
            flags: self.flags.union(TaskFlags::EXTENDED),
            ..self
        }
    }

    pub const fn autostart(self) -> Self {
        Self {
            flags: self.flags.union(TaskFlags::AUTOSTART),
            ..self
        }
    }

    pub const fn non_preemptable(self) -> Self {
        Self {
            flags: self.flags.union(TaskFlags::NON_PREEMPTABLE),
            ..self
        }
    }

    #[inline]
    pub const fn is_extended(&self) -> bool {
        self.flags.contains(TaskFlags::EXTENDED)
    }
}

/// *Task control block* - the state data of a task.
#[derive(Debug)]
pub(super) struct TaskCb {
    /// The static properties of the task.
    pub(super) attr: TaskAttr,

    pub(super) st: TaskState,

    /// The number of activations recorded and not yet terminated, including
    /// the one currently being executed. Never exceeds
    /// `attr.max_activate_count`.
    ///
    /// Invariant: `(activate_count == 0) == (st == TaskState::Suspended)`
    pub(super) activate_count: u32,

    /// The events set for the task. Only used by extended tasks.
    pub(super) events: EventMask,

    /// The events the task waits for. Non-zero only while the task is
    /// blocked in `wait_event`.
    pub(super) wait_mask: EventMask,
}

impl TaskCb {
    pub(super) const fn new(attr: TaskAttr) -> Self {
        Self {
            attr,
            st: TaskState::Suspended,
            activate_count: 0,
            events: 0,
            wait_mask: 0,
        }
    }

    #[inline]
    fn is_preemptable(&self) -> bool {
        !self.attr.flags.contains(TaskFlags::NON_PREEMPTABLE)
    }
}

/// These methods implement the task management services.
impl<Traits: Port, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>
    Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    /// If `task` is out of range, return `Err(Id)`.
    #[inline]
    pub(super) fn expect_task_id(&self, task: TaskId) -> Result<(), BadIdError> {
        if task.get() < NUM_TASKS {
            Ok(())
        } else {
            Err(BadIdError::Id)
        }
    }

    /// Record an activation of `task` (`ActivateTask`).
    ///
    /// The first activation makes the task Ready. If the number of pending
    /// activations would exceed the task's `max_activate_count`, the call fails
    /// with `Limit` and the task is left unchanged.
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn activate_task(&mut self, task: TaskId) -> Result<(), ActivateTaskError> {
        self.with_kernel_lock(|k| {
            let result = k.activate_checked(task);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::ActivateTask, e).with_task(task));
            }
            result
        })
    }

    /// End the current activation of the calling task (`TerminateTask`).
    ///
    /// The task becomes Ready again (at the back of its priority level) if it
    /// has another pending activation, or Suspended otherwise. The processor
    /// is handed over when this call returns.
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn terminate_task(&mut self) -> Result<(), TerminateTaskError> {
        self.with_kernel_lock(|k| {
            let result: Result<(), TerminateTaskError> = k
                .state
                .expect_task_context()
                .map(|running_task| k.finish_activation(running_task))
                .map_err(Into::into);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::TerminateTask, e));
            }
            result
        })
    }

    /// Terminate the calling task and activate `task` in one step
    /// (`ChainTask`).
    ///
    /// If `task` can't take another activation, the call fails with `Limit`
    /// and the calling task keeps running. Chaining the calling task itself
    /// puts its new activation at the back of its priority level.
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn chain_task(&mut self, task: TaskId) -> Result<(), ChainTaskError> {
        self.with_kernel_lock(|k| {
            let result = k.chain(task);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::ChainTask, e).with_task(task));
            }
            result
        })
    }

    /// Get the state of `task` (`GetTaskState`).
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn get_task_state(&mut self, task: TaskId) -> Result<TaskState, GetTaskStateError> {
        self.with_kernel_lock(|k| {
            let result: Result<TaskState, GetTaskStateError> = k
                .expect_task_id(task)
                .map(|()| k.tasks[task.get()].st)
                .map_err(Into::into);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::GetTaskState, e).with_task(task));
            }
            result
        })
    }

    /// Yield the processor to a Ready task whose priority is higher than or
    /// equal to the calling task's (`Schedule`).
    ///
    /// On an equal-priority yield, the calling task goes to the back of its
    /// priority level. Does nothing if there's no such task.
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn schedule(&mut self) -> Result<(), ScheduleError> {
        self.with_kernel_lock(|k| {
            let result: Result<(), ScheduleError> = k.yield_running_task().map_err(Into::into);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::Schedule, e));
            }
            result
        })
    }

    fn activate_checked(&mut self, task: TaskId) -> Result<(), ActivateTaskError> {
        self.expect_task_id(task)?;
        self.activate(task)?;
        Ok(())
    }

    /// Implements `activate_task`. Requires the kernel lock.
    pub(super) fn activate(&mut self, task: TaskId) -> Result<(), LimitError> {
        let task_cb = &mut self.tasks[task.get()];
        if task_cb.activate_count >= task_cb.attr.max_activate_count {
            return Err(LimitError::Limit);
        }

        task_cb.activate_count += 1;

        if task_cb.st == TaskState::Suspended {
            // A fresh activation starts with no events set
            task_cb.events = 0;
            self.make_ready(task);
        }

        Ok(())
    }

    fn finish_activation(&mut self, task: TaskId) {
        let task_cb = &mut self.tasks[task.get()];
        debug_assert_eq!(task_cb.st, TaskState::Running);
        debug_assert_ne!(task_cb.activate_count, 0);

        task_cb.activate_count -= 1;

        if task_cb.activate_count > 0 {
            // Start the next pending activation
            task_cb.events = 0;
            self.make_ready(task);
        } else {
            task_cb.st = TaskState::Suspended;
        }

        // The calling task has left the Running state
        self.state.need_schedule = true;
    }

    fn chain(&mut self, task: TaskId) -> Result<(), ChainTaskError> {
        let running_task = self.state.expect_task_context()?;
        self.expect_task_id(task)?;

        if task == running_task {
            // The current activation is replaced by the new one; the
            // activation count doesn't change
            let task_cb = &mut self.tasks[task.get()];
            task_cb.events = 0;
            self.make_ready(task);
            self.state.need_schedule = true;
            return Ok(());
        }

        let target_cb = &self.tasks[task.get()];
        if target_cb.activate_count >= target_cb.attr.max_activate_count {
            return Err(LimitError::Limit.into());
        }

        self.finish_activation(running_task);
        self.activate(task)?;
        Ok(())
    }

    fn yield_running_task(&mut self) -> Result<(), CallLevelError> {
        let running_task = self.state.expect_task_context()?;
        let priority = self.tasks[running_task.get()].attr.priority;

        if matches!(self.ready_queue.highest_priority(), Some(p) if p >= priority) {
            log::trace!("{running_task:?} yields");
            self.tasks[running_task.get()].st = TaskState::Ready;
            self.ready_queue.push_back_task(running_task, priority);
            self.state.need_schedule = true;
        }

        Ok(())
    }

    /// Transition the task into the Ready state, inserting it at the back of
    /// its priority level, and request a context switch if it should preempt
    /// the running task.
    pub(super) fn make_ready(&mut self, task: TaskId) {
        let task_cb = &mut self.tasks[task.get()];
        task_cb.st = TaskState::Ready;
        let priority = task_cb.attr.priority;
        self.ready_queue.push_back_task(task, priority);

        if self.is_preempted_by(priority) {
            self.state.need_schedule = true;
        }
    }

    /// Get a flag indicating whether a newly Ready task having `priority`
    /// should take over the processor.
    fn is_preempted_by(&self, priority: TaskPriority) -> bool {
        match self.state.running_task {
            Some(running_task) => {
                let running_cb = &self.tasks[running_task.get()];
                if running_cb.st == TaskState::Running {
                    running_cb.is_preemptable() && priority > running_cb.attr.priority
                } else {
                    // The running task is leaving the processor; the scheduler
                    // has to run anyway
                    true
                }
            }
            None => true,
        }
    }

    /// Transition the running task into the Waiting state. The task stays
    /// blocked until `release` is called for it.
    pub(super) fn block_running_task(&mut self, task: TaskId) {
        let task_cb = &mut self.tasks[task.get()];
        assert_eq!(task_cb.st, TaskState::Running);
        task_cb.st = TaskState::Waiting;
        self.state.need_schedule = true;
    }

    /// Wake up a task blocked by `block_running_task`.
    pub(super) fn release(&mut self, task: TaskId) {
        assert_eq!(
            self.tasks[task.get()].st,
            TaskState::Waiting,
            "{task:?} was released without waiting"
        );
        self.make_ready(task);
    }

    /// Decide whether the running task should keep the processor.
    pub(super) fn schedule_from_running(&mut self) -> ScheduleDecision<TaskId> {
        let prev_task_priority = match self.state.running_task {
            Some(running_task) => {
                let running_cb = &self.tasks[running_task.get()];
                match running_cb.st {
                    TaskState::Running if !running_cb.is_preemptable() => {
                        return ScheduleDecision::Keep
                    }
                    TaskState::Running => Some(running_cb.attr.priority),
                    _ => None,
                }
            }
            None => None,
        };

        self.ready_queue.pop_front_task(prev_task_priority)
    }

    /// Run the scheduler and perform the context switch it decides on.
    /// Called with the outermost kernel lock held, right before it's released.
    pub(super) fn choose_next_running_task(&mut self) {
        self.state.need_schedule = false;

        let prev_running_task = self.state.running_task;

        let next_running_task = match self.schedule_from_running() {
            ScheduleDecision::SwitchTo(task) => task,
            // The current task can still run, and no task is willing to take
            // over it
            ScheduleDecision::Keep => return,
        };

        // `prev_running_task` now loses the control of the processor.
        if let Some(prev) = prev_running_task {
            let prev_cb = &mut self.tasks[prev.get()];
            match prev_cb.st {
                TaskState::Running => {
                    // Preempted. It was made Ready before anything queued at
                    // the same priority, so it goes to the front.
                    prev_cb.st = TaskState::Ready;
                    let priority = prev_cb.attr.priority;
                    self.ready_queue.push_front_task(prev, priority);
                }
                TaskState::Ready | TaskState::Waiting | TaskState::Suspended => {}
            }
        }

        if let Some(next) = next_running_task {
            // Transition `next_running_task` into the Running state
            self.tasks[next.get()].st = TaskState::Running;
        }

        self.state.running_task = next_running_task;

        if prev_running_task != next_running_task {
            log::trace!("switching context from {prev_running_task:?} to {next_running_task:?}");
            // Safety: The kernel lock is held, and the new running task has
            //         been committed to the kernel state
            unsafe {
                self.port
                    .switch_context(prev_running_task, next_running_task)
            };
        }
    }
}
