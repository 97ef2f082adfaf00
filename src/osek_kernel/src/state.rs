//! Per-core kernel state and call-level checks
use crate::{error::CallLevelError, utils::Init, Kernel, Port, TaskId};

/// Global kernel state.
#[derive(Debug)]
pub(super) struct State {
    /// The task that currently owns the processor. `None` while idle.
    ///
    /// The referenced task is usually in the Running state, but a service
    /// that makes it leave the processor (`terminate_task`, a blocking wait,
    /// a yield) changes its state first and leaves this field to be updated
    /// by the scheduler when the kernel lock is released.
    pub(super) running_task: Option<TaskId>,

    /// Set when the scheduler must reevaluate `running_task` at the end of
    /// the current critical section.
    pub(super) need_schedule: bool,

    /// The interrupt nesting level. Non-zero means interrupt level.
    pub(super) isr_nesting: u32,

    /// Set by [`Kernel::start`].
    pub(super) started: bool,
}

impl Init for State {
    const INIT: Self = Self {
        running_task: None,
        need_schedule: false,
        isr_nesting: 0,
        started: false,
    };
}

impl State {
    #[inline]
    pub(super) fn is_interrupt_level(&self) -> bool {
        self.isr_nesting != 0
    }

    /// If the current context is not a task context, return `Err(CallLevel)`.
    /// Otherwise return the calling task.
    pub(super) fn expect_task_context(&self) -> Result<TaskId, CallLevelError> {
        match self.running_task {
            Some(task) if !self.is_interrupt_level() => Ok(task),
            _ => Err(CallLevelError::CallLevel),
        }
    }
}

impl<Traits: Port, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>
    Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    /// Run `f` at interrupt level, as the body of a category 2 interrupt
    /// handler.
    ///
    /// Task-level services called from `f` fail with
    /// [`StatusType::CallLevel`](crate::StatusType::CallLevel). Any context
    /// switch requested by `f` is deferred until the outermost handler
    /// returns.
    pub fn isr<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.state.isr_nesting += 1;
        let ret = f(self);
        self.state.isr_nesting -= 1;

        if !self.state.is_interrupt_level() && self.state.need_schedule {
            log::trace!("dispatching on interrupt return");
            // Releasing the kernel lock performs the pending dispatch
            self.with_kernel_lock(|_| ());
        }

        ret
    }

    /// Get a flag indicating whether the current context is interrupt level.
    #[inline]
    pub fn is_interrupt_context(&self) -> bool {
        self.state.is_interrupt_level()
    }

    /// Get the task that currently owns the processor (`GetTaskID`). Returns
    /// `None` while idle. At interrupt level, this is the interrupted task.
    #[inline]
    pub fn get_task_id(&self) -> Option<TaskId> {
        self.state.running_task
    }
}
