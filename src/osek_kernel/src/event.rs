//! Events of extended tasks
use crate::{
    error::{
        AccessError, ClearEventError, GetEventError, SetEventError, StateError, WaitEventError,
    },
    hook::{ErrorInfo, ServiceId},
    task::{TaskId, TaskState},
    Kernel, Port,
};

/// A set of events. Each bit is an event.
pub type EventMask = u32;

impl<Traits: Port, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>
    Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    /// Set the events in `mask` for the extended task `task` (`SetEvent`).
    ///
    /// If `task` is waiting for any of them, it's released.
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn set_event(&mut self, task: TaskId, mask: EventMask) -> Result<(), SetEventError> {
        self.with_kernel_lock(|k| {
            let result = k.set_event_inner(task, mask);

            if let Err(e) = result {
                k.report(
                    ErrorInfo::new(ServiceId::SetEvent, e)
                        .with_task(task)
                        .with_mask(mask),
                );
            }
            result
        })
    }

    fn set_event_inner(&mut self, task: TaskId, mask: EventMask) -> Result<(), SetEventError> {
        self.expect_task_id(task)?;

        let task_cb = &mut self.tasks[task.get()];
        if !task_cb.attr.is_extended() {
            return Err(AccessError::Access.into());
        }
        if task_cb.st == TaskState::Suspended {
            return Err(StateError::State.into());
        }

        task_cb.events |= mask;

        if task_cb.st == TaskState::Waiting && task_cb.events & task_cb.wait_mask != 0 {
            task_cb.wait_mask = 0;
            log::trace!("events {mask:#x} release {task:?}");
            self.release(task);
        }

        Ok(())
    }

    /// Clear the events in `mask` for the calling task (`ClearEvent`).
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn clear_event(&mut self, mask: EventMask) -> Result<(), ClearEventError> {
        self.with_kernel_lock(|k| {
            let result = k.clear_event_inner(mask);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::ClearEvent, e).with_mask(mask));
            }
            result
        })
    }

    fn clear_event_inner(&mut self, mask: EventMask) -> Result<(), ClearEventError> {
        let running_task = self.state.expect_task_context()?;
        let task_cb = &mut self.tasks[running_task.get()];
        if !task_cb.attr.is_extended() {
            return Err(AccessError::Access.into());
        }
        task_cb.events &= !mask;
        Ok(())
    }

    /// Get the events currently set for `task` (`GetEvent`).
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn get_event(&mut self, task: TaskId) -> Result<EventMask, GetEventError> {
        self.with_kernel_lock(|k| {
            let result = k.get_event_inner(task);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::GetEvent, e).with_task(task));
            }
            result
        })
    }

    fn get_event_inner(&self, task: TaskId) -> Result<EventMask, GetEventError> {
        self.expect_task_id(task)?;
        let task_cb = &self.tasks[task.get()];
        if !task_cb.attr.is_extended() {
            return Err(AccessError::Access.into());
        }
        if task_cb.st == TaskState::Suspended {
            return Err(StateError::State.into());
        }
        Ok(task_cb.events)
    }

    /// Block the calling task until at least one of the events in `mask` is
    /// set (`WaitEvent`). Returns immediately if one already is.
    ///
    /// Events are not consumed by waiting; use
    /// [`clear_event`](Self::clear_event).
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn wait_event(&mut self, mask: EventMask) -> Result<(), WaitEventError> {
        self.with_kernel_lock(|k| {
            let result = k.wait_event_inner(mask);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::WaitEvent, e).with_mask(mask));
            }
            result
        })
    }

    fn wait_event_inner(&mut self, mask: EventMask) -> Result<(), WaitEventError> {
        let running_task = self.state.expect_task_context()?;
        let task_cb = &mut self.tasks[running_task.get()];
        if !task_cb.attr.is_extended() {
            return Err(AccessError::Access.into());
        }

        if task_cb.events & mask == 0 {
            task_cb.wait_mask = mask;
            log::trace!("{running_task:?} waits for events {mask:#x}");
            self.block_running_task(running_task);
        }

        Ok(())
    }
}
