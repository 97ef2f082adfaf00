//! Actions triggered by kernel objects
//!
//! An alarm expiry, a schedule table expiry point, or an interrupt handler
//! reacts by running a statically configured list of [`Action`]s.
#[cfg(feature = "kernel_monitoring")]
use crate::hook::TraceEvent;
use crate::{event::EventMask, task::TaskId, Kernel, Port};

/// A reaction to a trigger.
#[derive(Debug, Clone, Copy)]
pub enum Action {
    /// Call a function. The function runs with the kernel lock held and
    /// can't call kernel services.
    Callback(fn()),
    /// Activate a task.
    ActivateTask { task: TaskId },
    /// Set events for an extended task.
    SetEvent { task: TaskId, mask: EventMask },
}

impl<Traits: Port, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>
    Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    /// Execute `action`.
    ///
    /// A failure is reported to [`KernelHooks::error_hook`] with the identity
    /// of the equivalent service and its parameters, and is otherwise
    /// ignored. A context switch requested by the action happens when the
    /// outermost kernel lock is released.
    ///
    /// [`KernelHooks::error_hook`]: crate::KernelHooks::error_hook
    pub fn dispatch_action(&mut self, action: &Action) {
        self.with_kernel_lock(|k| match *action {
            Action::Callback(callback) => callback(),
            Action::ActivateTask { task } => {
                #[cfg(feature = "kernel_monitoring")]
                k.port.trace(TraceEvent::ActionActivateTaskEnter);

                // The error has already been passed to the error hook
                let _ = k.activate_task(task);

                #[cfg(feature = "kernel_monitoring")]
                k.port.trace(TraceEvent::ActionActivateTaskExit);
            }
            Action::SetEvent { task, mask } => {
                #[cfg(feature = "kernel_monitoring")]
                k.port.trace(TraceEvent::ActionSetEventEnter);

                // ditto
                let _ = k.set_event(task, mask);

                #[cfg(feature = "kernel_monitoring")]
                k.port.trace(TraceEvent::ActionSetEventExit);
            }
        })
    }

    /// Execute the actions of one trigger in order. All context switches they
    /// request are coalesced into one.
    pub fn dispatch_actions(&mut self, actions: &[Action]) {
        self.with_kernel_lock(|k| {
            for action in actions {
                k.dispatch_action(action);
            }
        })
    }
}
