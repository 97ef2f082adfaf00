//! The core of an OSEK/VDX-style statically configured kernel.
//!
//! A [`Kernel`] owns a fixed set of tasks and counting semaphores. Tasks are
//! scheduled by fixed priority, first-come first-served within a priority.
//! Every service goes through the kernel lock; mutations only record that
//! the scheduler has to run, and the context switch itself happens once, when
//! the outermost lock is released.
//!
//! The kernel doesn't execute task code. The [`Port`] implementation is told
//! which task owns the processor through [`PortThreading::switch_context`],
//! and it's the port's job to call the services on behalf of that task.
//!
//! # Example
//!
//! ```
//! use osek_kernel::{Cfg, Kernel, KernelHooks, PortThreading, TaskAttr, TaskId};
//!
//! struct NullPort;
//!
//! unsafe impl PortThreading for NullPort {
//!     unsafe fn enter_cpu_lock(&self) {}
//!     unsafe fn leave_cpu_lock(&self) {}
//!     unsafe fn switch_context(&self, _: Option<TaskId>, _: Option<TaskId>) {}
//! }
//!
//! impl KernelHooks for NullPort {}
//!
//! let mut kernel = Kernel::new(NullPort, Cfg {
//!     tasks: [TaskAttr::new("init", 1).autostart(), TaskAttr::new("worker", 2)],
//!     semaphores: [],
//! }).unwrap();
//!
//! kernel.start();
//! assert_eq!(kernel.get_task_id(), Some(TaskId::new(0)));
//!
//! kernel.activate_task(TaskId::new(1)).unwrap();
//! assert_eq!(kernel.get_task_id(), Some(TaskId::new(1)));
//! ```
#![cfg_attr(not(test), no_std)] // Link `std` only when building a test (`cfg(test)`)
#![deny(unsafe_op_in_unsafe_fn)]

mod action;
mod cfg;
mod error;
mod event;
mod hook;
mod klock;
mod semaphore;
mod state;
mod task;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use self::{
    action::Action,
    cfg::Cfg,
    error::{
        ActivateTaskError, CfgError, ChainTaskError, ClearEventError, GetEventError,
        GetSemaphoreError, GetTaskStateError, PostSemaphoreError, ScheduleError, SetEventError,
        StatusType, TerminateTaskError, WaitEventError, WaitSemaphoreError,
    },
    event::EventMask,
    hook::{ErrorInfo, KernelHooks, ServiceId, TraceEvent},
    semaphore::{SemaphoreAttr, SemaphoreDump, SemaphoreId, SemaphoreValue},
    task::{TaskAttr, TaskFlags, TaskId, TaskPriority, TaskState},
};

/// The number of task priority levels. Valid priorities are
/// `0..NUM_TASK_PRIORITY_LEVELS`.
pub const NUM_TASK_PRIORITY_LEVELS: usize = 64;

/// Implemented by a port. Provides the processor-level primitives the kernel
/// is built on.
///
/// # Safety
///
/// These methods are only meant to be called by the kernel. The
/// implementation must make `enter_cpu_lock` and `leave_cpu_lock` mask and
/// unmask every interrupt that can call kernel services.
pub unsafe trait PortThreading {
    /// Enter CPU Lock.
    ///
    /// # Safety
    ///
    /// CPU Lock must be inactive.
    unsafe fn enter_cpu_lock(&self);

    /// Leave CPU Lock.
    ///
    /// # Safety
    ///
    /// CPU Lock must be active.
    unsafe fn leave_cpu_lock(&self);

    /// Transfer the processor from `prev` to `next`. `None` denotes the idle
    /// context. Called with CPU Lock active, after the kernel has committed
    /// `next` as the running task.
    ///
    /// # Safety
    ///
    /// CPU Lock must be active. `prev != next`.
    unsafe fn switch_context(&self, prev: Option<TaskId>, next: Option<TaskId>);
}

/// The combination of the traits a port must implement.
pub trait Port: PortThreading + KernelHooks {}

impl<T: PortThreading + KernelHooks> Port for T {}

/// A kernel instance.
///
/// `NUM_TASKS` and `NUM_SEMAPHORES` are the sizes of the static
/// configuration ([`Cfg`]).
pub struct Kernel<Traits, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> {
    port: Traits,
    klock: klock::KernelLock,
    state: state::State,
    tasks: [task::TaskCb; NUM_TASKS],
    ready_queue: task::readyqueue::BitmapQueue<NUM_TASKS>,
    semaphores: [semaphore::SemaphoreCb<NUM_TASKS>; NUM_SEMAPHORES],
}

impl<Traits: Port, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>
    Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    /// Get a reference to the port.
    #[inline]
    pub fn port(&self) -> &Traits {
        &self.port
    }

    /// Pass a failed service call to the error hook.
    fn report(&self, info: ErrorInfo) {
        log::debug!(
            "{:?} failed with {:?} (task = {:?}, semaphore = {:?}, mask = {:?})",
            info.service,
            info.status,
            info.task,
            info.semaphore,
            info.mask
        );
        self.port.error_hook(&info);
    }
}

impl<Traits: core::fmt::Debug, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> core::fmt::Debug
    for Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Kernel")
            .field("port", &self.port)
            .field("klock", &self.klock)
            .field("state", &self.state)
            .field("tasks", &self.tasks)
            .field("ready_queue", &self.ready_queue)
            .field("semaphores", &self.semaphores)
            .finish()
    }
}
