//! Kernel state locking mechanism
//!
//! The kernel lock maps to the port's CPU Lock state. Only the outermost
//! acquisition reaches the port; nested acquisitions (e.g., an action
//! dispatched while a service is in progress) only bump a counter.
//!
//! Releasing the outermost lock is the single point where a pending
//! rescheduling request turns into a context switch.
use crate::{utils::Init, Kernel, Port};

/// The nesting state of the kernel lock.
#[derive(Debug)]
pub(super) struct KernelLock {
    nesting: u32,
}

impl Init for KernelLock {
    const INIT: Self = Self { nesting: 0 };
}

impl KernelLock {
    #[inline]
    pub(super) fn is_active(&self) -> bool {
        self.nesting != 0
    }
}

impl<Traits: Port, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>
    Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    /// Acquire the kernel lock.
    pub(super) fn lock_kernel(&mut self) {
        if self.klock.nesting == 0 {
            // Safety: The nesting counter says CPU Lock is inactive, and it's
            //         us (the kernel) who are controlling the CPU Lock state
            unsafe { self.port.enter_cpu_lock() };
        }
        self.klock.nesting += 1;
    }

    /// Release the kernel lock. When the outermost hold is released outside an
    /// interrupt handler and a reschedule is pending, the scheduler runs and
    /// the context switch is performed before CPU Lock is left.
    pub(super) fn unlock_kernel(&mut self) {
        assert!(self.klock.is_active(), "unbalanced kernel unlock");

        if self.klock.nesting == 1
            && self.state.started
            && !self.state.is_interrupt_level()
            && self.state.need_schedule
        {
            self.choose_next_running_task();
        }

        self.klock.nesting -= 1;
        if self.klock.nesting == 0 {
            // Safety: We entered CPU Lock in the matching `lock_kernel`
            unsafe { self.port.leave_cpu_lock() };
        }
    }

    /// Run `f` inside a kernel critical section.
    #[inline]
    pub(super) fn with_kernel_lock<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.lock_kernel();
        let ret = f(self);
        self.unlock_kernel();
        ret
    }
}
