//! Semaphores
use core::fmt;

use crate::{
    error::{AccessError, BadIdError, GetSemaphoreError, PostSemaphoreError, WaitSemaphoreError},
    hook::{ErrorInfo, ServiceId},
    task::TaskId,
    Kernel, Port,
};

/// The token count of a semaphore.
pub type SemaphoreValue = u32;

/// Identifies a statically configured semaphore. The value is the
/// semaphore's index in [`Cfg::semaphores`](crate::Cfg::semaphores).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemaphoreId(usize);

impl SemaphoreId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

/// The static properties of a semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreAttr {
    /// The initial token count.
    pub initial: SemaphoreValue,
}

impl SemaphoreAttr {
    pub const fn new(initial: SemaphoreValue) -> Self {
        Self { initial }
    }
}

/// *Semaphore control block* - the state data of a semaphore.
///
/// The waiting tasks are kept in a ring buffer with one slot per task. A task
/// can wait on at most one semaphore at a time, so the ring never needs more.
pub(super) struct SemaphoreCb<const CAPACITY: usize> {
    pub(super) token: SemaphoreValue,

    waiting_tasks: [TaskId; CAPACITY],

    /// The slot the next waiter is written to.
    index: usize,

    /// The number of waiters. The oldest one is at `index - size` (modulo
    /// `CAPACITY`).
    size: usize,
}

impl<const CAPACITY: usize> SemaphoreCb<CAPACITY> {
    pub(super) const fn new(attr: SemaphoreAttr) -> Self {
        Self {
            token: attr.initial,
            waiting_tasks: [TaskId::new(0); CAPACITY],
            index: 0,
            size: 0,
        }
    }

    #[inline]
    pub(super) fn num_waiting_tasks(&self) -> usize {
        self.size
    }

    /// Append `task` to the tail of the wait queue.
    ///
    /// Panics if the queue is full.
    fn enqueue(&mut self, task: TaskId) {
        assert!(self.size < CAPACITY, "semaphore wait queue overflow");
        self.waiting_tasks[self.index] = task;
        self.index += 1;
        if self.index == CAPACITY {
            self.index = 0;
        }
        self.size += 1;
    }

    /// Remove and return the oldest waiter.
    fn dequeue(&mut self) -> Option<TaskId> {
        if self.size == 0 {
            return None;
        }
        let task = self.waiting_tasks[self.head()];
        self.size -= 1;
        Some(task)
    }

    fn head(&self) -> usize {
        if self.index < self.size {
            self.index + CAPACITY - self.size
        } else {
            self.index - self.size
        }
    }

    /// Iterate over the waiting tasks, oldest first.
    pub(super) fn waiting_tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        let head = self.head();
        (0..self.size).map(move |i| self.waiting_tasks[(head + i) % CAPACITY])
    }
}

impl<const CAPACITY: usize> fmt::Debug for SemaphoreCb<CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SemaphoreCb")
            .field("self", &(self as *const _))
            .field("token", &self.token)
            .field("waiting_tasks", &DebugWaiters(self))
            .finish()
    }
}

struct DebugWaiters<'a, const CAPACITY: usize>(&'a SemaphoreCb<CAPACITY>);

impl<const CAPACITY: usize> fmt::Debug for DebugWaiters<'_, CAPACITY> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.0.waiting_tasks()).finish()
    }
}

/// The human-readable form of a semaphore's state, returned by
/// [`Kernel::dump_semaphore`]. Formats as `(token)[size] name ...`, or
/// `(token)[empty]` if no task is waiting.
pub struct SemaphoreDump<'a, Traits, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> {
    kernel: &'a Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>,
    semaphore_cb: &'a SemaphoreCb<NUM_TASKS>,
}

impl<Traits, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> fmt::Display
    for SemaphoreDump<'_, Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({})", self.semaphore_cb.token)?;
        let size = self.semaphore_cb.num_waiting_tasks();
        if size == 0 {
            return f.write_str("[empty]");
        }
        write!(f, "[{size}]")?;
        for task in self.semaphore_cb.waiting_tasks() {
            write!(f, " {}", self.kernel.tasks[task.get()].attr.name)?;
        }
        Ok(())
    }
}

impl<Traits: Port, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>
    Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    #[inline]
    fn expect_semaphore_id(&self, sem: SemaphoreId) -> Result<(), BadIdError> {
        if sem.get() < NUM_SEMAPHORES {
            Ok(())
        } else {
            Err(BadIdError::Id)
        }
    }

    /// Take a token from `sem`, blocking the calling task if there is none
    /// (`WaitSemaphore`).
    ///
    /// A blocked task is appended to the semaphore's FIFO wait queue and is
    /// switched out when this call returns. It stays in the Waiting state
    /// until a matching [`post_semaphore`](Self::post_semaphore).
    ///
    /// Only tasks with `max_activate_count == 1` may call this; other tasks
    /// get `Access`.
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn wait_semaphore(&mut self, sem: SemaphoreId) -> Result<(), WaitSemaphoreError> {
        self.with_kernel_lock(|k| {
            let result = k.wait_semaphore_inner(sem);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::WaitSemaphore, e).with_semaphore(sem));
            }
            result
        })
    }

    fn wait_semaphore_inner(&mut self, sem: SemaphoreId) -> Result<(), WaitSemaphoreError> {
        let running_task = self.state.expect_task_context()?;
        self.expect_semaphore_id(sem)?;

        if self.tasks[running_task.get()].attr.max_activate_count != 1 {
            // A queued activation would have nowhere to resume from
            return Err(AccessError::Access.into());
        }

        let semaphore_cb = &mut self.semaphores[sem.get()];
        if semaphore_cb.token == 0 {
            semaphore_cb.enqueue(running_task);
            log::trace!("{running_task:?} blocks on {sem:?}");
            self.block_running_task(running_task);
        } else {
            semaphore_cb.token -= 1;
        }

        Ok(())
    }

    /// Give a token to `sem` (`PostSemaphore`).
    ///
    /// If a task is waiting, the oldest waiter is released instead, regardless
    /// of its priority, and the token count doesn't change.
    ///
    /// # Panics
    ///
    /// Panics if the token count would exceed [`SemaphoreValue::MAX`].
    #[cfg_attr(not(feature = "inline_syscall"), inline(never))]
    pub fn post_semaphore(&mut self, sem: SemaphoreId) -> Result<(), PostSemaphoreError> {
        self.with_kernel_lock(|k| {
            let result = k.post_semaphore_inner(sem);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::PostSemaphore, e).with_semaphore(sem));
            }
            result
        })
    }

    fn post_semaphore_inner(&mut self, sem: SemaphoreId) -> Result<(), PostSemaphoreError> {
        self.expect_semaphore_id(sem)?;

        let semaphore_cb = &mut self.semaphores[sem.get()];
        if let Some(task) = semaphore_cb.dequeue() {
            log::trace!("{sem:?} releases {task:?}");
            self.release(task);
        } else {
            assert!(
                semaphore_cb.token < SemaphoreValue::MAX,
                "semaphore token overflow"
            );
            semaphore_cb.token += 1;
        }

        Ok(())
    }

    /// Get the token count of `sem`.
    pub fn semaphore_value(
        &mut self,
        sem: SemaphoreId,
    ) -> Result<SemaphoreValue, GetSemaphoreError> {
        self.with_kernel_lock(|k| {
            let result: Result<SemaphoreValue, GetSemaphoreError> = k
                .expect_semaphore_id(sem)
                .map(|()| k.semaphores[sem.get()].token)
                .map_err(Into::into);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::GetSemaphore, e).with_semaphore(sem));
            }
            result
        })
    }

    /// Get a printable summary of `sem` listing its waiting tasks by name.
    ///
    /// # Examples
    ///
    /// A semaphore with two tokens and no waiters is shown as `(2)[empty]`.
    pub fn dump_semaphore(
        &mut self,
        sem: SemaphoreId,
    ) -> Result<SemaphoreDump<'_, Traits, NUM_TASKS, NUM_SEMAPHORES>, GetSemaphoreError> {
        self.with_kernel_lock(|k| {
            let result: Result<(), GetSemaphoreError> =
                k.expect_semaphore_id(sem).map_err(Into::into);

            if let Err(e) = result {
                k.report(ErrorInfo::new(ServiceId::GetSemaphore, e).with_semaphore(sem));
            }
            result
        })?;

        Ok(SemaphoreDump {
            kernel: self,
            semaphore_cb: &self.semaphores[sem.get()],
        })
    }
}
