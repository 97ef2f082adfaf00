//! Static configuration and startup
use crate::{
    error::CfgError,
    klock::KernelLock,
    semaphore::{SemaphoreAttr, SemaphoreCb},
    state::State,
    task::{readyqueue::BitmapQueue, TaskAttr, TaskCb, TaskFlags, TaskId},
    utils::Init,
    Kernel, Port, NUM_TASK_PRIORITY_LEVELS,
};

/// The static configuration of a kernel instance.
///
/// Object identifiers are indices into these arrays: `tasks[i]` is
/// `TaskId::new(i)` and `semaphores[i]` is `SemaphoreId::new(i)`.
#[derive(Debug, Clone, Copy)]
pub struct Cfg<const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> {
    pub tasks: [TaskAttr; NUM_TASKS],
    pub semaphores: [SemaphoreAttr; NUM_SEMAPHORES],
}

impl<const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> Cfg<NUM_TASKS, NUM_SEMAPHORES> {
    fn validate(&self) -> Result<(), CfgError> {
        for (task, attr) in self.tasks.iter().enumerate() {
            if usize::from(attr.priority) >= NUM_TASK_PRIORITY_LEVELS {
                return Err(CfgError::BadPriority { task });
            }
            if attr.max_activate_count == 0 {
                return Err(CfgError::ZeroActivations { task });
            }
            if attr.is_extended() && attr.max_activate_count != 1 {
                return Err(CfgError::ExtendedMultipleActivations { task });
            }
        }
        Ok(())
    }
}

impl<Traits: Port, const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>
    Kernel<Traits, NUM_TASKS, NUM_SEMAPHORES>
{
    /// Construct a kernel instance. All tasks start Suspended; nothing runs
    /// until [`start`](Self::start) is called.
    pub fn new(port: Traits, cfg: Cfg<NUM_TASKS, NUM_SEMAPHORES>) -> Result<Self, CfgError> {
        cfg.validate()?;

        Ok(Self {
            port,
            klock: KernelLock::INIT,
            state: State::INIT,
            tasks: cfg.tasks.map(TaskCb::new),
            ready_queue: BitmapQueue::INIT,
            semaphores: cfg.semaphores.map(SemaphoreCb::new),
        })
    }

    /// Start the kernel (`StartOS`). Activates the tasks marked with
    /// [`TaskFlags::AUTOSTART`] and dispatches the first task.
    ///
    /// # Panics
    ///
    /// Panics if the kernel has already been started.
    pub fn start(&mut self) {
        assert!(!self.state.started, "the kernel is already started");

        self.with_kernel_lock(|k| {
            k.state.started = true;

            for i in 0..NUM_TASKS {
                if k.tasks[i].attr.flags.contains(TaskFlags::AUTOSTART) {
                    // Every task accepts at least one activation
                    let result = k.activate(TaskId::new(i));
                    debug_assert!(result.is_ok());
                }
            }

            log::debug!("kernel started");
            k.state.need_schedule = true;
        });
    }
}
