//! Simulation environment for running `osek_kernel` on a hosted environment.
//!
//! [`StdPort`] implements the port traits by recording what the kernel asks
//! of it: CPU Lock transitions, context switches, error reports and
//! instrumentation markers. Everything recorded is also logged through the
//! `log` facade.
//!
//! [`Simulation`] drives a kernel by repeatedly running one *step* of the
//! task that currently owns the processor. A step is a plain function that
//! calls kernel services on behalf of the task, and should end with a service
//! that gives up the processor (`terminate_task`, `wait_semaphore`, ...) or
//! otherwise the same task runs again on the next step.
#![deny(unsafe_op_in_unsafe_fn)]
use osek_kernel::{
    Cfg, CfgError, ErrorInfo, Kernel, KernelHooks, PortThreading, TaskId, TraceEvent,
};
use spin::Mutex as SpinMutex;

/// Used by tests and applications to set up logging
#[doc(hidden)]
pub extern crate env_logger;

/// A kernel running on [`StdPort`].
pub type StdKernel<const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> =
    Kernel<StdPort, NUM_TASKS, NUM_SEMAPHORES>;

/// Initialize `env_logger`. Does nothing if a logger is already installed.
pub fn init_logger() {
    let _ = env_logger::try_init();
}

/// A context switch performed by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    pub prev: Option<TaskId>,
    pub next: Option<TaskId>,
}

/// The port implementation.
#[derive(Debug)]
pub struct StdPort {
    /// Accessed by the kernel and by the test code on the same thread, so
    /// `SpinMutex` is sufficient (no real mutexes are necessary).
    state: SpinMutex<PortState>,
}

#[derive(Debug)]
struct PortState {
    cpu_lock: bool,
    /// The context the processor was last switched to.
    running_task: Option<TaskId>,
    switches: Vec<Switch>,
    errors: Vec<ErrorInfo>,
    traces: Vec<TraceEvent>,
}

impl Default for StdPort {
    fn default() -> Self {
        Self::new()
    }
}

impl StdPort {
    pub const fn new() -> Self {
        Self {
            state: SpinMutex::new(PortState {
                cpu_lock: false,
                running_task: None,
                switches: Vec::new(),
                errors: Vec::new(),
                traces: Vec::new(),
            }),
        }
    }

    pub fn is_cpu_lock_active(&self) -> bool {
        self.state.lock().cpu_lock
    }

    /// Get the context the processor was last switched to.
    pub fn running_task(&self) -> Option<TaskId> {
        self.state.lock().running_task
    }

    /// Get the context switches performed so far.
    pub fn switches(&self) -> Vec<Switch> {
        self.state.lock().switches.clone()
    }

    /// Get the errors reported so far.
    pub fn errors(&self) -> Vec<ErrorInfo> {
        self.state.lock().errors.clone()
    }

    /// Get the instrumentation markers received so far.
    pub fn traces(&self) -> Vec<TraceEvent> {
        self.state.lock().traces.clone()
    }

    /// Forget the recorded switches, errors, and markers.
    pub fn clear_records(&self) {
        let mut state = self.state.lock();
        state.switches.clear();
        state.errors.clear();
        state.traces.clear();
    }
}

unsafe impl PortThreading for StdPort {
    unsafe fn enter_cpu_lock(&self) {
        log::trace!("enter_cpu_lock");
        let mut state = self.state.lock();
        assert!(!state.cpu_lock, "CPU Lock is already active");
        state.cpu_lock = true;
    }

    unsafe fn leave_cpu_lock(&self) {
        log::trace!("leave_cpu_lock");
        let mut state = self.state.lock();
        assert!(state.cpu_lock, "CPU Lock is not active");
        state.cpu_lock = false;
    }

    unsafe fn switch_context(&self, prev: Option<TaskId>, next: Option<TaskId>) {
        let mut state = self.state.lock();
        assert!(state.cpu_lock, "context switch outside CPU Lock");
        assert_eq!(state.running_task, prev, "the kernel and the port disagree");

        match next {
            Some(task) => log::debug!("{task} is now running"),
            None => log::debug!("idle"),
        }

        state.running_task = next;
        state.switches.push(Switch { prev, next });
    }
}

impl KernelHooks for StdPort {
    fn error_hook(&self, info: &ErrorInfo) {
        log::warn!("{:?} returned {:?}", info.service, info.status);
        self.state.lock().errors.push(*info);
    }

    fn trace(&self, event: TraceEvent) {
        log::trace!("{event:?}");
        self.state.lock().traces.push(event);
    }
}

/// One step of a simulated task.
pub type TaskBody<const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> =
    fn(&mut StdKernel<NUM_TASKS, NUM_SEMAPHORES>);

/// The result of [`Simulation::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No task owns the processor.
    Idle,
    /// The step limit was reached while a task was still running.
    StepLimit,
}

/// A kernel together with the code of its tasks.
pub struct Simulation<const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> {
    kernel: StdKernel<NUM_TASKS, NUM_SEMAPHORES>,
    bodies: [TaskBody<NUM_TASKS, NUM_SEMAPHORES>; NUM_TASKS],
}

impl<const NUM_TASKS: usize, const NUM_SEMAPHORES: usize> Simulation<NUM_TASKS, NUM_SEMAPHORES> {
    /// Construct a simulation. `bodies[i]` is the step function of the task
    /// configured by `cfg.tasks[i]`.
    pub fn new(
        cfg: Cfg<NUM_TASKS, NUM_SEMAPHORES>,
        bodies: [TaskBody<NUM_TASKS, NUM_SEMAPHORES>; NUM_TASKS],
    ) -> Result<Self, CfgError> {
        Ok(Self {
            kernel: Kernel::new(StdPort::new(), cfg)?,
            bodies,
        })
    }

    pub fn kernel(&self) -> &StdKernel<NUM_TASKS, NUM_SEMAPHORES> {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut StdKernel<NUM_TASKS, NUM_SEMAPHORES> {
        &mut self.kernel
    }

    /// Start the kernel.
    pub fn start(&mut self) {
        self.kernel.start();
    }

    /// Run one step of the running task. Returns `false` if the processor is
    /// idle.
    pub fn step(&mut self) -> bool {
        let Some(task) = self.kernel.get_task_id() else {
            return false;
        };
        log::trace!("running a step of {task}");
        (self.bodies[task.get()])(&mut self.kernel);
        true
    }

    /// Run steps until the processor becomes idle or `max_steps` steps have
    /// run.
    pub fn run(&mut self, max_steps: usize) -> RunOutcome {
        for _ in 0..max_steps {
            if !self.step() {
                return RunOutcome::Idle;
            }
        }

        if self.kernel.get_task_id().is_none() {
            RunOutcome::Idle
        } else {
            log::debug!("step limit reached");
            RunOutcome::StepLimit
        }
    }

    /// Run `handler` as an interrupt handler. A context switch requested by
    /// the handler takes effect when it returns.
    pub fn interrupt<R>(
        &mut self,
        handler: impl FnOnce(&mut StdKernel<NUM_TASKS, NUM_SEMAPHORES>) -> R,
    ) -> R {
        log::trace!("interrupt enter");
        let ret = self.kernel.isr(handler);
        log::trace!("interrupt exit");
        ret
    }
}
