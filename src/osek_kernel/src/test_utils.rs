//! A recording port for the kernel's unit tests
use std::cell::{Cell, RefCell};

use crate::{
    Cfg, ErrorInfo, Kernel, KernelHooks, PortThreading, SemaphoreAttr, TaskAttr, TaskId, TraceEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PortEvent {
    EnterCpuLock,
    LeaveCpuLock,
    Switch(Option<TaskId>, Option<TaskId>),
    Error(ErrorInfo),
    Trace(TraceEvent),
}

#[derive(Debug, Default)]
pub(crate) struct MockPort {
    cpu_lock: Cell<bool>,
    events: RefCell<Vec<PortEvent>>,
}

impl MockPort {
    pub(crate) fn is_cpu_lock_active(&self) -> bool {
        self.cpu_lock.get()
    }

    pub(crate) fn events(&self) -> Vec<PortEvent> {
        self.events.borrow().clone()
    }

    pub(crate) fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    pub(crate) fn errors(&self) -> Vec<ErrorInfo> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                PortEvent::Error(info) => Some(info),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn switches(&self) -> Vec<(Option<TaskId>, Option<TaskId>)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                PortEvent::Switch(prev, next) => Some((prev, next)),
                _ => None,
            })
            .collect()
    }

    #[allow(dead_code)] // only used with `kernel_monitoring`
    pub(crate) fn traces(&self) -> Vec<TraceEvent> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                PortEvent::Trace(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: PortEvent) {
        log::trace!("{event:?}");
        self.events.borrow_mut().push(event);
    }
}

unsafe impl PortThreading for MockPort {
    unsafe fn enter_cpu_lock(&self) {
        assert!(!self.cpu_lock.replace(true), "CPU Lock is already active");
        self.push(PortEvent::EnterCpuLock);
    }

    unsafe fn leave_cpu_lock(&self) {
        assert!(self.cpu_lock.replace(false), "CPU Lock is not active");
        self.push(PortEvent::LeaveCpuLock);
    }

    unsafe fn switch_context(&self, prev: Option<TaskId>, next: Option<TaskId>) {
        assert!(self.cpu_lock.get(), "context switch outside CPU Lock");
        self.push(PortEvent::Switch(prev, next));
    }
}

impl KernelHooks for MockPort {
    fn error_hook(&self, info: &ErrorInfo) {
        self.push(PortEvent::Error(*info));
    }

    fn trace(&self, event: TraceEvent) {
        self.push(PortEvent::Trace(event));
    }
}

/// Construct a kernel that hasn't been started yet.
pub(crate) fn kernel<const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>(
    tasks: [TaskAttr; NUM_TASKS],
    semaphores: [SemaphoreAttr; NUM_SEMAPHORES],
) -> Kernel<MockPort, NUM_TASKS, NUM_SEMAPHORES> {
    let _ = env_logger::try_init();
    Kernel::new(MockPort::default(), Cfg { tasks, semaphores }).unwrap()
}

/// Construct and start a kernel.
pub(crate) fn started_kernel<const NUM_TASKS: usize, const NUM_SEMAPHORES: usize>(
    tasks: [TaskAttr; NUM_TASKS],
    semaphores: [SemaphoreAttr; NUM_SEMAPHORES],
) -> Kernel<MockPort, NUM_TASKS, NUM_SEMAPHORES> {
    let mut k = kernel(tasks, semaphores);
    k.start();
    k
}
