//! Error reporting and instrumentation hooks
use crate::{EventMask, SemaphoreId, StatusType, TaskId};

/// Identifies the kernel service that produced an [`ErrorInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    ActivateTask,
    TerminateTask,
    ChainTask,
    Schedule,
    GetTaskState,
    WaitSemaphore,
    PostSemaphore,
    GetSemaphore,
    SetEvent,
    ClearEvent,
    GetEvent,
    WaitEvent,
}

/// The context of a failed service call, passed to
/// [`KernelHooks::error_hook`].
///
/// Only the parameters the failing service actually takes are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorInfo {
    pub service: ServiceId,
    pub status: StatusType,
    pub task: Option<TaskId>,
    pub semaphore: Option<SemaphoreId>,
    pub mask: Option<EventMask>,
}

impl ErrorInfo {
    pub fn new(service: ServiceId, status: impl Into<StatusType>) -> Self {
        Self {
            service,
            status: status.into(),
            task: None,
            semaphore: None,
            mask: None,
        }
    }

    pub fn with_task(self, task: TaskId) -> Self {
        Self {
            task: Some(task),
            ..self
        }
    }

    pub fn with_semaphore(self, semaphore: SemaphoreId) -> Self {
        Self {
            semaphore: Some(semaphore),
            ..self
        }
    }

    pub fn with_mask(self, mask: EventMask) -> Self {
        Self {
            mask: Some(mask),
            ..self
        }
    }
}

/// Instrumentation markers emitted around action execution when the
/// `kernel_monitoring` feature is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    ActionActivateTaskEnter,
    ActionActivateTaskExit,
    ActionSetEventEnter,
    ActionSetEventExit,
}

/// Collaborator callbacks invoked by the kernel. Both methods have no-op
/// default implementations.
pub trait KernelHooks {
    /// Called with the kernel lock held whenever a service is about to return
    /// a status other than [`StatusType::Ok`].
    fn error_hook(&self, info: &ErrorInfo) {
        let _ = info;
    }

    /// Receives an instrumentation marker. Only called if the
    /// `kernel_monitoring` feature is enabled.
    fn trace(&self, event: TraceEvent) {
        let _ = event;
    }
}
