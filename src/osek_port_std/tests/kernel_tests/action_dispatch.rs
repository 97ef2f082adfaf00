//! Actions run from an interrupt handler.
use osek_kernel::{Action, Cfg, ServiceId, StatusType, TaskAttr, TaskId, TaskState};
use osek_port_std::{init_logger, StdKernel, StdPort};

fn tid(i: usize) -> TaskId {
    TaskId::new(i)
}

fn kernel() -> StdKernel<3, 0> {
    init_logger();
    let mut k = StdKernel::new(
        StdPort::new(),
        Cfg {
            tasks: [
                TaskAttr::new("main", 1).autostart(),
                TaskAttr::new("counted", 2).max_activate_count(2),
                TaskAttr::new("ext", 3).extended(),
            ],
            semaphores: [],
        },
    )
    .unwrap();
    k.start();
    k.port().clear_records();
    k
}

#[test]
fn activation_limit_is_reported_with_task_id() {
    let mut k = kernel();
    let actions = [Action::ActivateTask { task: tid(1) }; 3];

    k.isr(|k| k.dispatch_actions(&actions));

    // Two activations were recorded; the first one is running
    assert_eq!(k.get_task_id(), Some(tid(1)));
    let errors = k.port().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].service, ServiceId::ActivateTask);
    assert_eq!(errors[0].status, StatusType::Limit);
    assert_eq!(errors[0].task, Some(tid(1)));
    assert_eq!(errors[0].mask, None);

    k.terminate_task().unwrap();
    assert_eq!(k.get_task_id(), Some(tid(1)));
    k.terminate_task().unwrap();
    assert_eq!(k.get_task_id(), Some(tid(0)));
}

#[test]
fn set_event_on_suspended_task_is_reported() {
    let mut k = kernel();
    k.dispatch_action(&Action::SetEvent {
        task: tid(2),
        mask: 0b1000,
    });

    let errors = k.port().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].service, ServiceId::SetEvent);
    assert_eq!(errors[0].status, StatusType::State);
    assert_eq!(errors[0].task, Some(tid(2)));
    assert_eq!(errors[0].mask, Some(0b1000));
    assert_eq!(k.get_task_id(), Some(tid(0)));
}

#[test]
fn actions_are_executed_in_order() {
    let mut k = kernel();

    // Setting the event only succeeds because the activation comes first
    k.isr(|k| {
        k.dispatch_actions(&[
            Action::ActivateTask { task: tid(2) },
            Action::SetEvent {
                task: tid(2),
                mask: 1,
            },
        ])
    });
    assert!(k.port().errors().is_empty());
    assert_eq!(k.get_task_id(), Some(tid(2)));
    assert_eq!(k.get_event(tid(2)), Ok(1));

    k.terminate_task().unwrap();
    assert_eq!(k.get_task_state(tid(2)), Ok(TaskState::Suspended));

    // Reversed, `SetEvent` fails
    k.isr(|k| {
        k.dispatch_actions(&[
            Action::SetEvent {
                task: tid(2),
                mask: 1,
            },
            Action::ActivateTask { task: tid(2) },
        ])
    });
    assert_eq!(k.port().errors().len(), 1);
    assert_eq!(k.get_event(tid(2)), Ok(0));
}

#[cfg(feature = "kernel_monitoring")]
#[test]
fn trace_markers() {
    use osek_kernel::TraceEvent;

    let mut k = kernel();
    k.dispatch_actions(&[
        Action::ActivateTask { task: tid(2) },
        Action::SetEvent {
            task: tid(2),
            mask: 1,
        },
    ]);
    assert_eq!(
        k.port().traces(),
        [
            TraceEvent::ActionActivateTaskEnter,
            TraceEvent::ActionActivateTaskExit,
            TraceEvent::ActionSetEventEnter,
            TraceEvent::ActionSetEventExit,
        ]
    );
}
