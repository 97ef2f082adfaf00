//! An extended task waiting for events set by interrupt handlers.
use osek_kernel::{Action, Cfg, EventMask, TaskAttr, TaskId, TaskState};
use osek_port_std::{init_logger, Simulation, StdKernel};
use std::sync::atomic::{AtomicU32, Ordering};

const RX: EventMask = 1 << 0;
const TX: EventMask = 1 << 1;
const SERVER: TaskId = TaskId::new(0);

static HANDLED: AtomicU32 = AtomicU32::new(0);

/// Waits for `RX` or `TX` and records what it handled.
fn server(k: &mut StdKernel<2, 0>) {
    let events = k.get_event(SERVER).unwrap();
    if events != 0 {
        HANDLED.fetch_or(events, Ordering::Relaxed);
        k.clear_event(events).unwrap();
    }
    k.wait_event(RX | TX).unwrap();
}

fn idle(k: &mut StdKernel<2, 0>) {
    k.terminate_task().unwrap();
}

#[test]
fn interrupt_releases_waiting_task() {
    init_logger();

    let mut sim = Simulation::new(
        Cfg {
            tasks: [
                TaskAttr::new("server", 2).extended().autostart(),
                TaskAttr::new("idle", 1).autostart(),
            ],
            semaphores: [],
        },
        [server, idle],
    )
    .unwrap();
    sim.start();
    crate::run_to_idle(&mut sim);
    assert_eq!(
        sim.kernel_mut().get_task_state(SERVER),
        Ok(TaskState::Waiting)
    );

    const ON_RX: [Action; 1] = [Action::SetEvent {
        task: SERVER,
        mask: RX,
    }];
    sim.interrupt(|k| k.dispatch_actions(&ON_RX));
    assert_eq!(sim.kernel().get_task_id(), Some(SERVER));
    crate::run_to_idle(&mut sim);
    assert_eq!(HANDLED.load(Ordering::Relaxed), RX);

    sim.interrupt(|k| k.set_event(SERVER, TX).unwrap());
    crate::run_to_idle(&mut sim);
    assert_eq!(HANDLED.load(Ordering::Relaxed), RX | TX);
    assert!(sim.kernel().port().errors().is_empty());
}
