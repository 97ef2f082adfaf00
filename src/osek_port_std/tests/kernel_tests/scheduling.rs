//! Priority scheduling as observed by the port.
use osek_kernel::{Cfg, TaskAttr, TaskId, TaskState};
use osek_port_std::{init_logger, Simulation, StdKernel, StdPort, Switch};
use std::sync::Mutex;

fn tid(i: usize) -> TaskId {
    TaskId::new(i)
}

/// Tasks with priorities {5, 3, 5, 1} made Ready in that order run in the
/// order 0, 2, 1, 3.
#[test]
fn equal_priorities_run_in_activation_order() {
    init_logger();

    static ORDER: Mutex<Vec<usize>> = Mutex::new(Vec::new());

    fn body(k: &mut StdKernel<5, 0>) {
        let task = k.get_task_id().unwrap();
        if task == TaskId::new(4) {
            // The launcher
            for i in 0..4 {
                k.activate_task(TaskId::new(i)).unwrap();
            }
        } else {
            ORDER.lock().unwrap().push(task.get());
        }
        k.terminate_task().unwrap();
    }

    let mut sim = Simulation::new(
        Cfg {
            tasks: [
                TaskAttr::new("a", 5),
                TaskAttr::new("b", 3),
                TaskAttr::new("c", 5),
                TaskAttr::new("d", 1),
                TaskAttr::new("launcher", 9).autostart(),
            ],
            semaphores: [],
        },
        [body; 5],
    )
    .unwrap();
    sim.start();
    crate::run_to_idle(&mut sim);

    assert_eq!(*ORDER.lock().unwrap(), [0, 2, 1, 3]);
}

/// Wake-ups from an interrupt handler are dispatched when the outermost
/// handler returns.
#[test]
fn preemption_is_deferred_to_interrupt_exit() {
    init_logger();

    let mut sim = Simulation::new(
        Cfg {
            tasks: [
                TaskAttr::new("background", 1).autostart(),
                TaskAttr::new("handler_task", 2),
                TaskAttr::new("urgent", 3),
            ],
            semaphores: [],
        },
        [|_| {}; 3],
    )
    .unwrap();
    sim.start();
    sim.kernel().port().clear_records();

    sim.interrupt(|k| {
        k.activate_task(tid(1)).unwrap();
        k.isr(|k| k.activate_task(tid(2)).unwrap());
        // Nested handler returned, but we're still at interrupt level
        assert_eq!(k.get_task_id(), Some(tid(0)));
        assert!(k.port().switches().is_empty());
    });

    let k = sim.kernel_mut();
    assert_eq!(k.get_task_id(), Some(tid(2)));
    assert_eq!(
        k.port().switches(),
        [Switch {
            prev: Some(tid(0)),
            next: Some(tid(2))
        }]
    );
    assert_eq!(k.get_task_state(tid(0)), Ok(TaskState::Ready));
    assert_eq!(k.get_task_state(tid(1)), Ok(TaskState::Ready));
}

/// A non-preemptable task keeps running until it calls `schedule`.
#[test]
fn non_preemptable_task() {
    init_logger();

    let mut k = StdKernel::new(
        StdPort::new(),
        Cfg {
            tasks: [
                TaskAttr::new("np", 1).non_preemptable().autostart(),
                TaskAttr::new("high", 4),
            ],
            semaphores: [],
        },
    )
    .unwrap();
    k.start();

    k.isr(|k| k.activate_task(tid(1)).unwrap());
    assert_eq!(k.get_task_id(), Some(tid(0)));

    k.schedule().unwrap();
    assert_eq!(k.get_task_id(), Some(tid(1)));
    k.terminate_task().unwrap();
    assert_eq!(k.get_task_id(), Some(tid(0)));
    assert_eq!(k.get_task_state(tid(0)), Ok(TaskState::Running));
}

/// `chain_task` and multiple activations interleave correctly.
#[test]
fn chain_and_queued_activations() {
    init_logger();

    static RUNS: Mutex<Vec<usize>> = Mutex::new(Vec::new());

    fn first(k: &mut StdKernel<2, 0>) {
        RUNS.lock().unwrap().push(0);
        k.chain_task(TaskId::new(1)).unwrap();
    }

    fn second(k: &mut StdKernel<2, 0>) {
        let mut runs = RUNS.lock().unwrap();
        runs.push(1);
        let n = runs.len();
        drop(runs);
        if n < 4 {
            // Queue another activation of ourselves before leaving
            k.activate_task(TaskId::new(1)).unwrap();
        }
        k.terminate_task().unwrap();
    }

    let mut sim = Simulation::new(
        Cfg {
            tasks: [
                TaskAttr::new("first", 2).autostart(),
                TaskAttr::new("second", 1).max_activate_count(2),
            ],
            semaphores: [],
        },
        [first, second],
    )
    .unwrap();
    sim.start();
    crate::run_to_idle(&mut sim);

    assert_eq!(*RUNS.lock().unwrap(), [0, 1, 1, 1]);
    assert!(sim.kernel().port().errors().is_empty());
}
