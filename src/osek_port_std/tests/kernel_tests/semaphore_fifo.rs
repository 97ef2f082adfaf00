//! Counting semaphores: token accounting and FIFO wake-ups.
use osek_kernel::{Cfg, SemaphoreAttr, SemaphoreId, TaskAttr, TaskId, TaskState};
use osek_port_std::{init_logger, Simulation, StdKernel, StdPort};
use quickcheck_macros::quickcheck;
use std::sync::atomic::{AtomicUsize, Ordering};

const SEM: SemaphoreId = SemaphoreId::new(0);

/// A waits on an empty semaphore, B posts it, A runs and waits again.
#[test]
fn wait_post_wait() {
    init_logger();

    static B_STEPS: AtomicUsize = AtomicUsize::new(0);

    fn task_a(k: &mut StdKernel<2, 1>) {
        k.wait_semaphore(SEM).unwrap();
    }

    fn task_b(k: &mut StdKernel<2, 1>) {
        if B_STEPS.fetch_add(1, Ordering::Relaxed) == 0 {
            assert_eq!(k.post_semaphore(SEM), Ok(()));
        } else {
            k.terminate_task().unwrap();
        }
    }

    let mut sim = Simulation::new(
        Cfg {
            tasks: [
                TaskAttr::new("A", 2).autostart(),
                TaskAttr::new("B", 1).autostart(),
            ],
            semaphores: [SemaphoreAttr::new(0)],
        },
        [task_a, task_b],
    )
    .unwrap();
    sim.start();

    // A blocks
    assert!(sim.step());
    let k = sim.kernel_mut();
    assert_eq!(k.get_task_state(TaskId::new(0)), Ok(TaskState::Waiting));
    assert_eq!(k.get_task_id(), Some(TaskId::new(1)));

    // B posts; A is released and preempts B
    assert!(sim.step());
    let k = sim.kernel_mut();
    assert_eq!(k.semaphore_value(SEM), Ok(0));
    assert_eq!(k.get_task_id(), Some(TaskId::new(0)));
    assert_eq!(k.get_task_state(TaskId::new(1)), Ok(TaskState::Ready));

    // A waits again, B terminates
    crate::run_to_idle(&mut sim);

    let k = sim.kernel_mut();
    assert_eq!(k.semaphore_value(SEM), Ok(0));
    assert_eq!(k.get_task_state(TaskId::new(0)), Ok(TaskState::Waiting));
    assert_eq!(k.dump_semaphore(SEM).unwrap().to_string(), "(0)[1] A");
    assert!(k.port().errors().is_empty());
}

const NUM_WAITERS: usize = 8;
const POSTER: TaskId = TaskId::new(NUM_WAITERS);

/// `waiters` equal-priority tasks wait in turn on a semaphore holding
/// `tokens` tokens. Then a lower-priority task posts once per blocked task.
#[quickcheck]
fn waits_consume_tokens_then_block_in_order(tokens: u8, waiters: u8) {
    init_logger();

    let tokens = usize::from(tokens % 6);
    let waiters = usize::from(waiters) % (NUM_WAITERS + 1);
    log::debug!("tokens = {tokens}, waiters = {waiters}");

    let mut tasks = [TaskAttr::new("waiter", 1); NUM_WAITERS + 1];
    for attr in &mut tasks[..waiters] {
        *attr = attr.autostart();
    }
    tasks[POSTER.get()] = TaskAttr::new("poster", 0).autostart();

    let mut k: StdKernel<{ NUM_WAITERS + 1 }, 1> = StdKernel::new(
        StdPort::new(),
        Cfg {
            tasks,
            semaphores: [SemaphoreAttr::new(tokens as u32)],
        },
    )
    .unwrap();
    k.start();

    let mut blocked = Vec::new();
    for i in 0..waiters {
        let task = TaskId::new(i);
        assert_eq!(k.get_task_id(), Some(task));
        k.wait_semaphore(SEM).unwrap();

        if i < tokens {
            // Took a token and keeps running
            assert_eq!(k.get_task_id(), Some(task));
            k.terminate_task().unwrap();
        } else {
            assert_eq!(k.get_task_state(task), Ok(TaskState::Waiting));
            blocked.push(task);
        }
    }

    assert_eq!(
        k.semaphore_value(SEM),
        Ok(tokens.saturating_sub(waiters) as u32)
    );
    assert_eq!(blocked.len(), waiters.saturating_sub(tokens));

    // Each post releases exactly the oldest waiter
    assert_eq!(k.get_task_id(), Some(POSTER));
    for &task in &blocked {
        k.post_semaphore(SEM).unwrap();
        assert_eq!(k.get_task_id(), Some(task));
        assert_eq!(k.semaphore_value(SEM), Ok(0));
        k.terminate_task().unwrap();
        assert_eq!(k.get_task_id(), Some(POSTER));
    }

    // Nobody is left; a post stores a token
    let before = k.semaphore_value(SEM).unwrap();
    k.post_semaphore(SEM).unwrap();
    assert_eq!(k.semaphore_value(SEM), Ok(before + 1));
    assert!(k.port().errors().is_empty());
}

/// Waiters are released in arrival order even if a later one is more urgent.
#[test]
fn wake_up_order_ignores_priority() {
    init_logger();

    let mut k = StdKernel::new(
        StdPort::new(),
        Cfg {
            tasks: [
                TaskAttr::new("first", 1).autostart(),
                TaskAttr::new("second", 5),
                TaskAttr::new("poster", 0).autostart(),
            ],
            semaphores: [SemaphoreAttr::new(0)],
        },
    )
    .unwrap();
    k.start();

    k.wait_semaphore(SEM).unwrap();
    assert_eq!(k.get_task_id(), Some(TaskId::new(2)));
    k.activate_task(TaskId::new(1)).unwrap();
    k.wait_semaphore(SEM).unwrap();
    assert_eq!(
        k.dump_semaphore(SEM).unwrap().to_string(),
        "(0)[2] first second"
    );

    k.post_semaphore(SEM).unwrap();
    assert_eq!(k.get_task_id(), Some(TaskId::new(0)));
    assert_eq!(k.get_task_state(TaskId::new(1)), Ok(TaskState::Waiting));
}
