//! Task ready queue implementation (internal use only).
use core::fmt;

use crate::{
    task::{TaskId, TaskPriority},
    utils::{Init, OneLevelPrioBitmap, PrioBitmap},
    NUM_TASK_PRIORITY_LEVELS,
};

/// The result type of [`BitmapQueue::pop_front_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision<T> {
    /// The kernel should not perform context switch and should continue to
    /// schedule the current task.
    Keep,
    /// The kernel should perform context switch to the specified task.
    /// `SwitchTo(None)` switches to the idle context.
    SwitchTo(Option<T>),
}

#[derive(Debug, Clone, Copy)]
struct ListHead {
    first: Option<TaskId>,
    last: Option<TaskId>,
}

impl Init for ListHead {
    const INIT: Self = Self {
        first: None,
        last: None,
    };
}

/// The ready queue implementation that uses a set of FIFO queues segregated by
/// the priorities of contained tasks. The queues are singly-linked lists
/// threaded through `next`, so the total memory is bounded by the task count.
pub(crate) struct BitmapQueue<const NUM_TASKS: usize> {
    /// The set of segregated task ready queues, in which each queue stores
    /// the list of Ready tasks at the corresponding priority.
    ///
    /// Invariant: `queues[i].first.is_some() == bitmap.get(i)`
    queues: [ListHead; NUM_TASK_PRIORITY_LEVELS],

    /// The successor of each task in its ready queue.
    next: [Option<TaskId>; NUM_TASKS],

    /// Whether each task is currently linked to one of `queues`.
    linked: [bool; NUM_TASKS],

    /// The task ready bitmap, in which each bit indicates whether the
    /// segregated queue corresponding to that bit contains a task or not.
    bitmap: OneLevelPrioBitmap<NUM_TASK_PRIORITY_LEVELS>,
}

impl<const NUM_TASKS: usize> Init for BitmapQueue<NUM_TASKS> {
    const INIT: Self = Self {
        queues: [ListHead::INIT; NUM_TASK_PRIORITY_LEVELS],
        next: [None; NUM_TASKS],
        linked: [false; NUM_TASKS],
        bitmap: Init::INIT,
    };
}

impl<const NUM_TASKS: usize> BitmapQueue<NUM_TASKS> {
    /// Get the highest priority among the Ready tasks.
    #[inline]
    pub(crate) fn highest_priority(&self) -> Option<TaskPriority> {
        self.bitmap.find_set().map(|pri| pri as TaskPriority)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, task: TaskId) -> bool {
        self.linked[task.get()]
    }

    /// Insert the specified task `task` to the back of the queue for
    /// `priority`, i.e., after all Ready tasks having the same priority.
    ///
    /// Panics if `task` is already included in the queue.
    pub(crate) fn push_back_task(&mut self, task: TaskId, priority: TaskPriority) {
        self.link(task);
        let head = &mut self.queues[usize::from(priority)];
        match head.last {
            Some(last) => self.next[last.get()] = Some(task),
            None => head.first = Some(task),
        }
        head.last = Some(task);

        self.bitmap.set(usize::from(priority));
    }

    /// Insert the specified task `task` to the front of the queue for
    /// `priority`. Used for a preempted task, which was made Ready before any
    /// of the tasks queued at the same priority.
    ///
    /// Panics if `task` is already included in the queue.
    pub(crate) fn push_front_task(&mut self, task: TaskId, priority: TaskPriority) {
        self.link(task);
        let head = &mut self.queues[usize::from(priority)];
        self.next[task.get()] = head.first;
        if head.last.is_none() {
            head.last = Some(task);
        }
        head.first = Some(task);

        self.bitmap.set(usize::from(priority));
    }

    fn link(&mut self, task: TaskId) {
        assert!(
            !core::mem::replace(&mut self.linked[task.get()], true),
            "{task:?} is already in the ready queue"
        );
        self.next[task.get()] = None;
    }

    /// Choose the next task to schedule based on `prev_task_priority`, the
    /// priority of the task currently owning the processor, or `None` if no
    /// task can keep running (the processor is idle or the running task has
    /// just left the Running state).
    ///
    /// If this method returns `SwitchTo(Some(task))`, `task` is removed from
    /// the queue.
    ///
    /// | `prev_task_priority` | highest Ready priority `p` |        Returns      |
    /// | -------------------- | -------------------------- | ------------------- |
    /// |        `None`        |           none             |  `SwitchTo(None)`   |
    /// |        `None`        |           any              | `SwitchTo(Some(_))` |
    /// |      `Some(q)`       |      none, or `p <= q`     |       `Keep`        |
    /// |      `Some(q)`       |          `p > q`           | `SwitchTo(Some(_))` |
    ///
    /// Among the tasks having the highest priority, the one made Ready first
    /// is chosen.
    pub(crate) fn pop_front_task(
        &mut self,
        prev_task_priority: Option<TaskPriority>,
    ) -> ScheduleDecision<TaskId> {
        let next_task_priority = self.highest_priority();

        match (prev_task_priority, next_task_priority) {
            (Some(_), None) => ScheduleDecision::Keep,
            (Some(prev), Some(next)) if next <= prev => ScheduleDecision::Keep,
            (None, None) => ScheduleDecision::SwitchTo(None),
            (_, Some(next)) => {
                let task = self.pop_front_at(next);
                // There must be at least one element, because the bitmap
                // indicated so
                debug_assert!(task.is_some());
                ScheduleDecision::SwitchTo(task)
            }
        }
    }

    fn pop_front_at(&mut self, priority: TaskPriority) -> Option<TaskId> {
        let head = &mut self.queues[usize::from(priority)];
        let task = head.first?;

        head.first = self.next[task.get()].take();
        if head.first.is_none() {
            head.last = None;
            // Update `bitmap` accordingly
            self.bitmap.clear(usize::from(priority));
        }
        self.linked[task.get()] = false;

        Some(task)
    }

    /// Iterate over the Ready tasks at `priority` in scheduling order.
    pub(crate) fn iter_priority(
        &self,
        priority: TaskPriority,
    ) -> impl Iterator<Item = TaskId> + '_ {
        let mut cursor = self.queues[usize::from(priority)].first;
        core::iter::from_fn(move || {
            let task = cursor?;
            cursor = self.next[task.get()];
            Some(task)
        })
    }
}

impl<const NUM_TASKS: usize> fmt::Debug for BitmapQueue<NUM_TASKS> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        struct DebugFn<F>(F);
        impl<F: Fn(&mut fmt::Formatter) -> fmt::Result> fmt::Debug for DebugFn<F> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                (self.0)(f)
            }
        }

        f.write_str("BitmapQueue ")?;
        f.debug_map()
            .entries(
                (0..NUM_TASK_PRIORITY_LEVELS)
                    .rev()
                    .filter(|&i| self.bitmap.get(i))
                    .map(|i| {
                        (
                            // key = priority
                            i,
                            // value = list of tasks
                            DebugFn(move |f: &mut fmt::Formatter| {
                                f.debug_list()
                                    .entries(self.iter_priority(i as TaskPriority))
                                    .finish()
                            }),
                        )
                    }),
            )
            .finish()
    }
}
