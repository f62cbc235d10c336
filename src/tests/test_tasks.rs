#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::core::clock::SimulatedClock;
    use crate::core::tasks::TaskManager;

    const T0: i64 = 1_000_000;

    fn setup() -> (Arc<SimulatedClock>, TaskManager, Arc<AtomicUsize>) {
        let clock = Arc::new(SimulatedClock::new(T0));
        let manager = TaskManager::new(clock.clone());
        (clock, manager, Arc::new(AtomicUsize::new(0)))
    }

    fn counting_callback(count: &Arc<AtomicUsize>) -> Box<dyn FnMut(&Arc<crate::core::tasks::Task>) + Send> {
        let count = count.clone();
        Box::new(move |_task| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_single_task_runs_on_next_drain() {
        let (_clock, manager, count) = setup();
        manager.add_single_task(counting_callback(&count));

        // not drained yet
        assert_eq!(count.load(Ordering::SeqCst), 0);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_task_count(), 0);

        // completed tasks never run twice
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delayed_task() {
        let (clock, manager, count) = setup();
        manager.add_delayed_task(500, counting_callback(&count));

        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        clock.set_ms(T0 + 499);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        clock.set_ms(T0 + 500);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_task_count(), 0);
    }

    #[test]
    fn test_periodic_task() {
        let (clock, manager, count) = setup();
        manager.add_periodic_task(100, counting_callback(&count));

        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        clock.set_ms(T0 + 100);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        clock.set_ms(T0 + 200);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(manager.has_active_tasks());
    }

    #[test]
    fn test_periodic_stall_collapses_missed_slots() {
        let (clock, manager, count) = setup();
        manager.add_periodic_task(100, counting_callback(&count));

        clock.set_ms(T0 + 100);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // a ten-period stall yields exactly one firing on resumption
        clock.set_ms(T0 + 100 + 1_000);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // and the schedule is advanced past now
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        clock.set_ms(T0 + 100 + 1_100);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_delayed_periodic_task() {
        let (clock, manager, count) = setup();
        manager.add_delayed_periodic_task(50, 100, counting_callback(&count));

        clock.set_ms(T0 + 49);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        clock.set_ms(T0 + 50);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        clock.set_ms(T0 + 150);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_on_date_task() {
        let (clock, manager, count) = setup();
        manager.add_on_date_task(T0 + 5_000, counting_callback(&count));

        clock.set_ms(T0 + 4_999);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        clock.set_ms(T0 + 5_000);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_task_count(), 0);
    }

    #[test]
    fn test_periodic_on_date_task() {
        let (clock, manager, count) = setup();
        manager.add_periodic_on_date_task(T0 + 1_000, 100, counting_callback(&count));

        clock.set_ms(T0 + 999);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        clock.set_ms(T0 + 1_000);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        clock.set_ms(T0 + 1_100);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reschedule_rearms_single_task() {
        let (clock, manager, count) = setup();
        let task = manager.add_single_task(counting_callback(&count)).unwrap();

        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.is_completed());

        // rescheduling clears the completion flag
        task.reschedule_in(100);
        assert!(!task.is_completed());

        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        clock.set_ms(T0 + 100);
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reschedule_from_inside_callback() {
        let (clock, manager, _count) = setup();
        let fired = Arc::new(AtomicUsize::new(0));
        let sink = fired.clone();
        manager.add_single_task(Box::new(move |task| {
            if sink.fetch_add(1, Ordering::SeqCst) == 0 {
                task.reschedule_in(50);
            }
        }));

        manager.process();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        // re-armed by the callback, so the task survived the drain
        assert_eq!(manager.active_task_count(), 1);

        clock.set_ms(T0 + 50);
        manager.process();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(manager.active_task_count(), 0);
    }

    #[test]
    fn test_force_execute() {
        let (_clock, manager, count) = setup();
        manager.add_delayed_task(1_000_000, counting_callback(&count));

        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        manager.force_execute();
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_fires_each_task_once_more() {
        let (_clock, mut manager, count) = setup();
        manager.add_periodic_task(1_000_000, counting_callback(&count));
        manager.add_delayed_task(1_000_000, counting_callback(&count));

        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // shutdown gives every task a final firing so cleanup logic can run
        manager.shutdown();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(manager.active_task_count(), 0);

        // the manager is reusable afterwards
        manager.add_single_task(counting_callback(&count));
        manager.process();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_tasks_pending_until_drain() {
        let (_clock, manager, count) = setup();
        manager.add_periodic_task(100, counting_callback(&count));
        // submitted but not yet drained into the active list
        assert_eq!(manager.active_task_count(), 0);
        manager.process();
        assert_eq!(manager.active_task_count(), 1);
    }
}
