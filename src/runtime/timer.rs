use super::listeners::Subscription;
use crate::clock::duration_ms;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

type Tick = Arc<dyn Fn() + Send + Sync>;

struct Interval {
    period_ms: i64,
    next_due: i64,
    tick: Tick,
}

#[derive(Default)]
struct TimerTable {
    next_id: usize,
    intervals: BTreeMap<usize, Interval>,
}

/// Interval timers of one context, fired cooperatively by
/// [`Context::run_pending`](super::Context::run_pending).
pub(crate) struct Timers {
    table: Arc<Mutex<TimerTable>>,
}

impl Timers {
    pub(crate) fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(TimerTable::default())),
        }
    }

    pub(crate) fn set_interval<F>(&self, now: i64, period: Duration, tick: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let period_ms = duration_ms(period).max(1);
        let id = {
            let mut table = self.table.lock();
            let id = table.next_id;
            table.next_id += 1;
            table.intervals.insert(
                id,
                Interval {
                    period_ms,
                    next_due: now.saturating_add(period_ms),
                    tick: Arc::new(tick),
                },
            );
            id
        };

        let table = Arc::downgrade(&self.table);
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.lock().intervals.remove(&id);
            }
        })
    }

    /// Fire every interval whose deadline has passed. Each fires at most
    /// once per call, however many periods were missed, and is then
    /// rescheduled one period after `now`.
    pub(crate) fn fire_due(&self, now: i64) -> usize {
        let due: Vec<(usize, Tick)> = {
            let mut table = self.table.lock();
            table
                .intervals
                .iter_mut()
                .filter(|(_, interval)| interval.next_due <= now)
                .map(|(id, interval)| {
                    interval.next_due = now.saturating_add(interval.period_ms);
                    (*id, Arc::clone(&interval.tick))
                })
                .collect()
        };

        let mut fired = 0;
        for (id, tick) in due {
            if !self.table.lock().intervals.contains_key(&id) {
                continue;
            }
            tick();
            fired += 1;
        }
        fired
    }

    pub(crate) fn next_deadline(&self) -> Option<i64> {
        self.table
            .lock()
            .intervals
            .values()
            .map(|interval| interval.next_due)
            .min()
    }

    pub(crate) fn len(&self) -> usize {
        self.table.lock().intervals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_once_per_due_check() {
        let timers = Timers::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let _guard = timers.set_interval(0, Duration::from_millis(100), {
            let ticks = ticks.clone();
            move || {
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(timers.next_deadline(), Some(100));
        assert_eq!(timers.fire_due(99), 0);
        assert_eq!(timers.fire_due(100), 1);
        assert_eq!(timers.next_deadline(), Some(200));

        // Several missed periods still only fire once.
        assert_eq!(timers.fire_due(1_000), 1);
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(timers.next_deadline(), Some(1_100));
    }

    #[test]
    fn dropped_guard_stops_timer() {
        let timers = Timers::new();
        let guard = timers.set_interval(0, Duration::from_millis(10), || {});
        assert_eq!(timers.len(), 1);
        drop(guard);
        assert_eq!(timers.len(), 0);
        assert_eq!(timers.fire_due(1_000), 0);
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn zero_period_is_clamped() {
        let timers = Timers::new();
        let _guard = timers.set_interval(5, Duration::ZERO, || {});
        assert_eq!(timers.next_deadline(), Some(6));
    }
}
