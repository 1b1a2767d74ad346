use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct ScheduledTimer<T> {
    due_ms: f64,
    payload: T,
}

/// Single-threaded one-shot scheduler advanced by frame time.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    next_id: u64,
    scheduled: BTreeMap<TimerId, ScheduledTimer<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            scheduled: BTreeMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.scheduled.insert(
            id,
            ScheduledTimer {
                due_ms: now_ms + delay_ms.max(0.0),
                payload,
            },
        );
        id
    }

    /// Returns `false` if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.scheduled.remove(&id).is_some()
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.scheduled.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Removes and returns every timer due at or before `now_ms`, earliest first.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<(TimerId, T)> {
        let due_ids = self
            .scheduled
            .iter()
            .filter(|(_, timer)| timer.due_ms <= now_ms)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();

        let mut fired = due_ids
            .into_iter()
            .filter_map(|id| self.scheduled.remove(&id).map(|timer| (id, timer)))
            .collect::<Vec<_>>();
        fired.sort_by(|(a_id, a), (b_id, b)| a.due_ms.total_cmp(&b.due_ms).then(a_id.cmp(b_id)));
        fired
            .into_iter()
            .map(|(id, timer)| (id, timer.payload))
            .collect()
    }
}
