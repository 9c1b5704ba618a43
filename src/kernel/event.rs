use crate::ProcessId;
use crate::Time;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Total order over activation records: wake time first (total order
/// over f64, NaN never inserted), then the monotonic insertion
/// sequence, so same-time records fire strictly FIFO.
#[derive(Debug, Clone, Copy)]
pub struct EventKey {
    time: Time,
    seq: u64,
}

impl EventKey {
    pub fn time(&self) -> Time {
        self.time
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for EventKey {}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.seq.cmp(&other.seq))
    }
}

/// The pending activations of a run, at most one per process.
/// Inserting for an already-scheduled process replaces its record,
/// which is exactly the re-activation semantics the kernel wants.
#[derive(Debug, Default)]
pub struct EventQueue {
    order: BTreeMap<EventKey, ProcessId>,
    index: HashMap<ProcessId, EventKey>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, process: ProcessId, time: Time, seq: u64) {
        if let Some(old) = self.index.remove(&process) {
            self.order.remove(&old);
        }
        let key = EventKey { time, seq };
        self.order.insert(key, process);
        self.index.insert(process, key);
    }

    pub fn remove(&mut self, process: ProcessId) -> Option<EventKey> {
        let key = self.index.remove(&process)?;
        self.order.remove(&key);
        Some(key)
    }

    pub fn pop_first(&mut self) -> Option<(EventKey, ProcessId)> {
        let (key, process) = self.order.pop_first()?;
        self.index.remove(&process);
        Some((key, process))
    }

    pub fn peek_first(&self) -> Option<(EventKey, ProcessId)> {
        self.order.first_key_value().map(|(k, p)| (*k, *p))
    }

    pub fn contains(&self, process: ProcessId) -> bool {
        self.index.contains_key(&process)
    }

    pub fn scheduled_at(&self, process: ProcessId) -> Option<Time> {
        self.index.get(&process).map(EventKey::time)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
