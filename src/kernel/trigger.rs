use crate::kernel::entity::Entity;
use crate::kernel::process::ProcState;
use crate::kernel::scheduler::with_kernel;
use crate::kernel::scheduler::Sig;
use crate::list::Chain;
use crate::ProcessId;
use crate::Result;
use crate::SimError;
use std::sync::Mutex;

/// FIFO set of entities awaiting a trigger. Entities are removed as
/// they are triggered; triggering an empty queue is a non-event, not
/// a fault.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    members: Mutex<Chain<ProcessId>>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity; an entity sits in the queue at most once.
    pub fn insert(&self, entity: &Entity) -> Result<()> {
        let pid = entity.id();
        if self.lock().push_back(pid) {
            Ok(())
        } else {
            Err(SimError::state(
                "entity already queued for a trigger",
                Some(pid),
                crate::kernel::scheduler::Scheduler::now(),
            ))
        }
    }

    /// Trigger the head entity. `QueueEmpty` when there is nobody to
    /// trigger.
    pub fn trigger_first(&self) -> Result<ProcessId> {
        loop {
            let Some(pid) = self.lock().pop_front() else {
                return Err(SimError::QueueEmpty);
            };
            if fire(pid)? {
                return Ok(pid);
            }
        }
    }

    /// Trigger a snapshot of the whole queue, in insertion order and
    /// all at the current instant.
    pub fn trigger_all(&self) -> Result<usize> {
        let snapshot = {
            let mut members = self.lock();
            let all = members.iter().collect::<Vec<_>>();
            members.clear();
            all
        };
        let mut fired = 0;
        for pid in snapshot {
            if fire(pid)? {
                fired += 1;
            }
        }
        Ok(fired)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Chain<ProcessId>> {
        self.members.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Deliver one trigger; a member retired since insertion is skipped.
fn fire(pid: ProcessId) -> Result<bool> {
    with_kernel(|kernel| {
        if kernel.state_of(pid)? == ProcState::Terminated {
            log::warn!("skipping retired process {pid} in trigger queue");
            return Ok(false);
        }
        kernel.signal(pid, Sig::Trigger)?;
        Ok(true)
    })
}
