use crate::kernel::process::current_pid;
use crate::kernel::process::pause;
use crate::kernel::process::ProcState;
use crate::kernel::scheduler::with_kernel;
use crate::list::Chain;
use crate::ProcessId;
use crate::Result;
use crate::SimError;
use std::sync::Mutex;

/// Counting semaphore with strictly FIFO waiters and no spurious
/// wakeups. `free + held` is invariant over the semaphore's life: a
/// release with waiters present hands the releaser's slot straight to
/// the head of the queue, leaving the free count untouched.
#[derive(Debug)]
pub struct Semaphore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    free: usize,
    held: usize,
    waiters: Chain<ProcessId>,
}

impl Semaphore {
    pub fn new(resources: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                free: resources,
                held: 0,
                waiters: Chain::new(),
            }),
        }
    }

    /// Acquire one resource. Returns without suspending while capacity
    /// remains; otherwise the caller joins the FIFO and waits to be
    /// handed a slot by a release.
    pub fn get(&self) -> Result<()> {
        let pid = current_pid()?;
        let acquired = {
            let mut inner = self.lock();
            if inner.free > 0 {
                inner.free -= 1;
                inner.held += 1;
                true
            } else {
                let queued = inner.waiters.push_back(pid);
                debug_assert!(queued, "a suspended process cannot re-enter the queue");
                false
            }
        };
        if acquired {
            return Ok(());
        }
        with_kernel(|kernel| {
            if kernel.running != Some(pid) {
                return Err(SimError::state(
                    "semaphore get outside the running body",
                    Some(pid),
                    kernel.now,
                ));
            }
            kernel.entry(pid)?.state = ProcState::Waiting;
            kernel.running = None;
            Ok(())
        })?;
        pause(pid)
        // woken by a release that already transferred the slot
    }

    /// Release one resource: the head waiter (if any) is activated at
    /// the current instant and inherits the slot; with nobody waiting
    /// the free count grows back. Releasing more than was ever
    /// acquired is a programmer error.
    pub fn release(&self) -> Result<()> {
        loop {
            let next = self.lock().waiters.pop_front();
            match next {
                Some(pid) => {
                    let woke = with_kernel(|kernel| {
                        let now = kernel.now;
                        match kernel.procs.get_mut(&pid) {
                            Some(entry) if entry.state == ProcState::Waiting => {
                                entry.state = ProcState::Scheduled;
                                kernel.schedule(pid, now);
                                Ok(true)
                            }
                            // retired while queued; its slot passes on
                            _ => Ok(false),
                        }
                    })?;
                    if woke {
                        return Ok(());
                    }
                }
                None => {
                    let mut inner = self.lock();
                    if inner.held == 0 {
                        return Err(SimError::state(
                            "release without a matching get",
                            None,
                            crate::kernel::scheduler::Scheduler::now(),
                        ));
                    }
                    inner.held -= 1;
                    inner.free += 1;
                    return Ok(());
                }
            }
        }
    }

    /// Resources currently free.
    pub fn free(&self) -> usize {
        self.lock().free
    }

    /// Resources currently acquired and not yet released.
    pub fn held(&self) -> usize {
        self.lock().held
    }

    /// Processes queued for a resource.
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_without_a_get_is_a_programmer_error() {
        let sem = Semaphore::new(0);
        assert!(matches!(sem.release(), Err(SimError::InvalidState { .. })));
        // capacity alone does not license a release either
        let sem = Semaphore::new(2);
        assert!(matches!(sem.release(), Err(SimError::InvalidState { .. })));
        assert_eq!((sem.free(), sem.held(), sem.waiting()), (2, 0, 0));
    }
}
