use crate::kernel::process::current_pid;
use crate::kernel::process::pause;
use crate::kernel::process::spawn_inner;
use crate::kernel::process::ProcState;
use crate::kernel::process::Process;
use crate::kernel::scheduler::with_kernel;
use crate::kernel::scheduler::Sig;
use crate::ProcessId;
use crate::Result;
use crate::SimError;
use crate::Time;

/// Why a wait ended. Exactly one cause per resumption: a latched flag
/// wins over suspension, an interrupt is observed before a trigger,
/// and a timeout reports only when neither flag was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    Interrupted,
    Triggered,
    TimedOut,
    Activated,
}

/// A process with interrupt/trigger affordances. The one-shot flags
/// live in the kernel registry; the handle only carries identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    process: Process,
}

impl Entity {
    pub fn spawn<F>(label: &str, body: F) -> Result<Self>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        spawn_inner(label, true, body).map(|id| Self {
            process: Process::from_id(id),
        })
    }

    pub fn process(&self) -> Process {
        self.process
    }

    /// Raise the target's interrupted flag. A waiting target wakes
    /// now; one pending in a hold has its record cancelled and wakes
    /// now; otherwise the flag latches for its next wait.
    pub fn interrupt(&self) -> Result<()> {
        with_kernel(|kernel| kernel.signal(self.process.id(), Sig::Interrupt))
    }

    /// Raise the target's triggered flag. A waiting target wakes now;
    /// otherwise the flag latches for its next wait.
    pub fn trigger(&self) -> Result<()> {
        with_kernel(|kernel| kernel.signal(self.process.id(), Sig::Trigger))
    }
}

impl std::ops::Deref for Entity {
    type Target = Process;
    fn deref(&self) -> &Process {
        &self.process
    }
}

/// Suspend until interrupted, triggered, or activated. A flag latched
/// before the call is consumed immediately, without suspending.
pub fn wait() -> Result<Wakeup> {
    let pid = current_pid()?;
    match suspend(pid, None)? {
        Some(latched) => Ok(latched),
        None => {
            pause(pid)?;
            observe(pid, false)
        }
    }
}

/// As `wait`, but also arms a timeout record at `now + timeout`.
/// Whichever of signal and timeout fires first cancels the other.
pub fn wait_for(timeout: Time) -> Result<Wakeup> {
    let pid = current_pid()?;
    match suspend(pid, Some(timeout))? {
        Some(latched) => Ok(latched),
        None => {
            pause(pid)?;
            observe(pid, true)
        }
    }
}

/// Observe-and-clear the running entity's interrupted flag.
pub fn interrupted() -> Result<bool> {
    flag(Sig::Interrupt)
}

/// Observe-and-clear the running entity's triggered flag.
pub fn triggered() -> Result<bool> {
    flag(Sig::Trigger)
}

fn flag(sig: Sig) -> Result<bool> {
    let pid = current_pid()?;
    with_kernel(|kernel| {
        let now = kernel.now;
        let entry = kernel.entry(pid)?;
        if !entry.entity {
            return Err(SimError::state("flags on a plain process", Some(pid), now));
        }
        let raised = match sig {
            Sig::Interrupt => std::mem::take(&mut entry.interrupted),
            Sig::Trigger => std::mem::take(&mut entry.triggered),
        };
        Ok(raised)
    })
}

/// Bookkeeping for entering a wait. Returns a latched wakeup when the
/// entity should not suspend at all.
fn suspend(pid: ProcessId, timeout: Option<Time>) -> Result<Option<Wakeup>> {
    with_kernel(|kernel| {
        if kernel.running != Some(pid) {
            return Err(SimError::state(
                "wait outside the running body",
                Some(pid),
                kernel.now,
            ));
        }
        if let Some(timeout) = timeout {
            if !(timeout >= 0.0) {
                return Err(SimError::param(format!("wait timeout {timeout}"), kernel.now));
            }
        }
        let entry = kernel.entry(pid)?;
        if !entry.entity {
            return Err(SimError::state("wait on a plain process", Some(pid), kernel.now));
        }
        if entry.interrupted {
            entry.interrupted = false;
            return Ok(Some(Wakeup::Interrupted));
        }
        if entry.triggered {
            entry.triggered = false;
            return Ok(Some(Wakeup::Triggered));
        }
        entry.state = ProcState::Waiting;
        if let Some(timeout) = timeout {
            let wake = kernel.now + timeout;
            kernel.schedule(pid, wake);
        }
        kernel.running = None;
        Ok(None)
    })
}

/// What woke us: a flag, a timeout, or a plain activation.
fn observe(pid: ProcessId, timed: bool) -> Result<Wakeup> {
    with_kernel(|kernel| {
        let entry = kernel.entry(pid)?;
        if entry.interrupted {
            entry.interrupted = false;
            Ok(Wakeup::Interrupted)
        } else if entry.triggered {
            entry.triggered = false;
            Ok(Wakeup::Triggered)
        } else if timed {
            Ok(Wakeup::TimedOut)
        } else {
            Ok(Wakeup::Activated)
        }
    })
}
