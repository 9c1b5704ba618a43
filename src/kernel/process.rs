use crate::kernel::scheduler;
use crate::kernel::scheduler::with_kernel;
use crate::kernel::scheduler::Gate;
use crate::kernel::scheduler::Note;
use crate::kernel::scheduler::Scheduler;
use crate::ProcessId;
use crate::Result;
use crate::SimError;
use crate::Time;
use std::cell::RefCell;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;

/// Lifecycle of a simulated process.
///
/// Idle on construction; Scheduled while an activation record is
/// queued; Running while dispatched (at most one at a time); Waiting
/// with no record, resumable only from outside; Terminated forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Idle,
    Scheduled,
    Running,
    Waiting,
    Terminated,
}

/// Per-thread identity of the body being executed. Bodies run on their
/// own OS thread, so thread-locality is process-locality.
struct Context {
    pid: ProcessId,
    resume: Receiver<Gate>,
    notes: Sender<Note>,
}

thread_local! {
    static CONTEXT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

pub(crate) fn current_pid() -> Result<ProcessId> {
    CONTEXT.with(|c| {
        c.borrow().as_ref().map(|ctx| ctx.pid).ok_or_else(|| {
            SimError::state("called outside a process body", None, Scheduler::now())
        })
    })
}

/// Hand the baton back to the scheduler and block until dispatched
/// again. Converts a teardown gate into `Halted`.
pub(crate) fn pause(pid: ProcessId) -> Result<()> {
    CONTEXT.with(|c| {
        let borrow = c.borrow();
        let ctx = borrow
            .as_ref()
            .ok_or_else(|| SimError::state("suspend outside a process body", Some(pid), 0.0))?;
        let _ = ctx.notes.send(Note::Paused(pid));
        match ctx.resume.recv() {
            Ok(Gate::Go) => Ok(()),
            Ok(Gate::Halt) | Err(_) => Err(SimError::Halted),
        }
    })
}

/// Suspend the running body for `dt` of virtual time. The process
/// resumes once the clock reaches `now + dt` — or earlier, if an
/// interrupt preempts the hold.
pub fn hold(dt: Time) -> Result<()> {
    let pid = current_pid()?;
    with_kernel(|kernel| {
        if kernel.running != Some(pid) {
            return Err(SimError::state("hold outside the running body", Some(pid), kernel.now));
        }
        if !(dt >= 0.0) {
            return Err(SimError::param(format!("hold of {dt}"), kernel.now));
        }
        let wake = kernel.now + dt;
        kernel.schedule(pid, wake);
        kernel.entry(pid)?.state = ProcState::Scheduled;
        kernel.running = None;
        Ok(())
    })?;
    pause(pid)
}

/// Suspend with no scheduled resumption; only an external activation
/// (or, for entities, a signal) brings the process back.
pub fn passivate() -> Result<()> {
    let pid = current_pid()?;
    with_kernel(|kernel| {
        if kernel.running != Some(pid) {
            return Err(SimError::state(
                "passivate outside the running body",
                Some(pid),
                kernel.now,
            ));
        }
        kernel.entry(pid)?.state = ProcState::Waiting;
        kernel.running = None;
        Ok(())
    })?;
    pause(pid)
}

/// Terminate the running body. Never returns `Ok`: the `Halted`
/// sentinel unwinds the body through `?` and the kernel retires the
/// process cleanly.
pub fn stop() -> Result<()> {
    let pid = current_pid()?;
    with_kernel(|kernel| {
        if kernel.running != Some(pid) {
            return Err(SimError::state("stop outside the running body", Some(pid), kernel.now));
        }
        kernel.queue.remove(pid);
        kernel.entry(pid)?.state = ProcState::Terminated;
        kernel.running = None;
        Ok(())
    })?;
    Err(SimError::Halted)
}

/// The virtual clock, readable from anywhere.
pub fn current_time() -> Time {
    Scheduler::now()
}

/// Embedder-side handle to a simulated process. The handle is freely
/// copyable; the kernel owns the coroutine thread behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Process {
    id: ProcessId,
}

impl Process {
    /// Register a process and spawn its coroutine thread, parked until
    /// the first dispatch. The body runs cooperatively: it executes
    /// until it suspends through one of the primitives, and its errors
    /// fault the run.
    pub fn spawn<F>(label: &str, body: F) -> Result<Self>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        spawn_inner(label, false, body).map(|id| Self { id })
    }

    pub(crate) fn from_id(id: ProcessId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn state(&self) -> Result<ProcState> {
        with_kernel(|kernel| kernel.state_of(self.id))
    }

    /// Schedule at the current instant. No effect if already scheduled
    /// or running.
    pub fn activate(&self) -> Result<()> {
        with_kernel(|kernel| {
            let now = kernel.now;
            kernel.activate_at(self.id, now, false)
        })
    }

    /// Schedule at an absolute time, superseding any pending record.
    pub fn activate_at(&self, time: Time) -> Result<()> {
        with_kernel(|kernel| kernel.activate_at(self.id, time, true))
    }

    /// Schedule `dt` from now, superseding any pending record.
    pub fn activate_delay(&self, dt: Time) -> Result<()> {
        with_kernel(|kernel| {
            let time = kernel.now + dt;
            kernel.activate_at(self.id, time, true)
        })
    }

    /// Retire a process from outside its body: cancel any pending
    /// record and mark it Terminated. Its thread is reclaimed at
    /// scheduler teardown.
    pub fn terminate_now(&self) -> Result<()> {
        with_kernel(|kernel| {
            let now = kernel.now;
            match kernel.state_of(self.id)? {
                ProcState::Terminated => Err(SimError::state(
                    "terminate a terminated process",
                    Some(self.id),
                    now,
                )),
                ProcState::Running => Err(SimError::state(
                    "terminate the running process from outside its body",
                    Some(self.id),
                    now,
                )),
                _ => {
                    kernel.queue.remove(self.id);
                    kernel.entry(self.id)?.state = ProcState::Terminated;
                    log::debug!("process {} retired at t={}", self.id, now);
                    Ok(())
                }
            }
        })
    }
}

pub(crate) fn spawn_inner<F>(label: &str, entity: bool, body: F) -> Result<ProcessId>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let (resume_tx, resume_rx) = mpsc::channel();
    let (pid, notes_tx) = with_kernel(|kernel| {
        let pid = kernel.register(label, entity, resume_tx);
        Ok((pid, kernel.notes_tx.clone()))
    })?;
    let thread = std::thread::Builder::new()
        .name(format!("sim-{pid}-{label}"))
        .spawn(move || run_body(pid, resume_rx, notes_tx, body))
        .map_err(|e| SimError::state(format!("spawn body thread: {e}"), Some(pid), 0.0))?;
    with_kernel(|kernel| {
        kernel.entry(pid)?.thread = Some(thread);
        Ok(())
    })?;
    log::debug!("spawned process {pid} ({label})");
    Ok(pid)
}

fn run_body<F>(pid: ProcessId, resume: Receiver<Gate>, notes: Sender<Note>, body: F)
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    CONTEXT.with(|c| {
        *c.borrow_mut() = Some(Context { pid, resume, notes });
    });
    // park until the first dispatch; teardown before that exits quietly
    let dispatched = CONTEXT.with(|c| {
        let borrow = c.borrow();
        let ctx = borrow.as_ref().expect("context installed above");
        matches!(ctx.resume.recv(), Ok(Gate::Go))
    });
    if !dispatched {
        return;
    }
    let verdict = panic::catch_unwind(AssertUnwindSafe(body));
    let fault = match verdict {
        Ok(Ok(())) | Ok(Err(SimError::Halted)) => None,
        Ok(Err(fault)) => Some(fault),
        Err(_) => Some(SimError::state(
            "process body panicked",
            Some(pid),
            Scheduler::now(),
        )),
    };
    finish(pid, fault);
}

/// Retire the process after its body returned. Faults are parked in
/// the kernel for the dispatch loop to surface.
fn finish(pid: ProcessId, fault: Option<SimError>) {
    let notes = {
        let mut guard = scheduler::lock();
        match guard.as_mut() {
            None => None, // torn down; nobody to notify
            Some(kernel) => {
                kernel.queue.remove(pid);
                if let Ok(entry) = kernel.entry(pid) {
                    entry.state = ProcState::Terminated;
                }
                if kernel.running == Some(pid) {
                    kernel.running = None;
                }
                if let Some(fault) = fault {
                    log::error!("process {pid} faulted at t={}: {fault}", kernel.now);
                    kernel.fault = Some(fault);
                }
                Some(kernel.notes_tx.clone())
            }
        }
    };
    if let Some(notes) = notes {
        let _ = notes.send(Note::Finished(pid));
    }
}
