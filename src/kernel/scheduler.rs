use crate::kernel::event::EventQueue;
use crate::kernel::process::ProcState;
use crate::ProcessId;
use crate::Result;
use crate::SimError;
use crate::Time;
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread::JoinHandle;

/// Baton handed to a parked process thread: run on, or unwind.
pub(crate) enum Gate {
    Go,
    Halt,
}

/// Baton handed back by a process thread when it leaves the cpu.
pub(crate) enum Note {
    Paused(ProcessId),
    Finished(ProcessId),
}

/// One-shot causal signals an entity can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sig {
    Interrupt,
    Trigger,
}

pub(crate) struct ProcEntry {
    pub label: String,
    pub state: ProcState,
    pub entity: bool,
    pub interrupted: bool,
    pub triggered: bool,
    pub resume: Sender<Gate>,
    pub thread: Option<JoinHandle<()>>,
}

/// The state of one simulation run. A singleton: processes reach it
/// through the module-level mutex, which is held only for bookkeeping,
/// never across a baton handoff, so exactly one simulated process ever
/// executes between two scheduler steps.
pub(crate) struct Kernel {
    pub now: Time,
    pub seq: u64,
    pub next: ProcessId,
    pub queue: EventQueue,
    pub procs: HashMap<ProcessId, ProcEntry>,
    pub running: Option<ProcessId>,
    pub looping: bool,
    pub fault: Option<SimError>,
    pub notes_tx: Sender<Note>,
    notes_rx: Option<Receiver<Note>>,
}

static KERNEL: Mutex<Option<Kernel>> = Mutex::new(None);

pub(crate) fn lock() -> MutexGuard<'static, Option<Kernel>> {
    KERNEL.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn with_kernel<T>(f: impl FnOnce(&mut Kernel) -> Result<T>) -> Result<T> {
    let mut guard = lock();
    match guard.as_mut() {
        Some(kernel) => f(kernel),
        None => Err(SimError::state("no scheduler for this run", None, 0.0)),
    }
}

impl Kernel {
    fn new() -> Self {
        let (notes_tx, notes_rx) = mpsc::channel();
        Self {
            now: 0.0,
            seq: 0,
            next: 0,
            queue: EventQueue::new(),
            procs: HashMap::new(),
            running: None,
            looping: false,
            fault: None,
            notes_tx,
            notes_rx: Some(notes_rx),
        }
    }

    pub fn register(&mut self, label: &str, entity: bool, resume: Sender<Gate>) -> ProcessId {
        let pid = self.next;
        self.next += 1;
        self.procs.insert(
            pid,
            ProcEntry {
                label: label.to_string(),
                state: ProcState::Idle,
                entity,
                interrupted: false,
                triggered: false,
                resume,
                thread: None,
            },
        );
        pid
    }

    pub fn entry(&mut self, pid: ProcessId) -> Result<&mut ProcEntry> {
        let now = self.now;
        self.procs
            .get_mut(&pid)
            .ok_or_else(|| SimError::state("unknown process", Some(pid), now))
    }

    pub fn state_of(&self, pid: ProcessId) -> Result<ProcState> {
        self.procs
            .get(&pid)
            .map(|e| e.state)
            .ok_or_else(|| SimError::state("unknown process", Some(pid), self.now))
    }

    /// Queue an activation record; any prior record of the process is
    /// superseded.
    pub fn schedule(&mut self, pid: ProcessId, time: Time) {
        self.seq += 1;
        self.queue.insert(pid, time, self.seq);
    }

    /// Shared activation path. `reschedule` distinguishes the timed
    /// forms (which supersede a pending record) from plain `activate`
    /// (a no-op on an already scheduled process).
    pub fn activate_at(&mut self, pid: ProcessId, time: Time, reschedule: bool) -> Result<()> {
        if !(time >= self.now) {
            return Err(SimError::BackwardClock {
                requested: time,
                now: self.now,
            });
        }
        match self.state_of(pid)? {
            ProcState::Terminated => Err(SimError::state(
                "activate on a terminated process",
                Some(pid),
                self.now,
            )),
            ProcState::Running => Ok(()),
            ProcState::Scheduled if !reschedule => Ok(()),
            _ => {
                self.schedule(pid, time);
                self.entry(pid)?.state = ProcState::Scheduled;
                Ok(())
            }
        }
    }

    /// Deliver an interrupt or trigger to an entity. A waiting target
    /// wakes now (cancelling any armed timeout); an interrupt also
    /// preempts a pending hold; anything else just latches the flag.
    pub fn signal(&mut self, pid: ProcessId, sig: Sig) -> Result<()> {
        let now = self.now;
        let entry = self.entry(pid)?;
        if !entry.entity {
            return Err(SimError::state("signal a plain process", Some(pid), now));
        }
        match (entry.state, sig) {
            (ProcState::Terminated, _) => {
                return Err(SimError::state("signal a terminated process", Some(pid), now));
            }
            (ProcState::Waiting, _) => {
                Self::latch(entry, sig);
                entry.state = ProcState::Scheduled;
                self.schedule(pid, now);
            }
            (ProcState::Scheduled, Sig::Interrupt) => {
                Self::latch(entry, sig);
                self.schedule(pid, now);
            }
            _ => Self::latch(entry, sig),
        }
        Ok(())
    }

    fn latch(entry: &mut ProcEntry, sig: Sig) {
        match sig {
            Sig::Interrupt => entry.interrupted = true,
            Sig::Trigger => entry.triggered = true,
        }
    }
}

/// Facade over the run singleton.
pub struct Scheduler;

impl Scheduler {
    /// Start a fresh run. Fails if one already exists; nested runs are
    /// not a thing.
    pub fn create() -> Result<()> {
        let mut guard = lock();
        if guard.is_some() {
            return Err(SimError::state("scheduler already exists", None, 0.0));
        }
        *guard = Some(Kernel::new());
        log::debug!("scheduler created");
        Ok(())
    }

    /// Current virtual time; zero before a run exists.
    pub fn now() -> Time {
        lock().as_ref().map(|k| k.now).unwrap_or(0.0)
    }

    /// Drive the run until the queue empties, `until` is passed, or a
    /// process body faults. Returns the clock at halt.
    pub fn run(until: Option<Time>) -> Result<Time> {
        let notes = {
            let mut guard = lock();
            let kernel = guard
                .as_mut()
                .ok_or_else(|| SimError::state("no scheduler for this run", None, 0.0))?;
            if kernel.looping || kernel.running.is_some() {
                return Err(SimError::state(
                    "run while a run is in progress",
                    kernel.running,
                    kernel.now,
                ));
            }
            kernel.looping = true;
            kernel.notes_rx.take().expect("idle kernel owns its receiver")
        };
        let halted = Self::drive(until, &notes);
        {
            let mut guard = lock();
            if let Some(kernel) = guard.as_mut() {
                kernel.looping = false;
                kernel.notes_rx = Some(notes);
            }
        }
        halted
    }

    fn drive(until: Option<Time>, notes: &Receiver<Note>) -> Result<Time> {
        loop {
            // pick the next record under the lock, then hand the baton
            // over with the lock released
            let (pid, resume) = {
                let mut guard = lock();
                let kernel = guard
                    .as_mut()
                    .ok_or_else(|| SimError::state("scheduler vanished mid-run", None, 0.0))?;
                let Some((next, _)) = kernel.queue.peek_first() else {
                    return Ok(kernel.now);
                };
                if until.is_some_and(|limit| next.time() > limit) {
                    return Ok(kernel.now);
                }
                let (key, pid) = kernel.queue.pop_first().expect("peeked above");
                debug_assert!(key.time() >= kernel.now, "records never point backwards");
                kernel.now = kernel.now.max(key.time());
                let now = kernel.now;
                let entry = kernel.entry(pid)?;
                debug_assert!(
                    matches!(entry.state, ProcState::Scheduled | ProcState::Waiting),
                    "only scheduled or timeout-armed processes hold records",
                );
                entry.state = ProcState::Running;
                let resume = entry.resume.clone();
                log::trace!("dispatch {:<12} t={}", entry.label, now);
                kernel.running = Some(pid);
                (pid, resume)
            };
            if resume.send(Gate::Go).is_err() {
                return Err(SimError::state(
                    "process thread lost",
                    Some(pid),
                    Self::now(),
                ));
            }
            loop {
                match notes.recv() {
                    Ok(Note::Paused(p)) | Ok(Note::Finished(p)) if p == pid => break,
                    Ok(_) => continue,
                    Err(_) => {
                        return Err(SimError::state(
                            "all process threads disconnected",
                            Some(pid),
                            Self::now(),
                        ));
                    }
                }
            }
            let fault = with_kernel(|kernel| Ok(kernel.fault.take()))?;
            if let Some(fault) = fault {
                return Err(fault);
            }
        }
    }

    /// Tear the run down: unwind every process thread, join them, and
    /// clear the singleton so a new run can be created. A no-op when
    /// nothing exists. Refused from inside a run.
    pub fn terminate() -> Result<()> {
        let mut kernel = {
            let mut guard = lock();
            match guard.as_ref().map(|k| k.looping || k.running.is_some()) {
                None => return Ok(()),
                Some(true) => {
                    let k = guard.as_ref().expect("checked above");
                    return Err(SimError::state(
                        "terminate from inside a run",
                        k.running,
                        k.now,
                    ));
                }
                Some(false) => guard.take().expect("checked above"),
            }
        };
        let mut threads = Vec::new();
        for entry in kernel.procs.values_mut() {
            let _ = entry.resume.send(Gate::Halt);
            if let Some(thread) = entry.thread.take() {
                threads.push(thread);
            }
        }
        for thread in threads {
            let _ = thread.join();
        }
        log::debug!("scheduler terminated at t={}", kernel.now);
        Ok(())
    }
}
