use crate::ProcessId;
use crate::Time;

/// Everything that can go wrong inside the kernel, the streams, or the
/// aggregators. Programmer errors (`InvalidParameter`, `InvalidState`,
/// `BackwardClock`) abort a run when raised from a process body; the
/// rest are ordinary results the caller inspects.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("invalid parameter: {what} (t={time})")]
    InvalidParameter { what: String, time: Time },

    #[error("invalid state: {what} (process {process:?}, t={time})")]
    InvalidState {
        what: String,
        process: Option<ProcessId>,
        time: Time,
    },

    #[error("clock regression: requested t={requested} behind t={now}")]
    BackwardClock { requested: Time, now: Time },

    #[error("queue is empty")]
    QueueEmpty,

    #[error("not yet defined: {what}")]
    NotYetDefined { what: String },

    /// Not a fault. Suspension primitives return this when the process
    /// must unwind (self-termination or scheduler teardown); bodies
    /// propagate it with `?` and the kernel treats it as a clean exit.
    #[error("halted")]
    Halted,
}

impl SimError {
    pub(crate) fn state(what: impl Into<String>, process: Option<ProcessId>, time: Time) -> Self {
        Self::InvalidState {
            what: what.into(),
            process,
            time,
        }
    }

    pub(crate) fn param(what: impl Into<String>, time: Time) -> Self {
        Self::InvalidParameter {
            what: what.into(),
            time,
        }
    }
}
