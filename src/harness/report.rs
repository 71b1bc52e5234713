// src/harness/report.rs

//! The outcome of a scenario run: every round trip in order, plus the verdict
//! of each isolation check.

use crate::connection::TxnState;
use crate::core::protocol::Statement;
use std::fmt;

/// The phase of the interleaving a statement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Begin,
    Write,
    Read,
    Abort,
    Commit,
    Verify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Setup => "setup",
            Phase::Begin => "begin",
            Phase::Write => "write",
            Phase::Read => "read",
            Phase::Abort => "abort",
            Phase::Commit => "commit",
            Phase::Verify => "verify",
        };
        f.pad(s)
    }
}

/// One statement sent by one session and what came back.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub phase: Phase,
    pub session: String,
    pub statement: Statement,
    pub response: String,
    pub truncated: bool,
    /// The session's inferred transaction state after the round trip.
    pub state_after: TxnState,
}

/// The properties a scenario verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Every seeded row reads back with the values inserted.
    SeedRoundTrip,
    /// A concurrent session does not see an uncommitted write.
    NoDirtyRead,
    /// An aborted write is gone, including for the session that made it.
    RollbackComplete,
    /// Committing a transaction without writes leaves the rows unchanged.
    CommitPreservesRows,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckKind::SeedRoundTrip => "seed round trip",
            CheckKind::NoDirtyRead => "no dirty read",
            CheckKind::RollbackComplete => "rollback complete",
            CheckKind::CommitPreservesRows => "commit preserves rows",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub kind: CheckKind,
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    pub fn pass(kind: CheckKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(kind: CheckKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            passed: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioReport {
    pub observations: Vec<Observation>,
    pub checks: Vec<CheckOutcome>,
}

impl ScenarioReport {
    /// True if at least one check ran and none failed.
    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }

    pub fn check(&self, kind: CheckKind) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.kind == kind)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// Observations made by `session`, in order.
    pub fn observations_for<'a>(
        &'a self,
        session: &'a str,
    ) -> impl Iterator<Item = &'a Observation> + 'a {
        self.observations.iter().filter(move |o| o.session == session)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for o in &self.observations {
            writeln!(
                f,
                "[{:<6}] {} ({}) > {}",
                o.phase, o.session, o.state_after, o.statement
            )?;
            for line in o.response.lines().filter(|l| !l.trim().is_empty()) {
                writeln!(f, "           {line}")?;
            }
            if o.truncated {
                writeln!(f, "           (response may be truncated)")?;
            }
        }
        writeln!(f)?;
        for c in &self.checks {
            let verdict = if c.passed { "PASS" } else { "FAIL" };
            writeln!(f, "{verdict} {}: {}", c.kind, c.detail)?;
        }
        let summary = if self.passed() {
            "isolation contract held"
        } else {
            "isolation contract violated"
        };
        write!(f, "{summary}")
    }
}
