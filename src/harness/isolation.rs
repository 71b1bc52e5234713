// src/harness/isolation.rs

//! Drives two sessions through a fixed interleaving of transactional statements
//! and checks what each one observes against the isolation contract:
//!
//! 1. setup on A (autocommit): drop, create and seed the table
//! 2. A and B both `begin;`
//! 3. A updates the target row
//! 4. B reads the target row and must see the pre-update value
//! 5. A aborts
//! 6. A reads the target row and must see the pre-update value
//! 7. B commits
//!
//! Steps 3 to 6 are meaningless in any other order. Optional extra reads run
//! before step 2 (seed round trip) and after step 7 (commit preserves rows).

use super::report::{CheckKind, CheckOutcome, Observation, Phase, ScenarioReport};
use crate::config::{Config, ScenarioConfig};
use crate::connection::Session;
use crate::core::ClientError;
use crate::core::protocol::{ColumnDef, ColumnType, Predicate, Response, Statement, Value};
use tracing::{debug, info, warn};

const ID_COLUMN: &str = "id";
const NAME_COLUMN: &str = "name";
const SCORE_COLUMN: &str = "score";
const MIN_NAME_WIDTH: usize = 8;
const SCORE_EPSILON: f64 = 1e-6;

/// A row of the scenario table.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedRow {
    pub id: i64,
    pub name: String,
    pub score: f64,
}

impl SeedRow {
    pub fn new(id: i64, name: impl Into<String>, score: f64) -> Self {
        Self {
            id,
            name: name.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsolationScenario {
    pub table: String,
    pub rows: Vec<SeedRow>,
    /// The id of the row A updates and everyone reads.
    pub target_id: i64,
    /// The score A writes inside its transaction before aborting.
    pub updated_score: f64,
    pub verify_seed: bool,
    pub verify_after_commit: bool,
}

impl Default for IsolationScenario {
    fn default() -> Self {
        Self::from_config(&ScenarioConfig::default())
    }
}

impl IsolationScenario {
    pub fn from_config(config: &ScenarioConfig) -> Self {
        Self {
            table: config.table.clone(),
            rows: vec![
                SeedRow::new(1, "xiaohong", 90.0),
                SeedRow::new(2, "xiaoming", 95.0),
                SeedRow::new(3, "zhanghua", 88.5),
            ],
            target_id: 2,
            updated_score: 100.0,
            verify_seed: config.verify_seed,
            verify_after_commit: config.verify_after_commit,
        }
    }

    /// The score the target row holds before any transaction touches it.
    fn original_score(&self) -> Result<f64, ClientError> {
        self.rows
            .iter()
            .find(|r| r.id == self.target_id)
            .map(|r| r.score)
            .ok_or_else(|| {
                ClientError::InvalidState(format!(
                    "target row {} is not among the seeded rows",
                    self.target_id
                ))
            })
    }

    fn columns(&self) -> Vec<ColumnDef> {
        let name_width = self
            .rows
            .iter()
            .map(|r| r.name.len())
            .max()
            .unwrap_or(0)
            .max(MIN_NAME_WIDTH);
        vec![
            ColumnDef::new(ID_COLUMN, ColumnType::Int),
            ColumnDef::new(NAME_COLUMN, ColumnType::Char(name_width)),
            ColumnDef::new(SCORE_COLUMN, ColumnType::Float),
        ]
    }

    fn select_row(&self, id: i64) -> Result<Statement, ClientError> {
        Statement::select_where(&self.table, &[Predicate::equals(ID_COLUMN, id)])
    }

    /// Runs the interleaving on two independent sessions.
    ///
    /// Transport failures abort the run and are returned. Contract violations
    /// are not errors: they show up as failed checks in the report.
    pub async fn run(
        &self,
        a: &mut Session,
        b: &mut Session,
    ) -> Result<ScenarioReport, ClientError> {
        for s in [&*a, &*b] {
            if s.state().is_active() {
                return Err(ClientError::InvalidState(format!(
                    "session '{}' must not start the scenario inside a transaction",
                    s.name()
                )));
            }
        }
        let original = self.original_score()?;
        // Refuse unwritable scores before the table is dropped.
        for score in self.rows.iter().map(|r| r.score).chain([self.updated_score]) {
            Value::Float(score).check()?;
        }
        let mut report = ScenarioReport::default();
        info!(
            "Running isolation scenario on table '{}' with sessions '{}' and '{}'",
            self.table,
            a.name(),
            b.name()
        );

        // 1. Setup on A, autocommit.
        step(&mut report, Phase::Setup, a, Statement::drop_table(&self.table)).await?;
        step(
            &mut report,
            Phase::Setup,
            a,
            Statement::create_table(&self.table, &self.columns()),
        )
        .await?;
        for row in &self.rows {
            let insert = Statement::insert(
                &self.table,
                &[
                    Value::Int(row.id),
                    Value::Char(row.name.clone()),
                    Value::Float(row.score),
                ],
            )?;
            step(&mut report, Phase::Setup, a, insert).await?;
        }
        if self.verify_seed {
            let outcome = self.verify_seed_rows(&mut report, a).await?;
            report.checks.push(outcome);
        }

        // 2. Both sessions open a transaction.
        step(&mut report, Phase::Begin, a, Statement::begin()).await?;
        step(&mut report, Phase::Begin, b, Statement::begin()).await?;

        // 3. A writes inside its transaction.
        let update = Statement::update_where(
            &self.table,
            (SCORE_COLUMN, Value::Float(self.updated_score)),
            &[Predicate::equals(ID_COLUMN, self.target_id)],
        )?;
        step(&mut report, Phase::Write, a, update).await?;

        // 4. B must not see A's uncommitted write.
        let seen_by_b =
            step(&mut report, Phase::Read, b, self.select_row(self.target_id)?).await?;
        report.checks.push(self.score_check(
            CheckKind::NoDirtyRead,
            &seen_by_b,
            original,
            b.name(),
        ));

        // 5. A aborts.
        step(&mut report, Phase::Abort, a, Statement::abort()).await?;

        // 6. The aborted write is gone for A too.
        let seen_by_a =
            step(&mut report, Phase::Read, a, self.select_row(self.target_id)?).await?;
        report.checks.push(self.score_check(
            CheckKind::RollbackComplete,
            &seen_by_a,
            original,
            a.name(),
        ));

        // 7. B commits a transaction that wrote nothing.
        step(&mut report, Phase::Commit, b, Statement::commit()).await?;

        if self.verify_after_commit {
            let after =
                step(&mut report, Phase::Verify, b, self.select_row(self.target_id)?).await?;
            report.checks.push(self.score_check(
                CheckKind::CommitPreservesRows,
                &after,
                original,
                b.name(),
            ));
        }

        if report.passed() {
            info!("Isolation scenario passed");
        } else {
            for failure in report.failures() {
                warn!("Isolation check '{}' failed: {}", failure.kind, failure.detail);
            }
        }
        Ok(report)
    }

    async fn verify_seed_rows(
        &self,
        report: &mut ScenarioReport,
        session: &mut Session,
    ) -> Result<CheckOutcome, ClientError> {
        let mut mismatches = Vec::new();
        for row in &self.rows {
            let response = step(report, Phase::Setup, session, self.select_row(row.id)?).await?;
            let key = row.id.to_string();
            let Some(rs) = response.result_set() else {
                mismatches.push(format!(
                    "id={}: no result table in '{}'",
                    row.id,
                    response.text().trim()
                ));
                continue;
            };
            let name = rs.lookup(ID_COLUMN, &key, NAME_COLUMN);
            let score = rs.lookup_f64(ID_COLUMN, &key, SCORE_COLUMN);
            match (name, score) {
                (Some(n), Some(s)) if n == row.name && scores_match(s, row.score) => {}
                (None, _) | (_, None) => mismatches.push(format!("id={}: row missing", row.id)),
                (Some(n), Some(s)) => mismatches.push(format!(
                    "id={}: expected ({}, {}), observed ({}, {})",
                    row.id, row.name, row.score, n, s
                )),
            }
        }

        if mismatches.is_empty() {
            Ok(CheckOutcome::pass(
                CheckKind::SeedRoundTrip,
                format!("{} seeded rows read back intact", self.rows.len()),
            ))
        } else {
            Ok(CheckOutcome::fail(
                CheckKind::SeedRoundTrip,
                mismatches.join("; "),
            ))
        }
    }

    /// Compares the target row's score in `response` against `expected`.
    fn score_check(
        &self,
        kind: CheckKind,
        response: &Response,
        expected: f64,
        session: &str,
    ) -> CheckOutcome {
        let Some(rs) = response.result_set() else {
            return CheckOutcome::fail(
                kind,
                format!(
                    "session '{session}' got no result table: '{}'",
                    response.text().trim()
                ),
            );
        };
        let key = self.target_id.to_string();
        match rs.lookup_f64(ID_COLUMN, &key, SCORE_COLUMN) {
            Some(observed) if scores_match(observed, expected) => CheckOutcome::pass(
                kind,
                format!("session '{session}' observed score {observed} for id={key}"),
            ),
            Some(observed) if scores_match(observed, self.updated_score) => CheckOutcome::fail(
                kind,
                format!(
                    "session '{session}' observed the aborted/uncommitted score {observed} for id={key}, expected {expected}"
                ),
            ),
            Some(observed) => CheckOutcome::fail(
                kind,
                format!("session '{session}' observed score {observed} for id={key}, expected {expected}"),
            ),
            None => CheckOutcome::fail(
                kind,
                format!("session '{session}' did not see row id={key}"),
            ),
        }
    }
}

fn scores_match(a: f64, b: f64) -> bool {
    (a - b).abs() < SCORE_EPSILON
}

/// One round trip, recorded in the report.
async fn step(
    report: &mut ScenarioReport,
    phase: Phase,
    session: &mut Session,
    statement: Statement,
) -> Result<Response, ClientError> {
    let response = session.exec(&statement).await?;
    debug!("[{}] {} > {}", phase, session.name(), statement);
    report.observations.push(Observation {
        phase,
        session: session.name().to_string(),
        statement,
        response: response.text(),
        truncated: response.is_truncated(),
        state_after: session.state(),
    });
    Ok(response)
}

/// Opens sessions A and B against the configured server, runs the scenario and
/// closes both sessions on every exit path.
pub async fn run_against(config: &Config) -> Result<ScenarioReport, ClientError> {
    let scenario = IsolationScenario::from_config(&config.scenario);
    let addr = config.addr();

    let mut a = Session::open("A", &addr, &config.connection).await?;
    let mut b = match Session::open("B", &addr, &config.connection).await {
        Ok(b) => b,
        Err(e) => {
            if let Err(close_err) = a.close().await {
                warn!("Failed to close session 'A': {}", close_err);
            }
            return Err(e);
        }
    };

    let result = scenario.run(&mut a, &mut b).await;

    for session in [a, b] {
        let name = session.name().to_string();
        if let Err(e) = session.close().await {
            warn!("Failed to close session '{}': {}", name, e);
        }
    }
    result
}
