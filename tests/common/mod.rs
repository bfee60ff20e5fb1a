#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;
use crdb_retry::{
    Args, Capabilities, Context, DbError, Driver, ExecQuerier, QueryResult, Result, Results,
    Transaction, TxOptions,
};

/// Which handle a recorded call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Driver,
    Tx(usize),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub scope: Scope,
    pub query: String,
    pub args: Args,
    pub results: Results,
    pub deadline: Option<Instant>,
}

#[derive(Default)]
struct State {
    execs: Vec<Call>,
    queries: Vec<Call>,
    exec_script: VecDeque<Result<()>>,
    query_script: VecDeque<Result<()>>,
    tx_error: Option<DbError>,
    commit_result: Option<DbError>,
    opened: Vec<Option<TxOptions>>,
    commits: usize,
    rollbacks: usize,
    closed: bool,
}

/// Driver double that records every call and replays scripted outcomes.
///
/// Each `exec` (on the driver or any of its transactions) pops the next
/// scripted result; an empty script means success. Successful statements
/// write `QueryResult::affected(1)` into their result target.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<State>>,
    tx_options: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver that also implements `begin_tx`.
    pub fn with_tx_options() -> Self {
        Self {
            tx_options: true,
            ..Self::default()
        }
    }

    pub fn script_exec(&self, outcomes: impl IntoIterator<Item = Result<()>>) {
        self.state.lock().unwrap().exec_script.extend(outcomes);
    }

    pub fn script_query(&self, outcomes: impl IntoIterator<Item = Result<()>>) {
        self.state.lock().unwrap().query_script.extend(outcomes);
    }

    pub fn fail_tx(&self, err: DbError) {
        self.state.lock().unwrap().tx_error = Some(err);
    }

    pub fn fail_commit(&self, err: DbError) {
        self.state.lock().unwrap().commit_result = Some(err);
    }

    pub fn execs(&self) -> Vec<Call> {
        self.state.lock().unwrap().execs.clone()
    }

    /// Exec calls that are not part of the savepoint protocol.
    pub fn statements(&self) -> Vec<Call> {
        self.execs()
            .into_iter()
            .filter(|c| !c.query.contains("SAVEPOINT"))
            .collect()
    }

    pub fn exec_queries(&self) -> Vec<String> {
        self.execs().into_iter().map(|c| c.query).collect()
    }

    pub fn queries(&self) -> Vec<Call> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn opened(&self) -> Vec<Option<TxOptions>> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn record_exec(&self, scope: Scope, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.execs.push(Call {
            scope,
            query: query.to_string(),
            args: args.clone(),
            results: results.clone(),
            deadline: ctx.deadline(),
        });
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let outcome = state.exec_script.pop_front().unwrap_or(Ok(()));
        if outcome.is_ok() {
            results.set(QueryResult::affected(1))?;
        }
        outcome
    }

    fn record_query(&self, scope: Scope, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(Call {
            scope,
            query: query.to_string(),
            args: args.clone(),
            results: results.clone(),
            deadline: ctx.deadline(),
        });
        let outcome = state.query_script.pop_front().unwrap_or(Ok(()));
        if outcome.is_ok() {
            results.set(QueryResult::new(
                vec!["balance".into()],
                vec![vec![60i64.into()]],
            ))?;
        }
        outcome
    }

    fn open(&self, opts: Option<TxOptions>) -> Result<MockTx> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.tx_error.clone() {
            return Err(err);
        }
        state.opened.push(opts);
        Ok(MockTx {
            id: state.opened.len(),
            driver: self.clone(),
            done: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl ExecQuerier for MockDriver {
    async fn exec(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        self.record_exec(Scope::Driver, ctx, query, args, results)
    }

    async fn query(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        self.record_query(Scope::Driver, ctx, query, args, results)
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Tx = MockTx;

    async fn tx(&self, _ctx: &Context) -> Result<MockTx> {
        self.open(None)
    }

    async fn begin_tx(&self, _ctx: &Context, opts: &TxOptions) -> Result<MockTx> {
        if !self.tx_options {
            return Err(DbError::ExecutionError("begin_tx reached a driver without options".into()));
        }
        self.open(Some(opts.clone()))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            tx_options: self.tx_options,
        }
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }

    fn dialect(&self) -> &str {
        "postgres"
    }
}

pub struct MockTx {
    pub id: usize,
    driver: MockDriver,
    done: AtomicBool,
}

impl MockTx {
    fn ensure_open(&self) -> Result<()> {
        if self.done.load(Ordering::SeqCst) {
            Err(DbError::TxDone)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ExecQuerier for MockTx {
    async fn exec(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        self.ensure_open()?;
        self.driver
            .record_exec(Scope::Tx(self.id), ctx, query, args, results)
    }

    async fn query(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        self.ensure_open()?;
        self.driver
            .record_query(Scope::Tx(self.id), ctx, query, args, results)
    }
}

#[async_trait]
impl Transaction for MockTx {
    async fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        self.done.store(true, Ordering::SeqCst);
        let mut state = self.driver.state.lock().unwrap();
        state.commits += 1;
        match state.commit_result.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        self.done.store(true, Ordering::SeqCst);
        self.driver.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

pub fn retryable() -> DbError {
    DbError::serialization_failure("restart transaction: TransactionRetryWithProtoRefreshError")
}
