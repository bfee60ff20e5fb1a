use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{Args, Context, DbError, Result};
use crate::result::Results;

/// Statement execution shared by drivers and open transactions.
///
/// `results` is a binding target: implementations write the statement's
/// outcome into it (a no-op for `Results::none()`).
#[async_trait]
pub trait ExecQuerier: Send + Sync {
    /// Execute a statement that modifies data (INSERT, UPDATE, DELETE, DDL).
    async fn exec(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()>;

    /// Execute a statement that is expected to return rows (SELECT).
    async fn query(&self, ctx: &Context, query: &str, args: &Args, results: &Results)
    -> Result<()>;
}

/// An open database transaction.
///
/// After `commit` or `rollback` the handle is finished; implementations
/// reject further calls (typically with `DbError::TxDone`).
#[async_trait]
pub trait Transaction: ExecQuerier {
    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
}

/// Options for `Driver::begin_tx`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Optional operations a driver advertises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The driver implements `begin_tx` with `TxOptions`.
    pub tx_options: bool,
}

/// A generic SQL driver.
///
/// This trait lets transaction-aware code stay agnostic of the backend;
/// decorators such as `RetryDriver` implement it as well, so they can be
/// dropped in wherever a driver is expected.
#[async_trait]
pub trait Driver: ExecQuerier {
    type Tx: Transaction;

    /// Start a transaction with the backend defaults.
    async fn tx(&self, ctx: &Context) -> Result<Self::Tx>;

    /// Start a transaction with explicit options.
    ///
    /// Only meaningful when `capabilities().tx_options` is set.
    async fn begin_tx(&self, _ctx: &Context, _opts: &TxOptions) -> Result<Self::Tx> {
        Err(DbError::UnsupportedOperation(
            "Driver.BeginTx is not supported".into(),
        ))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Close the driver and release its connections.
    async fn close(&self) -> Result<()>;

    /// Name of the SQL dialect spoken by the backend, e.g. `"postgres"`.
    fn dialect(&self) -> &str;
}
