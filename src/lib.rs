// ============================================================================
// crdb_retry Library
// ============================================================================
//
// Decorates a generic SQL driver so that statements executed inside a
// transaction are transparently replayed when a serializable backend (such as
// CockroachDB) aborts them with a retryable serialization failure.
//
// ============================================================================

pub mod core;
pub mod driver;
pub mod interface;
pub mod result;
pub mod retry;

// Re-export main types for convenience
pub use crate::core::{Args, Context, DbError, Result, SERIALIZATION_FAILURE, Value};
pub use driver::{RetryDriver, RetryTx};
pub use interface::{Capabilities, Driver, ExecQuerier, IsolationLevel, Transaction, TxOptions};
pub use result::{QueryResult, Results, Row};
pub use retry::{ExecTx, Finalize, Param, RetryPolicy, execute_in_tx, is_retryable};

/// Decorate `driver` with the default retry policy.
///
/// The returned value is itself a [`Driver`], so it can replace the
/// undecorated one without touching callers.
///
/// # Examples
///
/// ```ignore
/// let drv = crdb_retry::new(PostgresDriver::connect(&dsn).await?);
/// let ctx = Context::background();
///
/// let tx = drv.tx(&ctx).await?;
/// tx.exec(&ctx, "UPDATE accounts SET balance = balance + $1 WHERE id = $2",
///         &Args::new(vec![10.into(), 1.into()]), &Results::none()).await?;
/// tx.exec(&ctx, "UPDATE accounts SET balance = balance - $1 WHERE id = $2",
///         &Args::new(vec![10.into(), 2.into()]), &Results::none()).await?;
/// tx.commit().await?;
/// ```
pub fn new<D: Driver>(driver: D) -> RetryDriver<D> {
    RetryDriver::new(driver)
}
