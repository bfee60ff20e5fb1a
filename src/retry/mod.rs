// ============================================================================
// Client-side transaction retry protocol
// ============================================================================
//
// Serializable backends with optimistic concurrency abort a transaction that
// lost a contention race with SQLSTATE 40001 and expect the client to replay
// it. The protocol:
//
//   SAVEPOINT <name>
//   <body>                          -- 40001? ROLLBACK TO SAVEPOINT <name>,
//   RELEASE SAVEPOINT <name>        --        back off, run <body> again
//
// The loop talks to the transaction through `ExecTx`, a context-taking,
// variadic shape; `driver::adapter` bridges a `Transaction` to it.
//
// ============================================================================

pub mod policy;

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::{Args, Context, DbError, Result, SERIALIZATION_FAILURE};
use crate::result::Results;

pub use policy::{Finalize, RESTART_SAVEPOINT, RetryPolicy};

/// One variadic argument of `ExecTx::exec`.
///
/// Position 0 carries the statement's arguments, positions 1.. carry result
/// targets.
#[derive(Debug, Clone)]
pub enum Param {
    Args(Args),
    Results(Results),
}

impl From<Args> for Param {
    fn from(args: Args) -> Self {
        Self::Args(args)
    }
}

impl From<Results> for Param {
    fn from(results: Results) -> Self {
        Self::Results(results)
    }
}

/// Transaction control object driven by `execute_in_tx`.
#[async_trait]
pub trait ExecTx: Send + Sync {
    async fn exec(&self, ctx: &Context, query: &str, params: &[Param]) -> Result<()>;

    async fn commit(&self, ctx: &Context) -> Result<()>;

    async fn rollback(&self, ctx: &Context) -> Result<()>;
}

/// Whether the backend asked for the transaction to be replayed.
///
/// This is the only place errors are classified; everything else is routed
/// back to the caller untouched.
pub fn is_retryable(err: &DbError) -> bool {
    err.sqlstate() == Some(SERIALIZATION_FAILURE)
}

/// Runs `body` inside `tx`, replaying it while it fails with a retryable
/// error.
///
/// Non-retryable errors from `body` are returned unchanged. Errors produced by
/// the protocol itself (restart statements, exhaustion, a done `ctx`) are
/// terminal. With `Finalize::Commit` the transaction is committed after a
/// successful body and rolled back after a failure.
pub async fn execute_in_tx<T, F, Fut>(
    ctx: &Context,
    tx: &T,
    policy: &RetryPolicy,
    body: F,
) -> Result<()>
where
    T: ExecTx + ?Sized,
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
{
    let outcome = retry_loop(ctx, tx, policy, body).await;

    match policy.finalize {
        Finalize::Statement => outcome,
        Finalize::Commit => match outcome {
            Ok(()) => tx.commit(ctx).await,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback(ctx).await {
                    debug!(error = %rollback_err, "rollback after failed transaction body");
                }
                Err(err)
            }
        },
    }
}

async fn retry_loop<T, F, Fut>(ctx: &Context, tx: &T, policy: &RetryPolicy, mut body: F) -> Result<()>
where
    T: ExecTx + ?Sized,
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
{
    if let Some(err) = ctx.err() {
        return Err(err);
    }

    let savepoint = policy.savepoint.as_deref();
    if let Some(name) = savepoint {
        tx.exec(ctx, &format!("SAVEPOINT {}", name), &[]).await?;
    }

    let mut restarts: u32 = 0;
    loop {
        let err = match body().await {
            Ok(()) => match savepoint {
                Some(name) => match tx.exec(ctx, &format!("RELEASE SAVEPOINT {}", name), &[]).await {
                    Ok(()) => return Ok(()),
                    Err(err) => err,
                },
                None => return Ok(()),
            },
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(err);
        }

        // Never keep replaying on behalf of a caller that already gave up.
        if let Some(ctx_err) = ctx.err() {
            return Err(ctx_err);
        }

        if restarts >= policy.max_retries {
            debug!(attempts = restarts + 1, error = %err, "transaction retries exhausted");
            return Err(DbError::RetriesExhausted {
                attempts: restarts + 1,
                last: Box::new(err),
            });
        }
        restarts += 1;

        if let Some(name) = savepoint {
            if let Err(restart) = tx
                .exec(ctx, &format!("ROLLBACK TO SAVEPOINT {}", name), &[])
                .await
            {
                return Err(DbError::RestartFailed {
                    restart: Box::new(restart),
                    cause: Box::new(err),
                });
            }
        }

        let backoff = policy.backoff(restarts);
        warn!(
            attempt = restarts,
            max_retries = policy.max_retries,
            backoff_ms = backoff.as_millis() as u64,
            error = %err,
            "restarting transaction after retryable error"
        );

        if !backoff.is_zero() {
            tokio::select! {
                ctx_err = ctx.done() => return Err(ctx_err),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }
}
