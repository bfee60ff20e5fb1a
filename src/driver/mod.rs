// ============================================================================
// Retrying driver decorator
// ============================================================================
//
//   RetryDriver ──tx/begin_tx──▶ RetryTx ──exec──▶ retry loop ──▶ TxAdapter
//        │                          │                               │
//        └── exec/query/close ──────┴── query/commit/rollback ──────┴──▶ inner
//
// Everything except `RetryTx::exec` is forwarded unchanged; statements outside
// a transaction are never retried.
//
// ============================================================================

mod adapter;
pub mod tx;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{Args, Context, DbError, Result};
use crate::interface::{Capabilities, Driver, ExecQuerier, TxOptions};
use crate::result::Results;
use crate::retry::RetryPolicy;

pub use tx::RetryTx;

/// Driver decorator adding client-side transaction retries.
pub struct RetryDriver<D> {
    inner: D,
    capabilities: Capabilities,
    policy: RetryPolicy,
}

impl<D: Driver> RetryDriver<D> {
    /// Decorate `inner` with the default retry policy.
    pub fn new(inner: D) -> Self {
        let capabilities = inner.capabilities();
        Self {
            inner,
            capabilities,
            policy: RetryPolicy::default(),
        }
    }

    /// Decorate `inner` with a custom retry policy.
    pub fn with_policy(inner: D, policy: RetryPolicy) -> Result<Self> {
        policy.validate()?;
        let capabilities = inner.capabilities();
        Ok(Self {
            inner,
            capabilities,
            policy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

#[async_trait]
impl<D: Driver> ExecQuerier for RetryDriver<D> {
    async fn exec(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        let outcome = self.inner.exec(ctx, query, args, results).await;
        debug!(dialect = self.inner.dialect(), ok = outcome.is_ok(), "driver exec passed through");
        outcome
    }

    async fn query(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        let outcome = self.inner.query(ctx, query, args, results).await;
        debug!(dialect = self.inner.dialect(), ok = outcome.is_ok(), "driver query passed through");
        outcome
    }
}

#[async_trait]
impl<D: Driver> Driver for RetryDriver<D> {
    type Tx = RetryTx<D::Tx>;

    async fn tx(&self, ctx: &Context) -> Result<Self::Tx> {
        let tx = self.inner.tx(ctx).await?;
        debug!(dialect = self.inner.dialect(), "opened retrying transaction");
        Ok(RetryTx::new(tx, ctx.clone(), self.policy.clone()))
    }

    async fn begin_tx(&self, ctx: &Context, opts: &TxOptions) -> Result<Self::Tx> {
        if !self.capabilities.tx_options {
            return Err(DbError::UnsupportedOperation(
                "Driver.BeginTx is not supported".into(),
            ));
        }
        let tx = self.inner.begin_tx(ctx, opts).await?;
        debug!(
            dialect = self.inner.dialect(),
            isolation = ?opts.isolation,
            read_only = opts.read_only,
            "opened retrying transaction with options"
        );
        Ok(RetryTx::new(tx, ctx.clone(), self.policy.clone()))
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn close(&self) -> Result<()> {
        let outcome = self.inner.close().await;
        debug!(dialect = self.inner.dialect(), ok = outcome.is_ok(), "driver closed");
        outcome
    }

    fn dialect(&self) -> &str {
        self.inner.dialect()
    }
}
