use async_trait::async_trait;

use crate::core::{Args, Context, Result};
use crate::interface::{ExecQuerier, Transaction};
use crate::result::Results;
use crate::retry::{self, RetryPolicy};

use super::adapter::TxAdapter;

/// Transaction whose statements are replayed on serialization failures.
///
/// `exec` runs under the retry loop; `query`, `commit` and `rollback` go
/// straight to the wrapped transaction.
pub struct RetryTx<T> {
    inner: T,
    ctx: Context,
    policy: RetryPolicy,
}

impl<T: Transaction> RetryTx<T> {
    pub(crate) fn new(inner: T, ctx: Context, policy: RetryPolicy) -> Self {
        Self { inner, ctx, policy }
    }

    /// Context the transaction was opened with.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Transaction> ExecQuerier for RetryTx<T> {
    async fn exec(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        let adapter = TxAdapter::new(&self.inner);
        let inner = &self.inner;
        retry::execute_in_tx(ctx, &adapter, &self.policy, move || {
            inner.exec(ctx, query, args, results)
        })
        .await
    }

    async fn query(&self, ctx: &Context, query: &str, args: &Args, results: &Results) -> Result<()> {
        self.inner.query(ctx, query, args, results).await
    }
}

#[async_trait]
impl<T: Transaction> Transaction for RetryTx<T> {
    async fn commit(&self) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(&self) -> Result<()> {
        self.inner.rollback().await
    }
}
