use async_trait::async_trait;

use crate::core::{Args, Context, DbError, Result};
use crate::interface::Transaction;
use crate::result::Results;
use crate::retry::{ExecTx, Param};

/// Presents a `Transaction` in the shape the retry loop drives.
///
/// Borrowed for a single retry-wrapped statement and dropped afterwards.
pub(crate) struct TxAdapter<'a, T: ?Sized> {
    tx: &'a T,
}

impl<'a, T: Transaction + ?Sized> TxAdapter<'a, T> {
    pub(crate) fn new(tx: &'a T) -> Self {
        Self { tx }
    }
}

/// Splits variadic params into `(args, results)`: position 0 is the
/// statement's arguments, every later position a result target. Missing
/// positions bind nothing.
fn split_params(params: &[Param]) -> Result<(Args, Results)> {
    let args = match params.first() {
        Some(Param::Args(args)) => args.clone(),
        Some(Param::Results(_)) => {
            return Err(DbError::TypeMismatch(
                "first exec parameter must be statement arguments".into(),
            ));
        }
        None => Args::none(),
    };

    let targets = params
        .iter()
        .skip(1)
        .map(|param| match param {
            Param::Results(results) => Ok(results.clone()),
            Param::Args(_) => Err(DbError::TypeMismatch(
                "exec parameters after the first must be result targets".into(),
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((args, Results::merge(targets)))
}

#[async_trait]
impl<'a, T: Transaction + ?Sized> ExecTx for TxAdapter<'a, T> {
    async fn exec(&self, ctx: &Context, query: &str, params: &[Param]) -> Result<()> {
        let (args, results) = split_params(params)?;
        self.tx.exec(ctx, query, &args, &results).await
    }

    async fn commit(&self, _ctx: &Context) -> Result<()> {
        self.tx.commit().await
    }

    async fn rollback(&self, _ctx: &Context) -> Result<()> {
        self.tx.rollback().await
    }
}
