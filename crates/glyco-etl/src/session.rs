//! [`Session`]: an open store owned by one load run.

use glyco_core::{
  record::Record,
  store::{Connect, StarStore},
};
use tracing::warn;

use crate::{
  Error, Result,
  connector::{RetryPolicy, connect_with_retry},
  pipeline::{self, LoadReport, LookupMode},
};

/// Owns the store for the duration of a run and closes it on every exit
/// path of [`Session::run`].
pub struct Session<S: StarStore> {
  store: S,
}

impl<S: StarStore> Session<S> {
  /// Connect, retrying per `policy`.
  pub async fn open<C>(connector: &C, policy: RetryPolicy) -> Result<Self>
  where
    C: Connect<Store = S>,
  {
    let store = connect_with_retry(connector, policy).await?;
    Ok(Self { store })
  }

  pub fn new(store: S) -> Self { Self { store } }

  /// Run every stage, then close the store whether or not the stages
  /// succeeded. A stage error takes precedence over a close error.
  pub async fn run(self, records: &[Record], mode: LookupMode) -> Result<LoadReport> {
    let result = pipeline::run(&self.store, records, mode).await;
    let closed = self.store.close().await.map_err(Error::store);

    match (result, closed) {
      (Ok(report), Ok(())) => Ok(report),
      (Ok(_), Err(e)) => Err(e),
      (Err(e), closed) => {
        if let Err(close_err) = closed {
          warn!("failed to close store after error: {close_err}");
        }
        Err(e)
      }
    }
  }
}
