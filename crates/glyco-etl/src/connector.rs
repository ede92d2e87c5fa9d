//! Bounded, fixed-delay retry around a single [`Connect`] attempt.
//!
//! The store is often still starting when the job is launched next to it, so
//! the first attempts are expected to fail.

use std::time::Duration;

use glyco_core::store::Connect;
use tracing::{info, warn};

use crate::{Error, Result};

/// How often and how patiently to try connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first. Zero is treated as one.
  pub max_attempts: u32,
  /// Pause between a failed attempt and the next one.
  pub delay:        Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 10,
      delay:        Duration::from_secs(3),
    }
  }
}

/// Connect through `connector`, retrying per `policy`.
///
/// Every failure is logged with its attempt number. When the last attempt
/// fails, returns [`Error::ConnectionExhausted`] carrying that attempt's error.
pub async fn connect_with_retry<C: Connect>(
  connector: &C,
  policy: RetryPolicy,
) -> Result<C::Store> {
  let attempts = policy.max_attempts.max(1);
  let target = connector.target();

  let mut attempt = 1;
  loop {
    match connector.connect().await {
      Ok(store) => {
        info!(store = %target, attempt, "connected to store");
        return Ok(store);
      }
      Err(e) => {
        warn!(store = %target, "store unavailable ({attempt}/{attempts}): {e}");
        if attempt == attempts {
          return Err(Error::ConnectionExhausted { attempts, source: Box::new(e) });
        }
      }
    }
    tokio::time::sleep(policy.delay).await;
    attempt += 1;
  }
}
