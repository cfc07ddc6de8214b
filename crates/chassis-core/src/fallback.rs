//! Two-strategy executor: run a primary action, fall back to a secondary.
//!
//! The chain fails only when both strategies fail. The resulting
//! [`FallbackError`] keeps both messages, because the primary's failure is
//! usually the one that explains what went wrong.

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Which strategy produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyUsed {
    Primary,
    Secondary,
}

/// Successful result of a [`FallbackChain`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackOutcome<T> {
    pub value: T,
    pub used: StrategyUsed,
    /// The primary's error when the secondary had to step in.
    pub primary_error: Option<String>,
}

/// Both strategies failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{primary_name} failed: {primary}; fallback {secondary_name} also failed: {secondary}")]
pub struct FallbackError {
    pub primary_name: String,
    pub primary: String,
    pub secondary_name: String,
    pub secondary: String,
}

/// Named primary/secondary pair.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    primary_name: String,
    secondary_name: String,
}

impl FallbackChain {
    pub fn new(primary_name: impl Into<String>, secondary_name: impl Into<String>) -> Self {
        Self {
            primary_name: primary_name.into(),
            secondary_name: secondary_name.into(),
        }
    }

    /// Run `primary`; if it fails run `secondary`.
    ///
    /// `secondary` is never invoked when `primary` succeeds.
    pub async fn run<T, E1, E2, P, PF, S, SF>(
        &self,
        primary: P,
        secondary: S,
    ) -> Result<FallbackOutcome<T>, FallbackError>
    where
        P: FnOnce() -> PF,
        PF: Future<Output = Result<T, E1>>,
        E1: Display,
        S: FnOnce() -> SF,
        SF: Future<Output = Result<T, E2>>,
        E2: Display,
    {
        let primary_err = match primary().await {
            Ok(value) => {
                return Ok(FallbackOutcome {
                    value,
                    used: StrategyUsed::Primary,
                    primary_error: None,
                })
            }
            Err(e) => e.to_string(),
        };

        warn!(
            strategy = %self.primary_name,
            fallback = %self.secondary_name,
            error = %primary_err,
            "Primary strategy failed, trying fallback"
        );

        match secondary().await {
            Ok(value) => {
                info!(strategy = %self.secondary_name, "Fallback strategy succeeded");
                Ok(FallbackOutcome {
                    value,
                    used: StrategyUsed::Secondary,
                    primary_error: Some(primary_err),
                })
            }
            Err(e) => {
                error!(
                    primary = %self.primary_name,
                    secondary = %self.secondary_name,
                    "Both strategies failed"
                );
                Err(FallbackError {
                    primary_name: self.primary_name.clone(),
                    primary: primary_err,
                    secondary_name: self.secondary_name.clone(),
                    secondary: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chain() -> FallbackChain {
        FallbackChain::new("direct_update", "sync_script")
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let secondary_calls = AtomicUsize::new(0);
        let calls = &secondary_calls;
        let outcome = chain()
            .run(
                || async { Ok::<_, String>(1) },
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(2)
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.value, 1);
        assert_eq!(outcome.used, StrategyUsed::Primary);
        assert!(outcome.primary_error.is_none());
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_secondary_used_after_primary_failure() {
        let outcome = chain()
            .run(
                || async { Err::<u32, _>("checkout failed") },
                || async { Ok::<_, String>(2) },
            )
            .await
            .unwrap();
        assert_eq!(outcome.value, 2);
        assert_eq!(outcome.used, StrategyUsed::Secondary);
        assert_eq!(outcome.primary_error.as_deref(), Some("checkout failed"));
    }

    #[tokio::test]
    async fn test_both_failures_are_retained() {
        let err = chain()
            .run(
                || async { Err::<u32, _>("checkout failed") },
                || async { Err::<u32, _>("script missing") },
            )
            .await
            .unwrap_err();
        assert_eq!(err.primary, "checkout failed");
        assert_eq!(err.secondary, "script missing");
        let msg = err.to_string();
        assert!(msg.contains("direct_update failed: checkout failed"));
        assert!(msg.contains("sync_script also failed: script missing"));
    }
}
