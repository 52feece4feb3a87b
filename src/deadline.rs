use std::{future::Future, time::Duration};

use tracing::warn;

use crate::users::error::UserError;

/// Runs one store operation under `limit`.
///
/// The operation's own error is returned unchanged when it fails first. When
/// the limit fires first the future is dropped, so nothing it produces later
/// is observed, and the caller gets [`UserError::TimedOut`].
pub async fn guarded<T, E, F>(limit: Duration, op: &'static str, fut: F) -> Result<T, UserError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<UserError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            warn!(op, limit_ms = limit.as_millis() as u64, "store call exceeded deadline");
            Err(UserError::TimedOut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{error::StoreError, repo_types::UniqueField};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    #[tokio::test]
    async fn returns_result_when_fast_enough() {
        let out = guarded(Duration::from_millis(500), "fast", async {
            Ok::<_, StoreError>(7)
        })
        .await
        .expect("should finish");
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn times_out_even_if_operation_would_succeed() {
        let err = guarded(Duration::from_millis(20), "slow", async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, UserError::TimedOut));
    }

    #[tokio::test]
    async fn early_domain_error_is_not_reclassified() {
        let err = guarded(Duration::from_millis(500), "dup", async {
            Err::<(), _>(StoreError::Duplicate(UniqueField::Email))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, UserError::EmailExists));
    }

    #[tokio::test]
    async fn late_result_is_never_applied() {
        let applied = Arc::new(AtomicBool::new(false));
        let flag = applied.clone();
        let err = guarded(Duration::from_millis(20), "late", async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            flag.store(true, Ordering::SeqCst);
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, UserError::TimedOut));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!applied.load(Ordering::SeqCst));
    }
}
