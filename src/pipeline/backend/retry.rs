use super::BackendError;
use crate::config::RetryPolicy;

/// Run `call` until it succeeds, fails permanently, or attempts run out.
///
/// Only transient errors are retried; everything else is returned on the
/// first occurrence. The last error is returned unchanged.
pub fn with_retry<T, F>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T, BackendError>
where
    F: FnMut() -> Result<T, BackendError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                attempt += 1;
                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Transient backend failure, retrying"
                );
                std::thread::sleep(backoff);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn success_needs_one_attempt() {
        let mut calls = 0;
        let result = with_retry(&fast_policy(3), "generate", || {
            calls += 1;
            Ok::<_, BackendError>("done")
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 1);
    }

    #[test]
    fn transient_error_is_retried_until_success() {
        let mut calls = 0;
        let result = with_retry(&fast_policy(3), "generate", || {
            calls += 1;
            if calls < 3 {
                Err(BackendError::Api { status: 503, message: "overloaded".into() })
            } else {
                Ok("recovered")
            }
        });
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls, 3);
    }

    #[test]
    fn attempts_are_bounded() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry(&fast_policy(3), "upload", || {
            calls += 1;
            Err(BackendError::Transport("connection reset".into()))
        });
        assert_eq!(result.unwrap_err(), BackendError::Transport("connection reset".into()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        for err in [
            BackendError::Authentication("bad key".into()),
            BackendError::Quota("exhausted".into()),
            BackendError::MalformedPayload("too large".into()),
        ] {
            let mut calls = 0;
            let result: Result<(), _> = with_retry(&fast_policy(5), "generate", || {
                calls += 1;
                Err(err.clone())
            });
            assert_eq!(result.unwrap_err(), err);
            assert_eq!(calls, 1);
        }
    }

    #[test]
    fn zero_attempts_still_calls_once() {
        let mut calls = 0;
        let _ = with_retry(&fast_policy(0), "status", || {
            calls += 1;
            Err::<(), _>(BackendError::Transport("down".into()))
        });
        assert_eq!(calls, 1);
    }
}
