// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::RowGrayError;
use std::panic::{self, AssertUnwindSafe};

pub type EngineResult<T> = std::result::Result<T, RowGrayError>;

/// Run codec code under a uniform panic policy: a panic inside a third-party
/// decoder or encoder becomes an `InternalPanic` error tagged with `label`
/// instead of unwinding through the caller.
pub fn run_with_panic_policy<T, F>(label: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(RowGrayError::internal_panic(format!("{label}: {detail}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_results_through() {
        assert_eq!(run_with_panic_policy("ok", || Ok(3)).unwrap(), 3);
        let err = run_with_panic_policy::<(), _>("err", || Err(RowGrayError::decode_failed("x")))
            .unwrap_err();
        assert!(matches!(err, RowGrayError::DecodeFailed { .. }));
    }

    #[test]
    fn converts_panics() {
        let err = run_with_panic_policy::<(), _>("decode:png", || panic!("boom")).unwrap_err();
        match err {
            RowGrayError::InternalPanic { message } => {
                assert!(message.contains("decode:png"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
