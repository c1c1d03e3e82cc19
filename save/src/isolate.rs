use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::{SaveError, SaveResult};

/// Run one unit of user code, turning a panic into [`SaveError::Panicked`].
pub(crate) fn run_isolated<T>(f: impl FnOnce() -> SaveResult<T>) -> SaveResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(SaveError::Panicked(panic_payload_to_string(&*payload))),
    }
}

pub(crate) fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_become_errors() {
        let result: SaveResult<()> = run_isolated(|| panic!("boom"));
        assert!(matches!(result, Err(SaveError::Panicked(msg)) if msg == "boom"));

        let formatted: SaveResult<()> = run_isolated(|| panic!("code {}", 7));
        assert!(matches!(formatted, Err(SaveError::Panicked(msg)) if msg == "code 7"));
    }

    #[test]
    fn results_pass_through() {
        assert_eq!(run_isolated(|| Ok(3)).unwrap(), 3);
        assert!(matches!(
            run_isolated::<()>(|| Err(SaveError::entity("bad"))),
            Err(SaveError::Entity(_))
        ));
    }
}
