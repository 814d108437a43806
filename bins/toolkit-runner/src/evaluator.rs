//! Verdict logic for a single toolkit run
//!
//! **Critical Properties:**
//! - Knows nothing about Docker
//! - Never modifies the workspace
//! - (run result, criterion, host filesystem) → verdict
//!
//! **Rules:**
//! - ExitCodeZero: pass iff the exit status is exactly 0
//! - FileExists: pass iff the artifact exists on the host; the exit status
//!   is deliberately not consulted, the artifact is the authoritative signal

use toolkit_common::types::{RunResult, SuccessCriterion, Verdict};

pub fn evaluate(result: &RunResult, criterion: &SuccessCriterion) -> Verdict {
    let passed = match criterion {
        SuccessCriterion::ExitCodeZero => result.exit_code == 0,
        SuccessCriterion::FileExists { path } => path.exists(),
    };

    if passed {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}
