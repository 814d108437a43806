//! Test case orchestration
//!
//! One case, strictly in order: clear stale artifacts → invoke the action
//! (blocking, no timeout) → evaluate → clean up on pass / keep on fail.
//! Every failure mode ends as a `Verdict::Fail`.

use crate::engine::{ActionEngine, INVOCATION_FAILURE_EXIT_CODE};
use crate::evaluator::evaluate;
use anyhow::{Context, Result};
use std::io::{self, Write};
use toolkit_common::paths::cleanup;
use toolkit_common::types::{RunResult, TestCase, Verdict};
use tracing::{error, info, instrument, warn};

pub struct TestCaseRunner<E> {
    engine: E,
}

impl<E: ActionEngine> TestCaseRunner<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run one test case and decide its verdict
    ///
    /// An engine error is not propagated: it is logged and recorded as
    /// [`INVOCATION_FAILURE_EXIT_CODE`], then judged like any other run.
    /// Errors returned here come from workspace cleanup only.
    #[instrument(skip(self, case), fields(test_case = %case.name))]
    pub async fn run(&self, case: &TestCase) -> Result<Verdict> {
        cleanup(case.disposable_paths()).context("Failed to clear stale artifacts")?;

        let exit_code = match self.engine.invoke(&case.working_directory, &case.inputs).await {
            Ok(code) => code,
            Err(e) => {
                error!(error = %format!("{:#}", e), "Toolkit invocation failed");
                INVOCATION_FAILURE_EXIT_CODE
            }
        };

        let result = RunResult::from_exit_code(exit_code);
        let verdict = evaluate(&result, &case.success);

        info!(exit_code = result.exit_code, verdict = %verdict, "Toolkit run evaluated");

        match verdict {
            Verdict::Pass => {
                cleanup(case.disposable_paths())
                    .context("Failed to clean up after passing run")?;
            }
            Verdict::Fail => {
                if let Some(artifact) = case.artifact() {
                    warn!(artifact = %artifact.display(), exit_code, "Expected artifact was not produced");
                }
                info!(workspace = %case.working_directory.display(), "Leaving workspace in place for inspection");
            }
        }

        Ok(verdict)
    }
}

/// Print the status block: blank line, status, blank line
pub fn report(out: &mut impl Write, verdict: Verdict) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", verdict.status_line())?;
    writeln!(out)?;
    out.flush()
}
