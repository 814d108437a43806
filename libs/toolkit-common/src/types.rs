use crate::paths::{covers, resolve_path_from};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Rule deciding whether a test case passed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuccessCriterion {
    /// Pass iff the action exited with status 0
    ExitCodeZero,
    /// Pass iff the action left `path` behind in the workspace.
    /// The exit status is not consulted in this mode.
    FileExists { path: PathBuf },
}

impl SuccessCriterion {
    /// Anchor a relative artifact path onto the working directory
    fn anchored(self, working_directory: &Path) -> Self {
        match self {
            SuccessCriterion::ExitCodeZero => SuccessCriterion::ExitCodeZero,
            SuccessCriterion::FileExists { path } => SuccessCriterion::FileExists {
                path: resolve_path_from(working_directory, &path),
            },
        }
    }
}

/// One invocation of the containerized toolkit action
///
/// Every path held here is absolute: the working directory is resolved
/// by the caller, and artifact/cleanup paths are anchored to it. None of
/// the removable paths may be the working directory or one of its parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub working_directory: PathBuf,
    pub inputs: BTreeMap<String, String>,
    pub success: SuccessCriterion,
    pub cleanup_paths: Vec<PathBuf>,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        working_directory: PathBuf,
        inputs: BTreeMap<String, String>,
        success: SuccessCriterion,
        cleanup_paths: Vec<PathBuf>,
    ) -> Result<Self> {
        debug_assert!(
            working_directory.is_absolute(),
            "working directory must be resolved before building a test case"
        );

        let success = success.anchored(&working_directory);
        let cleanup_paths = cleanup_paths
            .iter()
            .map(|p| resolve_path_from(&working_directory, p))
            .collect();

        let case = Self {
            name: name.into(),
            working_directory,
            inputs,
            success,
            cleanup_paths,
        };

        for path in case.disposable_paths() {
            if covers(path, &case.working_directory) {
                bail!(
                    "Test case '{}': {} would remove the workspace {}",
                    case.name,
                    path.display(),
                    case.working_directory.display()
                );
            }
        }

        Ok(case)
    }

    /// Expected artifact, if the case is artifact-based
    pub fn artifact(&self) -> Option<&Path> {
        match &self.success {
            SuccessCriterion::FileExists { path } => Some(path.as_path()),
            SuccessCriterion::ExitCodeZero => None,
        }
    }

    /// Everything that has to go before a run and after a passing one:
    /// the declared cleanup paths, then the artifact.
    pub fn disposable_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.cleanup_paths.iter().map(PathBuf::as_path).collect();
        if let Some(artifact) = self.artifact() {
            paths.push(artifact);
        }
        paths
    }
}

/// Outcome of a single action invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i64,
    pub succeeded: bool,
}

impl RunResult {
    pub fn from_exit_code(exit_code: i64) -> Self {
        Self {
            exit_code,
            succeeded: exit_code == 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    /// Literal line printed between the blank lines of the status block
    pub fn status_line(self) -> &'static str {
        match self {
            Verdict::Pass => "OK",
            Verdict::Fail => "TEST FAILED",
        }
    }

    /// Process exit status for an aggregator
    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_line())
    }
}
