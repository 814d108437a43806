//! Test-case catalog for the toolkit runner

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use toolkit_common::paths::resolve_path;
use toolkit_common::types::{SuccessCriterion, TestCase};

pub const DEFAULT_CATALOG_PATH: &str = "config/test-cases.json";

/// One catalog entry, as written in test-cases.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub working_directory: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    pub success: SuccessCriterion,
    #[serde(default)]
    pub cleanup: Vec<PathBuf>,
}

impl TestCaseSpec {
    /// Turn the entry into a runnable case rooted at an absolute workspace
    pub fn resolve(&self) -> Result<TestCase> {
        let working_directory = resolve_path(&self.working_directory)
            .with_context(|| format!("Failed to resolve workspace for '{}'", self.name))?;

        TestCase::new(
            self.name.clone(),
            working_directory,
            self.inputs.clone(),
            self.success.clone(),
            self.cleanup.clone(),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TestCasesJson {
    test_cases: Vec<TestCaseSpec>,
}

/// Catalog of named test cases, in file order
#[derive(Debug, Clone)]
pub struct TestCaseCatalog {
    cases: Vec<TestCaseSpec>,
}

impl TestCaseCatalog {
    /// Load the catalog from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Test case catalog not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let parsed: TestCasesJson = serde_json::from_str(content)?;

        let mut seen = std::collections::HashSet::new();
        for case in &parsed.test_cases {
            if case.name.is_empty() {
                bail!("Test case with empty name");
            }
            if !seen.insert(case.name.as_str()) {
                bail!("Duplicate test case name: {}", case.name);
            }
        }

        Ok(Self {
            cases: parsed.test_cases,
        })
    }

    pub fn get(&self, name: &str) -> Result<&TestCaseSpec> {
        self.cases
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| anyhow::anyhow!("No test case named '{}' (available: {})", name, self.names().join(", ")))
    }

    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn cases(&self) -> &[TestCaseSpec] {
        &self.cases
    }
}
