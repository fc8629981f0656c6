//! Declarative resolution test cases
//!
//! Cases are authored in YAML or JSON and run against a [`DomainCatalog`].
//! A case whose domain cannot be loaded fails; it does not abort the run.

use crate::catalog::DomainCatalog;
use crate::error::ResolutionError;
use crate::types::{RecentAction, ResolutionRequest, UserContext};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Context switch and history of a case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestContext {
    /// Supply a user context
    pub enabled: bool,
    /// History; only successful entries are passed on
    pub recent_actions: Vec<RecentAction>,
}

/// What a case asserts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    /// Confidence above zero
    pub should_succeed: bool,
    /// Exact confidence
    pub confidence_score: u8,
    /// Each string must occur in some reasoning line
    #[serde(default)]
    pub reasoning_contains: Vec<String>,
    /// Number of selected actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_actions_count: Option<usize>,
    /// Activated products, order-insensitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_activation: Option<Vec<String>>,
}

/// One resolution scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Case id
    pub id: String,
    /// Domain id
    pub domain: String,
    /// What the case covers
    #[serde(default)]
    pub description: String,
    /// Free-text intent, informational
    #[serde(default)]
    pub intent: String,
    /// Node to resolve
    pub entry_node: String,
    /// Context
    #[serde(default)]
    pub context: TestContext,
    /// Rationalization toggle
    #[serde(default)]
    pub rationalized: bool,
    /// Workflow toggle
    #[serde(default)]
    pub workflows: bool,
    /// Assertions
    pub expected: Expectation,
}

impl TestCase {
    fn request(&self) -> ResolutionRequest {
        let mut request = ResolutionRequest::new()
            .rationalized(self.rationalized)
            .workflows(self.workflows);
        if self.context.enabled {
            request = request
                .with_context(UserContext::for_role("Test User"))
                .with_recent_actions(self.context.recent_actions.iter().filter(|a| a.success).cloned());
        }
        request
    }
}

/// Observed outcome of a case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualOutcome {
    /// Confidence above zero
    pub success: bool,
    /// Confidence
    pub confidence_score: u8,
    /// Reasoning lines
    pub reasoning: Vec<String>,
    /// Number of selected actions
    pub selected_actions_count: usize,
    /// Activated products
    pub products: Vec<String>,
}

/// Verdict for one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    /// Case id
    pub id: String,
    /// Domain id
    pub domain: String,
    /// Description
    pub description: String,
    /// All assertions held
    pub passed: bool,
    /// Observed outcome
    pub actual: ActualOutcome,
    /// Failed assertions
    pub errors: Vec<String>,
}

/// Verdicts for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Per-case verdicts, in run order
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    /// Passed cases
    #[must_use]
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed).count()
    }

    /// Failed cases
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// All cases
    #[must_use]
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    /// Every case passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed)
    }

    /// Cases grouped by domain, in first-seen order
    #[must_use]
    pub fn by_domain(&self) -> IndexMap<&str, Vec<&CaseReport>> {
        let mut out: IndexMap<&str, Vec<&CaseReport>> = IndexMap::new();
        for case in &self.cases {
            out.entry(case.domain.as_str()).or_default().push(case);
        }
        out
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(72);
        writeln!(f, "{rule}")?;
        writeln!(f, "INTENT RESOLUTION TEST REPORT")?;
        writeln!(f, "{rule}")?;

        #[allow(clippy::cast_precision_loss)]
        let rate = if self.total() == 0 {
            0.0
        } else {
            self.passed() as f64 / self.total() as f64 * 100.0
        };
        writeln!(f, "Summary: {}/{} passed ({rate:.1}%)", self.passed(), self.total())?;

        for (domain, cases) in self.by_domain() {
            let passed = cases.iter().filter(|c| c.passed).count();
            writeln!(f)?;
            writeln!(f, "Domain: {} ({passed}/{} passed)", domain.to_uppercase(), cases.len())?;
            for case in cases.iter().filter(|c| !c.passed) {
                writeln!(f, "  FAIL {}: {}", case.id, case.description)?;
                for error in &case.errors {
                    writeln!(f, "       {error}")?;
                }
            }
            for case in cases.iter().filter(|c| c.passed) {
                writeln!(f, "  ok   {}", case.id)?;
            }
        }
        Ok(())
    }
}

/// Runs cases against a catalog
#[derive(Debug, Clone, Copy)]
pub struct SuiteRunner<'c> {
    catalog: &'c DomainCatalog,
}

impl<'c> SuiteRunner<'c> {
    /// Runner over `catalog`
    #[must_use]
    pub fn new(catalog: &'c DomainCatalog) -> Self {
        Self { catalog }
    }

    /// Run one case
    #[must_use]
    pub fn run_case(&self, case: &TestCase) -> CaseReport {
        tracing::debug!(case = %case.id, domain = %case.domain, "running case");

        let resolution = match self.catalog.get(&case.domain) {
            Ok(domain) => domain.resolve(&case.entry_node, &case.request()),
            Err(err) => {
                tracing::warn!(case = %case.id, error = %err, "case could not run");
                return CaseReport {
                    id: case.id.clone(),
                    domain: case.domain.clone(),
                    description: case.description.clone(),
                    passed: false,
                    actual: ActualOutcome::default(),
                    errors: vec![format!("Test execution failed: {err}")],
                };
            }
        };

        let actual = ActualOutcome {
            success: resolution.is_resolved(),
            confidence_score: resolution.confidence_score,
            selected_actions_count: resolution.selected_actions.len(),
            products: resolution.products().into_iter().map(str::to_string).collect(),
            reasoning: resolution.reasoning,
        };
        let errors = check(&case.expected, &actual);

        CaseReport {
            id: case.id.clone(),
            domain: case.domain.clone(),
            description: case.description.clone(),
            passed: errors.is_empty(),
            actual,
            errors,
        }
    }

    /// Run cases in order
    #[must_use]
    pub fn run(&self, cases: &[TestCase]) -> SuiteReport {
        let report = SuiteReport {
            cases: cases.iter().map(|c| self.run_case(c)).collect(),
        };
        tracing::info!(passed = report.passed(), failed = report.failed(), "suite finished");
        report
    }
}

fn check(expected: &Expectation, actual: &ActualOutcome) -> Vec<String> {
    let mut errors = Vec::new();
    let verdict = |ok: bool| if ok { "success" } else { "failure" };

    if actual.success != expected.should_succeed {
        errors.push(format!(
            "Expected {}, got {}",
            verdict(expected.should_succeed),
            verdict(actual.success)
        ));
    }
    if actual.confidence_score != expected.confidence_score {
        errors.push(format!(
            "Expected confidence {}, got {}",
            expected.confidence_score, actual.confidence_score
        ));
    }
    for needle in &expected.reasoning_contains {
        if !actual.reasoning.iter().any(|r| r.contains(needle.as_str())) {
            errors.push(format!("Expected reasoning to contain \"{needle}\""));
        }
    }
    if let Some(count) = expected.selected_actions_count {
        if count != actual.selected_actions_count {
            errors.push(format!("Expected {count} actions, got {}", actual.selected_actions_count));
        }
    }
    if let Some(products) = &expected.product_activation {
        let mut want = products.clone();
        let mut got = actual.products.clone();
        want.sort();
        got.sort();
        if want != got {
            errors.push(format!("Expected products [{}], got [{}]", want.join(", "), got.join(", ")));
        }
    }
    errors
}

/// Load cases from a `.yaml`, `.yml` or `.json` file holding a list
///
/// # Errors
/// Unreadable file, unsupported extension or malformed content.
pub fn load_cases(path: &Path) -> Result<Vec<TestCase>, ResolutionError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let text = match ext {
        "json" | "yaml" | "yml" => std::fs::read_to_string(path).map_err(|e| ResolutionError::io(path, e))?,
        _ => return Err(ResolutionError::UnsupportedFormat(path.to_path_buf())),
    };
    if ext == "json" {
        serde_json::from_str(&text).map_err(|e| ResolutionError::parse(path, e))
    } else {
        serde_yaml::from_str(&text).map_err(|e| ResolutionError::parse(path, e))
    }
}
