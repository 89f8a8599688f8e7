//! # Scenario DSL
//!
//! A declarative, builder-pattern API for defining readable survey
//! scenarios in a Given-When-Then style.
//!
//! ## Example
//!
//! ```rust,ignore
//! Scenario::new("Single respondent closes the survey")
//!     .with_questions(3)
//!     .with_limit(1)
//!     .given(|ctx| ctx.harness.publish(&[5, 3, 4]))
//!     .when("one respondent answers", |ctx| {
//!         let r = ctx.harness.respond(&[3, 2, 4]);
//!         ctx.respondents.push(r);
//!     })
//!     .then("the survey is closed", |ctx| {
//!         assert_eq!(ctx.harness.status(), SurveyStatus::Closed);
//!     })
//!     .run();
//! ```

extern crate std;

use soroban_sdk::Address;
use std::boxed::Box;
use std::string::String;
use std::vec::Vec;

use super::invariants::InvariantSet;
use super::{SurveyTestHarness, TestEnv};

// ── Scenario Context ─────────────────────────────────────────────────────────

/// Mutable context passed to scenario steps.
pub struct ScenarioContext<'a, 'b> {
    pub harness: &'a SurveyTestHarness<'b>,
    pub respondents: Vec<Address>,
    /// Storage for arbitrary test data between steps.
    pub data: std::collections::HashMap<String, u32>,
}

impl<'a, 'b> ScenarioContext<'a, 'b> {
    fn new(harness: &'a SurveyTestHarness<'b>) -> Self {
        Self {
            harness,
            respondents: Vec::new(),
            data: std::collections::HashMap::new(),
        }
    }

    /// Submit `ratings` from a fresh respondent and remember the address.
    pub fn respond(&mut self, ratings: &[u8]) -> Address {
        let respondent = self.harness.respond(ratings);
        self.respondents.push(respondent.clone());
        respondent
    }

    pub fn store(&mut self, key: &str, value: u32) {
        self.data.insert(key.into(), value);
    }

    pub fn load(&self, key: &str) -> u32 {
        *self
            .data
            .get(key)
            .unwrap_or_else(|| panic!("Scenario variable '{}' not found", key))
    }
}

// ── Step Types ───────────────────────────────────────────────────────────────

type StepFn = Box<dyn FnOnce(&mut ScenarioContext<'_, '_>)>;

struct GivenStep {
    action: StepFn,
}

struct WhenStep {
    #[allow(dead_code)]
    description: String,
    action: StepFn,
}

struct ThenStep {
    #[allow(dead_code)]
    description: String,
    assertion: StepFn,
}

// ── Scenario Builder ─────────────────────────────────────────────────────────

/// A declarative test scenario with Given-When-Then structure.
///
/// Steps are collected via the builder and executed in order during `run()`.
/// Invariants can optionally be checked between When and Then phases.
pub struct Scenario {
    name: String,
    total_questions: u32,
    respondent_limit: u32,
    given_steps: Vec<GivenStep>,
    when_steps: Vec<WhenStep>,
    then_steps: Vec<ThenStep>,
    invariants: Option<InvariantSet>,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            total_questions: 1,
            respondent_limit: 10,
            given_steps: Vec::new(),
            when_steps: Vec::new(),
            then_steps: Vec::new(),
            invariants: None,
        }
    }

    pub fn with_questions(mut self, total_questions: u32) -> Self {
        self.total_questions = total_questions;
        self
    }

    pub fn with_limit(mut self, respondent_limit: u32) -> Self {
        self.respondent_limit = respondent_limit;
        self
    }

    /// Add a precondition/setup step.
    pub fn given<F>(mut self, action: F) -> Self
    where
        F: FnOnce(&mut ScenarioContext<'_, '_>) + 'static,
    {
        self.given_steps.push(GivenStep {
            action: Box::new(action),
        });
        self
    }

    /// Add an action step with a description.
    pub fn when<F>(mut self, description: &str, action: F) -> Self
    where
        F: FnOnce(&mut ScenarioContext<'_, '_>) + 'static,
    {
        self.when_steps.push(WhenStep {
            description: description.into(),
            action: Box::new(action),
        });
        self
    }

    /// Add an assertion step with a description.
    pub fn then<F>(mut self, description: &str, assertion: F) -> Self
    where
        F: FnOnce(&mut ScenarioContext<'_, '_>) + 'static,
    {
        self.then_steps.push(ThenStep {
            description: description.into(),
            assertion: Box::new(assertion),
        });
        self
    }

    /// Attach invariants to check between when and then phases.
    pub fn with_invariants(mut self, invariants: InvariantSet) -> Self {
        self.invariants = Some(invariants);
        self
    }

    /// Deploy a fresh survey, run all steps in order and panic on the first
    /// failed assertion or invariant.
    pub fn run(self) {
        let env = TestEnv::new();
        let harness = SurveyTestHarness::new(&env, self.total_questions, self.respondent_limit);
        let mut ctx = ScenarioContext::new(&harness);

        for step in self.given_steps {
            (step.action)(&mut ctx);
        }

        for step in self.when_steps {
            (step.action)(&mut ctx);
        }

        if let Some(ref invariants) = self.invariants {
            let violations = invariants.check_all(&harness.snapshot());
            if !violations.is_empty() {
                let mut report = std::format!(
                    "Scenario '{}': invariant violations after actions:\n",
                    self.name
                );
                for (name, msg) in &violations {
                    report.push_str(&std::format!("  ✗ [{}]: {}\n", name, msg));
                }
                panic!("{}", report);
            }
        }

        for step in self.then_steps {
            (step.assertion)(&mut ctx);
        }
    }
}

// ── Assertion Helpers ────────────────────────────────────────────────────────

/// Assert that an action fails with the expected contract error code.
///
/// Uses `try_*` client methods that return `Result`.
#[macro_export]
macro_rules! assert_contract_error {
    ($result:expr, $expected:expr) => {
        match $result {
            Err(Ok(e)) => assert_eq!(
                e, $expected,
                "Expected error {:?}, got {:?}",
                $expected, e
            ),
            Err(Err(e)) => panic!("Unexpected SDK error: {:?}", e),
            Ok(_) => panic!("Expected error {:?}, but operation succeeded", $expected),
        }
    };
}

/// Assert that a value is within a percentage tolerance of the expected value.
///
/// Used for means and variances derived from decrypted integer aggregates.
#[macro_export]
macro_rules! assert_within_tolerance {
    ($actual:expr, $expected:expr, $tolerance_pct:expr) => {{
        let actual = $actual as f64;
        let expected = $expected as f64;
        let tolerance = expected.abs() * ($tolerance_pct as f64 / 100.0);
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "Value {} is not within {}% of expected {}: diff = {}",
            actual,
            $tolerance_pct,
            expected,
            diff,
        );
    }};
}

// ── Batch Scenario Runner ────────────────────────────────────────────────────

/// Run multiple scenarios and return the number passed and failed.
pub fn run_scenarios(scenarios: Vec<Scenario>) -> (usize, usize) {
    let total = scenarios.len();
    let mut failures = 0;

    for scenario in scenarios {
        let name = scenario.name.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scenario.run();
        }));

        match result {
            Ok(()) => {
                std::eprintln!("  ✓ {}", name);
            }
            Err(_) => {
                std::eprintln!("  ✗ {}", name);
                failures += 1;
            }
        }
    }

    (total - failures, failures)
}
