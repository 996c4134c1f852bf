use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::benchmark::BenchmarkStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::grading::RuntimeScale;
use crate::sandbox::RunOptions;
use crate::style;
use crate::testing::{Feedback, JudgeResult, TestCase, TestResult, TestRunner};

/// Grades a built submission against the configured integration tests.
///
/// The runner must be rooted at a prepared jail: a copy of the project directory
/// (reference outputs included) with the submission built under `submission/`.
#[derive(Debug)]
pub struct IntegrationTestGrader<'a> {
    config: &'a Config,
    runner: &'a TestRunner,
    store: BenchmarkStore,
}

impl<'a> IntegrationTestGrader<'a> {
    pub const SUBMISSION_DIR: &'static str = "submission";
    pub const STUDENT_OUTPUT: &'static str = "__student.out";

    pub fn new(config: &'a Config, runner: &'a TestRunner) -> Self {
        Self {
            config,
            runner,
            store: BenchmarkStore::in_dir(runner.sandbox().root()),
        }
    }

    fn submission_exe(&self) -> PathBuf {
        self.runner
            .sandbox()
            .path(Path::new(Self::SUBMISSION_DIR).join(&self.config.project.submission_exe))
    }

    pub async fn grade_test(&self, test_id: &str, case: &TestCase) -> Result<TestResult> {
        let input = self.config.integration.test_dir.join(case.input());
        let output = Path::new(Self::STUDENT_OUTPUT);

        if self.config.is_invalid_test_case(test_id) {
            let status = self
                .runner
                .run_with_flags(
                    &self.submission_exe(),
                    &input,
                    &case.flag_string(),
                    output,
                    RunOptions::LIMITED,
                )
                .await?;
            log::info!("Invalid test {} finished with {}", test_id, status);
            return Ok(invalid_case_result(!status.success()));
        }

        let (status, runtime) = self
            .runner
            .run_with_flags_timed(
                &self.submission_exe(),
                &input,
                &case.flag_string(),
                output,
                RunOptions::LIMITED,
            )
            .await?;
        if !status.success() {
            log::info!("Submission failed test {} ({})", test_id, status);
            return Ok(TestResult {
                passed: false,
                percent: 0.0,
                runtime,
                runtime_budget: 1.0,
            });
        }

        let budget = self.store.load(test_id)?.time;
        let judge = self.runner.sandbox().path(self.config.judge_for(test_id)?);
        let verdict = self
            .runner
            .judge(
                &judge,
                &self.store.output_path(test_id),
                output,
                &input,
                Feedback::Print,
            )
            .await?;

        Ok(TestResult {
            passed: verdict.passed(),
            percent: score(&verdict, runtime, budget, &self.config.integration.runtime_scoring),
            runtime,
            runtime_budget: budget,
        })
    }

    /// Grade every configured test case in id order.
    pub async fn grade_integration_tests(&self) -> Result<BTreeMap<String, TestResult>> {
        if self.config.integration.tests.is_empty() {
            return Err(Error::NoIntegrationTests);
        }
        let mut results = BTreeMap::new();
        for (id, case) in &self.config.integration.tests {
            let res = self.grade_test(id, case).await?;
            results.insert(id.clone(), res);
        }
        Ok(results)
    }

    /// Grade every test, printing one line per test.
    pub async fn run_and_print(&self) -> Result<(BTreeMap<String, TestResult>, f64)> {
        let results = self.grade_integration_tests().await?;
        for (id, res) in &results {
            println!(
                "Test {} {} ({:.2}%, runtime {:.3}, budget {:.3})",
                id,
                style::verdict(res.passed),
                res.percent * 100.0,
                res.runtime,
                res.runtime_budget
            );
        }
        let score = self.grade(&results)?;
        Ok((results, score))
    }

    /// Mean awarded percent over all cases, scaled to the integration points.
    pub fn grade(&self, results: &BTreeMap<String, TestResult>) -> Result<f64> {
        integration_score(results.values(), self.config.integration.points)
    }
}

fn invalid_case_result(rejected: bool) -> TestResult {
    TestResult {
        passed: rejected,
        percent: if rejected { 1.0 } else { 0.0 },
        runtime: 0.0,
        runtime_budget: 1.0,
    }
}

/// Credit for a judged case: the judge's ratio times the runtime multiplier.
pub fn score(verdict: &JudgeResult, runtime: f64, budget: f64, scale: &RuntimeScale) -> f64 {
    verdict.ratio() * scale.multiplier(runtime / budget)
}

pub fn integration_score<'r>(
    results: impl ExactSizeIterator<Item = &'r TestResult>,
    points: f64,
) -> Result<f64> {
    let count = results.len();
    if count == 0 {
        return Err(Error::NoIntegrationTests);
    }
    let total: f64 = results.map(|r| r.percent).sum();
    Ok(total / count as f64 * points)
}
