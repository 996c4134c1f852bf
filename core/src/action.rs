use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::benchmark::{OutputGenerator, Regeneration};
use crate::config::Config;
use crate::grading::{IntegrationTestGrader, TestSuiteGrader};
use crate::sandbox::{make_jail, Invocation, RunOptions, Sandbox};
use crate::style;
use crate::testing::{TestResult, TestRunner};

/// Name the submission archive gets inside the jail.
pub const SUBMIT_FILE: &str = "submit.tar.gz";

/// Everything one grading run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    pub project: String,
    pub tests: BTreeMap<String, TestResult>,
    pub integration_score: f64,
    pub caught_bugs: Option<BTreeSet<String>>,
    pub suite_score: Option<f64>,
    pub score: f64,
    pub total_points: f64,
}

fn make_targets<'t>(targets: impl IntoIterator<Item = &'t str>) -> Invocation {
    Invocation::new("make").arg("--no-print-directory").args(targets)
}

/// Build the staff solution, the test-suite executables, the buggy solutions and the judges.
pub async fn compile_solutions(project_dir: &Path, cfg: &Config) -> Result<()> {
    let project = Sandbox::unlimited(absolute(project_dir)?);

    let mut targets = vec![cfg.project.staff_solution_exe.as_str()];
    if let Some(suite) = &cfg.suite {
        targets.push(&suite.test_suite_exe);
        targets.push(&suite.flags_command);
        targets.extend(suite.buggy_solutions.iter().map(String::as_str));
    }

    let solution = project.within(&cfg.project.solution_dir);
    for target in targets {
        solution
            .run(&make_targets([target]), RunOptions::STRICT)
            .await
            .with_context(|| format!("Failed to build solution target '{}'", target))?;
    }

    let judges = project.within(&cfg.project.judge_dir);
    for judge in cfg.judge_exes() {
        judges
            .run(&make_targets([judge]), RunOptions::STRICT)
            .await
            .with_context(|| format!("Failed to build judge '{}'", judge))?;
    }
    Ok(())
}

/// Bring the reference output and benchmark of every integration test up to date.
pub async fn generate_output(project_dir: &Path, cfg: &Config) -> Result<()> {
    let runner = TestRunner::new(Sandbox::unlimited(absolute(project_dir)?), cfg.input_mode());
    log::debug!("Reference runs read input via {}", cfg.input_mode());
    let generator = OutputGenerator::new(cfg, &runner);

    for (id, case) in &cfg.integration.tests {
        let res = generator
            .ensure(id, case)
            .await
            .with_context(|| format!("Failed to generate output for test {}", id))?;
        if let Regeneration::Generated(record) = res {
            log::info!("Test {}: budget {:.3}s", id, record.time);
        }
    }
    Ok(())
}

/// Copy the project files into a fresh jail.
pub fn prepare_jail(jail: &Sandbox, project_dir: &Path) -> Result<()> {
    let opt = fsutil::OptCopyContents {
        overwrite_existing_file: true,
    };
    fsutil::copy_contents_all(project_dir, jail.root(), &opt)
        .context("Failed to copy the project into the jail")
}

/// Extract the submission archive into `submission/`, overlay the grader files
/// and build the student executable.
pub async fn unpack_submission(
    jail: &Sandbox,
    project_dir: &Path,
    cfg: &Config,
    archive: &Path,
) -> Result<()> {
    let submission = jail.within(IntegrationTestGrader::SUBMISSION_DIR);
    fsutil::mkdir_all(submission.root())?;
    fsutil::copy_file(archive, submission.path(SUBMIT_FILE))?;

    let tar = Invocation::new("tar").args(["-xf", SUBMIT_FILE]);
    submission
        .run(&tar, RunOptions::STRICT)
        .await
        .context("Failed to extract the submission")?;

    // Grader files replace whatever the student shipped under the same name.
    for file in &cfg.project.grader_files {
        let Some(name) = file.file_name() else {
            continue;
        };
        fsutil::copy_recursively(project_dir.join(file), submission.path(name))?;
    }

    submission
        .run(&make_targets([]), RunOptions::STRICT)
        .await
        .context("Failed to build the submission")?;
    Ok(())
}

/// The whole grading pipeline for one submission archive.
pub async fn do_test(project_dir: &Path, cfg: &Config, submit_file: &Path) -> Result<GradeReport> {
    let project_dir = absolute(project_dir)?;
    let submit_file = absolute(submit_file)?;

    self::compile_solutions(&project_dir, cfg).await?;
    self::generate_output(&project_dir, cfg).await?;

    let jail = make_jail(cfg.jail).context("Failed to create a jail")?;
    self::prepare_jail(&jail, &project_dir)?;
    self::unpack_submission(&jail, &project_dir, cfg, &submit_file).await?;

    let runner = TestRunner::new((*jail).clone(), cfg.input_mode());

    let integration = IntegrationTestGrader::new(cfg, &runner);
    let (tests, integration_score) = integration.run_and_print().await?;
    println!(
        "{}",
        style::score_line("Integration tests score", integration_score, cfg.integration.points)
    );
    println!("---");
    let mut score = integration_score;

    let (caught_bugs, suite_score) = match TestSuiteGrader::new(cfg, &runner) {
        Some(grader) => {
            let (bugs, suite_score) = grader.run_and_print().await?;
            println!(
                "{}",
                style::score_line("Test suite score", suite_score, grader.points())
            );
            println!("---");
            score += suite_score;
            (Some(bugs), Some(suite_score))
        }
        None => {
            log::info!("Test suite not enabled.");
            (None, None)
        }
    };

    println!("{}", style::score_line("Score", score, cfg.project.total_points));
    jail.close()?;

    Ok(GradeReport {
        project: cfg.project.id.clone(),
        tests,
        integration_score,
        caught_bugs,
        suite_score,
        score,
        total_points: cfg.project.total_points,
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }
    let cwd = std::env::current_dir().context("Failed to get current dir")?;
    Ok(cwd.join(path))
}
