use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::{Config, SuiteConfig};
use crate::error::{Error, Result};
use crate::grading::IntegrationTestGrader;
use crate::sandbox::{Invocation, RunOptions, RunStatus};
use crate::testing::{Feedback, TestRunner};

/// Scores a student-written test suite by how many seeded buggy solutions it tells
/// apart from the reference solution.
#[derive(Debug)]
pub struct TestSuiteGrader<'a> {
    config: &'a Config,
    suite: &'a SuiteConfig,
    jail: &'a TestRunner,
    runner: TestRunner,
    flags_command: PathBuf,
}

impl<'a> TestSuiteGrader<'a> {
    pub const TEST_FILE_PREFIX: &'static str = "test-";
    pub const TEST_FILE_SUFFIX: &'static str = ".txt";
    pub const CORRECT_OUTPUT: &'static str = "__correct.out";
    pub const BUGGY_OUTPUT: &'static str = "__buggy.out";

    /// `None` when the project has no test suite component.
    pub fn new(config: &'a Config, jail: &'a TestRunner) -> Option<Self> {
        let suite = config.suite.as_ref()?;
        let flags_command = jail.sandbox().path(config.flags_command_path()?);
        Some(Self {
            config,
            suite,
            jail,
            runner: jail.within(IntegrationTestGrader::SUBMISSION_DIR),
            flags_command,
        })
    }

    fn staff_exe(&self, name: &str) -> PathBuf {
        self.jail
            .sandbox()
            .path(self.config.project.solution_dir.join(name))
    }

    /// Student tests in the submission directory, as test id => file name.
    /// `test-1.txt` has the id `1`.
    pub fn find_test_files(&self) -> Result<BTreeMap<String, String>> {
        let pattern = format!("{}*{}", Self::TEST_FILE_PREFIX, Self::TEST_FILE_SUFFIX);
        let pattern = glob::Pattern::new(&pattern).map_err(|e| Error::Config(e.to_string()))?;

        let files = fsutil::find_files(self.runner.sandbox().root(), &pattern)?;
        Ok(files
            .into_iter()
            .filter_map(|name| {
                let id = name
                    .strip_prefix(Self::TEST_FILE_PREFIX)?
                    .strip_suffix(Self::TEST_FILE_SUFFIX)?
                    .to_owned();
                Some((id, name))
            })
            .collect())
    }

    /// Flags for a student test, or `None` when the flags command rejects its name.
    pub async fn flags_for(&self, test_file: &str) -> Result<Option<String>> {
        let inv = Invocation::new(&self.flags_command).arg(test_file);
        let (status, stdout) = self.runner.sandbox().output(&inv, RunOptions::TOLERANT).await?;
        match status {
            RunStatus::Exited(0) => Ok(Some(stdout.trim().to_owned())),
            RunStatus::Exited(2) => Ok(None),
            status => Err(Error::FlagsCommandCrashed {
                command: inv.to_shell(),
                status,
            }),
        }
    }

    /// Bugs told apart from the reference by one student test, or `None` when the
    /// reference rejects the test as illegal.
    pub async fn bugs_caught_by(
        &self,
        test_file: &str,
        flags: &str,
    ) -> Result<Option<BTreeSet<String>>> {
        let input = Path::new(test_file);
        let correct = Path::new(Self::CORRECT_OUTPUT);
        let buggy = Path::new(Self::BUGGY_OUTPUT);

        let status = self
            .runner
            .run_with_flags(
                &self.staff_exe(&self.suite.test_suite_exe),
                input,
                flags,
                correct,
                RunOptions::TOLERANT,
            )
            .await?;
        match status {
            RunStatus::Exited(0) => {}
            RunStatus::Exited(2) => {
                log::info!("Illegal test case {}", test_file);
                return Ok(None);
            }
            status => {
                return Err(Error::ReferenceCrashed {
                    test_file: test_file.to_owned(),
                    status,
                })
            }
        }

        let judge = self.jail.sandbox().path(self.config.judge_for(test_file)?);
        let mut caught = BTreeSet::new();
        for bug in &self.suite.buggy_solutions {
            // A crashing bug is judged on whatever it managed to print.
            self.runner
                .run_with_flags(&self.staff_exe(bug), input, flags, buggy, RunOptions::TOLERANT)
                .await?;
            let verdict = self
                .runner
                .judge(&judge, correct, buggy, input, Feedback::Suppress)
                .await?;
            if !verdict.passed() {
                caught.insert(bug.clone());
            }
        }
        Ok(Some(caught))
    }

    /// Union of the bugs caught by every legal student test.
    pub async fn grade_test_suite(&self) -> Result<BTreeSet<String>> {
        let tests = self.find_test_files()?;
        if tests.is_empty() {
            log::info!("No test suite provided by student.");
        }

        let mut bugs = BTreeSet::new();
        for (id, file) in &tests {
            let Some(flags) = self.flags_for(file).await? else {
                log::info!("Invalid test filename: {}", file);
                continue;
            };
            let Some(caught) = self.bugs_caught_by(file, &flags).await? else {
                continue;
            };
            log::info!("Student test {} caught bugs: {}", id, join(&caught));
            bugs.extend(caught);
        }
        Ok(bugs)
    }

    pub async fn run_and_print(&self) -> Result<(BTreeSet<String>, f64)> {
        let bugs = self.grade_test_suite().await?;
        println!("Caught bugs: {}", join(&bugs));
        let score = self.grade(&bugs);
        Ok((bugs, score))
    }

    pub fn points(&self) -> f64 {
        self.suite.points
    }

    pub fn grade(&self, caught: &BTreeSet<String>) -> f64 {
        self.suite.percentage(caught.len()) * self.suite.points
    }
}

fn join(bugs: &BTreeSet<String>) -> String {
    bugs.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::test::EXAMPLE_TOML;
    use crate::sandbox::Sandbox;
    use crate::testutil::write_script;

    struct Fixture {
        dir: tempfile::TempDir,
        config: Config,
        runner: TestRunner,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_reference(
                r#"input=$(cat); case "$input" in *illegal*) exit 2;; esac; echo "$input""#,
            )
        }

        fn with_reference(reference_body: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            write_script(root, "solution/market_suite", reference_body);
            write_script(
                root,
                "solution/flags",
                r#"case "$1" in *bad*) exit 2;; *crash*) exit 1;; esac; echo " -v ""#,
            );
            for n in 1..=6 {
                write_script(
                    root,
                    &format!("solution/bug{}", n),
                    &format!(
                        r#"input=$(cat); case "$input" in *trigger-bug{}*) echo wrong;; *) echo "$input";; esac"#,
                        n
                    ),
                );
            }
            write_script(root, "judges/edit_distance_judge", r#"cmp -s "$1" "$2" || exit 2"#);
            fsutil::mkdir_all(root.join("submission")).unwrap();

            let config = Config::from_toml(EXAMPLE_TOML).unwrap();
            let runner = TestRunner::new(Sandbox::unlimited(root), config.input_mode());
            Self { dir, config, runner }
        }

        fn add_test(&self, name: &str, contents: &str) {
            fsutil::write(self.dir.path().join("submission").join(name), contents).unwrap();
        }

        fn grader(&self) -> TestSuiteGrader<'_> {
            TestSuiteGrader::new(&self.config, &self.runner).unwrap()
        }
    }

    fn set(bugs: &[&str]) -> BTreeSet<String> {
        bugs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_grader_without_suite() {
        let toml = EXAMPLE_TOML.split("[suite]").next().unwrap();
        let config = Config::from_toml(toml).unwrap();
        let runner = TestRunner::new(Sandbox::unlimited("/jail"), config.input_mode());
        assert!(TestSuiteGrader::new(&config, &runner).is_none());
    }

    #[test]
    fn test_files_are_discovered_by_name() {
        let f = Fixture::new();
        f.add_test("test-1.txt", "");
        f.add_test("test-edge.txt", "");
        f.add_test("notes.txt", "");
        f.add_test("test-2.in", "");

        let found = f.grader().find_test_files().unwrap();
        let ids: Vec<&str> = found.keys().map(String::as_str).collect();
        assert_eq!(ids, ["1", "edge"]);
        assert_eq!(found["edge"], "test-edge.txt");
    }

    #[tokio::test]
    async fn flags_command_protocol() {
        let f = Fixture::new();
        let g = f.grader();
        assert_eq!(g.flags_for("test-1.txt").await.unwrap(), Some("-v".to_owned()));
        assert_eq!(g.flags_for("test-bad.txt").await.unwrap(), None);
        assert!(matches!(
            g.flags_for("test-crash.txt").await,
            Err(Error::FlagsCommandCrashed { .. })
        ));
    }

    #[tokio::test]
    async fn caught_bugs_are_united_across_tests() {
        let f = Fixture::new();
        f.add_test("test-1.txt", "trigger-bug1 trigger-bug2\n");
        f.add_test("test-2.txt", "trigger-bug2 trigger-bug3\n");
        f.add_test("test-3.txt", "illegal trigger-bug4\n");
        f.add_test("test-bad.txt", "trigger-bug5\n");

        let g = f.grader();
        let bugs = g.grade_test_suite().await.unwrap();
        assert_eq!(bugs, set(&["bug1", "bug2", "bug3"]));
        assert!((g.grade(&bugs) - 20.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn adding_a_test_never_loses_bugs() {
        let f = Fixture::new();
        f.add_test("test-1.txt", "trigger-bug6\n");
        let before = f.grader().grade_test_suite().await.unwrap();

        f.add_test("test-2.txt", "nothing special\n");
        f.add_test("test-3.txt", "trigger-bug1\n");
        let after = f.grader().grade_test_suite().await.unwrap();

        assert!(before.is_subset(&after));
        assert_eq!(after, set(&["bug1", "bug6"]));
    }

    #[tokio::test]
    async fn illegal_test_is_skipped() {
        let f = Fixture::new();
        let g = f.grader();
        f.add_test("test-1.txt", "illegal trigger-bug1\n");
        assert_eq!(g.bugs_caught_by("test-1.txt", "").await.unwrap(), None);
    }

    #[tokio::test]
    async fn crashing_reference_is_fatal() {
        let f = Fixture::with_reference("exit 1");
        f.add_test("test-1.txt", "trigger-bug1\n");
        let err = f.grader().grade_test_suite().await.unwrap_err();
        assert!(matches!(err, Error::ReferenceCrashed { .. }));
    }

    #[tokio::test]
    async fn empty_suite_scores_zero() {
        let f = Fixture::new();
        let g = f.grader();
        let (bugs, score) = g.run_and_print().await.unwrap();
        assert!(bugs.is_empty());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn score_is_clamped() {
        let f = Fixture::new();
        let g = f.grader();
        let all = set(&["bug1", "bug2", "bug3", "bug4", "bug5", "bug6"]);
        assert_eq!(g.grade(&all), 20.0);
        assert_eq!(g.grade(&set(&["bug1"])), 0.0);
        assert_eq!(g.grade(&BTreeSet::new()), 0.0);
    }
}
