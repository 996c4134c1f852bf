use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context as _;
use serde::Deserialize;
use serdable::RegexPattern;

use crate::error::{Error, Result};
use crate::grading::RuntimeScale;
use crate::sandbox::Limits;
use crate::testing::{InputMode, TestCase};

/// Project configuration, validated once when loaded and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub project: ProjectConfig,
    pub jail: Limits,
    pub integration: IntegrationConfig,
    pub suite: Option<SuiteConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    pub id: String,
    pub total_points: f64,
    pub submission_exe: String,
    pub solution_dir: PathBuf,
    pub staff_solution_exe: String,
    pub judge_dir: PathBuf,
    pub tests_to_stdin: bool,
    #[serde(default)]
    pub grader_files: Vec<PathBuf>,
    pub judges: Vec<JudgeRule>,
}

/// The judge `exe` (in the judge directory) handles every test whose name matches `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JudgeRule {
    pub exe: String,
    pub pattern: RegexPattern,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IntegrationConfig {
    pub test_dir: PathBuf,
    pub invalid_test_prefix: String,
    pub points: f64,
    pub runtime_scoring: RuntimeScale,
    pub tests: BTreeMap<String, TestCase>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SuiteConfig {
    pub points: f64,
    pub flags_command: String,
    pub min_bugs_for_points: usize,
    pub bugs_for_full_points: usize,
    pub buggy_solutions: Vec<String>,
    pub test_suite_exe: String,
}

impl Config {
    pub const FILENAME: &str = "project.toml";

    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::Config(msg));

        if self.project.judges.is_empty() {
            return invalid("No judges provided.".to_owned());
        }
        if self.integration.invalid_test_prefix.is_empty() {
            return invalid("`integration.invalid-test-prefix` must not be empty".to_owned());
        }
        self.jail.validate().map_err(Error::Config)?;

        if let Some(suite) = &self.suite {
            if suite.bugs_for_full_points <= suite.min_bugs_for_points {
                return invalid(format!(
                    "`suite.bugs-for-full-points` ({}) must be greater than `suite.min-bugs-for-points` ({})",
                    suite.bugs_for_full_points, suite.min_bugs_for_points
                ));
            }
        }
        Ok(())
    }

    pub fn input_mode(&self) -> InputMode {
        InputMode::from_tests_to_stdin(self.project.tests_to_stdin)
    }

    pub fn is_invalid_test_case(&self, test_id: &str) -> bool {
        test_id.starts_with(&self.integration.invalid_test_prefix)
    }

    /// The staff solution, relative to the project directory.
    pub fn staff_solution_path(&self) -> PathBuf {
        self.project.solution_dir.join(&self.project.staff_solution_exe)
    }

    /// The flags command of the test suite, relative to the project directory.
    pub fn flags_command_path(&self) -> Option<PathBuf> {
        let suite = self.suite.as_ref()?;
        Some(self.project.solution_dir.join(&suite.flags_command))
    }

    /// The judge responsible for `test_name`, relative to the project directory.
    /// Exactly one judge pattern must match.
    pub fn judge_for(&self, test_name: &str) -> Result<PathBuf> {
        let matches: Vec<&JudgeRule> = self
            .project
            .judges
            .iter()
            .filter(|j| j.pattern.is_match(test_name))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::NoJudge(test_name.to_owned())),
            [judge] => Ok(self.project.judge_dir.join(&judge.exe)),
            _ => Err(Error::AmbiguousJudge {
                test: test_name.to_owned(),
                judges: matches.iter().map(|j| j.exe.clone()).collect(),
            }),
        }
    }

    pub fn judge_exes(&self) -> impl Iterator<Item = &str> {
        self.project.judges.iter().map(|j| j.exe.as_str())
    }
}

impl SuiteConfig {
    /// Share of the suite points earned by catching `num_bugs` bugs, in `[0, 1]`.
    pub fn percentage(&self, num_bugs: usize) -> f64 {
        let min = self.min_bugs_for_points as f64;
        let full = self.bugs_for_full_points as f64;
        ((num_bugs as f64 - min) / (full - min)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) const EXAMPLE_TOML: &str = r#"
[project]
id = "p2-stocks"
total-points = 100.0
submission-exe = "market"
solution-dir = "solution"
staff-solution-exe = "market"
judge-dir = "judges"
tests-to-stdin = true
grader-files = ["orders.h"]
judges = [
    { exe = "diff_judge", pattern = "^(?:[0-9]|INV)" },
    { exe = "edit_distance_judge", pattern = "^test-" },
]

[jail]
time-limit = 10
disk-limit = 10000000
memory-limit = 512

[integration]
test-dir = "tests"
invalid-test-prefix = "INV"
points = 80.0
runtime-scoring = "0.00-1.00:1.00 1.00-2.00:0.95 2.00-4.00:0.50"

[integration.tests]
01 = "market-small.txt -v"
02 = "market-large.txt -v --median"
INV-01 = "market-bad.txt"

[suite]
points = 20.0
flags-command = "flags"
min-bugs-for-points = 2
bugs-for-full-points = 5
buggy-solutions = ["bug1", "bug2", "bug3", "bug4", "bug5", "bug6"]
test-suite-exe = "market_suite"
"#;

    #[test]
    fn example_toml_should_be_parsable() {
        let cfg = dbg!(Config::from_toml(EXAMPLE_TOML)).unwrap();

        assert_eq!(cfg.source_config_file, None);
        assert_eq!(cfg.project.id, "p2-stocks");
        assert_eq!(cfg.input_mode(), InputMode::Stdin);
        assert_eq!(cfg.staff_solution_path(), PathBuf::from("solution/market"));
        assert_eq!(cfg.jail.time_limit, 10);
        assert_eq!(cfg.jail.memory_limit, 512);

        let ids: Vec<&str> = cfg.integration.tests.keys().map(String::as_str).collect();
        assert_eq!(ids, ["01", "02", "INV-01"]);
        assert_eq!(
            cfg.integration.tests["02"],
            TestCase::new("market-large.txt", ["-v", "--median"])
        );
        assert_eq!(cfg.integration.runtime_scoring.multiplier(1.5), 0.95);

        let suite = cfg.suite.as_ref().unwrap();
        assert_eq!(suite.buggy_solutions.len(), 6);
        assert_eq!(cfg.flags_command_path(), Some(PathBuf::from("solution/flags")));
    }

    #[test]
    fn invalid_prefix() {
        let cfg = Config::from_toml(EXAMPLE_TOML).unwrap();
        assert!(cfg.is_invalid_test_case("INV-01"));
        assert!(!cfg.is_invalid_test_case("01"));
    }

    #[test]
    fn judge_selection() {
        let cfg = Config::from_toml(EXAMPLE_TOML).unwrap();
        assert_eq!(cfg.judge_for("01").unwrap(), PathBuf::from("judges/diff_judge"));
        assert_eq!(
            cfg.judge_for("test-3.txt").unwrap(),
            PathBuf::from("judges/edit_distance_judge")
        );
        assert!(matches!(cfg.judge_for("other"), Err(Error::NoJudge(_))));

        let toml = EXAMPLE_TOML.replace("pattern = \"^test-\"", "pattern = \"1\"");
        let cfg = Config::from_toml(&toml).unwrap();
        let err = cfg.judge_for("01").unwrap_err();
        assert!(matches!(err, Error::AmbiguousJudge { judges, .. } if judges.len() == 2));
    }

    #[test]
    fn suite_is_optional() {
        let toml = EXAMPLE_TOML.split("[suite]").next().unwrap();
        let cfg = Config::from_toml(toml).unwrap();
        assert!(cfg.suite.is_none());
        assert_eq!(cfg.flags_command_path(), None);
    }

    #[test]
    fn validation_errors() {
        let broken = [
            EXAMPLE_TOML.replace("bugs-for-full-points = 5", "bugs-for-full-points = 2"),
            EXAMPLE_TOML.replace("invalid-test-prefix = \"INV\"", "invalid-test-prefix = \"\""),
            EXAMPLE_TOML.replace("time-limit = 10", "time-limit = 0"),
            EXAMPLE_TOML.replace("1.00-2.00:0.95", "1.00-2.00"),
            EXAMPLE_TOML.replace("INV-01 = \"market-bad.txt\"", "INV-01 = \" \""),
            EXAMPLE_TOML.replace("pattern = \"^test-\"", "pattern = \"(\""),
        ];
        for toml in &broken {
            assert!(Config::from_toml(toml).is_err());
        }
    }

    #[test]
    fn suite_percentage_is_clamped() {
        let cfg = Config::from_toml(EXAMPLE_TOML).unwrap();
        let suite = cfg.suite.unwrap();
        assert_eq!(suite.percentage(0), 0.0);
        assert_eq!(suite.percentage(2), 0.0);
        assert!((suite.percentage(3) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(suite.percentage(5), 1.0);
        assert_eq!(suite.percentage(6), 1.0);
    }
}
