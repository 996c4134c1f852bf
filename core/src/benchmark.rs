use std::path::{Path, PathBuf};

use fsutil::SingleFileDriver;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sandbox::RunOptions;
use crate::testing::{TestCase, TestRunner};

/// Reference data for one test: the input it was generated from, the flags it was
/// run with, and the runtime budget in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub input: String,
    pub flags: String,
    pub time: f64,
}

impl BenchmarkRecord {
    /// Parse the three-line artifact format: input file, flag string, budget.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let lines: Vec<&str> = text.lines().collect();
        let [input, flags, time, ..] = lines.as_slice() else {
            return Err(format!("expected 3 lines, found {}", lines.len()));
        };
        let time: f64 = time
            .trim()
            .parse()
            .map_err(|e| format!("invalid time {:?}: {}", time.trim(), e))?;
        Ok(Self {
            input: input.trim().to_owned(),
            flags: flags.trim().to_owned(),
            time,
        })
    }

    pub fn to_artifact(&self) -> String {
        format!("{}\n{}\n{}\n", self.input, self.flags, self.time)
    }

    fn matches(&self, case: &TestCase) -> bool {
        self.input == case.input() && self.flags == case.flag_string()
    }
}

/// Location of the cached reference outputs and benchmark records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkStore {
    dir: PathBuf,
}

impl BenchmarkStore {
    pub const OUTPUT_DIR: &str = "output";
    pub const OUTPUT_EXTENSION: &str = "output";
    pub const BENCHMARK_EXTENSION: &str = "benchmark";

    /// The store kept under `root/output`.
    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(Self::OUTPUT_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn output_path(&self, test_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", test_id, Self::OUTPUT_EXTENSION))
    }

    pub fn benchmark_path(&self, test_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", test_id, Self::BENCHMARK_EXTENSION))
    }

    pub fn load(&self, test_id: &str) -> Result<BenchmarkRecord> {
        let file = SingleFileDriver::new(self.benchmark_path(test_id));
        if !file.exists() {
            return Err(Error::MissingBenchmark {
                test: test_id.to_owned(),
                path: file.filepath,
            });
        }
        let text = file.read()?;
        BenchmarkRecord::parse(&text).map_err(|reason| Error::MalformedBenchmark {
            path: file.filepath,
            reason,
        })
    }

    pub fn save(&self, test_id: &str, record: &BenchmarkRecord) -> Result<()> {
        SingleFileDriver::new(self.benchmark_path(test_id)).write(&record.to_artifact())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Regeneration {
    /// Invalid test cases have no reference output.
    InvalidCase,
    UpToDate,
    Generated(BenchmarkRecord),
}

/// Generates and caches the staff solution's output and runtime budget for each test.
#[derive(Debug)]
pub struct OutputGenerator<'a> {
    config: &'a Config,
    runner: &'a TestRunner,
    store: BenchmarkStore,
}

impl<'a> OutputGenerator<'a> {
    /// Floor for runtime budgets; tiny budgets turn timer noise into failures.
    pub const MIN_BENCHMARK_TIME: f64 = 0.003;

    /// Slack given to student submissions over the staff solution.
    pub const BENCHMARK_FACTOR: f64 = 1.5;

    pub fn new(config: &'a Config, runner: &'a TestRunner) -> Self {
        Self {
            config,
            runner,
            store: BenchmarkStore::in_dir(runner.sandbox().root()),
        }
    }

    pub fn store(&self) -> &BenchmarkStore {
        &self.store
    }

    pub fn budget_for(measured: f64) -> f64 {
        (measured * Self::BENCHMARK_FACTOR).max(Self::MIN_BENCHMARK_TIME)
    }

    fn exe_path(&self) -> PathBuf {
        self.runner
            .sandbox()
            .path(self.config.staff_solution_path())
    }

    /// Make sure the reference output and benchmark for `test_id` exist and are current.
    pub async fn ensure(&self, test_id: &str, case: &TestCase) -> Result<Regeneration> {
        if self.config.is_invalid_test_case(test_id) {
            return Ok(Regeneration::InvalidCase);
        }
        fsutil::mkdir_all(self.store.dir())?;

        if !self.should_remake(test_id, case)? {
            log::info!("Skipped output generation for test {}", test_id);
            return Ok(Regeneration::UpToDate);
        }
        log::info!("Generating output for test {}", test_id);

        let input_path = self.config.integration.test_dir.join(case.input());
        let (_, measured) = self
            .runner
            .run_with_flags_timed(
                &self.exe_path(),
                &input_path,
                &case.flag_string(),
                &self.store.output_path(test_id),
                RunOptions::STRICT,
            )
            .await?;

        let time = Self::budget_for(measured);
        log::info!("Got benchmark time {} for test {}", time, test_id);

        let record = BenchmarkRecord {
            input: case.input().to_owned(),
            flags: case.flag_string(),
            time,
        };
        self.store.save(test_id, &record)?;
        Ok(Regeneration::Generated(record))
    }

    fn should_remake(&self, test_id: &str, case: &TestCase) -> Result<bool> {
        let output = SingleFileDriver::new(self.store.output_path(test_id));
        let benchmark = SingleFileDriver::new(self.store.benchmark_path(test_id));
        if !output.exists() || !benchmark.exists() {
            return Ok(true);
        }

        let exe_mtime = fsutil::modified_time(self.exe_path())?;
        if exe_mtime > output.modified()? || exe_mtime > benchmark.modified()? {
            return Ok(true);
        }

        match self.store.load(test_id) {
            Ok(record) => Ok(!record.matches(case)),
            Err(e) => {
                log::warn!("Regenerating test {}: {:#}", test_id, e);
                Ok(true)
            }
        }
    }
}
