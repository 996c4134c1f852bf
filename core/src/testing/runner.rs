use std::path::Path;

use crate::error::{Error, Result};
use crate::sandbox::{Invocation, Redirect, RunOptions, RunStatus, Sandbox};

/// How a test's input file reaches the program under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum InputMode {
    /// `program < input flags...`
    Stdin,
    /// `program input flags...`
    Argument,
}

impl InputMode {
    pub fn from_tests_to_stdin(tests_to_stdin: bool) -> Self {
        if tests_to_stdin {
            InputMode::Stdin
        } else {
            InputMode::Argument
        }
    }
}

/// Runs staff and student executables inside a sandbox, optionally timing them.
/// It does not grade anything by itself.
#[derive(Debug, Clone)]
pub struct TestRunner {
    sandbox: Sandbox,
    input_mode: InputMode,
}

impl TestRunner {
    const BASH: &str = "bash";

    /// Runtime reported when the timing footer cannot be read. Large enough to land
    /// outside any runtime scale, so the case scores zero instead of aborting grading.
    pub const TIME_SENTINEL: f64 = 999.0;

    /// bash's default `time` format, pinned so an inherited `TIMEFORMAT` cannot change it.
    const TIMEFORMAT: &str = "\nreal\t%3lR\nuser\t%3lU\nsys\t%3lS";

    pub fn new(sandbox: Sandbox, input_mode: InputMode) -> Self {
        Self {
            sandbox,
            input_mode,
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    /// A runner whose commands execute in `dir` (relative to the sandbox root).
    pub fn within(&self, dir: impl AsRef<Path>) -> Self {
        Self {
            sandbox: self.sandbox.within(dir),
            input_mode: self.input_mode,
        }
    }

    /// `executable [< ]input flags... > output 2>/dev/null`
    pub fn command_with_flags(
        &self,
        executable: &Path,
        input_file: &Path,
        flags: &str,
        output_file: &Path,
    ) -> Invocation {
        let executable = if executable.is_relative() && executable.components().count() == 1 {
            Path::new(".").join(executable)
        } else {
            executable.to_owned()
        };

        let inv = Invocation::new(executable);
        let inv = match self.input_mode {
            InputMode::Stdin => inv.stdin(Redirect::File(input_file.to_owned())),
            InputMode::Argument => inv.arg(input_file.to_string_lossy()),
        };

        // Flags that came from the flags command carry a trailing newline.
        inv.args(flags.trim().split_whitespace())
            .stdout(Redirect::File(output_file.to_owned()))
            .stderr(Redirect::Null)
    }

    pub async fn run_with_flags(
        &self,
        executable: &Path,
        input_file: &Path,
        flags: &str,
        output_file: &Path,
        opts: RunOptions,
    ) -> Result<RunStatus> {
        let inv = self.command_with_flags(executable, input_file, flags, output_file);
        self.sandbox.run(&inv, opts).await
    }

    /// Same as [`TestRunner::run_with_flags`], but also measures the CPU time spent
    /// by the program using bash's `time` keyword, which has millisecond precision.
    ///
    /// Only "user" time is used: "sys" time varies too much between machines.
    pub async fn run_with_flags_timed(
        &self,
        executable: &Path,
        input_file: &Path,
        flags: &str,
        output_file: &Path,
        opts: RunOptions,
    ) -> Result<(RunStatus, f64)> {
        let inner = self.command_with_flags(executable, input_file, flags, output_file);
        let footer = tempfile::NamedTempFile::new().map_err(Error::TempFile)?;

        let inv = Invocation::new(Self::BASH)
            .arg("-c")
            .arg(format!("time {}", inner.to_shell()))
            .env("TIMEFORMAT", Self::TIMEFORMAT)
            .stderr(Redirect::File(footer.path().to_owned()));
        let status = self.sandbox.run(&inv, opts).await?;

        let seconds = match fsutil::read_to_string(footer.path()) {
            Ok(text) => self::user_seconds(&text),
            Err(e) => {
                log::warn!("Cannot read timing output: {:#}", e);
                Self::TIME_SENTINEL
            }
        };
        Ok((status, seconds))
    }
}

/// Parse the "user" line of bash's `time` footer, i.e. the second line from the end,
/// shaped like `user\t1m2.345s`.
pub fn parse_user_time(footer: &str) -> Option<f64> {
    let lines: Vec<&str> = footer.trim().lines().collect();
    let line = lines.len().checked_sub(2).map(|i| lines[i])?;
    let user_time = line.split_whitespace().nth(1)?;
    let (minutes, seconds) = user_time.split_once('m')?;
    let seconds = seconds.strip_suffix('s')?;

    let minutes: u32 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(seconds + 60.0 * f64::from(minutes))
}

/// [`parse_user_time`] falling back to [`TestRunner::TIME_SENTINEL`].
pub fn user_seconds(footer: &str) -> f64 {
    parse_user_time(footer).unwrap_or_else(|| {
        log::info!("Failed to read time from {:?}", footer);
        TestRunner::TIME_SENTINEL
    })
}
