pub mod invocation;
pub mod jail;
pub mod limits;

pub use invocation::*;
pub use jail::*;
pub use limits::*;

use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use tokio::process::Command;

use crate::error::{Error, Result};

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Exited(i32),
    Signaled(i32),
    /// Killed by the sandbox after exceeding the wall-clock guard of a limited run.
    TimedOut,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        *self == RunStatus::Exited(0)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            RunStatus::Exited(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        match (status.code(), status.signal()) {
            (Some(code), _) => RunStatus::Exited(code),
            (None, Some(sig)) => RunStatus::Signaled(sig),
            (None, None) => RunStatus::Exited(-1),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Exited(code) => write!(f, "status {}", code),
            RunStatus::Signaled(sig) => write!(f, "killed by signal {}", sig),
            RunStatus::TimedOut => write!(f, "timed out"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Return a non-zero status to the caller instead of failing.
    pub accept_failure: bool,
    /// Apply the sandbox's resource limits.
    pub limited: bool,
}

impl RunOptions {
    pub const STRICT: Self = Self {
        accept_failure: false,
        limited: false,
    };

    pub const TOLERANT: Self = Self {
        accept_failure: true,
        limited: false,
    };

    pub const LIMITED: Self = Self {
        accept_failure: true,
        limited: true,
    };
}

/// A working directory plus optional resource limits.
///
/// A sandbox never changes the current directory of the grading process: every
/// invocation carries its own working directory, resolved against [`Sandbox::root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
    limits: Option<Limits>,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>, limits: Limits) -> Self {
        Self {
            root: root.into(),
            limits: Some(limits),
        }
    }

    /// A sandbox that only provides path convenience, for trusted staff commands.
    pub fn unlimited(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            limits: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// The same sandbox rooted at a subdirectory.
    pub fn within(&self, dir: impl AsRef<Path>) -> Sandbox {
        Sandbox {
            root: self.root.join(dir),
            limits: self.limits,
        }
    }

    pub async fn run(&self, inv: &Invocation, opts: RunOptions) -> Result<RunStatus> {
        self.execute(inv, opts).await.map(|(status, _)| status)
    }

    /// Same as [`Sandbox::run`], but captures standard output.
    pub async fn output(&self, inv: &Invocation, opts: RunOptions) -> Result<(RunStatus, String)> {
        let inv = inv.clone().stdout(Redirect::Piped);
        let (status, stdout) = self.execute(&inv, opts).await?;
        Ok((status, String::from_utf8_lossy(&stdout).into_owned()))
    }

    async fn execute(&self, inv: &Invocation, opts: RunOptions) -> Result<(RunStatus, Vec<u8>)> {
        let dir = match inv.get_current_dir() {
            Some(d) => self.root.join(d),
            None => self.root.clone(),
        };
        let command_line = inv.to_shell();
        let limits = if opts.limited {
            let limits = self
                .limits
                .ok_or_else(|| Error::MissingLimits(self.root.clone()))?;
            Some(limits)
        } else {
            None
        };

        log::info!(
            "Running command '{}'{} in {}",
            command_line,
            if limits.is_some() { " (limited)" } else { "" },
            dir.to_string_lossy()
        );

        let mut cmd = Command::new(resolve_program(&dir, inv.get_program()));
        cmd.args(inv.get_args())
            .current_dir(&dir)
            .stdin(open_stdio(&dir, inv.get_stdin(), false)?)
            .stdout(open_stdio(&dir, inv.get_stdout(), true)?)
            .stderr(open_stdio(&dir, inv.get_stderr(), true)?)
            .kill_on_drop(true);
        for (k, v) in inv.get_envs() {
            cmd.env(k, v);
        }
        if let Some(limits) = &limits {
            limits.install(&mut cmd);
        }

        let child = cmd.spawn().map_err(|source| Error::Spawn {
            command: command_line.clone(),
            source,
        })?;
        let pid = child.id();
        let waiting = child.wait_with_output();

        let output = match limits.map(|l| l.wall_clock()) {
            Some(deadline) => match tokio::time::timeout(deadline, waiting).await {
                Ok(res) => Some(res),
                Err(_) => {
                    if let Some(pid) = pid {
                        // The child leads its own process group; take the whole tree down.
                        unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
                    }
                    log::info!("Command timed out after {:?}: '{}'", deadline, command_line);
                    None
                }
            },
            None => Some(waiting.await),
        };

        let (status, stdout) = match output {
            Some(res) => {
                let out = res.map_err(|source| Error::Spawn {
                    command: command_line.clone(),
                    source,
                })?;
                (RunStatus::from(out.status), out.stdout)
            }
            None => (RunStatus::TimedOut, Vec::new()),
        };

        if !status.success() && !opts.accept_failure {
            return Err(Error::CommandFailed {
                command: command_line,
                status,
            });
        }
        Ok((status, stdout))
    }
}

/// Paths with a directory part are resolved against the working directory,
/// bare names are looked up in `PATH`.
fn resolve_program(dir: &Path, program: &Path) -> PathBuf {
    if program.is_relative() && program.components().count() > 1 {
        dir.join(program)
    } else {
        program.to_owned()
    }
}

fn open_stdio(dir: &Path, r: &Redirect, write: bool) -> Result<Stdio> {
    let stdio = match r {
        Redirect::Inherit => Stdio::inherit(),
        Redirect::Null => Stdio::null(),
        Redirect::Piped => Stdio::piped(),
        Redirect::File(p) => {
            let path = dir.join(p);
            let file = if write {
                File::create(&path)
            } else {
                File::open(&path)
            };
            let file = file.map_err(|source| Error::Redirect { path, source })?;
            Stdio::from(file)
        }
    };
    Ok(stdio)
}
