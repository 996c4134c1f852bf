use std::path::{Path, PathBuf};

/// Where one of the standard streams of a spawned process goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Inherit,
    Null,
    /// Path relative to the working directory of the invocation (or absolute).
    File(PathBuf),
    Piped,
}

/// A single process invocation.
///
/// The sandbox turns this into a real process without going through a shell;
/// [`Invocation::to_shell`] exists for logging and for wrappers that genuinely
/// need a shell (such as bash's `time` keyword).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    stdin: Redirect,
    stdout: Redirect,
    stderr: Redirect,
    envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdin: Redirect::Null,
            stdout: Redirect::Inherit,
            stderr: Redirect::Inherit,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Working directory, relative to the sandbox root.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stdin(mut self, r: Redirect) -> Self {
        self.stdin = r;
        self
    }

    pub fn stdout(mut self, r: Redirect) -> Self {
        self.stdout = r;
        self
    }

    pub fn stderr(mut self, r: Redirect) -> Self {
        self.stderr = r;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn get_stdin(&self) -> &Redirect {
        &self.stdin
    }

    pub fn get_stdout(&self) -> &Redirect {
        &self.stdout
    }

    pub fn get_stderr(&self) -> &Redirect {
        &self.stderr
    }

    pub fn get_envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Renders the invocation as a single POSIX shell command line.
    ///
    /// The working directory and environment are not part of the rendering.
    ///
    /// ```
    /// use gradekit_core::sandbox::{Invocation, Redirect};
    ///
    /// let inv = Invocation::new("./solution/market")
    ///     .args(["-v", "--mode=fast"])
    ///     .stdin(Redirect::File("tests/in 1.txt".into()))
    ///     .stdout(Redirect::File("out".into()))
    ///     .stderr(Redirect::Null);
    /// assert_eq!(
    ///     inv.to_shell(),
    ///     "./solution/market -v --mode=fast < 'tests/in 1.txt' > out 2>/dev/null"
    /// );
    /// ```
    pub fn to_shell(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 4);
        parts.push(shell_quote(&self.program.to_string_lossy()));
        parts.extend(self.args.iter().map(|a| shell_quote(a)));

        match &self.stdin {
            Redirect::File(p) => parts.push(format!("< {}", shell_quote(&p.to_string_lossy()))),
            Redirect::Null | Redirect::Inherit | Redirect::Piped => (),
        }
        match &self.stdout {
            Redirect::File(p) => parts.push(format!("> {}", shell_quote(&p.to_string_lossy()))),
            Redirect::Null => parts.push(">/dev/null".to_owned()),
            Redirect::Inherit | Redirect::Piped => (),
        }
        match &self.stderr {
            Redirect::File(p) => parts.push(format!("2> {}", shell_quote(&p.to_string_lossy()))),
            Redirect::Null => parts.push("2>/dev/null".to_owned()),
            Redirect::Inherit | Redirect::Piped => (),
        }
        parts.join(" ")
    }
}

/// Quote a word for a POSIX shell, leaving plain words untouched.
///
/// ```
/// use gradekit_core::sandbox::shell_quote;
///
/// assert_eq!(shell_quote("plain-word_1.txt"), "plain-word_1.txt");
/// assert_eq!(shell_quote("two words"), "'two words'");
/// assert_eq!(shell_quote("it's"), r#"'it'\''s'"#);
/// assert_eq!(shell_quote(""), "''");
/// ```
pub fn shell_quote(s: &str) -> String {
    let is_plain = |c: char| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c);
    if !s.is_empty() && s.chars().all(is_plain) {
        return s.to_owned();
    }
    format!("'{}'", s.replace('\'', r#"'\''"#))
}
