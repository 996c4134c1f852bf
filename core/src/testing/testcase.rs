use std::{fmt, str::FromStr};

use serde::Deserialize;

/// One integration test: an input file (relative to the test directory) and the
/// command-line flags to pass along with it.
///
/// In the config file a test case is written as `"<input-file> [flags...]"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct TestCase {
    input: String,
    flags: Vec<String>,
}

impl TestCase {
    pub fn new<I, S>(input: impl Into<String>, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: input.into(),
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// The flags joined by single spaces, as recorded in benchmark artifacts.
    pub fn flag_string(&self) -> String {
        self.flags.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyTestCase;

impl fmt::Display for EmptyTestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test case has no input file")
    }
}

impl std::error::Error for EmptyTestCase {}

impl FromStr for TestCase {
    type Err = EmptyTestCase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let input = words.next().ok_or(EmptyTestCase)?;
        Ok(Self::new(input, words))
    }
}

impl TryFrom<String> for TestCase {
    type Error = EmptyTestCase;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_input_and_flags() {
        let t: TestCase = "  sort-1.txt  -v   --mode fast ".parse().unwrap();
        assert_eq!(t.input(), "sort-1.txt");
        assert_eq!(t.flags(), ["-v", "--mode", "fast"]);
        assert_eq!(t.flag_string(), "-v --mode fast");
    }

    #[test]
    fn parse_without_flags() {
        let t: TestCase = "in.txt".parse().unwrap();
        assert_eq!(t, TestCase::new("in.txt", Vec::<String>::new()));
        assert_eq!(t.flag_string(), "");
    }

    #[test]
    fn parse_empty_is_an_error() {
        assert_eq!("   ".parse::<TestCase>(), Err(EmptyTestCase));
    }
}
