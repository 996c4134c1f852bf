//! The contract with external judge programs.
//!
//! A judge is invoked as `judge <expected-output> <student-output> <input>` and must
//! exit with 0 (pass) or 2 (fail); any other outcome means the judge itself is broken.
//! On a pass, the first line of standard output, if any, is the ratio of points to
//! award. Everything else the judge prints is feedback for a human.

use std::path::Path;

use super::{result::JudgeResult, runner::TestRunner};
use crate::error::{Error, Result};
use crate::sandbox::{Invocation, RunOptions, RunStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Print,
    Suppress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeReport {
    pub result: JudgeResult,
    pub feedback: String,
}

impl JudgeReport {
    /// Interpret what a judge printed, given whether it passed the student.
    pub fn parse(passed: bool, stdout: &str) -> Result<Self> {
        if !passed {
            return Ok(Self {
                result: JudgeResult::new(JudgeResult::FAILED, None),
                feedback: stdout.to_owned(),
            });
        }
        if stdout.trim().is_empty() {
            return Ok(Self {
                result: JudgeResult::new(JudgeResult::PASSED, None),
                feedback: String::new(),
            });
        }

        let (first, rest) = stdout.split_once('\n').unwrap_or((stdout, ""));
        let ratio: f64 = first.trim().parse().map_err(|_| Error::MalformedRatio {
            line: first.to_owned(),
        })?;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(Error::RatioOutOfRange(ratio));
        }
        log::info!("Got ratio {} for judge.", ratio);

        Ok(Self {
            result: JudgeResult::new(JudgeResult::PASSED, Some(ratio)),
            feedback: rest.to_owned(),
        })
    }
}

impl TestRunner {
    /// Run `judge` on the given files and interpret its verdict.
    pub async fn judge(
        &self,
        judge: &Path,
        expected_file: &Path,
        student_file: &Path,
        input_file: &Path,
        feedback: Feedback,
    ) -> Result<JudgeResult> {
        let inv = Invocation::new(judge).args([
            expected_file.to_string_lossy(),
            student_file.to_string_lossy(),
            input_file.to_string_lossy(),
        ]);
        let (status, stdout) = self.sandbox().output(&inv, RunOptions::TOLERANT).await?;

        let passed = match status {
            RunStatus::Exited(JudgeResult::PASSED) => true,
            RunStatus::Exited(JudgeResult::FAILED) => false,
            status => {
                return Err(Error::JudgeCrashed {
                    command: inv.to_shell(),
                    status,
                })
            }
        };
        let report = JudgeReport::parse(passed, &stdout)?;

        let text = report.feedback.trim();
        if feedback == Feedback::Print && !text.is_empty() {
            println!("{}", text);
        }
        Ok(report.result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sandbox::Sandbox;
    use crate::testing::InputMode;
    use crate::testutil::write_script;

    #[test]
    fn pass_without_output_is_full_credit() {
        let r = JudgeReport::parse(true, "  \n").unwrap();
        assert!(r.result.passed());
        assert_eq!(r.result.ratio(), 1.0);
    }

    #[test]
    fn pass_with_ratio_line() {
        let r = JudgeReport::parse(true, "0.5\ntour length 120 (best 60)\n").unwrap();
        assert_eq!(r.result.ratio(), 0.5);
        assert_eq!(r.feedback, "tour length 120 (best 60)\n");

        let r = JudgeReport::parse(true, "1.0\n").unwrap();
        assert_eq!(r.result.ratio(), 1.0);
        assert_eq!(r.feedback, "");
    }

    #[test]
    fn fail_ignores_printed_ratio() {
        let r = JudgeReport::parse(false, "0.9\nline 3 differs\n").unwrap();
        assert!(!r.result.passed());
        assert_eq!(r.result.ratio(), 0.0);
        assert_eq!(r.feedback, "0.9\nline 3 differs\n");
    }

    #[test]
    fn malformed_ratio_is_fatal() {
        let err = JudgeReport::parse(true, "looks good\n").unwrap_err();
        assert!(matches!(err, Error::MalformedRatio { line } if line == "looks good"));

        let err = JudgeReport::parse(true, "\n0.5\n").unwrap_err();
        assert!(matches!(err, Error::MalformedRatio { .. }));
    }

    #[test]
    fn out_of_range_ratio_is_fatal() {
        for out in ["1.5\n", "-0.1\n", "NaN\n"] {
            let err = JudgeReport::parse(true, out).unwrap_err();
            assert!(matches!(err, Error::RatioOutOfRange(_)), "{:?}", out);
        }
    }

    #[tokio::test]
    async fn judge_exit_codes() {
        let tmp = tempfile::tempdir().unwrap();
        let pass = write_script(tmp.path(), "pass.sh", "echo 0.25; echo close enough");
        let fail = write_script(tmp.path(), "fail.sh", "echo 0.25; exit 2");
        let crash = write_script(tmp.path(), "crash.sh", "exit 1");
        let r = TestRunner::new(Sandbox::unlimited(tmp.path()), InputMode::Stdin);
        let (e, s, i) = (Path::new("e"), Path::new("s"), Path::new("i"));

        let res = r.judge(&pass, e, s, i, Feedback::Suppress).await.unwrap();
        assert_eq!(res, JudgeResult::new(0, Some(0.25)));

        let res = r.judge(&fail, e, s, i, Feedback::Suppress).await.unwrap();
        assert!(!res.passed());
        assert_eq!(res.ratio(), 0.0);

        let err = r.judge(&crash, e, s, i, Feedback::Suppress).await.unwrap_err();
        assert!(matches!(
            err,
            Error::JudgeCrashed {
                status: RunStatus::Exited(1),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn judge_receives_files_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let judge = write_script(
            tmp.path(),
            "judge.sh",
            r#"[ "$1" = expected.out ] && [ "$2" = student.out ] && [ "$3" = in.txt ] || exit 2"#,
        );
        let r = TestRunner::new(Sandbox::unlimited(tmp.path()), InputMode::Stdin);
        let res = r
            .judge(
                &judge,
                Path::new("expected.out"),
                Path::new("student.out"),
                Path::new("in.txt"),
                Feedback::Print,
            )
            .await
            .unwrap();
        assert!(res.passed());
    }
}
