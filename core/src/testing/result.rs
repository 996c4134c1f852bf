use serde::Serialize;

/// Verdict of an external judge.
///
/// `ratio` is the fraction of the test's points to award. It only means something
/// when the judge passed the student; otherwise [`JudgeResult::ratio`] is zero no
/// matter what the judge printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeResult {
    status: i32,
    ratio: f64,
}

impl JudgeResult {
    pub const PASSED: i32 = 0;
    pub const FAILED: i32 = 2;

    pub fn new(status: i32, ratio: Option<f64>) -> Self {
        Self {
            status,
            ratio: ratio.unwrap_or(1.0),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == Self::PASSED
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn ratio(&self) -> f64 {
        if self.passed() {
            self.ratio
        } else {
            0.0
        }
    }
}

/// Outcome of one integration test case. Created once per case, never updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub passed: bool,
    /// Awarded fraction of the test's weight, in `[0, 1]`.
    pub percent: f64,
    /// Measured CPU seconds.
    pub runtime: f64,
    pub runtime_budget: f64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ratio_defaults_to_full_credit() {
        let r = JudgeResult::new(JudgeResult::PASSED, None);
        assert!(r.passed());
        assert_eq!(r.ratio(), 1.0);
    }

    #[test]
    fn ratio_is_zero_when_failed() {
        let r = JudgeResult::new(JudgeResult::FAILED, Some(0.75));
        assert!(!r.passed());
        assert_eq!(r.status(), 2);
        assert_eq!(r.ratio(), 0.0);
    }

    #[test]
    fn ratio_is_kept_when_passed() {
        for x in [0.0, 0.25, 0.5, 1.0] {
            assert_eq!(JudgeResult::new(JudgeResult::PASSED, Some(x)).ratio(), x);
        }
    }
}
