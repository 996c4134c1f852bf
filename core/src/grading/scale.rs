use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

/// One `low-high:factor` interval of a runtime scale. `low` is inclusive, `high` exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub low: f64,
    pub high: f64,
    pub factor: f64,
}

/// Piecewise multiplier applied to a test's credit, keyed by the ratio of measured
/// runtime to budgeted runtime.
///
/// Written as space-separated tokens, e.g. `"0.00-1.00:1.00 1.00-2.00:0.95"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct RuntimeScale {
    bands: Vec<Band>,
}

impl RuntimeScale {
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Factor of the first interval (in written order) containing `ratio`, or 0.0 when
    /// no interval does.
    ///
    /// ```
    /// use gradekit_core::grading::RuntimeScale;
    ///
    /// let scale: RuntimeScale = "0-1:1.0 1-2:0.5".parse().unwrap();
    /// assert_eq!(scale.multiplier(0.99), 1.0);
    /// assert_eq!(scale.multiplier(1.0), 0.5);
    /// assert_eq!(scale.multiplier(2.0), 0.0);
    /// ```
    pub fn multiplier(&self, ratio: f64) -> f64 {
        self.bands
            .iter()
            .find(|b| b.low <= ratio && ratio < b.high)
            .map_or(0.0, |b| b.factor)
    }
}

impl FromStr for RuntimeScale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bands = s
            .split_whitespace()
            .map(parse_band)
            .collect::<Result<Vec<_>, _>>()?;
        if bands.is_empty() {
            return Err(Error::InvalidScale {
                token: s.to_owned(),
                reason: "runtime scale has no intervals",
            });
        }
        Ok(Self { bands })
    }
}

impl TryFrom<String> for RuntimeScale {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

fn parse_band(token: &str) -> Result<Band, Error> {
    let invalid = |reason| Error::InvalidScale {
        token: token.to_owned(),
        reason,
    };
    let (interval, factor) = token.split_once(':').ok_or_else(|| invalid("missing ':'"))?;
    let (low, high) = interval
        .split_once('-')
        .ok_or_else(|| invalid("missing '-' in interval"))?;

    let number = |s: &str| {
        s.parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| invalid("not a number"))
    };
    let band = Band {
        low: number(low)?,
        high: number(high)?,
        factor: number(factor)?,
    };
    if band.low > band.high {
        return Err(invalid("interval ends before it begins"));
    }
    Ok(band)
}
