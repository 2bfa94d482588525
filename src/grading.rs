use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};

/// Minimum percentage each marked component (theory, practical) must reach.
pub const COMPONENT_PASS_PERCENT: Decimal = dec!(35);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "NG")]
    NotGraded,
}

/// Total-percentage thresholds, highest first. Anything below the last row is NG.
const GRADE_TABLE: [(Decimal, Grade); 7] = [
    (dec!(90), Grade::APlus),
    (dec!(80), Grade::A),
    (dec!(70), Grade::BPlus),
    (dec!(60), Grade::B),
    (dec!(50), Grade::CPlus),
    (dec!(40), Grade::C),
    (dec!(35), Grade::D),
];

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::NotGraded => "NG",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(Grade::APlus),
            "A" => Some(Grade::A),
            "B+" => Some(Grade::BPlus),
            "B" => Some(Grade::B),
            "C+" => Some(Grade::CPlus),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "NG" => Some(Grade::NotGraded),
            _ => None,
        }
    }

    pub fn grade_point(self) -> Decimal {
        match self {
            Grade::APlus => dec!(4.00),
            Grade::A => dec!(3.60),
            Grade::BPlus => dec!(3.20),
            Grade::B => dec!(2.80),
            Grade::CPlus => dec!(2.40),
            Grade::C => dec!(2.00),
            Grade::D => dec!(1.60),
            Grade::NotGraded => dec!(0.00),
        }
    }

    pub fn is_failing(self) -> bool {
        self == Grade::NotGraded
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grade one subject from raw marks.
///
/// Callers validate `0 <= obtained <= full` beforehand; this function does not.
/// A component with zero full marks counts as fully passed. Percentages are
/// compared unrounded, so 90.00 exactly is A+ and 34.99 in either component is NG.
pub fn compute_grade(
    theory_obtained: Decimal,
    practical_obtained: Decimal,
    theory_full: Decimal,
    practical_full: Decimal,
) -> EngineResult<(Grade, Decimal)> {
    let total_full = checked_add(theory_full, practical_full)?;
    if total_full <= Decimal::ZERO {
        return Ok((Grade::NotGraded, Grade::NotGraded.grade_point()));
    }

    let theory_pct = component_percent(theory_obtained, theory_full)?;
    let practical_pct = component_percent(practical_obtained, practical_full)?;
    if theory_pct < COMPONENT_PASS_PERCENT || practical_pct < COMPONENT_PASS_PERCENT {
        return Ok((Grade::NotGraded, Grade::NotGraded.grade_point()));
    }

    let obtained = checked_add(theory_obtained, practical_obtained)?;
    let total_pct = percent_of(obtained, total_full)?;
    let grade = GRADE_TABLE
        .iter()
        .find(|(threshold, _)| total_pct >= *threshold)
        .map(|(_, g)| *g)
        .unwrap_or(Grade::NotGraded);
    Ok((grade, grade.grade_point()))
}

fn component_percent(obtained: Decimal, full: Decimal) -> EngineResult<Decimal> {
    if full > Decimal::ZERO {
        percent_of(obtained, full)
    } else {
        Ok(Decimal::ONE_HUNDRED)
    }
}

fn out_of_range(part: Decimal, whole: Decimal) -> EngineError {
    EngineError::validation_with(
        "marks are out of range",
        serde_json::json!({ "marks": part, "fullMarks": whole }),
    )
}

fn checked_add(a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_add(b).ok_or_else(|| out_of_range(a, b))
}

/// `part / whole * 100`, multiplying first to keep terminating results exact.
/// Returns zero for a non-positive `whole` and a validation error on overflow.
pub fn percent_of(part: Decimal, whole: Decimal) -> EngineResult<Decimal> {
    if whole <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    part.checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(whole))
        .ok_or_else(|| out_of_range(part, whole))
}

/// Round half away from zero and pin the scale to two fractional digits, the
/// storage precision of every mark, percentage and grade point.
pub fn round2(value: Decimal) -> Decimal {
    let mut v = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    v.rescale(2);
    v
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallGradePolicy {
    /// "PASS" when no subject failed, otherwise "NG".
    #[default]
    PassFail,
    /// Letter grade derived from the GPA when no subject failed, otherwise "NG".
    GpaLetter,
}

impl OverallGradePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pass_fail" => Some(Self::PassFail),
            "gpa_letter" => Some(Self::GpaLetter),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PassFail => "pass_fail",
            Self::GpaLetter => "gpa_letter",
        }
    }

    pub fn overall_grade(self, gpa: Decimal, has_failure: bool) -> String {
        if has_failure {
            return Grade::NotGraded.as_str().to_string();
        }
        match self {
            Self::PassFail => "PASS".to_string(),
            Self::GpaLetter => letter_for_gpa(gpa).as_str().to_string(),
        }
    }
}

fn letter_for_gpa(gpa: Decimal) -> Grade {
    if gpa >= dec!(3.6) {
        Grade::APlus
    } else if gpa >= dec!(3.2) {
        Grade::A
    } else if gpa >= dec!(2.8) {
        Grade::BPlus
    } else if gpa >= dec!(2.4) {
        Grade::B
    } else if gpa >= dec!(2.0) {
        Grade::CPlus
    } else if gpa >= dec!(1.6) {
        Grade::C
    } else {
        Grade::D
    }
}
