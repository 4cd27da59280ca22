use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{StudentRecord, BOTH};

/// Criteria exactly as a caller submits them: every field optional and loosely
/// typed (number or numeric string). `null` and `""` both mean "absent".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCriteria {
    #[serde(default, alias = "minSecondaryPercentage", skip_serializing_if = "Option::is_none")]
    pub min_tenth_percentage: Option<Value>,
    #[serde(
        default,
        alias = "minHigherSecondaryPercentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_twelfth_percentage: Option<Value>,
    #[serde(
        default,
        alias = "minUndergraduatePercentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_ug_percentage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backlogs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaField {
    MinTenthPercentage,
    MinTwelfthPercentage,
    MinUgPercentage,
    MaxBacklogs,
    Gender,
}

impl CriteriaField {
    pub fn name(self) -> &'static str {
        match self {
            CriteriaField::MinTenthPercentage => "minTenthPercentage",
            CriteriaField::MinTwelfthPercentage => "minTwelfthPercentage",
            CriteriaField::MinUgPercentage => "minUgPercentage",
            CriteriaField::MaxBacklogs => "maxBacklogs",
            CriteriaField::Gender => "gender",
        }
    }
}

impl fmt::Display for CriteriaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CriteriaError {
    #[error("{field} must be a number, got {value}")]
    NotANumber { field: CriteriaField, value: String },

    #[error("{field} must be a whole number, got {value}")]
    NotAnInteger { field: CriteriaField, value: String },

    #[error("{field} must be a string, got {value}")]
    NotAString { field: CriteriaField, value: String },
}

/// Criteria after coercion. `gender` is `None` when the caller asked for no
/// gender constraint (absent, empty, or `"Both"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub min_tenth_percentage: Option<f64>,
    pub min_twelfth_percentage: Option<f64>,
    pub min_ug_percentage: Option<f64>,
    pub max_backlogs: Option<i64>,
    pub gender: Option<String>,
}

impl RawCriteria {
    pub fn get(&self, field: CriteriaField) -> Option<&Value> {
        match field {
            CriteriaField::MinTenthPercentage => self.min_tenth_percentage.as_ref(),
            CriteriaField::MinTwelfthPercentage => self.min_twelfth_percentage.as_ref(),
            CriteriaField::MinUgPercentage => self.min_ug_percentage.as_ref(),
            CriteriaField::MaxBacklogs => self.max_backlogs.as_ref(),
            CriteriaField::Gender => self.gender.as_ref(),
        }
    }

    pub fn set(&mut self, field: CriteriaField, value: Option<Value>) {
        let slot = match field {
            CriteriaField::MinTenthPercentage => &mut self.min_tenth_percentage,
            CriteriaField::MinTwelfthPercentage => &mut self.min_twelfth_percentage,
            CriteriaField::MinUgPercentage => &mut self.min_ug_percentage,
            CriteriaField::MaxBacklogs => &mut self.max_backlogs,
            CriteriaField::Gender => &mut self.gender,
        };
        *slot = value;
    }

    /// Coerces every present field, rejecting values that do not parse as the
    /// field's type instead of letting them reach the store.
    pub fn validate(&self) -> Result<FilterCriteria, CriteriaError> {
        Ok(FilterCriteria {
            min_tenth_percentage: self.percentage(CriteriaField::MinTenthPercentage)?,
            min_twelfth_percentage: self.percentage(CriteriaField::MinTwelfthPercentage)?,
            min_ug_percentage: self.percentage(CriteriaField::MinUgPercentage)?,
            max_backlogs: self.backlogs()?,
            gender: self.gender_constraint()?,
        })
    }

    fn present(&self, field: CriteriaField) -> Option<&Value> {
        match self.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn percentage(&self, field: CriteriaField) -> Result<Option<f64>, CriteriaError> {
        let Some(value) = self.present(field) else {
            return Ok(None);
        };

        let parsed = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };

        match parsed {
            Some(number) if number.is_finite() => Ok(Some(number)),
            _ => Err(CriteriaError::NotANumber {
                field,
                value: value.to_string(),
            }),
        }
    }

    fn backlogs(&self) -> Result<Option<i64>, CriteriaError> {
        let field = CriteriaField::MaxBacklogs;
        let Some(value) = self.present(field) else {
            return Ok(None);
        };

        let as_float = match value {
            Value::Number(number) => {
                if let Some(whole) = number.as_i64() {
                    return Ok(Some(whole));
                }
                number.as_f64()
            }
            Value::String(text) => {
                let text = text.trim();
                if let Ok(whole) = text.parse::<i64>() {
                    return Ok(Some(whole));
                }
                text.parse::<f64>().ok()
            }
            _ => None,
        };

        match as_float {
            Some(number) if !number.is_finite() => Err(CriteriaError::NotANumber {
                field,
                value: value.to_string(),
            }),
            Some(number)
                if number.fract() == 0.0
                    && number >= i64::MIN as f64
                    && number <= i64::MAX as f64 =>
            {
                Ok(Some(number as i64))
            }
            Some(_) => Err(CriteriaError::NotAnInteger {
                field,
                value: value.to_string(),
            }),
            None => Err(CriteriaError::NotANumber {
                field,
                value: value.to_string(),
            }),
        }
    }

    fn gender_constraint(&self) -> Result<Option<String>, CriteriaError> {
        match self.present(CriteriaField::Gender) {
            None => Ok(None),
            Some(Value::String(text)) if text == BOTH => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(other) => Err(CriteriaError::NotAString {
                field: CriteriaField::Gender,
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Ssc,
    Inter,
    Btech,
}

impl Score {
    pub fn column(self) -> &'static str {
        match self {
            Score::Ssc => "ssc_percentage",
            Score::Inter => "inter_percentage",
            Score::Btech => "btech_percentage",
        }
    }

    fn wire_name(self) -> &'static str {
        match self {
            Score::Ssc => "sscPercentage",
            Score::Inter => "interPercentage",
            Score::Btech => "btechPercentage",
        }
    }

    pub fn of(self, student: &StudentRecord) -> f64 {
        match self {
            Score::Ssc => student.ssc_percentage,
            Score::Inter => student.inter_percentage,
            Score::Btech => student.btech_percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Inclusive lower bound on a percentage.
    AtLeast(Score, f64),
    /// Inclusive upper bound on the backlog count.
    AtMostBacklogs(i64),
    GenderIs(String),
}

impl Clause {
    pub fn matches(&self, student: &StudentRecord) -> bool {
        match self {
            Clause::AtLeast(score, min) => score.of(student) >= *min,
            Clause::AtMostBacklogs(max) => i64::from(student.backlog_count) <= *max,
            Clause::GenderIs(gender) => student.gender == *gender,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::AtLeast(score, min) => write!(f, "{} >= {}", score.wire_name(), min),
            Clause::AtMostBacklogs(max) => write!(f, "backlogCount <= {max}"),
            Clause::GenderIs(gender) => write!(f, "gender == {gender:?}"),
        }
    }
}

/// Conjunction of clauses. The empty predicate matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub clauses: Vec<Clause>,
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, student: &StudentRecord) -> bool {
        self.clauses.iter().all(|clause| clause.matches(student))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("{}");
        }

        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

pub fn build_predicate(criteria: &FilterCriteria) -> Predicate {
    let mut clauses = Vec::new();

    if let Some(min) = criteria.min_tenth_percentage {
        clauses.push(Clause::AtLeast(Score::Ssc, min));
    }
    if let Some(min) = criteria.min_twelfth_percentage {
        clauses.push(Clause::AtLeast(Score::Inter, min));
    }
    if let Some(min) = criteria.min_ug_percentage {
        clauses.push(Clause::AtLeast(Score::Btech, min));
    }
    if let Some(max) = criteria.max_backlogs {
        clauses.push(Clause::AtMostBacklogs(max));
    }
    if let Some(gender) = &criteria.gender {
        clauses.push(Clause::GenderIs(gender.clone()));
    }

    Predicate { clauses }
}
