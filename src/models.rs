use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

pub const MALE: &str = "Male";
pub const FEMALE: &str = "Female";
/// Gender selector value meaning "no constraint".
pub const BOTH: &str = "Both";

pub const STUDENTS_COLLECTION: &str = "students";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub roll_number: String,
    pub student_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub ssc_percentage: f64,
    pub inter_percentage: f64,
    pub btech_percentage: f64,
    #[serde(default)]
    pub backlog_count: i32,
    pub personal_email: String,
    pub domain_email: String,
    pub contact_number: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderDistribution {
    pub male: usize,
    pub female: usize,
}

/// Average undergraduate percentage as it travels on the wire: the number `0`
/// for an empty match, otherwise a fixed two-decimal string such as `"70.00"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AverageScore {
    Empty,
    Mean(String),
}

impl AverageScore {
    pub fn as_str(&self) -> &str {
        match self {
            AverageScore::Empty => "0",
            AverageScore::Mean(value) => value,
        }
    }
}

impl Serialize for AverageScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AverageScore::Empty => serializer.serialize_u8(0),
            AverageScore::Mean(value) => serializer.serialize_str(value),
        }
    }
}

impl<'de> Deserialize<'de> for AverageScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(f64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(value) => AverageScore::Mean(value),
            Repr::Number(value) if value == 0.0 => AverageScore::Empty,
            Repr::Number(value) => AverageScore::Mean(format!("{value:.2}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityStats {
    pub total_eligible: usize,
    pub avg_btech_percentage: AverageScore,
    pub gender_distribution: GenderDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResponse {
    pub success: bool,
    pub count: usize,
    pub total_in_db: u64,
    pub stats: EligibilityStats,
    pub data: Vec<StudentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    pub count: usize,
    pub database: String,
    pub collection: String,
    pub data: Vec<StudentRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsResponse {
    pub success: bool,
    pub message: &'static str,
    pub database: String,
    pub model_collection: String,
    pub total_students: u64,
    pub fields: Vec<String>,
    pub sample_data: StudentRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub error: String,
}
