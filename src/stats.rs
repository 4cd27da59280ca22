use crate::models::{
    AverageScore, EligibilityStats, FilterResponse, GenderDistribution, StudentRecord, FEMALE,
    MALE,
};

/// Matched records plus everything derived from them for one filter call.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityResult {
    pub students: Vec<StudentRecord>,
    pub total_in_db: u64,
    pub stats: EligibilityStats,
}

impl EligibilityResult {
    pub fn new(students: Vec<StudentRecord>, total_in_db: u64) -> Self {
        let stats = compute_stats(&students);
        Self {
            students,
            total_in_db,
            stats,
        }
    }

    pub fn into_response(self) -> FilterResponse {
        FilterResponse {
            success: true,
            count: self.students.len(),
            total_in_db: self.total_in_db,
            stats: self.stats,
            data: self.students,
        }
    }
}

/// Genders other than exactly "Male" or "Female" count toward `total_eligible`
/// but toward neither distribution bucket.
pub fn compute_stats(matched: &[StudentRecord]) -> EligibilityStats {
    let total_eligible = matched.len();

    let avg_btech_percentage = if matched.is_empty() {
        AverageScore::Empty
    } else {
        let sum: f64 = matched.iter().map(|s| s.btech_percentage).sum();
        AverageScore::Mean(round_to_hundredths(sum / total_eligible as f64))
    };

    let gender_distribution = GenderDistribution {
        male: matched.iter().filter(|s| s.gender == MALE).count(),
        female: matched.iter().filter(|s| s.gender == FEMALE).count(),
    };

    EligibilityStats {
        total_eligible,
        avg_btech_percentage,
        gender_distribution,
    }
}

/// Fixed two-decimal rendering, rounding half away from zero on `value * 100`.
pub fn round_to_hundredths(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}
