//! Filter form and results view.
//!
//! The portal flips between a criteria-entry view and a results view on a
//! single `show_filters` flag. Every submission takes a generation token;
//! only the response carrying the latest token may touch displayed state, so a
//! slow earlier request can never overwrite a newer one.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::client::{ClientError, EligibilityApi};
use crate::criteria::{CriteriaField, RawCriteria};
use crate::export::{self, ExportError};
use crate::models::{EligibilityStats, FilterResponse, StudentRecord, BOTH};

pub const FILTER_FAILED_MESSAGE: &str =
    "Failed to filter students. Please check your connection and backend API.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Criteria,
    Results,
}

/// Handle for one in-flight filter call.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTicket {
    generation: u64,
    criteria: RawCriteria,
}

impl FilterTicket {
    pub fn criteria(&self) -> &RawCriteria {
        &self.criteria
    }
}

pub fn default_criteria() -> RawCriteria {
    RawCriteria {
        min_tenth_percentage: Some(json!(60)),
        min_twelfth_percentage: Some(json!(60)),
        min_ug_percentage: Some(json!(65)),
        max_backlogs: Some(json!(0)),
        gender: Some(json!(BOTH)),
    }
}

#[derive(Debug, Clone)]
pub struct Portal {
    filters: RawCriteria,
    show_filters: bool,
    students: Vec<StudentRecord>,
    stats: Option<EligibilityStats>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl Default for Portal {
    fn default() -> Self {
        Self::new()
    }
}

impl Portal {
    pub fn new() -> Self {
        Self {
            filters: default_criteria(),
            show_filters: true,
            students: Vec::new(),
            stats: None,
            loading: false,
            error: None,
            generation: 0,
        }
    }

    pub fn view(&self) -> View {
        if self.show_filters {
            View::Criteria
        } else {
            View::Results
        }
    }

    pub fn filters(&self) -> &RawCriteria {
        &self.filters
    }

    pub fn students(&self) -> &[StudentRecord] {
        &self.students
    }

    pub fn stats(&self) -> Option<&EligibilityStats> {
        self.stats.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_filter(&mut self, field: CriteriaField, value: Value) {
        self.filters.set(field, Some(value));
    }

    /// Starts a filter call and supersedes any call still in flight.
    pub fn begin_filter(&mut self) -> FilterTicket {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        FilterTicket {
            generation: self.generation,
            criteria: self.filters.clone(),
        }
    }

    /// Applies a response if its ticket is still current. Returns `false` when
    /// the response was discarded as stale.
    pub fn finish_filter(
        &mut self,
        ticket: FilterTicket,
        result: Result<FilterResponse, ClientError>,
    ) -> bool {
        if ticket.generation != self.generation {
            return false;
        }

        self.loading = false;
        match result {
            Ok(response) => {
                self.students = response.data;
                self.stats = Some(response.stats);
                self.show_filters = false;
            }
            // Rejected criteria are the user's to fix, so show why.
            Err(ClientError::Server { status, message }) if status == StatusCode::BAD_REQUEST => {
                tracing::warn!("Filter criteria rejected: {message}");
                self.error = Some(message);
            }
            Err(err) => {
                tracing::warn!("Filter request failed: {err}");
                self.error = Some(FILTER_FAILED_MESSAGE.to_string());
            }
        }
        true
    }

    pub async fn submit(&mut self, api: &dyn EligibilityApi) -> bool {
        let ticket = self.begin_filter();
        let result = api.filter_eligible(ticket.criteria()).await;
        self.finish_filter(ticket, result)
    }

    /// Restores default criteria and clears results without a network call.
    /// Any in-flight response is discarded.
    pub fn reset(&mut self) {
        self.filters = default_criteria();
        self.students.clear();
        self.stats = None;
        self.show_filters = true;
        self.loading = false;
        self.error = None;
        self.generation += 1;
    }

    /// Back to the criteria form; fetched results stay.
    pub fn show_filters(&mut self) {
        self.show_filters = true;
    }

    pub fn export_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        export::write_csv(&self.students, writer)
    }

    pub fn export_to_dir(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf, ExportError> {
        export::export_to_dir(&self.students, dir, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AverageScore, GenderDistribution, ListResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn sample_student(roll: &str) -> StudentRecord {
        StudentRecord {
            roll_number: roll.to_string(),
            student_name: format!("Student {roll}"),
            gender: "Female".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2002, 12, 25).unwrap(),
            ssc_percentage: 90.0,
            inter_percentage: 85.0,
            btech_percentage: 75.0,
            backlog_count: 0,
            personal_email: format!("{roll}@example.com"),
            domain_email: format!("{roll}@college.edu"),
            contact_number: "9000000000".to_string(),
        }
    }

    fn response_with(rolls: &[&str]) -> FilterResponse {
        let data: Vec<StudentRecord> = rolls.iter().map(|roll| sample_student(roll)).collect();
        FilterResponse {
            success: true,
            count: data.len(),
            total_in_db: 10,
            stats: EligibilityStats {
                total_eligible: data.len(),
                avg_btech_percentage: AverageScore::Mean("75.00".to_string()),
                gender_distribution: GenderDistribution {
                    male: 0,
                    female: data.len(),
                },
            },
            data,
        }
    }

    fn server_error() -> ClientError {
        ClientError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Error filtering students: down".to_string(),
        }
    }

    struct RecordingApi {
        seen: Mutex<Vec<RawCriteria>>,
        fail: bool,
    }

    #[async_trait]
    impl EligibilityApi for RecordingApi {
        async fn list_all(&self) -> Result<ListResponse, ClientError> {
            Err(server_error())
        }

        async fn filter_eligible(
            &self,
            criteria: &RawCriteria,
        ) -> Result<FilterResponse, ClientError> {
            self.seen.lock().unwrap().push(criteria.clone());
            if self.fail {
                Err(server_error())
            } else {
                Ok(response_with(&["A1"]))
            }
        }
    }

    #[test]
    fn starts_in_criteria_view_with_defaults() {
        let portal = Portal::new();
        assert_eq!(portal.view(), View::Criteria);
        assert_eq!(portal.filters(), &default_criteria());
        assert!(portal.students().is_empty());
        assert!(portal.stats().is_none());
        assert!(!portal.is_loading());
    }

    #[tokio::test]
    async fn successful_submit_shows_results() {
        let api = RecordingApi {
            seen: Mutex::new(Vec::new()),
            fail: false,
        };
        let mut portal = Portal::new();
        portal.set_filter(CriteriaField::MinUgPercentage, json!("70"));

        assert!(portal.submit(&api).await);
        assert_eq!(portal.view(), View::Results);
        assert_eq!(portal.students().len(), 1);
        assert_eq!(portal.stats().unwrap().total_eligible, 1);
        assert!(!portal.is_loading());

        let seen = api.seen.lock().unwrap();
        assert_eq!(seen[0].min_ug_percentage, Some(json!("70")));
    }

    #[tokio::test]
    async fn failed_submit_stays_on_criteria_with_error() {
        let api = RecordingApi {
            seen: Mutex::new(Vec::new()),
            fail: true,
        };
        let mut portal = Portal::new();

        assert!(portal.submit(&api).await);
        assert_eq!(portal.view(), View::Criteria);
        assert_eq!(portal.error(), Some(FILTER_FAILED_MESSAGE));
        assert!(!portal.is_loading());

        // A retry clears the previous error as soon as it starts.
        let _ticket = portal.begin_filter();
        assert_eq!(portal.error(), None);
    }

    #[test]
    fn rejected_criteria_show_server_message() {
        let mut portal = Portal::new();
        portal.set_filter(CriteriaField::MinUgPercentage, json!("abc"));
        let ticket = portal.begin_filter();

        let message =
            "Invalid filter criteria: minUgPercentage must be a number, got \"abc\"".to_string();
        assert!(portal.finish_filter(
            ticket,
            Err(ClientError::Server {
                status: StatusCode::BAD_REQUEST,
                message: message.clone(),
            })
        ));
        assert_eq!(portal.view(), View::Criteria);
        assert_eq!(portal.error(), Some(message.as_str()));
        assert!(!portal.is_loading());
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut portal = Portal::new();
        let first = portal.begin_filter();
        let second = portal.begin_filter();

        assert!(portal.finish_filter(second, Ok(response_with(&["B1", "B2"]))));
        assert!(!portal.finish_filter(first, Ok(response_with(&["A1"]))));

        let rolls: Vec<&str> = portal
            .students()
            .iter()
            .map(|s| s.roll_number.as_str())
            .collect();
        assert_eq!(rolls, ["B1", "B2"]);
    }

    #[test]
    fn stale_error_does_not_mask_newer_results() {
        let mut portal = Portal::new();
        let first = portal.begin_filter();
        let second = portal.begin_filter();

        assert!(!portal.finish_filter(first, Err(server_error())));
        assert!(portal.is_loading());
        assert!(portal.finish_filter(second, Ok(response_with(&["A1"]))));
        assert_eq!(portal.error(), None);
        assert_eq!(portal.view(), View::Results);
    }

    #[test]
    fn show_filters_keeps_results() {
        let mut portal = Portal::new();
        let ticket = portal.begin_filter();
        portal.finish_filter(ticket, Ok(response_with(&["A1"])));

        portal.show_filters();
        assert_eq!(portal.view(), View::Criteria);
        assert_eq!(portal.students().len(), 1);
        assert!(portal.stats().is_some());
    }

    #[test]
    fn reset_restores_defaults_and_drops_in_flight_response() {
        let mut portal = Portal::new();
        portal.set_filter(CriteriaField::Gender, json!("Male"));
        let ticket = portal.begin_filter();

        portal.reset();
        assert_eq!(portal.filters(), &default_criteria());
        assert!(!portal.is_loading());
        assert!(!portal.finish_filter(ticket, Ok(response_with(&["A1"]))));
        assert!(portal.students().is_empty());
        assert_eq!(portal.view(), View::Criteria);
    }

    #[test]
    fn export_writes_current_results() {
        let mut portal = Portal::new();
        let ticket = portal.begin_filter();
        portal.finish_filter(ticket, Ok(response_with(&["A1", "A2"])));

        let mut buffer = Vec::new();
        portal.export_csv(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output.lines().count(), 3);
        assert!(output.lines().nth(1).unwrap().starts_with("A1,"));
    }
}
