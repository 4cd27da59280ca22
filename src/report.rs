use std::fmt::Write;

use crate::export::short_date;
use crate::models::{EligibilityStats, ListResponse, StudentRecord};
use crate::portal::{Portal, View};

fn write_table(output: &mut String, students: &[StudentRecord]) {
    let _ = writeln!(
        output,
        "{:<12} {:<24} {:<8} {:<11} {:>7} {:>7} {:>8} {:>8}",
        "Roll No", "Name", "Gender", "DOB", "10th %", "12th %", "B.Tech %", "Backlogs"
    );

    for student in students {
        let _ = writeln!(
            output,
            "{:<12} {:<24} {:<8} {:<11} {:>7} {:>7} {:>8} {:>8}",
            student.roll_number,
            student.student_name,
            student.gender,
            short_date(student.date_of_birth),
            student.ssc_percentage,
            student.inter_percentage,
            student.btech_percentage,
            student.backlog_count
        );
    }
}

pub fn build_stats(stats: &EligibilityStats) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Statistics");
    let _ = writeln!(output, "- Total eligible: {}", stats.total_eligible);
    let _ = writeln!(
        output,
        "- Average B.Tech %: {}",
        stats.avg_btech_percentage.as_str()
    );
    let _ = writeln!(
        output,
        "- Male: {} / Female: {}",
        stats.gender_distribution.male, stats.gender_distribution.female
    );
    output
}

/// Renders whatever the portal currently displays.
pub fn build_portal_view(portal: &Portal) -> String {
    let mut output = String::new();

    match portal.view() {
        View::Criteria => {
            let _ = writeln!(output, "# Filter Criteria");
            match serde_json::to_string_pretty(portal.filters()) {
                Ok(filters) => {
                    let _ = writeln!(output, "{filters}");
                }
                Err(e) => {
                    let _ = writeln!(output, "(unprintable criteria: {e})");
                }
            }
            if portal.is_loading() {
                let _ = writeln!(output, "Filtering...");
            }
            if let Some(error) = portal.error() {
                let _ = writeln!(output);
                let _ = writeln!(output, "Error: {error}");
            }
        }
        View::Results => {
            let _ = writeln!(output, "# Eligible Students");
            if let Some(stats) = portal.stats() {
                output.push_str(&build_stats(stats));
            }
            let _ = writeln!(output);
            if portal.students().is_empty() {
                let _ = writeln!(output, "No students match these criteria.");
            } else {
                write_table(&mut output, portal.students());
            }
        }
    }

    output
}

pub fn build_list(response: &ListResponse) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} students from {}.{}",
        response.count, response.database, response.collection
    );
    if !response.data.is_empty() {
        write_table(&mut output, &response.data);
    }
    output
}
