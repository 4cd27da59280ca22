use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

use crate::models::StudentRecord;

pub const CSV_HEADERS: [&str; 11] = [
    "Roll No",
    "Name",
    "Gender",
    "Date of Birth",
    "10th %",
    "12th %",
    "B.Tech %",
    "Backlogs",
    "Personal Email",
    "Domain Email",
    "Contact",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("eligible_students_{}.csv", date.format("%Y-%m-%d"))
}

/// US short date without zero padding, e.g. `4/9/2003`.
pub fn short_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

fn csv_row(student: &StudentRecord) -> [String; 11] {
    [
        student.roll_number.clone(),
        student.student_name.clone(),
        student.gender.clone(),
        short_date(student.date_of_birth),
        student.ssc_percentage.to_string(),
        student.inter_percentage.to_string(),
        student.btech_percentage.to_string(),
        student.backlog_count.to_string(),
        student.personal_email.clone(),
        student.domain_email.clone(),
        student.contact_number.clone(),
    ]
}

/// Writes a header plus one row per student, in the given order. Fields
/// holding commas, quotes or line breaks are quoted.
pub fn write_csv<W: Write>(students: &[StudentRecord], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADERS)?;
    for student in students {
        csv_writer.write_record(csv_row(student))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_to_dir(
    students: &[StudentRecord],
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(export_filename(date));
    let file = File::create(&path)?;
    write_csv(students, file)?;
    Ok(path)
}
