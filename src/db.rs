use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::StudentRecord;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).context("invalid date")
}

pub fn seed_students() -> anyhow::Result<Vec<StudentRecord>> {
    let rows = vec![
        ("21A91A0501", "Avery Lee", "Male", date(2003, 4, 9)?, 88.0, 79.5, 70.0, 0, "9000000001"),
        ("21A91A0502", "Kiara Patel", "Female", date(2002, 11, 30)?, 91.0, 84.0, 60.0, 1, "9000000002"),
        ("21A91A0503", "Jules Moreno", "Male", date(2003, 1, 15)?, 76.0, 68.0, 66.5, 0, "9000000003"),
        ("21A91A0504", "Sana Reddy", "Female", date(2002, 7, 21)?, 95.0, 93.5, 82.3, 0, "9000000004"),
        ("21A91A0505", "Rohan Varma", "Male", date(2003, 3, 2)?, 64.0, 58.0, 61.2, 2, "9000000005"),
        ("21A91A0506", "Meera Nair", "Female", date(2002, 9, 12)?, 82.0, 77.0, 74.8, 0, "9000000006"),
    ];

    Ok(rows
        .into_iter()
        .map(
            |(roll, name, gender, dob, ssc, inter, btech, backlogs, contact)| StudentRecord {
                roll_number: roll.to_string(),
                student_name: name.to_string(),
                gender: gender.to_string(),
                date_of_birth: dob,
                ssc_percentage: ssc,
                inter_percentage: inter,
                btech_percentage: btech,
                backlog_count: backlogs,
                personal_email: format!(
                    "{}@example.com",
                    name.to_lowercase().replace(' ', ".")
                ),
                domain_email: format!("{}@college.edu", roll.to_lowercase()),
                contact_number: contact.to_string(),
            },
        )
        .collect())
}

/// Inserts or refreshes one record keyed by roll number. Returns whether a row
/// was written.
pub async fn upsert_student(pool: &PgPool, student: &StudentRecord) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO students
        (id, roll_number, student_name, gender, date_of_birth, ssc_percentage,
         inter_percentage, btech_percentage, backlog_count, personal_email,
         domain_email, contact_number)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (roll_number) DO UPDATE
        SET student_name = EXCLUDED.student_name,
            gender = EXCLUDED.gender,
            date_of_birth = EXCLUDED.date_of_birth,
            ssc_percentage = EXCLUDED.ssc_percentage,
            inter_percentage = EXCLUDED.inter_percentage,
            btech_percentage = EXCLUDED.btech_percentage,
            backlog_count = EXCLUDED.backlog_count,
            personal_email = EXCLUDED.personal_email,
            domain_email = EXCLUDED.domain_email,
            contact_number = EXCLUDED.contact_number
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&student.roll_number)
    .bind(&student.student_name)
    .bind(&student.gender)
    .bind(student.date_of_birth)
    .bind(student.ssc_percentage)
    .bind(student.inter_percentage)
    .bind(student.btech_percentage)
    .bind(student.backlog_count)
    .bind(&student.personal_email)
    .bind(&student.domain_email)
    .bind(&student.contact_number)
    .execute(pool)
    .await
    .with_context(|| format!("failed to upsert student {}", student.roll_number))?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let mut written = 0usize;
    for student in seed_students()? {
        if upsert_student(pool, &student).await? {
            written += 1;
        }
    }
    Ok(written)
}

#[derive(serde::Deserialize)]
struct CsvRow {
    roll_number: String,
    student_name: String,
    gender: String,
    date_of_birth: NaiveDate,
    ssc_percentage: f64,
    inter_percentage: f64,
    btech_percentage: f64,
    backlog_count: Option<i32>,
    personal_email: String,
    domain_email: String,
    contact_number: String,
}

/// Parses an import file with snake_case headers and ISO dates. An empty
/// `backlog_count` means zero.
pub fn read_import_rows(csv_path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut students = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let row = result.with_context(|| format!("invalid row on line {}", index + 2))?;
        students.push(StudentRecord {
            roll_number: row.roll_number,
            student_name: row.student_name,
            gender: row.gender,
            date_of_birth: row.date_of_birth,
            ssc_percentage: row.ssc_percentage,
            inter_percentage: row.inter_percentage,
            btech_percentage: row.btech_percentage,
            backlog_count: row.backlog_count.unwrap_or(0),
            personal_email: row.personal_email,
            domain_email: row.domain_email,
            contact_number: row.contact_number,
        });
    }

    Ok(students)
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for student in read_import_rows(csv_path)? {
        if upsert_student(pool, &student).await? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn seed_data_is_well_formed() {
        let students = seed_students().unwrap();
        assert_eq!(students.len(), 6);
        assert_eq!(students[0].personal_email, "avery.lee@example.com");
        assert_eq!(students[0].domain_email, "21a91a0501@college.edu");
        assert!(students.iter().all(|s| s.backlog_count >= 0));
    }

    #[test]
    fn import_rows_parse_with_default_backlogs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "roll_number,student_name,gender,date_of_birth,ssc_percentage,inter_percentage,\
             btech_percentage,backlog_count,personal_email,domain_email,contact_number"
        )
        .unwrap();
        writeln!(
            file,
            "A1,\"Lee, Avery\",Male,2003-04-09,88,79.5,70,,avery@example.com,a1@college.edu,9000000001"
        )
        .unwrap();
        writeln!(
            file,
            "A2,Kiara Patel,Female,2002-11-30,91,84,60,1,kiara@example.com,a2@college.edu,9000000002"
        )
        .unwrap();

        let students = read_import_rows(file.path()).unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].student_name, "Lee, Avery");
        assert_eq!(students[0].backlog_count, 0);
        assert_eq!(students[1].backlog_count, 1);
        assert_eq!(students[1].btech_percentage, 60.0);
    }

    #[test]
    fn import_reports_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "roll_number,student_name,gender,date_of_birth,ssc_percentage,inter_percentage,\
             btech_percentage,backlog_count,personal_email,domain_email,contact_number"
        )
        .unwrap();
        writeln!(
            file,
            "A1,Avery Lee,Male,not-a-date,88,79.5,70,0,avery@example.com,a1@college.edu,9000000001"
        )
        .unwrap();

        let err = read_import_rows(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
