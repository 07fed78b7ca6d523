use crate::db;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningSituation {
    pub id: String,
    pub year: Option<String>,
    pub region: Option<String>,
    pub school: String,
    pub subject: String,
    pub teaching_staff: Vec<String>,
    pub title: String,
    pub description: String,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub specific_competences: Vec<String>,
    pub modules: Vec<String>,
}

/// Link sets are `None` when the request left them out; on update that keeps
/// the stored set.
#[derive(Debug, Clone, Default)]
pub struct SituationInput {
    pub year: Option<String>,
    pub region: Option<String>,
    pub school: String,
    pub subject: String,
    pub title: String,
    pub description: String,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub teaching_staff: Option<Vec<String>>,
    pub specific_competences: Option<Vec<String>>,
    pub modules: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SituationFilter {
    pub year: Option<String>,
    pub subject: Option<String>,
}

const SITUATION_COLUMNS: &str =
    "id, year_id, region_id, school_id, subject_id, title, description, date_start, date_end";

fn situation_from_row(r: &Row<'_>) -> rusqlite::Result<LearningSituation> {
    Ok(LearningSituation {
        id: r.get(0)?,
        year: r.get(1)?,
        region: r.get(2)?,
        school: r.get(3)?,
        subject: r.get(4)?,
        teaching_staff: Vec::new(),
        title: r.get(5)?,
        description: r.get(6)?,
        date_start: r.get(7)?,
        date_end: r.get(8)?,
        specific_competences: Vec::new(),
        modules: Vec::new(),
    })
}

fn with_links(conn: &Connection, mut ls: LearningSituation) -> Result<LearningSituation> {
    let id = ls.id.as_str();
    ls.teaching_staff = db::linked_ids(
        conn,
        "learning_situation_staff",
        "learning_situation_id",
        "user_id",
        id,
    )?;
    ls.specific_competences = db::linked_ids(
        conn,
        "learning_situation_competences",
        "learning_situation_id",
        "competence_id",
        id,
    )?;
    ls.modules = db::linked_ids(
        conn,
        "learning_situation_modules",
        "learning_situation_id",
        "module_id",
        id,
    )?;
    Ok(ls)
}

pub fn get_situation(conn: &Connection, situation_id: &str) -> Result<LearningSituation> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM learning_situations WHERE id = ?",
                SITUATION_COLUMNS
            ),
            [situation_id],
            situation_from_row,
        )
        .optional()?;
    match row {
        Some(ls) => with_links(conn, ls),
        None => Err(Error::not_found("learning situation not found")),
    }
}

/// Newest `date_start` first; undated situations go last.
pub fn list_situations(conn: &Connection, filter: &SituationFilter) -> Result<Vec<LearningSituation>> {
    let mut sql = format!(
        "SELECT {} FROM learning_situations WHERE 1 = 1",
        SITUATION_COLUMNS
    );
    let mut args: Vec<&str> = Vec::new();
    if let Some(year) = &filter.year {
        sql.push_str(" AND year_id = ?");
        args.push(year);
    }
    if let Some(subject) = &filter.subject {
        sql.push_str(" AND subject_id = ?");
        args.push(subject);
    }
    sql.push_str(" ORDER BY date_start IS NULL, date_start DESC, rowid");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), situation_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(|ls| with_links(conn, ls)).collect()
}

fn write_links(conn: &Connection, situation_id: &str, input: &SituationInput) -> Result<()> {
    if let Some(staff) = &input.teaching_staff {
        db::replace_links(
            conn,
            "learning_situation_staff",
            "learning_situation_id",
            "user_id",
            situation_id,
            staff,
        )?;
    }
    if let Some(competences) = &input.specific_competences {
        db::replace_links(
            conn,
            "learning_situation_competences",
            "learning_situation_id",
            "competence_id",
            situation_id,
            competences,
        )?;
    }
    if let Some(modules) = &input.modules {
        db::replace_links(
            conn,
            "learning_situation_modules",
            "learning_situation_id",
            "module_id",
            situation_id,
            modules,
        )?;
    }
    Ok(())
}

pub fn create_situation(conn: &Connection, input: &SituationInput) -> Result<LearningSituation> {
    let id = Uuid::new_v4().to_string();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO learning_situations(
            id, year_id, region_id, school_id, subject_id, title, description, date_start, date_end
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            input.year,
            input.region,
            input.school,
            input.subject,
            input.title,
            input.description,
            input.date_start,
            input.date_end
        ],
    )?;
    write_links(&tx, &id, input)?;
    tx.commit()?;
    tracing::debug!(situation_id = %id, subject = %input.subject, "created learning situation");
    get_situation(conn, &id)
}

pub fn update_situation(
    conn: &Connection,
    situation_id: &str,
    input: &SituationInput,
) -> Result<LearningSituation> {
    let tx = conn.unchecked_transaction()?;
    let changed = tx.execute(
        "UPDATE learning_situations
         SET year_id = ?, region_id = ?, school_id = ?, subject_id = ?, title = ?,
             description = ?, date_start = ?, date_end = ?
         WHERE id = ?",
        params![
            input.year,
            input.region,
            input.school,
            input.subject,
            input.title,
            input.description,
            input.date_start,
            input.date_end,
            situation_id
        ],
    )?;
    if changed == 0 {
        return Err(Error::not_found("learning situation not found"));
    }
    write_links(&tx, situation_id, input)?;
    tx.commit()?;
    get_situation(conn, situation_id)
}

pub fn delete_situation(conn: &Connection, situation_id: &str) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM learning_situations WHERE id = ?",
        [situation_id],
    )?;
    if changed == 0 {
        return Err(Error::not_found("learning situation not found"));
    }
    Ok(())
}
