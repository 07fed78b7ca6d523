//! Teaching modules. The structured parts of a module (competences, criteria,
//! knowledge, content, files) are free-form JSON kept in TEXT columns.

use crate::db;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

/// A full module write. Every JSON field is stored as given, so a field left
/// out of a request resets to its empty default.
#[derive(Debug, Clone)]
pub struct ModuleInput {
    pub year: String,
    pub school: String,
    pub subject: String,
    pub title: String,
    pub description: String,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub session_length: Option<f64>,
    pub evaluable: bool,
    pub specific_competences: JsonValue,
    pub selected_criteria: JsonValue,
    pub basic_knowledge: JsonValue,
    pub content: JsonValue,
    pub files: JsonValue,
    /// `None` keeps the stored staff.
    pub teaching_staff: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleFilter {
    pub year: Option<String>,
    pub subject: Option<String>,
}

/// Session length in hours, kept to one decimal.
pub fn session_hours(raw: Option<f64>) -> Result<Option<f64>> {
    match raw {
        Some(hours) if hours < 0.0 || !hours.is_finite() => {
            Err(Error::bad_request("session_length must not be negative"))
        }
        Some(hours) => Ok(Some((hours * 10.0).round() / 10.0)),
        None => Ok(None),
    }
}

const MODULE_COLUMNS: &str = "id, year_id, school_id, subject_id, title, description,
    date_start, date_end, session_length, evaluable, specific_competences_json,
    selected_criteria_json, basic_knowledge_json, content_json, files_json";

fn module_row(r: &Row<'_>) -> rusqlite::Result<JsonValue> {
    let specific_competences: String = r.get(10)?;
    let selected_criteria: String = r.get(11)?;
    let basic_knowledge: String = r.get(12)?;
    let content: String = r.get(13)?;
    let files: String = r.get(14)?;
    Ok(json!({
        "id": r.get::<_, String>(0)?,
        "year": r.get::<_, String>(1)?,
        "school": r.get::<_, String>(2)?,
        "subject": r.get::<_, String>(3)?,
        "title": r.get::<_, String>(4)?,
        "description": r.get::<_, String>(5)?,
        "date_start": r.get::<_, Option<NaiveDate>>(6)?,
        "date_end": r.get::<_, Option<NaiveDate>>(7)?,
        "session_length": r.get::<_, Option<f64>>(8)?,
        "evaluable": r.get::<_, i64>(9)? != 0,
        "specific_competences": db::parse_json_text(&specific_competences, json!([])),
        "selected_criteria": db::parse_json_text(&selected_criteria, json!({})),
        "basic_knowledge": db::parse_json_text(&basic_knowledge, json!([])),
        "content": db::parse_json_text(&content, json!([])),
        "files": db::parse_json_text(&files, json!([])),
    }))
}

fn with_staff(conn: &Connection, mut module: JsonValue) -> Result<JsonValue> {
    let id = module["id"].as_str().unwrap_or_default().to_string();
    module["teaching_staff"] = json!(db::linked_ids(
        conn,
        "module_staff",
        "module_id",
        "user_id",
        &id
    )?);
    Ok(module)
}

pub fn module_json(conn: &Connection, module_id: &str) -> Result<JsonValue> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM modules WHERE id = ?", MODULE_COLUMNS),
            [module_id],
            module_row,
        )
        .optional()?;
    match row {
        Some(module) => with_staff(conn, module),
        None => Err(Error::not_found("module not found")),
    }
}

/// Newest `date_start` first; undated modules go last.
pub fn list_modules(conn: &Connection, filter: &ModuleFilter) -> Result<Vec<JsonValue>> {
    let mut sql = format!("SELECT {} FROM modules WHERE 1 = 1", MODULE_COLUMNS);
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
        .query_map(rusqlite::params_from_iter(args.iter()), module_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(|m| with_staff(conn, m)).collect()
}

pub fn create_module(conn: &Connection, input: &ModuleInput) -> Result<JsonValue> {
    let id = Uuid::new_v4().to_string();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO modules(
            id, year_id, school_id, subject_id, title, description, date_start, date_end,
            session_length, evaluable, specific_competences_json, selected_criteria_json,
            basic_knowledge_json, content_json, files_json
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            input.year,
            input.school,
            input.subject,
            input.title,
            input.description,
            input.date_start,
            input.date_end,
            input.session_length,
            input.evaluable as i64,
            db::json_text(&input.specific_competences),
            db::json_text(&input.selected_criteria),
            db::json_text(&input.basic_knowledge),
            db::json_text(&input.content),
            db::json_text(&input.files)
        ],
    )?;
    if let Some(staff) = &input.teaching_staff {
        db::replace_links(&tx, "module_staff", "module_id", "user_id", &id, staff)?;
    }
    tx.commit()?;
    tracing::debug!(module_id = %id, subject = %input.subject, "created module");
    module_json(conn, &id)
}

pub fn update_module(conn: &Connection, module_id: &str, input: &ModuleInput) -> Result<JsonValue> {
    let tx = conn.unchecked_transaction()?;
    let changed = tx.execute(
        "UPDATE modules
         SET year_id = ?, school_id = ?, subject_id = ?, title = ?, description = ?,
             date_start = ?, date_end = ?, session_length = ?, evaluable = ?,
             specific_competences_json = ?, selected_criteria_json = ?,
             basic_knowledge_json = ?, content_json = ?, files_json = ?
         WHERE id = ?",
        params![
            input.year,
            input.school,
            input.subject,
            input.title,
            input.description,
            input.date_start,
            input.date_end,
            input.session_length,
            input.evaluable as i64,
            db::json_text(&input.specific_competences),
            db::json_text(&input.selected_criteria),
            db::json_text(&input.basic_knowledge),
            db::json_text(&input.content),
            db::json_text(&input.files),
            module_id
        ],
    )?;
    if changed == 0 {
        return Err(Error::not_found("module not found"));
    }
    if let Some(staff) = &input.teaching_staff {
        db::replace_links(&tx, "module_staff", "module_id", "user_id", module_id, staff)?;
    }
    tx.commit()?;
    module_json(conn, module_id)
}

pub fn delete_module(conn: &Connection, module_id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM modules WHERE id = ?", [module_id])?;
    if changed == 0 {
        return Err(Error::not_found("module not found"));
    }
    Ok(())
}
