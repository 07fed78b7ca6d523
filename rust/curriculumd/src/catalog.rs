//! Reference data shared by several resources: regions, years, school types,
//! subjects and specific competences, rendered the way the API nests them.

use crate::db;
use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

pub fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ? LIMIT 1", table);
    Ok(conn
        .query_row(&sql, [id], |_r| Ok(()))
        .optional()?
        .is_some())
}

pub fn region_json(conn: &Connection, region_id: &str) -> Result<Option<JsonValue>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description FROM regions WHERE id = ?",
            [region_id],
            |r| {
                Ok(json!({
                    "id": r.get::<_, String>(0)?,
                    "name": r.get::<_, String>(1)?,
                    "description": r.get::<_, Option<String>>(2)?,
                }))
            },
        )
        .optional()?)
}

pub fn list_regions(conn: &Connection) -> Result<Vec<JsonValue>> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM regions ORDER BY name")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "description": r.get::<_, Option<String>>(2)?,
            }))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// `{id, name, description}`; default years are only listed by the
/// school-type endpoints.
pub fn school_type_json(conn: &Connection, school_type_id: &str) -> Result<Option<JsonValue>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description FROM school_types WHERE id = ?",
            [school_type_id],
            |r| {
                Ok(json!({
                    "id": r.get::<_, String>(0)?,
                    "name": r.get::<_, String>(1)?,
                    "description": r.get::<_, String>(2)?,
                }))
            },
        )
        .optional()?)
}

pub fn school_type_default_years(conn: &Connection, school_type_id: &str) -> Result<Vec<String>> {
    Ok(db::linked_ids(
        conn,
        "school_type_default_years",
        "school_type_id",
        "year_id",
        school_type_id,
    )?)
}

const SUBJECT_COLUMNS: &str = "id, name, description, year_id, region_id, school_id";

fn subject_rows(conn: &Connection, sql: &str, args: &[&str]) -> Result<Vec<JsonValue>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "description": r.get::<_, String>(2)?,
                "year": r.get::<_, Option<String>>(3)?,
                "region": r.get::<_, Option<String>>(4)?,
                "school": r.get::<_, String>(5)?,
            }))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|mut subject| -> Result<JsonValue> {
            let id = subject["id"].as_str().unwrap_or_default().to_string();
            subject["teaching_staff"] =
                json!(db::linked_ids(conn, "subject_staff", "subject_id", "user_id", &id)?);
            subject["specific_competences"] = json!(db::linked_ids(
                conn,
                "subject_competences",
                "subject_id",
                "competence_id",
                &id
            )?);
            Ok(subject)
        })
        .collect()
}

pub fn subject_json(conn: &Connection, subject_id: &str) -> Result<Option<JsonValue>> {
    let sql = format!("SELECT {} FROM subjects WHERE id = ?", SUBJECT_COLUMNS);
    Ok(subject_rows(conn, &sql, &[subject_id])?.into_iter().next())
}

pub fn list_subjects(conn: &Connection) -> Result<Vec<JsonValue>> {
    let sql = format!("SELECT {} FROM subjects ORDER BY name, rowid", SUBJECT_COLUMNS);
    subject_rows(conn, &sql, &[])
}

pub fn subjects_for_year(conn: &Connection, year_id: &str) -> Result<Vec<JsonValue>> {
    let sql = format!(
        "SELECT {} FROM subjects WHERE year_id = ? ORDER BY name, rowid",
        SUBJECT_COLUMNS
    );
    subject_rows(conn, &sql, &[year_id])
}

pub fn subjects_for_school_year(
    conn: &Connection,
    school_id: &str,
    year_id: &str,
) -> Result<Vec<JsonValue>> {
    let sql = format!(
        "SELECT {} FROM subjects WHERE school_id = ? AND year_id = ? ORDER BY name, rowid",
        SUBJECT_COLUMNS
    );
    subject_rows(conn, &sql, &[school_id, year_id])
}

fn year_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<JsonValue> {
    Ok(json!({
        "id": r.get::<_, String>(0)?,
        "name": r.get::<_, String>(1)?,
        "division": r.get::<_, Option<String>>(2)?,
    }))
}

/// A year with every subject attached to it.
pub fn year_json(conn: &Connection, year_id: &str) -> Result<Option<JsonValue>> {
    let row = conn
        .query_row(
            "SELECT id, name, division FROM years WHERE id = ?",
            [year_id],
            year_row,
        )
        .optional()?;
    let Some(mut year) = row else {
        return Ok(None);
    };
    year["subjects"] = json!(subjects_for_year(conn, year_id)?);
    Ok(Some(year))
}

pub fn list_years(conn: &Connection) -> Result<Vec<JsonValue>> {
    let mut stmt = conn.prepare("SELECT id, name, division FROM years ORDER BY name, rowid")?;
    let rows = stmt
        .query_map([], year_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|mut year| -> Result<JsonValue> {
            let id = year["id"].as_str().unwrap_or_default().to_string();
            year["subjects"] = json!(subjects_for_year(conn, &id)?);
            Ok(year)
        })
        .collect()
}

/// Years linked to a school, each carrying only that school's subjects.
pub fn school_years_json(conn: &Connection, school_id: &str) -> Result<Vec<JsonValue>> {
    let mut stmt = conn.prepare(
        "SELECT y.id, y.name, y.division
         FROM years y
         JOIN school_years sy ON sy.year_id = y.id
         WHERE sy.school_id = ?
         ORDER BY y.name, y.rowid",
    )?;
    let rows = stmt
        .query_map([school_id], year_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|mut year| -> Result<JsonValue> {
            let id = year["id"].as_str().unwrap_or_default().to_string();
            year["subjects"] = json!(subjects_for_school_year(conn, school_id, &id)?);
            Ok(year)
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct CompetenceFilter {
    pub region: Option<String>,
    pub subject: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompetenceInput {
    pub region: String,
    pub subject: Option<String>,
    pub year: Option<String>,
    pub code: String,
    pub description: String,
    pub evaluation_criteria: JsonValue,
}

const COMPETENCE_SELECT: &str = "SELECT c.id, c.region_id, c.subject_id, c.year_id, s.name, y.name,
        c.code, c.description, c.evaluation_criteria_json
     FROM specific_competences c
     LEFT JOIN subjects s ON s.id = c.subject_id
     LEFT JOIN years y ON y.id = c.year_id";

fn competence_row(r: &Row<'_>) -> rusqlite::Result<JsonValue> {
    let criteria: String = r.get(8)?;
    Ok(json!({
        "id": r.get::<_, String>(0)?,
        "region": r.get::<_, String>(1)?,
        "subject": r.get::<_, Option<String>>(2)?,
        "year": r.get::<_, Option<String>>(3)?,
        "subject_name": r.get::<_, Option<String>>(4)?,
        "year_name": r.get::<_, Option<String>>(5)?,
        "code": r.get::<_, String>(6)?,
        "description": r.get::<_, String>(7)?,
        "evaluation_criteria": db::parse_json_text(&criteria, json!([])),
    }))
}

/// Ordered by code. Each row carries its subject and year names.
pub fn list_competences(conn: &Connection, filter: &CompetenceFilter) -> Result<Vec<JsonValue>> {
    let mut sql = format!("{} WHERE 1 = 1", COMPETENCE_SELECT);
    let mut args: Vec<&str> = Vec::new();
    let filters = [
        ("c.region_id", &filter.region),
        ("c.subject_id", &filter.subject),
        ("c.year_id", &filter.year),
    ];
    for (column, value) in filters {
        if let Some(value) = value.as_deref() {
            sql.push_str(&format!(" AND {} = ?", column));
            args.push(value);
        }
    }
    sql.push_str(" ORDER BY c.code, c.rowid");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), competence_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn create_competence(conn: &Connection, input: &CompetenceInput) -> Result<JsonValue> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO specific_competences(
            id, region_id, subject_id, year_id, code, description, evaluation_criteria_json
         ) VALUES(?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            input.region,
            input.subject,
            input.year,
            input.code,
            input.description,
            db::json_text(&input.evaluation_criteria)
        ],
    )
    .map_err(|e| match Error::from(e) {
        Error::Conflict(_) => Error::conflict(format!(
            "a competence with code {} already exists for this region, subject and year",
            input.code
        )),
        other => other,
    })?;

    conn.query_row(
        &format!("{} WHERE c.id = ?", COMPETENCE_SELECT),
        [&id],
        competence_row,
    )
    .optional()?
    .ok_or_else(|| Error::Internal("competence missing after insert".into()))
}
