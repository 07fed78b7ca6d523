//! Planning units: per-subject numbered slots, reconciled in bulk from the
//! planner grid or edited one at a time.

use crate::catalog;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// One row of a bulk update. Keyed by `unit_number` within the subject.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnitDescriptor {
    pub unit_number: i64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub learning_situation: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn blank_as_none<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SituationDetails {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanningUnit {
    pub id: String,
    pub subject: String,
    pub unit_number: i64,
    pub learning_situation: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub title: Option<String>,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_situation_details: Option<SituationDetails>,
}

const UNIT_SELECT: &str = "SELECT p.id, p.subject_id, p.unit_number, p.learning_situation_id,
        p.start_date, p.end_date, p.title, p.notes, ls.title, ls.description
     FROM planning_units p
     LEFT JOIN learning_situations ls ON ls.id = p.learning_situation_id";

fn unit_from_row(r: &Row<'_>) -> rusqlite::Result<PlanningUnit> {
    let details = match r.get::<_, Option<String>>(8)? {
        Some(title) => Some(SituationDetails {
            title,
            description: r.get::<_, Option<String>>(9)?.unwrap_or_default(),
        }),
        None => None,
    };
    Ok(PlanningUnit {
        id: r.get(0)?,
        subject: r.get(1)?,
        unit_number: r.get(2)?,
        learning_situation: r.get(3)?,
        start_date: r.get(4)?,
        end_date: r.get(5)?,
        title: r.get(6)?,
        notes: r.get(7)?,
        learning_situation_details: details,
    })
}

pub fn units_for_subject(conn: &Connection, subject_id: &str) -> Result<Vec<PlanningUnit>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.subject_id = ? ORDER BY p.unit_number",
        UNIT_SELECT
    ))?;
    let units = stmt
        .query_map([subject_id], unit_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(units)
}

pub fn list_units(conn: &Connection, subject_id: Option<&str>) -> Result<Vec<PlanningUnit>> {
    if let Some(subject_id) = subject_id {
        return units_for_subject(conn, subject_id);
    }
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY p.subject_id, p.unit_number",
        UNIT_SELECT
    ))?;
    let units = stmt
        .query_map([], unit_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(units)
}

pub fn get_unit(conn: &Connection, unit_id: &str) -> Result<PlanningUnit> {
    conn.query_row(
        &format!("{} WHERE p.id = ?", UNIT_SELECT),
        [unit_id],
        unit_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("planning unit not found"))
}

/// Upserts every descriptor, in order, by `(subject, unit_number)`.
///
/// Existing units get a full overwrite: a descriptor without a learning
/// situation clears the link. Units not mentioned are left alone. A repeated
/// `unit_number` means the last descriptor wins. Any store failure rolls the
/// whole batch back.
pub fn reconcile_planning_units(
    conn: &Connection,
    subject_id: &str,
    units: &[UnitDescriptor],
) -> Result<Vec<PlanningUnit>> {
    if !catalog::exists(conn, "subjects", subject_id)? {
        return Err(Error::not_found("Subject not found"));
    }

    let tx = conn.unchecked_transaction()?;
    let mut created = 0usize;
    let mut updated = 0usize;
    for unit in units {
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM planning_units WHERE subject_id = ? AND unit_number = ?",
                params![subject_id, unit.unit_number],
                |r| r.get(0),
            )
            .optional()?;
        match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE planning_units
                     SET learning_situation_id = ?, start_date = ?, end_date = ?, title = ?, notes = ?
                     WHERE id = ?",
                    params![
                        unit.learning_situation,
                        unit.start_date,
                        unit.end_date,
                        unit.title,
                        unit.notes,
                        id
                    ],
                )?;
                updated += 1;
            }
            None => {
                tx.execute(
                    "INSERT INTO planning_units(
                        id, subject_id, unit_number, learning_situation_id,
                        start_date, end_date, title, notes
                     ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        Uuid::new_v4().to_string(),
                        subject_id,
                        unit.unit_number,
                        unit.learning_situation,
                        unit.start_date,
                        unit.end_date,
                        unit.title,
                        unit.notes
                    ],
                )?;
                created += 1;
            }
        }
    }
    tx.commit()?;

    tracing::debug!(subject_id, created, updated, "reconciled planning units");
    units_for_subject(conn, subject_id)
}

fn check_situation_subject(
    conn: &Connection,
    subject_id: &str,
    learning_situation: Option<&str>,
) -> Result<()> {
    let Some(ls_id) = learning_situation else {
        return Ok(());
    };
    let owner: Option<String> = conn
        .query_row(
            "SELECT subject_id FROM learning_situations WHERE id = ?",
            [ls_id],
            |r| r.get(0),
        )
        .optional()?;
    match owner {
        None => Err(Error::bad_request(format!(
            "learning situation not found: {}",
            ls_id
        ))),
        Some(owner) if owner != subject_id => Err(Error::bad_request(
            "learning situation must belong to the same subject as the planning unit",
        )),
        Some(_) => Ok(()),
    }
}

pub fn create_unit(
    conn: &Connection,
    subject_id: &str,
    unit: &UnitDescriptor,
) -> Result<PlanningUnit> {
    if !catalog::exists(conn, "subjects", subject_id)? {
        return Err(Error::bad_request(format!("subject not found: {}", subject_id)));
    }
    check_situation_subject(conn, subject_id, unit.learning_situation.as_deref())?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO planning_units(
            id, subject_id, unit_number, learning_situation_id,
            start_date, end_date, title, notes
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            subject_id,
            unit.unit_number,
            unit.learning_situation,
            unit.start_date,
            unit.end_date,
            unit.title,
            unit.notes
        ],
    )?;
    get_unit(conn, &id)
}

/// Full overwrite of one unit; the subject may change too.
pub fn update_unit(
    conn: &Connection,
    unit_id: &str,
    subject_id: &str,
    unit: &UnitDescriptor,
) -> Result<PlanningUnit> {
    get_unit(conn, unit_id)?;
    check_situation_subject(conn, subject_id, unit.learning_situation.as_deref())?;
    conn.execute(
        "UPDATE planning_units
         SET subject_id = ?, unit_number = ?, learning_situation_id = ?,
             start_date = ?, end_date = ?, title = ?, notes = ?
         WHERE id = ?",
        params![
            subject_id,
            unit.unit_number,
            unit.learning_situation,
            unit.start_date,
            unit.end_date,
            unit.title,
            unit.notes,
            unit_id
        ],
    )?;
    get_unit(conn, unit_id)
}

pub fn delete_unit(conn: &Connection, unit_id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM planning_units WHERE id = ?", [unit_id])?;
    if changed == 0 {
        return Err(Error::not_found("planning unit not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> Connection {
        let conn = crate::db::open_in_memory().expect("db");
        conn.execute_batch(
            "INSERT INTO schools(id, name) VALUES('sch', 'IES Norte');
             INSERT INTO subjects(id, name, school_id) VALUES('math', 'Maths', 'sch');
             INSERT INTO subjects(id, name, school_id) VALUES('bio', 'Biology', 'sch');
             INSERT INTO learning_situations(id, school_id, subject_id, title, description)
                VALUES('ls-bio', 'sch', 'bio', 'Cells', 'Under the microscope');",
        )
        .expect("seed");
        conn
    }

    fn descriptor(value: serde_json::Value) -> UnitDescriptor {
        serde_json::from_value(value).expect("descriptor")
    }

    #[test]
    fn descriptor_treats_blank_situation_as_unlinked() {
        let d = descriptor(json!({ "unit_number": 3, "learning_situation": "", "start_date": null }));
        assert_eq!(d.learning_situation, None);
        assert_eq!(d.start_date, None);
    }

    #[test]
    fn descriptor_requires_integer_unit_number() {
        let r: std::result::Result<UnitDescriptor, _> =
            serde_json::from_value(json!({ "unit_number": "one" }));
        assert!(r.is_err());
        let r: std::result::Result<UnitDescriptor, _> = serde_json::from_value(json!({}));
        assert!(r.is_err());
    }

    #[test]
    fn single_create_rejects_situation_of_another_subject() {
        let conn = seeded();
        let d = descriptor(json!({ "unit_number": 1, "learning_situation": "ls-bio" }));
        assert!(matches!(
            create_unit(&conn, "math", &d),
            Err(Error::BadRequest(_))
        ));
        let unit = create_unit(&conn, "bio", &d).expect("create");
        let details = unit.learning_situation_details.expect("details");
        assert_eq!(details.title, "Cells");
    }

    #[test]
    fn missing_subject_writes_nothing() {
        let conn = seeded();
        let d = descriptor(json!({ "unit_number": 1 }));
        assert!(matches!(
            reconcile_planning_units(&conn, "nope", &[d]),
            Err(Error::NotFound(_))
        ));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM planning_units", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }
}
