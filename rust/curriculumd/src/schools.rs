use crate::calendar;
use crate::catalog;
use crate::db;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct SchoolInput {
    pub name: String,
    pub region: Option<String>,
    pub school_type: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    /// `None` leaves the staff set untouched on update.
    pub teaching_staff: Option<Vec<String>>,
}

fn check_references(conn: &Connection, input: &SchoolInput) -> Result<()> {
    if let Some(region) = &input.region {
        if !catalog::exists(conn, "regions", region)? {
            return Err(Error::bad_request(format!("region not found: {}", region)));
        }
    }
    if let Some(school_type) = &input.school_type {
        if !catalog::exists(conn, "school_types", school_type)? {
            return Err(Error::bad_request(format!(
                "school_type not found: {}",
                school_type
            )));
        }
    }
    Ok(())
}

/// Creates a school together with everything that hangs off its creation:
/// staff links, the school type's default years and the academic calendar.
/// All of it commits or none of it does.
pub fn create_school(conn: &Connection, input: &SchoolInput, today: NaiveDate) -> Result<String> {
    check_references(conn, input)?;

    let school_id = Uuid::new_v4().to_string();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO schools(id, name, region_id, school_type_id, address, phone_number)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![
            school_id,
            input.name,
            input.region,
            input.school_type,
            input.address,
            input.phone_number
        ],
    )?;
    if let Some(staff) = &input.teaching_staff {
        db::replace_links(&tx, "school_staff", "school_id", "user_id", &school_id, staff)?;
    }
    if let Some(school_type) = &input.school_type {
        let defaults = catalog::school_type_default_years(&tx, school_type)?;
        if !defaults.is_empty() {
            db::replace_links(&tx, "school_years", "school_id", "year_id", &school_id, &defaults)?;
        }
    }
    calendar::bootstrap_school_calendar(&tx, &school_id, today)?;
    tx.commit()?;

    tracing::info!(school_id = %school_id, name = %input.name, "created school");
    Ok(school_id)
}

/// Plain field update. Never touches calendars or years.
pub fn update_school(conn: &Connection, school_id: &str, input: &SchoolInput) -> Result<()> {
    check_references(conn, input)?;
    let tx = conn.unchecked_transaction()?;
    let changed = tx.execute(
        "UPDATE schools
         SET name = ?, region_id = ?, school_type_id = ?, address = ?, phone_number = ?
         WHERE id = ?",
        params![
            input.name,
            input.region,
            input.school_type,
            input.address,
            input.phone_number,
            school_id
        ],
    )?;
    if changed == 0 {
        return Err(Error::not_found("school not found"));
    }
    if let Some(staff) = &input.teaching_staff {
        db::replace_links(&tx, "school_staff", "school_id", "user_id", school_id, staff)?;
    }
    tx.commit()?;
    Ok(())
}

pub fn delete_school(conn: &Connection, school_id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM schools WHERE id = ?", [school_id])?;
    if changed == 0 {
        return Err(Error::not_found("school not found"));
    }
    tracing::info!(school_id, "deleted school");
    Ok(())
}

/// Serialized school: nested region and school type, plus its years, each
/// listing only this school's subjects.
pub fn school_json(conn: &Connection, school_id: &str) -> Result<Option<JsonValue>> {
    let row = conn
        .query_row(
            "SELECT id, name, address, phone_number, region_id, school_type_id
             FROM schools WHERE id = ?",
            [school_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()?;
    let Some((id, name, address, phone_number, region_id, school_type_id)) = row else {
        return Ok(None);
    };

    let region = match region_id {
        Some(rid) => catalog::region_json(conn, &rid)?,
        None => None,
    };
    let school_type = match school_type_id {
        Some(tid) => catalog::school_type_json(conn, &tid)?,
        None => None,
    };
    let years = catalog::school_years_json(conn, &id)?;
    let teaching_staff = db::linked_ids(conn, "school_staff", "school_id", "user_id", &id)?;

    Ok(Some(json!({
        "id": id,
        "name": name,
        "address": address,
        "phone_number": phone_number,
        "region": region,
        "school_type": school_type,
        "years": years,
        "teaching_staff": teaching_staff,
    })))
}

pub fn list_schools(conn: &Connection) -> Result<Vec<JsonValue>> {
    let mut stmt = conn.prepare("SELECT id FROM schools ORDER BY name, rowid")?;
    let ids = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(school) = school_json(conn, &id)? {
            out.push(school);
        }
    }
    Ok(out)
}
