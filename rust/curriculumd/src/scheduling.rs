//! Learning situations placed on a term, and their order within it.
//!
//! Every read and write is scoped to the schools whose teaching staff
//! includes the caller; anything outside that scope reads as missing.

use crate::calendar;
use crate::error::{Error, Result};
use crate::situations::{self, LearningSituation};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledSituation {
    pub id: String,
    pub learning_situation: LearningSituation,
    pub term: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub order: i64,
}

#[derive(Debug, Clone)]
pub struct ScheduleInput {
    pub learning_situation_id: String,
    pub term: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub order: Option<i64>,
}

const SCOPED_SELECT: &str = "SELECT s.id, s.learning_situation_id, s.term_id, s.start_date, s.end_date, s.sort_order
     FROM scheduled_situations s
     JOIN learning_situations ls ON ls.id = s.learning_situation_id
     JOIN school_staff ss ON ss.school_id = ls.school_id
     WHERE ss.user_id = ?";

type ScheduleRow = (String, String, String, NaiveDate, NaiveDate, i64);

fn schedule_row(r: &Row<'_>) -> rusqlite::Result<ScheduleRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
    ))
}

fn hydrate(conn: &Connection, row: ScheduleRow) -> Result<ScheduledSituation> {
    let (id, ls_id, term, start_date, end_date, order) = row;
    Ok(ScheduledSituation {
        id,
        learning_situation: situations::get_situation(conn, &ls_id)?,
        term,
        start_date,
        end_date,
        order,
    })
}

/// Ordered by term, then position, then start date.
pub fn list_scheduled(
    conn: &Connection,
    user_id: &str,
    term_id: Option<&str>,
) -> Result<Vec<ScheduledSituation>> {
    let mut sql = SCOPED_SELECT.to_string();
    let mut args: Vec<&str> = vec![user_id];
    if let Some(term_id) = term_id {
        sql.push_str(" AND s.term_id = ?");
        args.push(term_id);
    }
    sql.push_str(" ORDER BY s.term_id, s.sort_order, s.start_date, s.rowid");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), schedule_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(|row| hydrate(conn, row)).collect()
}

pub fn get_scheduled(conn: &Connection, user_id: &str, id: &str) -> Result<ScheduledSituation> {
    let row = conn
        .query_row(
            &format!("{} AND s.id = ?", SCOPED_SELECT),
            params![user_id, id],
            schedule_row,
        )
        .optional()?;
    match row {
        Some(row) => hydrate(conn, row),
        None => Err(Error::not_found("scheduled situation not found")),
    }
}

fn situation_visible(conn: &Connection, user_id: &str, ls_id: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1
             FROM learning_situations ls
             JOIN school_staff ss ON ss.school_id = ls.school_id
             WHERE ss.user_id = ? AND ls.id = ?",
            params![user_id, ls_id],
            |_r| Ok(()),
        )
        .optional()?
        .is_some())
}

fn check_input(conn: &Connection, user_id: &str, input: &ScheduleInput) -> Result<()> {
    if !situation_visible(conn, user_id, &input.learning_situation_id)? {
        return Err(Error::bad_request(format!(
            "learning situation not found: {}",
            input.learning_situation_id
        )));
    }
    match calendar::get_term_for_user(conn, user_id, &input.term) {
        Ok(_) => {}
        Err(Error::NotFound(_)) => {
            return Err(Error::bad_request(format!("term not found: {}", input.term)));
        }
        Err(e) => return Err(e),
    }
    if input.end_date < input.start_date {
        return Err(Error::bad_request("end_date must not be before start_date"));
    }
    Ok(())
}

pub fn create_scheduled(
    conn: &Connection,
    user_id: &str,
    input: &ScheduleInput,
) -> Result<ScheduledSituation> {
    check_input(conn, user_id, input)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO scheduled_situations(id, learning_situation_id, term_id, start_date, end_date, sort_order)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![
            id,
            input.learning_situation_id,
            input.term,
            input.start_date,
            input.end_date,
            input.order.unwrap_or(0)
        ],
    )?;
    get_scheduled(conn, user_id, &id)
}

/// An absent `order` keeps the current position.
pub fn update_scheduled(
    conn: &Connection,
    user_id: &str,
    id: &str,
    input: &ScheduleInput,
) -> Result<ScheduledSituation> {
    let current = get_scheduled(conn, user_id, id)?;
    check_input(conn, user_id, input)?;
    conn.execute(
        "UPDATE scheduled_situations
         SET learning_situation_id = ?, term_id = ?, start_date = ?, end_date = ?, sort_order = ?
         WHERE id = ?",
        params![
            input.learning_situation_id,
            input.term,
            input.start_date,
            input.end_date,
            input.order.unwrap_or(current.order),
            id
        ],
    )?;
    get_scheduled(conn, user_id, id)
}

pub fn delete_scheduled(conn: &Connection, user_id: &str, id: &str) -> Result<()> {
    get_scheduled(conn, user_id, id)?;
    conn.execute("DELETE FROM scheduled_situations WHERE id = ?", [id])?;
    Ok(())
}

/// Sets each listed situation's order to its index in `new_order`.
///
/// The term must be visible to the caller and every id must already be
/// scheduled on that term; otherwise nothing is written.
pub fn reorder(conn: &Connection, user_id: &str, term_id: &str, new_order: &[String]) -> Result<()> {
    calendar::get_term_for_user(conn, user_id, term_id)?;

    let members: HashSet<String> = {
        let mut stmt = conn.prepare("SELECT id FROM scheduled_situations WHERE term_id = ?")?;
        let ids = stmt
            .query_map([term_id], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        ids
    };
    for id in new_order {
        if !members.contains(id) {
            return Err(Error::bad_request(format!(
                "scheduled situation not found for term: {}",
                id
            )));
        }
    }

    let tx = conn.unchecked_transaction()?;
    for (index, id) in new_order.iter().enumerate() {
        tx.execute(
            "UPDATE scheduled_situations SET sort_order = ? WHERE id = ?",
            params![index as i64, id],
        )?;
    }
    tx.commit()?;

    tracing::debug!(term_id, count = new_order.len(), "reordered scheduled situations");
    Ok(())
}
