//! Academic calendars: the window derived from the creation date of a school,
//! and the scoped reads/updates of calendars and terms.

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

/// Month from which "today" already belongs to the academic year starting
/// this September.
const ROLLOVER_MONTH: u32 = 7;

pub const TERM_NAMES: [&str; 3] = ["First Term", "Second Term", "Third Term"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermWindow {
    pub name: &'static str,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcademicWindow {
    pub start_year: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub terms: [TermWindow; 3],
}

impl AcademicWindow {
    /// Sep 1 .. Jun 30 of the academic year `today` belongs to, with the three
    /// fixed terms. `None` only at the edge of the representable date range.
    pub fn containing(today: NaiveDate) -> Option<Self> {
        let start_year = if today.month() >= ROLLOVER_MONTH {
            today.year()
        } else {
            today.year() - 1
        };
        Self::starting(start_year)
    }

    pub fn starting(start_year: i32) -> Option<Self> {
        let next = start_year.checked_add(1)?;
        let ymd = NaiveDate::from_ymd_opt;
        Some(Self {
            start_year,
            start: ymd(start_year, 9, 1)?,
            end: ymd(next, 6, 30)?,
            terms: [
                TermWindow {
                    name: TERM_NAMES[0],
                    start: ymd(start_year, 9, 1)?,
                    end: ymd(start_year, 12, 22)?,
                },
                TermWindow {
                    name: TERM_NAMES[1],
                    start: ymd(next, 1, 8)?,
                    end: ymd(next, 3, 31)?,
                },
                TermWindow {
                    name: TERM_NAMES[2],
                    start: ymd(next, 4, 1)?,
                    end: ymd(next, 6, 30)?,
                },
            ],
        })
    }

    /// `2024-2025` style label.
    pub fn label(&self) -> String {
        format!("{}-{}", self.start_year, self.start_year + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Term {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolCalendar {
    pub id: String,
    #[serde(skip)]
    pub school_id: String,
    pub academic_year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub terms: Vec<Term>,
}

/// Writes the calendar and its three terms for a freshly created school.
///
/// Runs once per school, from the creation service. Calling it again for the
/// same school adds a second calendar.
pub fn bootstrap_school_calendar(
    conn: &Connection,
    school_id: &str,
    today: NaiveDate,
) -> Result<SchoolCalendar> {
    let window = AcademicWindow::containing(today)
        .ok_or_else(|| Error::Internal(format!("no academic year contains {}", today)))?;

    let calendar_id = Uuid::new_v4().to_string();
    let academic_year = window.label();
    conn.execute(
        "INSERT INTO school_calendars(id, school_id, academic_year, start_date, end_date)
         VALUES(?, ?, ?, ?, ?)",
        params![calendar_id, school_id, academic_year, window.start, window.end],
    )?;

    let mut terms = Vec::with_capacity(window.terms.len());
    for term in &window.terms {
        let term_id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO terms(id, calendar_id, name, start_date, end_date) VALUES(?, ?, ?, ?, ?)",
            params![term_id, calendar_id, term.name, term.start, term.end],
        )?;
        terms.push(Term {
            id: term_id,
            name: term.name.to_string(),
            start_date: term.start,
            end_date: term.end,
        });
    }

    tracing::info!(
        school_id,
        calendar_id = %calendar_id,
        academic_year = %academic_year,
        "bootstrapped school calendar"
    );

    Ok(SchoolCalendar {
        id: calendar_id,
        school_id: school_id.to_string(),
        academic_year,
        start_date: window.start,
        end_date: window.end,
        terms,
    })
}

fn terms_for_calendar(conn: &Connection, calendar_id: &str) -> Result<Vec<Term>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, start_date, end_date
         FROM terms
         WHERE calendar_id = ?
         ORDER BY start_date, rowid",
    )?;
    let terms = stmt
        .query_map([calendar_id], |r| {
            Ok(Term {
                id: r.get(0)?,
                name: r.get(1)?,
                start_date: r.get(2)?,
                end_date: r.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(terms)
}

type CalendarRow = (String, String, String, NaiveDate, NaiveDate);

fn calendar_row(r: &Row<'_>) -> rusqlite::Result<CalendarRow> {
    Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
}

fn calendar_from_row(conn: &Connection, row: CalendarRow) -> Result<SchoolCalendar> {
    let (id, school_id, academic_year, start_date, end_date) = row;
    let terms = terms_for_calendar(conn, &id)?;
    Ok(SchoolCalendar {
        id,
        school_id,
        academic_year,
        start_date,
        end_date,
        terms,
    })
}

/// Calendars of every school whose teaching staff includes `user_id`.
pub fn list_calendars_for_user(conn: &Connection, user_id: &str) -> Result<Vec<SchoolCalendar>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.school_id, c.academic_year, c.start_date, c.end_date
         FROM school_calendars c
         JOIN school_staff ss ON ss.school_id = c.school_id
         WHERE ss.user_id = ?
         ORDER BY c.start_date, c.rowid",
    )?;
    let rows = stmt
        .query_map([user_id], calendar_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|row| calendar_from_row(conn, row))
        .collect()
}

pub fn calendars_for_school(conn: &Connection, school_id: &str) -> Result<Vec<SchoolCalendar>> {
    let mut stmt = conn.prepare(
        "SELECT id, school_id, academic_year, start_date, end_date
         FROM school_calendars
         WHERE school_id = ?
         ORDER BY start_date, rowid",
    )?;
    let rows = stmt
        .query_map([school_id], calendar_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|row| calendar_from_row(conn, row))
        .collect()
}

pub fn get_calendar_for_user(
    conn: &Connection,
    user_id: &str,
    calendar_id: &str,
) -> Result<SchoolCalendar> {
    let row = conn
        .query_row(
            "SELECT c.id, c.school_id, c.academic_year, c.start_date, c.end_date
             FROM school_calendars c
             JOIN school_staff ss ON ss.school_id = c.school_id
             WHERE ss.user_id = ? AND c.id = ?",
            params![user_id, calendar_id],
            calendar_row,
        )
        .optional()?;
    match row {
        Some(row) => calendar_from_row(conn, row),
        None => Err(Error::not_found("school calendar not found")),
    }
}

pub fn list_terms_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Term>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.start_date, t.end_date
         FROM terms t
         JOIN school_calendars c ON c.id = t.calendar_id
         JOIN school_staff ss ON ss.school_id = c.school_id
         WHERE ss.user_id = ?
         ORDER BY t.start_date, t.rowid",
    )?;
    let terms = stmt
        .query_map([user_id], |r| {
            Ok(Term {
                id: r.get(0)?,
                name: r.get(1)?,
                start_date: r.get(2)?,
                end_date: r.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(terms)
}

pub fn get_term_for_user(conn: &Connection, user_id: &str, term_id: &str) -> Result<Term> {
    conn.query_row(
        "SELECT t.id, t.name, t.start_date, t.end_date
         FROM terms t
         JOIN school_calendars c ON c.id = t.calendar_id
         JOIN school_staff ss ON ss.school_id = c.school_id
         WHERE ss.user_id = ? AND t.id = ?",
        params![user_id, term_id],
        |r| {
            Ok(Term {
                id: r.get(0)?,
                name: r.get(1)?,
                start_date: r.get(2)?,
                end_date: r.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| Error::not_found("term not found"))
}

pub fn update_term_for_user(
    conn: &Connection,
    user_id: &str,
    term_id: &str,
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Term> {
    get_term_for_user(conn, user_id, term_id)?;
    if end_date < start_date {
        return Err(Error::bad_request("end_date must not be before start_date"));
    }
    conn.execute(
        "UPDATE terms SET name = ?, start_date = ?, end_date = ? WHERE id = ?",
        params![name, start_date, end_date, term_id],
    )?;
    get_term_for_user(conn, user_id, term_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn july_starts_the_new_academic_year() {
        let w = AcademicWindow::containing(d(2024, 7, 1)).expect("window");
        assert_eq!(w.label(), "2024-2025");
        assert_eq!(w.start, d(2024, 9, 1));
        assert_eq!(w.end, d(2025, 6, 30));
    }

    #[test]
    fn june_still_belongs_to_the_previous_academic_year() {
        let w = AcademicWindow::containing(d(2024, 6, 30)).expect("window");
        assert_eq!(w.label(), "2023-2024");
        assert_eq!(w.start, d(2023, 9, 1));
        assert_eq!(w.end, d(2024, 6, 30));
    }

    #[test]
    fn january_maps_to_previous_september() {
        let w = AcademicWindow::containing(d(2025, 1, 15)).expect("window");
        assert_eq!(w.start_year, 2024);
    }

    #[test]
    fn terms_have_fixed_boundaries() {
        let w = AcademicWindow::starting(2024).expect("window");
        let bounds: Vec<_> = w.terms.iter().map(|t| (t.name, t.start, t.end)).collect();
        assert_eq!(
            bounds,
            vec![
                ("First Term", d(2024, 9, 1), d(2024, 12, 22)),
                ("Second Term", d(2025, 1, 8), d(2025, 3, 31)),
                ("Third Term", d(2025, 4, 1), d(2025, 6, 30)),
            ]
        );
    }

    #[test]
    fn terms_are_ordered_disjoint_and_inside_the_year() {
        for year in [1999, 2023, 2024, 2100] {
            let w = AcademicWindow::starting(year).expect("window");
            for t in &w.terms {
                assert!(t.start <= t.end);
                assert!(t.start >= w.start && t.end <= w.end);
            }
            for pair in w.terms.windows(2) {
                assert!(pair[0].end < pair[1].start);
            }
        }
    }

    #[test]
    fn end_of_date_range_has_no_window() {
        assert!(AcademicWindow::starting(i32::MAX).is_none());
    }
}
