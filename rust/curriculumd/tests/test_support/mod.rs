#![allow(dead_code)]

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use curriculumd::api::{self, AppState, CALLER_HEADER};
use curriculumd::{db, Config, FixedClock};
use rusqlite::{params, Connection};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub struct TestApp {
    pub workspace: TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn config(&self) -> &Config {
        self.state.config()
    }

    /// Runs `f` against the live connection; keep it synchronous.
    pub fn with_db<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.state.db();
        f(&conn)
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        caller: Option<&str>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = caller {
            builder = builder.header(CALLER_HEADER, user_id);
        }
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).expect("encode body")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.send(req).await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, JsonValue) {
        let response = self.router.clone().oneshot(req).await.expect("response");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                JsonValue::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, caller: Option<&str>) -> (StatusCode, JsonValue) {
        self.request("GET", uri, caller, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        caller: Option<&str>,
        body: JsonValue,
    ) -> (StatusCode, JsonValue) {
        self.request("POST", uri, caller, Some(body)).await
    }

    pub async fn put(
        &self,
        uri: &str,
        caller: Option<&str>,
        body: JsonValue,
    ) -> (StatusCode, JsonValue) {
        self.request("PUT", uri, caller, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, caller: Option<&str>) -> (StatusCode, JsonValue) {
        self.request("DELETE", uri, caller, None).await
    }
}

/// Router over a fresh temp workspace whose clock is pinned to `today`.
pub fn app_on(today: NaiveDate) -> TestApp {
    let workspace = tempfile::Builder::new()
        .prefix("curriculumd-test")
        .tempdir()
        .expect("temp workspace");
    let conn = db::open_db(workspace.path()).expect("open db");
    let config = Config::for_workspace(workspace.path());
    let state = AppState::new(conn, config, Arc::new(FixedClock(today)));
    let router = api::router(state.clone());
    TestApp {
        workspace,
        state,
        router,
    }
}

pub fn app() -> TestApp {
    app_on(date(2024, 9, 15))
}

pub fn insert_region(conn: &Connection, id: &str, name: &str) {
    conn.execute(
        "INSERT INTO regions(id, name) VALUES(?, ?)",
        params![id, name],
    )
    .expect("insert region");
}

pub fn insert_year(conn: &Connection, id: &str, name: &str) {
    conn.execute("INSERT INTO years(id, name) VALUES(?, ?)", params![id, name])
        .expect("insert year");
}

pub fn insert_school(conn: &Connection, id: &str, name: &str, region: Option<&str>) {
    conn.execute(
        "INSERT INTO schools(id, name, region_id) VALUES(?, ?, ?)",
        params![id, name, region],
    )
    .expect("insert school");
}

pub fn insert_user(conn: &Connection, id: &str, username: &str, role: &str, school: Option<&str>) {
    conn.execute(
        "INSERT INTO users(id, username, role, school_id) VALUES(?, ?, ?, ?)",
        params![id, username, role, school],
    )
    .expect("insert user");
}

pub fn add_staff(conn: &Connection, school: &str, user: &str) {
    conn.execute(
        "INSERT INTO school_staff(school_id, user_id) VALUES(?, ?)",
        params![school, user],
    )
    .expect("insert staff");
}

pub fn insert_subject(conn: &Connection, id: &str, name: &str, school: &str, year: Option<&str>) {
    conn.execute(
        "INSERT INTO subjects(id, name, school_id, year_id) VALUES(?, ?, ?, ?)",
        params![id, name, school, year],
    )
    .expect("insert subject");
}

pub fn insert_situation(
    conn: &Connection,
    id: &str,
    school: &str,
    subject: &str,
    title: &str,
    date_start: Option<&str>,
) {
    conn.execute(
        "INSERT INTO learning_situations(id, school_id, subject_id, title, date_start)
         VALUES(?, ?, ?, ?, ?)",
        params![id, school, subject, title, date_start],
    )
    .expect("insert learning situation");
}

pub fn insert_calendar(conn: &Connection, id: &str, school: &str) {
    conn.execute(
        "INSERT INTO school_calendars(id, school_id, academic_year, start_date, end_date)
         VALUES(?, ?, '2024-2025', '2024-09-01', '2025-06-30')",
        params![id, school],
    )
    .expect("insert calendar");
}

pub fn insert_term(conn: &Connection, id: &str, calendar: &str, name: &str) {
    conn.execute(
        "INSERT INTO terms(id, calendar_id, name, start_date, end_date)
         VALUES(?, ?, ?, '2024-09-01', '2024-12-22')",
        params![id, calendar, name],
    )
    .expect("insert term");
}

pub fn insert_scheduled(conn: &Connection, id: &str, situation: &str, term: &str, order: i64) {
    conn.execute(
        "INSERT INTO scheduled_situations(id, learning_situation_id, term_id, start_date, end_date, sort_order)
         VALUES(?, ?, ?, '2024-09-10', '2024-09-30', ?)",
        params![id, situation, term, order],
    )
    .expect("insert scheduled situation");
}

/// A school with one teacher on staff: `("sch-1", "u-teacher")`.
pub fn seed_school_with_teacher(conn: &Connection) -> (&'static str, &'static str) {
    insert_region(conn, "reg-1", "Comunidad de Madrid");
    insert_school(conn, "sch-1", "IES Norte", Some("reg-1"));
    insert_user(conn, "u-teacher", "ana", "teacher", Some("sch-1"));
    add_staff(conn, "sch-1", "u-teacher");
    ("sch-1", "u-teacher")
}
