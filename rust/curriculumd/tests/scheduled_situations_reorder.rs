mod test_support;

use axum::http::StatusCode;
use serde_json::json;
use test_support::{
    add_staff, app, insert_calendar, insert_scheduled, insert_school, insert_situation,
    insert_subject, insert_term, insert_user, seed_school_with_teacher, TestApp,
};

const TEACHER: Option<&str> = Some("u-teacher");

/// Two situations on term `t-1`, one on `t-2`.
fn seeded() -> TestApp {
    let app = app();
    app.with_db(|conn| {
        let (school, _) = seed_school_with_teacher(conn);
        insert_subject(conn, "math", "Maths", school, None);
        insert_situation(conn, "ls-a", school, "math", "A", None);
        insert_situation(conn, "ls-b", school, "math", "B", None);
        insert_calendar(conn, "cal-1", school);
        insert_term(conn, "t-1", "cal-1", "First Term");
        insert_term(conn, "t-2", "cal-1", "Second Term");
        insert_scheduled(conn, "s-a", "ls-a", "t-1", 0);
        insert_scheduled(conn, "s-b", "ls-b", "t-1", 1);
        insert_scheduled(conn, "s-c", "ls-a", "t-2", 0);
    });
    app
}

fn order_of(app: &TestApp, id: &str) -> i64 {
    app.with_db(|conn| {
        conn.query_row(
            "SELECT sort_order FROM scheduled_situations WHERE id = ?",
            [id],
            |r| r.get(0),
        )
        .expect("order")
    })
}

#[tokio::test]
async fn reorder_sets_positions_from_the_list() {
    let app = seeded();
    let (status, body) = app
        .post(
            "/scheduled-situations/reorder/",
            TEACHER,
            json!({ "term_id": "t-1", "new_order": ["s-b", "s-a"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body, json!({ "status": "success" }));
    assert_eq!(order_of(&app, "s-b"), 0);
    assert_eq!(order_of(&app, "s-a"), 1);

    let (_, listed) = app.get("/scheduled-situations/?term=t-1", TEACHER).await;
    let ids: Vec<&str> = listed
        .as_array()
        .expect("list")
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["s-b", "s-a"]);
    assert_eq!(listed[0]["learning_situation"]["title"], "B");
    assert_eq!(listed[0]["order"], 0);
}

#[tokio::test]
async fn id_from_another_term_is_rejected_and_nothing_moves() {
    let app = seeded();
    let (status, body) = app
        .post(
            "/scheduled-situations/reorder/",
            TEACHER,
            json!({ "term_id": "t-1", "new_order": ["s-b", "s-c", "s-a"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"].as_str().unwrap_or_default().contains("s-c"),
        "{}",
        body
    );
    assert_eq!(order_of(&app, "s-a"), 0);
    assert_eq!(order_of(&app, "s-b"), 1);
    assert_eq!(order_of(&app, "s-c"), 0);
}

#[tokio::test]
async fn term_outside_the_callers_schools_is_not_found() {
    let app = seeded();
    app.with_db(|conn| {
        insert_school(conn, "sch-2", "CEIP Sur", None);
        insert_user(conn, "u-other", "luis", "teacher", Some("sch-2"));
        add_staff(conn, "sch-2", "u-other");
    });
    let (status, _) = app
        .post(
            "/scheduled-situations/reorder/",
            Some("u-other"),
            json!({ "term_id": "t-1", "new_order": ["s-b", "s-a"] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(order_of(&app, "s-a"), 0);

    let (status, _) = app.get("/scheduled-situations/s-a/", Some("u-other")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_term_id_is_a_bad_request() {
    let app = seeded();
    let (status, _) = app
        .post(
            "/scheduled-situations/reorder/",
            TEACHER,
            json!({ "new_order": ["s-a"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedule_crud_round_trip() {
    let app = seeded();
    let (status, created) = app
        .post(
            "/scheduled-situations/",
            TEACHER,
            json!({
                "learning_situation_id": "ls-b",
                "term": "t-2",
                "start_date": "2025-01-13",
                "end_date": "2025-02-07"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["order"], 0);
    assert_eq!(created["learning_situation"]["id"], "ls-b");
    let id = created["id"].as_str().expect("id").to_string();

    let (status, updated) = app
        .put(
            &format!("/scheduled-situations/{}/", id),
            TEACHER,
            json!({
                "learning_situation_id": "ls-b",
                "term": "t-2",
                "start_date": "2025-01-20",
                "end_date": "2025-02-14",
                "order": 5
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["start_date"], "2025-01-20");
    assert_eq!(updated["order"], 5);

    let (status, _) = app
        .put(
            &format!("/scheduled-situations/{}/", id),
            TEACHER,
            json!({
                "learning_situation_id": "ls-b",
                "term": "t-2",
                "start_date": "2025-02-20",
                "end_date": "2025-02-14"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .delete(&format!("/scheduled-situations/{}/", id), TEACHER)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .get(&format!("/scheduled-situations/{}/", id), TEACHER)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
