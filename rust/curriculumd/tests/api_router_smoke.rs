mod test_support;

use axum::http::StatusCode;
use serde_json::json;
use test_support::{app, insert_year, seed_school_with_teacher};

#[tokio::test]
async fn health_reports_version_and_workspace() {
    let app = app();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(
        body["workspacePath"],
        app.workspace.path().to_string_lossy().as_ref()
    );
}

#[tokio::test]
async fn regions_crud() {
    let app = app();
    let (status, created) = app
        .post("/regions/", None, json!({ "name": "Cantabria" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let id = created["id"].as_str().expect("id").to_string();

    let (status, updated) = app
        .put(
            &format!("/regions/{}/", id),
            None,
            json!({ "name": "Cantabria", "description": "North coast" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "North coast");

    let (_, listed) = app.get("/regions/", None).await;
    assert_eq!(listed.as_array().map(|a| a.len()), Some(1));

    let (status, _) = app
        .post("/schools/", None, json!({ "name": "IES Norte", "region": id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.delete(&format!("/regions/{}/", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert_eq!(body["error"], "conflict");

    let (status, _) = app.get("/regions/nope/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.post("/regions/", None, json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_params");
}

#[tokio::test]
async fn school_with_unknown_region_is_rejected() {
    let app = app();
    let (status, body) = app
        .post("/schools/", None, json!({ "name": "IES Norte", "region": "nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "region not found: nope");
    let (_, schools) = app.get("/schools/", None).await;
    assert_eq!(schools, json!([]));
}

#[tokio::test]
async fn subject_create_uses_the_callers_school_and_region() {
    let app = app();
    app.with_db(|conn| {
        seed_school_with_teacher(conn);
        insert_year(conn, "y-1", "1º ESO");
    });
    let (status, subject) = app
        .post(
            "/subjects/create/",
            Some("u-teacher"),
            json!({ "name": "Maths", "year": "y-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", subject);
    assert_eq!(subject["school"], "sch-1");
    assert_eq!(subject["region"], "reg-1");
    assert_eq!(subject["teaching_staff"], json!(["u-teacher"]));

    let (_, year) = app.get("/years/y-1/", None).await;
    let names: Vec<&str> = year["subjects"]
        .as_array()
        .expect("subjects")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Maths"]);
}

#[tokio::test]
async fn protected_routes_need_a_known_caller() {
    let app = app();
    app.with_db(|conn| {
        seed_school_with_teacher(conn);
    });
    for uri in ["/subjects/", "/modules/", "/terms/", "/planning-units/"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}: {}", uri, body);
        let (status, _) = app.get(uri, Some("ghost")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        let (status, _) = app.get(uri, Some("u-teacher")).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn school_type_carries_default_years() {
    let app = app();
    app.with_db(|conn| {
        insert_year(conn, "y-1", "1º ESO");
        insert_year(conn, "y-2", "2º ESO");
    });
    let (status, created) = app
        .post(
            "/school-types/",
            None,
            json!({ "name": "Secondary", "default_years": ["y-1", "y-2"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["default_years"], json!(["y-1", "y-2"]));

    let id = created["id"].as_str().expect("id");
    let (status, fetched) = app.get(&format!("/school-types/{}/", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Secondary");
}
