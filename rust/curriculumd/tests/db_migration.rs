use curriculumd::db;
use rusqlite::Connection;

#[test]
fn open_db_adds_columns_missing_from_older_workspaces() {
    let workspace = tempfile::tempdir().expect("temp workspace");
    {
        let conn = Connection::open(workspace.path().join(db::DB_FILE)).expect("open raw db");
        conn.execute_batch(
            "CREATE TABLE regions(id TEXT PRIMARY KEY, name TEXT NOT NULL, description TEXT);
             INSERT INTO regions(id, name) VALUES('reg-1', 'Cantabria');
             CREATE TABLE specific_competences(
                id TEXT PRIMARY KEY,
                region_id TEXT NOT NULL,
                subject_id TEXT,
                year_id TEXT,
                code TEXT NOT NULL,
                description TEXT NOT NULL
             );
             INSERT INTO specific_competences(id, region_id, code, description)
                VALUES('c-1', 'reg-1', 'CE1', 'Reads maps');
             CREATE TABLE modules(
                id TEXT PRIMARY KEY,
                year_id TEXT NOT NULL,
                school_id TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                date_start TEXT,
                date_end TEXT,
                specific_competences_json TEXT NOT NULL DEFAULT '[]',
                selected_criteria_json TEXT NOT NULL DEFAULT '{}',
                basic_knowledge_json TEXT NOT NULL DEFAULT '[]',
                content_json TEXT NOT NULL DEFAULT '[]',
                files_json TEXT NOT NULL DEFAULT '[]'
             );",
        )
        .expect("legacy schema");
    }

    let conn = db::open_db(workspace.path()).expect("open db");
    assert!(db::table_has_column(&conn, "specific_competences", "evaluation_criteria_json").unwrap());
    assert!(db::table_has_column(&conn, "modules", "session_length").unwrap());
    assert!(db::table_has_column(&conn, "modules", "evaluable").unwrap());

    let criteria: String = conn
        .query_row(
            "SELECT evaluation_criteria_json FROM specific_competences WHERE id = 'c-1'",
            [],
            |r| r.get(0),
        )
        .expect("criteria");
    assert_eq!(criteria, "[]");

    // Tables the old workspace never had are created too.
    assert!(db::table_has_column(&conn, "planning_units", "unit_number").unwrap());
    assert!(db::table_has_column(&conn, "scheduled_situations", "sort_order").unwrap());
}

#[test]
fn reopening_is_idempotent() {
    let workspace = tempfile::tempdir().expect("temp workspace");
    drop(db::open_db(workspace.path()).expect("first open"));
    let conn = db::open_db(workspace.path()).expect("second open");
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('modules') WHERE name = 'evaluable'",
            [],
            |r| r.get(0),
        )
        .expect("count");
    assert_eq!(count, 1);
}
