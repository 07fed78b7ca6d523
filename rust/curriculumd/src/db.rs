use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "curriculum.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS regions(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS years(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            division TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS school_types(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS school_type_default_years(
            school_type_id TEXT NOT NULL,
            year_id TEXT NOT NULL,
            PRIMARY KEY(school_type_id, year_id),
            FOREIGN KEY(school_type_id) REFERENCES school_types(id) ON DELETE CASCADE,
            FOREIGN KEY(year_id) REFERENCES years(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schools(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            region_id TEXT,
            school_type_id TEXT,
            address TEXT,
            phone_number TEXT,
            FOREIGN KEY(region_id) REFERENCES regions(id) ON DELETE RESTRICT,
            FOREIGN KEY(school_type_id) REFERENCES school_types(id) ON DELETE RESTRICT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS school_years(
            school_id TEXT NOT NULL,
            year_id TEXT NOT NULL,
            PRIMARY KEY(school_id, year_id),
            FOREIGN KEY(school_id) REFERENCES schools(id) ON DELETE CASCADE,
            FOREIGN KEY(year_id) REFERENCES years(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL DEFAULT '',
            school_id TEXT,
            FOREIGN KEY(school_id) REFERENCES schools(id) ON DELETE SET NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS groups(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_groups(
            user_id TEXT NOT NULL,
            group_id TEXT NOT NULL,
            PRIMARY KEY(user_id, group_id),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(group_id) REFERENCES groups(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS school_staff(
            school_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY(school_id, user_id),
            FOREIGN KEY(school_id) REFERENCES schools(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_school_staff_user ON school_staff(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            year_id TEXT,
            region_id TEXT,
            school_id TEXT NOT NULL,
            FOREIGN KEY(year_id) REFERENCES years(id) ON DELETE SET NULL,
            FOREIGN KEY(region_id) REFERENCES regions(id) ON DELETE SET NULL,
            FOREIGN KEY(school_id) REFERENCES schools(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_school ON subjects(school_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_year ON subjects(year_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_staff(
            subject_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY(subject_id, user_id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS specific_competences(
            id TEXT PRIMARY KEY,
            region_id TEXT NOT NULL,
            subject_id TEXT,
            year_id TEXT,
            code TEXT NOT NULL,
            description TEXT NOT NULL,
            evaluation_criteria_json TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY(region_id) REFERENCES regions(id) ON DELETE RESTRICT,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
            FOREIGN KEY(year_id) REFERENCES years(id) ON DELETE CASCADE,
            UNIQUE(region_id, subject_id, year_id, code)
        )",
        [],
    )?;
    // Workspaces created before evaluation criteria were tracked.
    ensure_competences_evaluation_criteria(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_specific_competences_subject ON specific_competences(subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_competences(
            subject_id TEXT NOT NULL,
            competence_id TEXT NOT NULL,
            PRIMARY KEY(subject_id, competence_id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
            FOREIGN KEY(competence_id) REFERENCES specific_competences(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS modules(
            id TEXT PRIMARY KEY,
            year_id TEXT NOT NULL,
            school_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            date_start TEXT,
            date_end TEXT,
            session_length REAL,
            evaluable INTEGER NOT NULL DEFAULT 0,
            specific_competences_json TEXT NOT NULL DEFAULT '[]',
            selected_criteria_json TEXT NOT NULL DEFAULT '{}',
            basic_knowledge_json TEXT NOT NULL DEFAULT '[]',
            content_json TEXT NOT NULL DEFAULT '[]',
            files_json TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY(year_id) REFERENCES years(id) ON DELETE CASCADE,
            FOREIGN KEY(school_id) REFERENCES schools(id) ON DELETE CASCADE,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        )",
        [],
    )?;
    // Workspaces created before session length and evaluability existed.
    ensure_modules_session_columns(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_modules_subject ON modules(subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS module_staff(
            module_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY(module_id, user_id),
            FOREIGN KEY(module_id) REFERENCES modules(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS learning_situations(
            id TEXT PRIMARY KEY,
            year_id TEXT,
            region_id TEXT,
            school_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            date_start TEXT,
            date_end TEXT,
            FOREIGN KEY(year_id) REFERENCES years(id) ON DELETE SET NULL,
            FOREIGN KEY(region_id) REFERENCES regions(id) ON DELETE SET NULL,
            FOREIGN KEY(school_id) REFERENCES schools(id) ON DELETE CASCADE,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_learning_situations_subject ON learning_situations(subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS learning_situation_staff(
            learning_situation_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY(learning_situation_id, user_id),
            FOREIGN KEY(learning_situation_id) REFERENCES learning_situations(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS learning_situation_competences(
            learning_situation_id TEXT NOT NULL,
            competence_id TEXT NOT NULL,
            PRIMARY KEY(learning_situation_id, competence_id),
            FOREIGN KEY(learning_situation_id) REFERENCES learning_situations(id) ON DELETE CASCADE,
            FOREIGN KEY(competence_id) REFERENCES specific_competences(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS learning_situation_modules(
            learning_situation_id TEXT NOT NULL,
            module_id TEXT NOT NULL,
            PRIMARY KEY(learning_situation_id, module_id),
            FOREIGN KEY(learning_situation_id) REFERENCES learning_situations(id) ON DELETE CASCADE,
            FOREIGN KEY(module_id) REFERENCES modules(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS school_calendars(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            FOREIGN KEY(school_id) REFERENCES schools(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_school_calendars_school ON school_calendars(school_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS terms(
            id TEXT PRIMARY KEY,
            calendar_id TEXT NOT NULL,
            name TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            FOREIGN KEY(calendar_id) REFERENCES school_calendars(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_terms_calendar ON terms(calendar_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scheduled_situations(
            id TEXT PRIMARY KEY,
            learning_situation_id TEXT NOT NULL,
            term_id TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(learning_situation_id) REFERENCES learning_situations(id) ON DELETE CASCADE,
            FOREIGN KEY(term_id) REFERENCES terms(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scheduled_situations_term_sort ON scheduled_situations(term_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS planning_units(
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            unit_number INTEGER NOT NULL,
            learning_situation_id TEXT,
            start_date TEXT,
            end_date TEXT,
            title TEXT,
            notes TEXT,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
            FOREIGN KEY(learning_situation_id) REFERENCES learning_situations(id) ON DELETE CASCADE,
            UNIQUE(subject_id, unit_number)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_planning_units_subject_number ON planning_units(subject_id, unit_number)",
        [],
    )?;

    Ok(())
}

fn ensure_competences_evaluation_criteria(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "specific_competences", "evaluation_criteria_json")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE specific_competences ADD COLUMN evaluation_criteria_json TEXT NOT NULL DEFAULT '[]'",
        [],
    )?;
    Ok(())
}

fn ensure_modules_session_columns(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "modules", "session_length")? {
        conn.execute("ALTER TABLE modules ADD COLUMN session_length REAL", [])?;
    }
    if !table_has_column(conn, "modules", "evaluable")? {
        conn.execute(
            "ALTER TABLE modules ADD COLUMN evaluable INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn json_text(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Parses a JSON TEXT column; unreadable content degrades to `fallback`.
pub fn parse_json_text(raw: &str, fallback: serde_json::Value) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or(fallback)
}

/// Ids of a many-to-many link table for one owner, in insertion order.
pub fn linked_ids(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    target_column: &str,
    owner_id: &str,
) -> rusqlite::Result<Vec<String>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ? ORDER BY rowid",
        target_column, table, owner_column
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([owner_id], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Replaces the link set of one owner with `target_ids`, skipping duplicates.
pub fn replace_links(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    target_column: &str,
    owner_id: &str,
    target_ids: &[String],
) -> rusqlite::Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?", table, owner_column),
        [owner_id],
    )?;
    let sql = format!(
        "INSERT OR IGNORE INTO {}({}, {}) VALUES(?, ?)",
        table, owner_column, target_column
    );
    let mut stmt = conn.prepare(&sql)?;
    for target in target_ids {
        stmt.execute((owner_id, target))?;
    }
    Ok(())
}
