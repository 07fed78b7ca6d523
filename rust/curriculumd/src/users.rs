use crate::error::{Error, Result};
use crate::groups::{self, Role};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub school: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub school: Option<String>,
}

const USER_COLUMNS: &str = "id, username, school_id, email, first_name, last_name, role";

fn user_from_row(r: &Row<'_>) -> rusqlite::Result<(User, String)> {
    let role_raw: String = r.get(6)?;
    Ok((
        User {
            id: r.get(0)?,
            username: r.get(1)?,
            school: r.get(2)?,
            email: r.get(3)?,
            first_name: r.get(4)?,
            last_name: r.get(5)?,
            role: Role::Unassigned,
            groups: Vec::new(),
        },
        role_raw,
    ))
}

fn finish(conn: &Connection, (mut user, role_raw): (User, String)) -> Result<User> {
    // Rows written outside the API may carry an unknown role; treat as unassigned.
    user.role = Role::parse(&role_raw).unwrap_or(Role::Unassigned);
    user.groups = groups::group_names_for_user(conn, &user.id)?;
    Ok(user)
}

pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            [user_id],
            user_from_row,
        )
        .optional()?;
    row.map(|row| finish(conn, row)).transpose()
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users ORDER BY username",
        USER_COLUMNS
    ))?;
    let rows = stmt
        .query_map([], user_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(|row| finish(conn, row)).collect()
}

pub fn create_user(conn: &Connection, input: &UserInput) -> Result<User> {
    let user_id = Uuid::new_v4().to_string();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO users(id, username, email, first_name, last_name, role, school_id)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        params![
            user_id,
            input.username,
            input.email,
            input.first_name,
            input.last_name,
            input.role.as_str(),
            input.school
        ],
    )?;
    groups::sync_user_groups(&tx, &user_id, input.role)?;
    tx.commit()?;
    tracing::info!(user_id = %user_id, role = input.role.as_str(), "created user");
    get_user(conn, &user_id)?.ok_or_else(|| Error::Internal("user missing after insert".into()))
}

pub fn update_user(conn: &Connection, user_id: &str, input: &UserInput) -> Result<User> {
    let tx = conn.unchecked_transaction()?;
    let changed = tx.execute(
        "UPDATE users
         SET username = ?, email = ?, first_name = ?, last_name = ?, role = ?, school_id = ?
         WHERE id = ?",
        params![
            input.username,
            input.email,
            input.first_name,
            input.last_name,
            input.role.as_str(),
            input.school,
            user_id
        ],
    )?;
    if changed == 0 {
        return Err(Error::not_found("user not found"));
    }
    groups::sync_user_groups(&tx, user_id, input.role)?;
    tx.commit()?;
    get_user(conn, user_id)?.ok_or_else(|| Error::not_found("user not found"))
}
