use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "school")]
    School,
    #[serde(rename = "teacher")]
    Teacher,
    #[serde(rename = "")]
    Unassigned,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::School => "school",
            Role::Teacher => "teacher",
            Role::Unassigned => "",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "admin" => Ok(Role::Admin),
            "school" => Ok(Role::School),
            "teacher" => Ok(Role::Teacher),
            "" => Ok(Role::Unassigned),
            other => Err(Error::bad_request(format!(
                "role must be one of admin, school, teacher or empty (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Teachers,
}

impl Group {
    /// Groups whose membership is derived from the role. Others are left alone.
    pub const MANAGED: [Group; 1] = [Group::Teachers];

    pub fn name(self) -> &'static str {
        match self {
            Group::Teachers => "Teachers",
        }
    }
}

pub fn desired_groups(role: Role) -> BTreeSet<Group> {
    match role {
        Role::Teacher => BTreeSet::from([Group::Teachers]),
        Role::Admin | Role::School | Role::Unassigned => BTreeSet::new(),
    }
}

fn group_id(conn: &Connection, group: Group) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT id FROM groups WHERE name = ?",
            [group.name()],
            |r| r.get::<_, String>(0),
        )
        .optional()?)
}

fn ensure_group(conn: &Connection, group: Group) -> Result<String> {
    if let Some(id) = group_id(conn, group)? {
        return Ok(id);
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO groups(id, name) VALUES(?, ?)",
        params![id, group.name()],
    )?;
    Ok(id)
}

/// Brings the managed group memberships of `user_id` in line with `role`.
/// Applying it twice changes nothing the second time.
pub fn sync_user_groups(conn: &Connection, user_id: &str, role: Role) -> Result<()> {
    let desired = desired_groups(role);
    for group in Group::MANAGED {
        if desired.contains(&group) {
            let gid = ensure_group(conn, group)?;
            let added = conn.execute(
                "INSERT OR IGNORE INTO user_groups(user_id, group_id) VALUES(?, ?)",
                params![user_id, gid],
            )?;
            if added > 0 {
                tracing::debug!(user_id, group = group.name(), "added user to group");
            }
        } else if let Some(gid) = group_id(conn, group)? {
            let removed = conn.execute(
                "DELETE FROM user_groups WHERE user_id = ? AND group_id = ?",
                params![user_id, gid],
            )?;
            if removed > 0 {
                tracing::debug!(user_id, group = group.name(), "removed user from group");
            }
        }
    }
    Ok(())
}

pub fn group_names_for_user(conn: &Connection, user_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT g.name
         FROM groups g
         JOIN user_groups ug ON ug.group_id = g.id
         WHERE ug.user_id = ?
         ORDER BY g.name",
    )?;
    let names = stmt
        .query_map([user_id], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_teachers_join_the_teachers_group() {
        assert_eq!(desired_groups(Role::Teacher), BTreeSet::from([Group::Teachers]));
        assert!(desired_groups(Role::Admin).is_empty());
        assert!(desired_groups(Role::School).is_empty());
        assert!(desired_groups(Role::Unassigned).is_empty());
    }

    #[test]
    fn role_parse_accepts_known_values_only() {
        assert_eq!(Role::parse("teacher").expect("role"), Role::Teacher);
        assert_eq!(Role::parse(" admin ").expect("role"), Role::Admin);
        assert_eq!(Role::parse("").expect("role"), Role::Unassigned);
        assert!(matches!(Role::parse("principal"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn sync_is_idempotent_and_follows_role_changes() {
        let conn = crate::db::open_in_memory().expect("db");
        conn.execute(
            "INSERT INTO users(id, username, role) VALUES('u1', 'ana', 'teacher')",
            [],
        )
        .expect("user");
        conn.execute(
            "INSERT INTO groups(id, name) VALUES('g-staff', 'Staff')",
            [],
        )
        .expect("group");
        conn.execute(
            "INSERT INTO user_groups(user_id, group_id) VALUES('u1', 'g-staff')",
            [],
        )
        .expect("membership");

        sync_user_groups(&conn, "u1", Role::Teacher).expect("sync");
        sync_user_groups(&conn, "u1", Role::Teacher).expect("sync again");
        assert_eq!(
            group_names_for_user(&conn, "u1").expect("groups"),
            vec!["Staff".to_string(), "Teachers".to_string()]
        );

        sync_user_groups(&conn, "u1", Role::School).expect("demote");
        assert_eq!(
            group_names_for_user(&conn, "u1").expect("groups"),
            vec!["Staff".to_string()]
        );
    }
}
