use crate::Database;
use crate::models::{AdminUserRow, CommentRow, InvitationRow, NewInvitation, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
        verified: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, verified) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, name, email, password_hash, role, verified],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Flip the verification flag. Returns false when no such user exists.
    pub fn set_user_verified(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute("UPDATE users SET verified = 1 WHERE id = ?1", [id])?;
            Ok(affected > 0)
        })
    }

    /// Remove a user: their invitations are deleted explicitly first, then the
    /// user row. Comments under those invitations go via the FK cascade.
    /// Returns false when no such user exists.
    pub fn delete_user_with_invitations(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM invitations WHERE user_id = ?1", [id])?;
            let affected = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(affected > 0)
        })
    }

    pub fn list_users(&self) -> Result<Vec<AdminUserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name, u.email, u.role, u.verified, u.created_at, COUNT(i.id)
                 FROM users u
                 LEFT JOIN invitations i ON i.user_id = u.id
                 GROUP BY u.id
                 ORDER BY u.created_at, u.rowid",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(AdminUserRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        role: row.get(3)?,
                        verified: row.get(4)?,
                        created_at: row.get(5)?,
                        invitation_count: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Invitations --

    pub fn insert_invitation(&self, inv: &NewInvitation) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO invitations (
                     id, slug, user_id,
                     groom_name, groom_nick, bride_name, bride_nick,
                     event_date, location, message,
                     bank_name, account_number, account_holder,
                     groom_photo, bride_photo,
                     love_story, gallery
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                rusqlite::params![
                    inv.id,
                    inv.slug,
                    inv.user_id,
                    inv.groom_name,
                    inv.groom_nick,
                    inv.bride_name,
                    inv.bride_nick,
                    inv.event_date,
                    inv.location,
                    inv.message,
                    inv.bank_name,
                    inv.account_number,
                    inv.account_holder,
                    inv.groom_photo,
                    inv.bride_photo,
                    inv.love_story,
                    inv.gallery,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_invitation_by_slug(&self, slug: &str) -> Result<Option<InvitationRow>> {
        self.with_conn(|conn| query_invitation(conn, "slug", slug))
    }

    pub fn get_invitation_by_id(&self, id: &str) -> Result<Option<InvitationRow>> {
        self.with_conn(|conn| query_invitation(conn, "id", id))
    }

    pub fn list_invitations_by_user(&self, user_id: &str) -> Result<Vec<InvitationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INVITATION_COLUMNS} FROM invitations
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            ))?;

            let rows = stmt
                .query_map([user_id], read_invitation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Owner-gated deletion: the row goes away only when both the id and the
    /// owning user match. Returns true when a row was deleted.
    pub fn delete_invitation_owned(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "DELETE FROM invitations WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(affected > 0)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        invitation_id: &str,
        guest_name: &str,
        message: &str,
        attendance: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, invitation_id, guest_name, message, attendance)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, invitation_id, guest_name, message, attendance],
            )?;
            Ok(())
        })
    }

    /// Newest-first; rowid breaks ties within the same second.
    pub fn get_comments_for_invitation(&self, invitation_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, invitation_id, guest_name, message, attendance, created_at
                 FROM comments
                 WHERE invitation_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([invitation_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        invitation_id: row.get(1)?,
                        guest_name: row.get(2)?,
                        message: row.get(3)?,
                        attendance: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

/// True when the error chain bottoms out in a SQLite UNIQUE violation on the
/// given column (e.g. "invitations.slug"). The API layer maps this to a
/// user-facing conflict message.
pub fn is_unique_violation(err: &anyhow::Error, column: &str) -> bool {
    for cause in err.chain() {
        if let Some(rusqlite::Error::SqliteFailure(e, Some(msg))) =
            cause.downcast_ref::<rusqlite::Error>()
        {
            if e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(column) {
                return true;
            }
        }
    }
    false
}

const INVITATION_COLUMNS: &str = "id, slug, user_id, groom_name, groom_nick, bride_name, bride_nick, \
     event_date, location, message, bank_name, account_number, account_holder, \
     groom_photo, bride_photo, love_story, gallery, created_at";

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, email, password, role, verified, created_at FROM users WHERE {column} = ?1",
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                verified: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_invitation(conn: &Connection, column: &str, value: &str) -> Result<Option<InvitationRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVITATION_COLUMNS} FROM invitations WHERE {column} = ?1",
    ))?;

    let row = stmt.query_row([value], read_invitation).optional()?;

    Ok(row)
}

fn read_invitation(row: &rusqlite::Row<'_>) -> rusqlite::Result<InvitationRow> {
    Ok(InvitationRow {
        id: row.get(0)?,
        slug: row.get(1)?,
        user_id: row.get(2)?,
        groom_name: row.get(3)?,
        groom_nick: row.get(4)?,
        bride_name: row.get(5)?,
        bride_nick: row.get(6)?,
        event_date: row.get(7)?,
        location: row.get(8)?,
        message: row.get(9)?,
        bank_name: row.get(10)?,
        account_number: row.get(11)?,
        account_holder: row.get(12)?,
        groom_photo: row.get(13)?,
        bride_photo: row.get(14)?,
        love_story: row.get(15)?,
        gallery: row.get(16)?,
        created_at: row.get(17)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, id: &str, email: &str) {
        db.create_user(id, "Test User", email, "$argon2id$stub", "member", true)
            .unwrap();
    }

    fn sample_invitation(id: &str, slug: &str, user_id: &str) -> NewInvitation {
        NewInvitation {
            id: id.into(),
            slug: slug.into(),
            user_id: user_id.into(),
            groom_name: "Arif Rahman".into(),
            groom_nick: "Arif".into(),
            bride_name: "Dewi Lestari".into(),
            bride_nick: "Dewi".into(),
            event_date: "2026-11-21".into(),
            location: "Gedung Serbaguna, Bandung".into(),
            message: "With joy we invite you".into(),
            bank_name: None,
            account_number: None,
            account_holder: None,
            groom_photo: None,
            bride_photo: None,
            love_story: "[]".into(),
            gallery: "[]".into(),
        }
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let db = test_db();
        seed_user(&db, "u1", "couple@example.com");

        let err = db
            .create_user("u2", "Other", "couple@example.com", "hash", "member", false)
            .unwrap_err();
        assert!(is_unique_violation(&err, "users.email"));

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_verify_flips_flag() {
        let db = test_db();
        db.create_user("u1", "Pending", "p@example.com", "hash", "member", false)
            .unwrap();
        assert!(!db.get_user_by_id("u1").unwrap().unwrap().verified);

        assert!(db.set_user_verified("u1").unwrap());
        assert!(db.get_user_by_id("u1").unwrap().unwrap().verified);

        assert!(!db.set_user_verified("missing").unwrap());
    }

    #[test]
    fn test_delete_requires_matching_owner() {
        let db = test_db();
        seed_user(&db, "owner", "owner@example.com");
        seed_user(&db, "intruder", "intruder@example.com");
        db.insert_invitation(&sample_invitation("inv1", "arif-dewi", "owner"))
            .unwrap();

        assert!(!db.delete_invitation_owned("inv1", "intruder").unwrap());
        assert!(db.get_invitation_by_id("inv1").unwrap().is_some());

        assert!(db.delete_invitation_owned("inv1", "owner").unwrap());
        assert!(db.get_invitation_by_id("inv1").unwrap().is_none());
    }

    #[test]
    fn test_delete_user_removes_invitations_and_comments() {
        let db = test_db();
        seed_user(&db, "u1", "couple@example.com");
        db.insert_invitation(&sample_invitation("inv1", "arif-dewi", "u1"))
            .unwrap();
        db.insert_comment("c1", "inv1", "Guest", "Congrats!", "attending")
            .unwrap();

        assert!(db.delete_user_with_invitations("u1").unwrap());
        assert!(db.get_user_by_id("u1").unwrap().is_none());
        assert!(db.get_invitation_by_id("inv1").unwrap().is_none());
        assert!(db.get_comments_for_invitation("inv1").unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_user_returns_false() {
        let db = test_db();
        assert!(!db.delete_user_with_invitations("ghost").unwrap());
    }

    #[test]
    fn test_comments_are_newest_first() {
        let db = test_db();
        seed_user(&db, "u1", "couple@example.com");
        db.insert_invitation(&sample_invitation("inv1", "arif-dewi", "u1"))
            .unwrap();

        for (id, name) in [("c1", "First"), ("c2", "Second"), ("c3", "Third")] {
            db.insert_comment(id, "inv1", name, "Congrats!", "undecided")
                .unwrap();
        }

        let comments = db.get_comments_for_invitation("inv1").unwrap();
        let names: Vec<&str> = comments.iter().map(|c| c.guest_name.as_str()).collect();
        assert_eq!(names, ["Third", "Second", "First"]);

        // Stable across repeated reads
        let again = db.get_comments_for_invitation("inv1").unwrap();
        let ids: Vec<&str> = again.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c3", "c2", "c1"]);
    }

    #[test]
    fn test_duplicate_slug_reports_unique_violation() {
        let db = test_db();
        seed_user(&db, "u1", "couple@example.com");
        db.insert_invitation(&sample_invitation("inv1", "arif-dewi", "u1"))
            .unwrap();

        let err = db
            .insert_invitation(&sample_invitation("inv2", "arif-dewi", "u1"))
            .unwrap_err();
        assert!(is_unique_violation(&err, "invitations.slug"));
        assert!(!is_unique_violation(&err, "users.email"));
    }

    #[test]
    fn test_comment_requires_live_invitation() {
        let db = test_db();
        let result = db.insert_comment("c1", "no-such-invitation", "Guest", "Hi", "attending");
        assert!(result.is_err());
    }

    #[test]
    fn test_list_invitations_scoped_to_user() {
        let db = test_db();
        seed_user(&db, "u1", "a@example.com");
        seed_user(&db, "u2", "b@example.com");
        db.insert_invitation(&sample_invitation("inv1", "first-pair", "u1"))
            .unwrap();
        db.insert_invitation(&sample_invitation("inv2", "second-pair", "u1"))
            .unwrap();
        db.insert_invitation(&sample_invitation("inv3", "other-pair", "u2"))
            .unwrap();

        let mine = db.list_invitations_by_user("u1").unwrap();
        let ids: Vec<&str> = mine.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["inv2", "inv1"]);
    }

    #[test]
    fn test_list_users_counts_invitations() {
        let db = test_db();
        seed_user(&db, "u1", "a@example.com");
        seed_user(&db, "u2", "b@example.com");
        db.insert_invitation(&sample_invitation("inv1", "first-pair", "u1"))
            .unwrap();
        db.insert_invitation(&sample_invitation("inv2", "second-pair", "u1"))
            .unwrap();

        let users = db.list_users().unwrap();
        assert_eq!(users.len(), 2);
        let u1 = users.iter().find(|u| u.id == "u1").unwrap();
        let u2 = users.iter().find(|u| u.id == "u2").unwrap();
        assert_eq!(u1.invitation_count, 2);
        assert_eq!(u2.invitation_count, 0);
    }
}
