use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'member',
            verified    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS invitations (
            id              TEXT PRIMARY KEY,
            slug            TEXT NOT NULL UNIQUE,
            user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            groom_name      TEXT NOT NULL,
            groom_nick      TEXT NOT NULL,
            bride_name      TEXT NOT NULL,
            bride_nick      TEXT NOT NULL,
            event_date      TEXT NOT NULL,
            location        TEXT NOT NULL,
            message         TEXT NOT NULL,
            bank_name       TEXT,
            account_number  TEXT,
            account_holder  TEXT,
            groom_photo     TEXT,
            bride_photo     TEXT,
            love_story      TEXT NOT NULL DEFAULT '[]',
            gallery         TEXT NOT NULL DEFAULT '[]',
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_invitations_user
            ON invitations(user_id, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id              TEXT PRIMARY KEY,
            invitation_id   TEXT NOT NULL REFERENCES invitations(id) ON DELETE CASCADE,
            guest_name      TEXT NOT NULL,
            message         TEXT NOT NULL,
            attendance      TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_invitation
            ON comments(invitation_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
