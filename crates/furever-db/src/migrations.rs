use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Collections carry no foreign keys: references between documents are by
/// value and are checked by the write paths in `queries`.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (document collections)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                doc         TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE pets (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL,
                doc         TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_pets_username ON pets(username);

            CREATE TABLE adoption_applications (
                id          TEXT PRIMARY KEY,
                pet_id      TEXT NOT NULL,
                username    TEXT NOT NULL,
                doc         TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_applications_pet
                ON adoption_applications(pet_id, created_at);

            CREATE TABLE posts (
                id           TEXT PRIMARY KEY,
                username     TEXT NOT NULL,
                post_content TEXT NOT NULL,
                date_posted  TEXT NOT NULL,
                created_at   TEXT NOT NULL
            );

            CREATE INDEX idx_posts_username ON posts(username, date_posted);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
