use std::time::Duration;
use sqlx::{
    sqlite::{SqlitePoolOptions, SqliteRow},
    Column, Row, SqlitePool,
};

/// Staff accounts behind challenges 3 and 4. Passwords are stored in clear.
const SEED_USERS: [(&str, &str, &str); 4] = [
    ("admin", "admin123", "admin@example.com"),
    ("john", "password123", "john@example.com"),
    ("jane", "secret456", "jane@example.com"),
    ("bob", "bob2023", "bob@example.com"),
];

/// Rows of an arbitrary query, every value rendered as text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// SQLite database queried by the SQL injection challenges.
#[derive(Clone)]
pub struct VulnDb {
    pool: SqlitePool,
}

impl VulnDb {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            // Keep connections open so an in-memory database survives
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Recreates both tables with the fixed staff accounts and the flag of
    /// challenge 4.
    pub async fn seed(&self, data_extract_flag: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                password TEXT NOT NULL,
                email TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        for (username, password, email) in SEED_USERS {
            sqlx::query("INSERT INTO users (username, password, email) VALUES (?, ?, ?)")
                .bind(username)
                .bind(password)
                .bind(email)
                .execute(&self.pool)
                .await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS flags_table (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                flag_value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("DELETE FROM flags_table").execute(&self.pool).await?;
        sqlx::query("INSERT INTO flags_table (flag_value) VALUES (?)")
            .bind(data_extract_flag)
            .execute(&self.pool)
            .await?;

        tracing::info!("Challenge database seeded");
        Ok(())
    }

    /// Challenge 3. Credentials are pasted into the statement as-is.
    /// Returns the name on the first matching row.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<String>, sqlx::Error> {
        let query = format!(
            "SELECT * FROM users WHERE username='{}' AND password='{}'",
            username, password
        );
        tracing::debug!("challenge3 query: {}", query);

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(first_statement(&query)).fetch_optional(&mut *tx).await?;
        tx.rollback().await?;
        Ok(row.map(|row| match row.try_get::<String, _>("username") {
            Ok(name) => name,
            Err(_) => column_text(&row, 0),
        }))
    }

    /// Challenge 4. The search term is pasted into a LIKE pattern as-is.
    pub async fn search(&self, term: &str) -> Result<QueryRows, sqlx::Error> {
        let query = format!(
            "SELECT username, email FROM users WHERE username LIKE '%{}%'",
            term
        );
        tracing::debug!("challenge4 query: {}", query);

        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(first_statement(&query)).fetch_all(&mut *tx).await?;
        tx.rollback().await?;
        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => vec!["username".to_string(), "email".to_string()],
        };
        let rows = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| column_text(row, i)).collect())
            .collect();
        Ok(QueryRows { columns, rows })
    }
}

/// Leading statement of `sql`, up to the first `;` outside quotes and
/// comments. Stacked statements after it never run.
fn first_statement(sql: &str) -> &str {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < len {
                    if bytes[i] == quote {
                        // Doubled quote is an escaped quote
                        if i + 1 < len && bytes[i + 1] == quote {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b';' => return &sql[..i],
            _ => {}
        }
        i += 1;
    }
    sql
}

fn column_text(row: &SqliteRow, index: usize) -> String {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.unwrap_or_else(|| "NULL".to_string());
    }
    if let Ok(Some(value)) = row.try_get::<Option<i64>, _>(index) {
        return value.to_string();
    }
    if let Ok(Some(value)) = row.try_get::<Option<f64>, _>(index) {
        return value.to_string();
    }
    if let Ok(Some(value)) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return String::from_utf8_lossy(&value).into_owned();
    }
    "?".to_string()
}
