//! Seed data import from CSV files.
//!
//! Loads the files below from one directory, in this order so foreign keys
//! resolve. Missing files are skipped. Rows keep their ids, rows whose id is
//! already present are left alone, and every id sequence is moved past the
//! highest imported id. The whole import is one transaction.
//!
//! | file | columns |
//! |---|---|
//! | `users.csv` | id, username, email, role, bio, first_name, last_name |
//! | `category.csv` | id, name, slug |
//! | `genre.csv` | id, name, slug |
//! | `titles.csv` | id, name, year, category |
//! | `genre_title.csv` | id, title_id, genre_id |
//! | `review.csv` | id, title_id, text, author, score, pub_date |
//! | `comments.csv` | id, review_id, text, author, pub_date |

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use sqlx::{PgConnection, postgres::PgQueryResult};

use crate::db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read {file}: {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },

    #[error("malformed row in {file}: {source}")]
    Csv { file: String, source: csv::Error },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome for one imported file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub file: &'static str,
    pub inserted: u64,
    pub skipped: u64,
}

/// The seed files, in import order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedFile {
    Users,
    Categories,
    Genres,
    Titles,
    GenreTitles,
    Reviews,
    Comments,
}

impl SeedFile {
    pub const ALL: [SeedFile; 7] = [
        SeedFile::Users,
        SeedFile::Categories,
        SeedFile::Genres,
        SeedFile::Titles,
        SeedFile::GenreTitles,
        SeedFile::Reviews,
        SeedFile::Comments,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            SeedFile::Users => "users.csv",
            SeedFile::Categories => "category.csv",
            SeedFile::Genres => "genre.csv",
            SeedFile::Titles => "titles.csv",
            SeedFile::GenreTitles => "genre_title.csv",
            SeedFile::Reviews => "review.csv",
            SeedFile::Comments => "comments.csv",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            SeedFile::Users => "users",
            SeedFile::Categories => "categories",
            SeedFile::Genres => "genres",
            SeedFile::Titles => "titles",
            SeedFile::GenreTitles => "genre_title",
            SeedFile::Reviews => "reviews",
            SeedFile::Comments => "comments",
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: i64,
    username: String,
    email: String,
    #[serde(default = "default_role")]
    role: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    id: i64,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct TitleRecord {
    id: i64,
    name: String,
    year: i32,
    category: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GenreTitleRecord {
    id: i64,
    title_id: i64,
    genre_id: i64,
}

#[derive(Debug, Deserialize)]
struct ReviewRecord {
    id: i64,
    title_id: i64,
    text: String,
    author: i64,
    score: i16,
    pub_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CommentRecord {
    id: i64,
    review_id: i64,
    text: String,
    author: i64,
    pub_date: DateTime<Utc>,
}

/// Import every seed file found in `dir`.
///
/// # Errors
///
/// Any unreadable file, malformed row or rejected insert aborts the import
/// and rolls back everything.
pub async fn import_directory(pool: &DbPool, dir: &Path) -> Result<Vec<ImportReport>, ImportError> {
    let mut tx = pool.begin().await?;
    let mut reports = Vec::new();

    for seed in SeedFile::ALL {
        let path = dir.join(seed.file_name());
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!("{} not found, skipping", path.display());
            continue;
        }

        let bytes = tokio::fs::read(&path).await.map_err(|source| ImportError::Io {
            file: seed.file_name().to_string(),
            source,
        })?;

        let (inserted, total) = import_file(&mut tx, seed, &bytes).await?;
        reset_sequence(&mut tx, seed.table()).await?;

        tracing::info!(
            "{}: {} rows imported, {} already present",
            seed.file_name(),
            inserted,
            total - inserted
        );
        reports.push(ImportReport {
            file: seed.file_name(),
            inserted,
            skipped: total - inserted,
        });
    }

    tx.commit().await?;
    Ok(reports)
}

/// Returns (inserted rows, rows in file).
async fn import_file(
    conn: &mut PgConnection,
    seed: SeedFile,
    bytes: &[u8],
) -> Result<(u64, u64), ImportError> {
    let file = seed.file_name();
    let mut inserted = 0;
    let total;

    match seed {
        SeedFile::Users => {
            let records: Vec<UserRecord> = parse_records(bytes, file)?;
            total = records.len() as u64;
            for r in records {
                let result = sqlx::query(
                    r#"
                    INSERT INTO users (id, username, email, role, bio, first_name, last_name)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(r.id)
                .bind(r.username)
                .bind(r.email)
                .bind(r.role)
                .bind(r.bio)
                .bind(r.first_name)
                .bind(r.last_name)
                .execute(&mut *conn)
                .await?;
                inserted += affected(result);
            }
        }
        SeedFile::Categories | SeedFile::Genres => {
            let records: Vec<CatalogRecord> = parse_records(bytes, file)?;
            total = records.len() as u64;
            let sql = format!(
                "INSERT INTO {} (id, name, slug) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
                seed.table()
            );
            for r in records {
                let result = sqlx::query(&sql)
                    .bind(r.id)
                    .bind(r.name)
                    .bind(r.slug)
                    .execute(&mut *conn)
                    .await?;
                inserted += affected(result);
            }
        }
        SeedFile::Titles => {
            let records: Vec<TitleRecord> = parse_records(bytes, file)?;
            total = records.len() as u64;
            for r in records {
                let result = sqlx::query(
                    r#"
                    INSERT INTO titles (id, name, year, category_id)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(r.id)
                .bind(r.name)
                .bind(r.year)
                .bind(r.category)
                .execute(&mut *conn)
                .await?;
                inserted += affected(result);
            }
        }
        SeedFile::GenreTitles => {
            let records: Vec<GenreTitleRecord> = parse_records(bytes, file)?;
            total = records.len() as u64;
            for r in records {
                let result = sqlx::query(
                    "INSERT INTO genre_title (id, title_id, genre_id) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
                )
                .bind(r.id)
                .bind(r.title_id)
                .bind(r.genre_id)
                .execute(&mut *conn)
                .await?;
                inserted += affected(result);
            }
        }
        SeedFile::Reviews => {
            let records: Vec<ReviewRecord> = parse_records(bytes, file)?;
            total = records.len() as u64;
            for r in records {
                let result = sqlx::query(
                    r#"
                    INSERT INTO reviews (id, title_id, author_id, text, score, pub_date)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(r.id)
                .bind(r.title_id)
                .bind(r.author)
                .bind(r.text)
                .bind(r.score)
                .bind(r.pub_date)
                .execute(&mut *conn)
                .await?;
                inserted += affected(result);
            }
        }
        SeedFile::Comments => {
            let records: Vec<CommentRecord> = parse_records(bytes, file)?;
            total = records.len() as u64;
            for r in records {
                let result = sqlx::query(
                    r#"
                    INSERT INTO comments (id, review_id, author_id, text, pub_date)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(r.id)
                .bind(r.review_id)
                .bind(r.author)
                .bind(r.text)
                .bind(r.pub_date)
                .execute(&mut *conn)
                .await?;
                inserted += affected(result);
            }
        }
    }

    Ok((inserted, total))
}

fn affected(result: PgQueryResult) -> u64 {
    result.rows_affected()
}

/// Move the table's id sequence past its highest id.
async fn reset_sequence(conn: &mut PgConnection, table: &str) -> Result<(), ImportError> {
    sqlx::query(&format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
    ))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn parse_records<T: DeserializeOwned>(bytes: &[u8], file: &str) -> Result<Vec<T>, ImportError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| ImportError::Csv {
            file: file.to_string(),
            source,
        })
}
