use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{DeveloperId, Gender, LevelId};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLevel {
    pub level_id: LevelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDeveloper {
    pub developer_id: DeveloperId,
    pub level_id: LevelId,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub age: u32,
    pub hobby: String,
}

/// Every editable developer column; inserts and updates write all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperFields {
    pub level_id: LevelId,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub age: u32,
    pub hobby: String,
}

const DEVELOPER_COLUMNS: &str = "id, id_level, name, gender, date_birth, age, hobby";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_level(&self, name: &str) -> Result<StoredLevel> {
        let rec = sqlx::query("INSERT INTO levels (level) VALUES (?) RETURNING id, level")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .context("failed to insert level")?;
        Ok(level_from_row(&rec))
    }

    pub async fn level(&self, level_id: LevelId) -> Result<Option<StoredLevel>> {
        let row = sqlx::query("SELECT id, level FROM levels WHERE id = ?")
            .bind(level_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(level_from_row))
    }

    pub async fn list_levels(&self) -> Result<Vec<StoredLevel>> {
        let rows = sqlx::query("SELECT id, level FROM levels ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(level_from_row).collect())
    }

    pub async fn update_level(&self, level_id: LevelId, name: &str) -> Result<Option<StoredLevel>> {
        let row = sqlx::query("UPDATE levels SET level = ? WHERE id = ? RETURNING id, level")
            .bind(name)
            .bind(level_id.0)
            .fetch_optional(&self.pool)
            .await
            .context("failed to update level")?;
        Ok(row.as_ref().map(level_from_row))
    }

    pub async fn delete_level(&self, level_id: LevelId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM levels WHERE id = ?")
            .bind(level_id.0)
            .execute(&self.pool)
            .await
            .context("failed to delete level")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_developers_for_level(&self, level_id: LevelId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM developers WHERE id_level = ?")
            .bind(level_id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn create_developer(&self, fields: &DeveloperFields) -> Result<StoredDeveloper> {
        let rec = sqlx::query(&format!(
            "INSERT INTO developers (id_level, name, gender, date_birth, age, hobby)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {DEVELOPER_COLUMNS}"
        ))
        .bind(fields.level_id.0)
        .bind(&fields.name)
        .bind(fields.gender.code())
        .bind(fields.date_of_birth)
        .bind(i64::from(fields.age))
        .bind(&fields.hobby)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert developer")?;
        developer_from_row(&rec)
    }

    pub async fn developer(&self, developer_id: DeveloperId) -> Result<Option<StoredDeveloper>> {
        let row = sqlx::query(&format!(
            "SELECT {DEVELOPER_COLUMNS} FROM developers WHERE id = ?"
        ))
        .bind(developer_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(developer_from_row).transpose()
    }

    pub async fn list_developers(&self) -> Result<Vec<StoredDeveloper>> {
        let rows = sqlx::query(&format!(
            "SELECT {DEVELOPER_COLUMNS} FROM developers ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(developer_from_row).collect()
    }

    pub async fn update_developer(
        &self,
        developer_id: DeveloperId,
        fields: &DeveloperFields,
    ) -> Result<Option<StoredDeveloper>> {
        let row = sqlx::query(&format!(
            "UPDATE developers
             SET id_level = ?, name = ?, gender = ?, date_birth = ?, age = ?, hobby = ?
             WHERE id = ?
             RETURNING {DEVELOPER_COLUMNS}"
        ))
        .bind(fields.level_id.0)
        .bind(&fields.name)
        .bind(fields.gender.code())
        .bind(fields.date_of_birth)
        .bind(i64::from(fields.age))
        .bind(&fields.hobby)
        .bind(developer_id.0)
        .fetch_optional(&self.pool)
        .await
        .context("failed to update developer")?;
        row.as_ref().map(developer_from_row).transpose()
    }

    pub async fn delete_developer(&self, developer_id: DeveloperId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM developers WHERE id = ?")
            .bind(developer_id.0)
            .execute(&self.pool)
            .await
            .context("failed to delete developer")?;
        Ok(result.rows_affected() > 0)
    }
}

fn level_from_row(row: &SqliteRow) -> StoredLevel {
    StoredLevel {
        level_id: LevelId(row.get::<i64, _>(0)),
        name: row.get::<String, _>(1),
    }
}

fn developer_from_row(row: &SqliteRow) -> Result<StoredDeveloper> {
    let gender_code: String = row.try_get(3)?;
    let gender = Gender::from_str(&gender_code)?;
    let age: i64 = row.try_get(5)?;
    Ok(StoredDeveloper {
        developer_id: DeveloperId(row.try_get::<i64, _>(0)?),
        level_id: LevelId(row.try_get::<i64, _>(1)?),
        name: row.try_get(2)?,
        gender,
        date_of_birth: row.try_get::<NaiveDate, _>(4)?,
        age: u32::try_from(age).map_err(|_| anyhow!("stored age {age} out of range"))?,
        hobby: row.try_get(6)?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
