//! Local settings store (SQLite).
//!
//! Two tables:
//!   - `file_paths(program_name, path)`: where external programs live
//!   - `profiles(name, color, rate, ...)`: one row of overrides per profile,
//!     one column per [`Field`]

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::profile::{Field, ProfileId, ProfileSettings};

/// File name of the store inside the data directory.
pub const DB_FILE_NAME: &str = "settings.db";

/// Environment variable overriding the store location.
pub const DB_ENV_VAR: &str = "RATTRAP_DB";

/// Default store location: `<data dir>/rattrap/settings.db`.
pub fn default_db_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(DB_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let data_dir = dirs::data_dir().ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine the user data directory",
        ))
    })?;
    Ok(data_dir.join("rattrap").join(DB_FILE_NAME))
}

/// Handle on the settings database.
pub struct SettingsStore {
    conn: Connection,
}

impl SettingsStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "Opening settings store");
        Self::init(Connection::open(path)?)
    }

    /// A throwaway store that lives only as long as the handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let columns: Vec<String> = Field::ALL[1..]
            .iter()
            .map(|field| format!("{} TEXT NOT NULL", field.column()))
            .collect();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS file_paths (
                 program_name TEXT PRIMARY KEY,
                 path TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS profiles (
                 name TEXT PRIMARY KEY,
                 {}
             );",
            columns.join(",\n                 ")
        ))?;
        Ok(Self { conn })
    }

    /// Stored location of `program`, if any.
    pub fn tool_path(&self, program: &str) -> Result<Option<PathBuf>> {
        let path: Option<String> = self
            .conn
            .query_row(
                "SELECT path FROM file_paths WHERE program_name = ?1",
                params![program],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.map(PathBuf::from))
    }

    /// Remember where `program` lives, replacing any earlier entry.
    pub fn set_tool_path(&self, program: &str, path: &Path) -> Result<()> {
        self.conn.execute(
            "INSERT INTO file_paths (program_name, path) VALUES (?1, ?2)
             ON CONFLICT(program_name) DO UPDATE SET path = excluded.path",
            params![program, path.to_string_lossy()],
        )?;
        info!(program, path = %path.display(), "Stored tool path");
        Ok(())
    }

    /// Column names of the profiles table, in order.
    pub fn column_names(&self) -> Result<Vec<String>> {
        let stmt = self.conn.prepare("SELECT * FROM profiles LIMIT 0")?;
        Ok(stmt.column_names().into_iter().map(String::from).collect())
    }

    pub fn profile(&self, id: ProfileId) -> Result<Option<ProfileSettings>> {
        let sql = format!("SELECT {} FROM profiles WHERE name = ?1", select_list());
        self.conn
            .query_row(&sql, params![id.as_str()], row_to_settings)
            .optional()?
            .transpose()
    }

    /// Every stored profile, ordered by name.
    pub fn profiles(&self) -> Result<Vec<ProfileSettings>> {
        let sql = format!("SELECT {} FROM profiles ORDER BY name", select_list());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_settings)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row??);
        }
        Ok(out)
    }

    /// Insert a full row, replacing an existing row of the same name.
    pub fn insert_profile(&self, settings: &ProfileSettings) -> Result<()> {
        let placeholders: Vec<String> = (1..=Field::ALL.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT OR REPLACE INTO profiles ({}) VALUES ({})",
            select_list(),
            placeholders.join(", ")
        );
        let values: Vec<&str> = Field::ALL.iter().map(|f| settings.get(*f)).collect();
        self.conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        info!(profile = %settings.name, "Stored profile");
        Ok(())
    }

    /// Overwrite one column of an existing row.
    pub fn update_field(&self, id: ProfileId, field: Field, value: &str) -> Result<()> {
        if field == Field::Name {
            return Err(Error::NotEditable(field));
        }
        // Column names come from `Field`, never from user input.
        let sql = format!("UPDATE profiles SET {} = ?1 WHERE name = ?2", field.column());
        let changed = self.conn.execute(&sql, params![value, id.as_str()])?;
        if changed == 0 {
            return Err(Error::MissingProfile(id));
        }
        debug!(profile = %id, %field, value, "Updated profile field");
        Ok(())
    }

    /// Remove one profile row. Returns whether a row existed.
    pub fn delete_profile(&self, id: ProfileId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM profiles WHERE name = ?1", params![id.as_str()])?;
        Ok(removed > 0)
    }

    /// Remove every profile row.
    pub fn clear_profiles(&self) -> Result<()> {
        self.conn.execute("DELETE FROM profiles", [])?;
        info!("Cleared stored profiles");
        Ok(())
    }
}

fn select_list() -> String {
    Field::ALL
        .iter()
        .map(|f| f.column())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outer error is SQLite, inner is a row whose name is not a known profile.
fn row_to_settings(row: &Row<'_>) -> rusqlite::Result<Result<ProfileSettings>> {
    let name: String = row.get(0)?;
    let id = match name.parse::<ProfileId>() {
        Ok(id) => id,
        Err(e) => return Ok(Err(e)),
    };
    let mut settings = ProfileSettings::empty(id);
    for (i, field) in Field::ALL.iter().enumerate().skip(1) {
        let value: String = row.get(i)?;
        if let Err(e) = settings.set(*field, value) {
            return Ok(Err(e));
        }
    }
    Ok(Ok(settings))
}
