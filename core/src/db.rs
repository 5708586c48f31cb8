use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::error::{AppError, Result};
use crate::models::{
    CurrentWeather, NewSavedLocation, NewTodo, Priority, SavedLocation, Todo, WeatherHistory,
};

pub use rusqlite::Error as DbError;

/// Read cap for the weather search log.
pub const HISTORY_LIMIT: usize = 20;

/// Which app a database file belongs to. Each app gets its own file and
/// only its own tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Todo,
    Weather,
}

impl Schema {
    #[must_use]
    pub fn app_name(self) -> &'static str {
        match self {
            Self::Todo => "todo_app",
            Self::Weather => "weather_app",
        }
    }

    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.db", self.app_name())
    }
}

pub struct Database {
    conn: Connection,
}

/// Lock a shared database, recovering the guard if a previous holder panicked.
pub fn lock(db: &Mutex<Database>) -> MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
    }
}

impl Database {
    pub fn open(path: &Path, schema: Schema) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.migrate(schema)?;
        tracing::debug!(path = %path.display(), app = schema.app_name(), "database opened");
        Ok(db)
    }

    pub fn open_in_memory(schema: Schema) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate(schema)?;
        Ok(db)
    }

    fn migrate(&self, schema: Schema) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            match schema {
                Schema::Todo => self.conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS todos (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        title TEXT NOT NULL,
                        description TEXT,
                        completed INTEGER NOT NULL DEFAULT 0,
                        priority TEXT NOT NULL DEFAULT 'medium',
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos(created_at);

                    PRAGMA user_version = 1;",
                )?,
                Schema::Weather => self.conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS weather_history (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        city TEXT NOT NULL,
                        country TEXT,
                        temperature REAL NOT NULL,
                        feels_like REAL,
                        humidity INTEGER,
                        pressure INTEGER,
                        wind_speed REAL,
                        wind_direction INTEGER,
                        weather_main TEXT NOT NULL,
                        weather_description TEXT NOT NULL,
                        icon TEXT,
                        timezone INTEGER,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS saved_locations (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        city TEXT NOT NULL,
                        country TEXT,
                        latitude REAL,
                        longitude REAL,
                        nickname TEXT,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_weather_history_created_at
                        ON weather_history(created_at);
                    CREATE UNIQUE INDEX IF NOT EXISTS idx_saved_locations_city_country
                        ON saved_locations(city, IFNULL(country, ''));

                    PRAGMA user_version = 1;",
                )?,
            }
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn todo_from_row(row: &rusqlite::Row) -> rusqlite::Result<Todo> {
        Ok(Todo {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            completed: row.get(3)?,
            priority: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn history_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeatherHistory> {
        Ok(WeatherHistory {
            id: row.get(0)?,
            city: row.get(1)?,
            country: row.get(2)?,
            temperature: row.get(3)?,
            feels_like: row.get(4)?,
            humidity: row.get(5)?,
            pressure: row.get(6)?,
            wind_speed: row.get(7)?,
            wind_direction: row.get(8)?,
            weather_main: row.get(9)?,
            weather_description: row.get(10)?,
            icon: row.get(11)?,
            timezone: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn location_from_row(row: &rusqlite::Row) -> rusqlite::Result<SavedLocation> {
        Ok(SavedLocation {
            id: row.get(0)?,
            city: row.get(1)?,
            country: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            nickname: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    // --- Todos ---

    /// All todos, newest first.
    pub fn list_todos(&self) -> Result<Vec<Todo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, completed, priority, created_at, updated_at
             FROM todos ORDER BY created_at DESC, id DESC",
        )?;
        let todos = stmt
            .query_map([], Self::todo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(todos)
    }

    pub fn get_todo(&self, id: i64) -> Result<Option<Todo>> {
        let todo = self
            .conn
            .query_row(
                "SELECT id, title, description, completed, priority, created_at, updated_at
                 FROM todos WHERE id = ?1",
                params![id],
                Self::todo_from_row,
            )
            .optional()?;
        Ok(todo)
    }

    pub fn insert_todo(&self, todo: &NewTodo) -> Result<Todo> {
        let now = now();
        self.conn.execute(
            "INSERT INTO todos (title, description, completed, priority, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4, ?4)",
            params![todo.title, todo.description, todo.priority, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_todo(id)?
            .ok_or(AppError::Persistence(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Flip `completed` on one row. Returns the updated row, or `None` when
    /// no todo has this id.
    pub fn toggle_todo(&self, id: i64) -> Result<Option<Todo>> {
        let changed = self.conn.execute(
            "UPDATE todos SET completed = NOT completed, updated_at = ?2 WHERE id = ?1",
            params![id, now()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_todo(id)
    }

    pub fn delete_todo(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // --- Weather history ---

    pub fn insert_weather_history(&self, w: &CurrentWeather) -> Result<WeatherHistory> {
        let now = now();
        self.conn.execute(
            "INSERT INTO weather_history (city, country, temperature, feels_like, humidity, pressure,
                 wind_speed, wind_direction, weather_main, weather_description, icon, timezone,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                w.city,
                w.country,
                w.temperature,
                w.feels_like,
                w.humidity,
                w.pressure,
                w.wind_speed,
                w.wind_direction,
                w.weather_main,
                w.weather_description,
                w.icon,
                w.timezone,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let record = self.conn.query_row(
            "SELECT * FROM weather_history WHERE id = ?1",
            params![id],
            Self::history_from_row,
        )?;
        Ok(record)
    }

    /// The `limit` most recent searches, newest first.
    pub fn recent_weather_history(&self, limit: usize) -> Result<Vec<WeatherHistory>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM weather_history ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], Self::history_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    // --- Saved locations ---

    /// All saved locations, newest first.
    pub fn list_saved_locations(&self) -> Result<Vec<SavedLocation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM saved_locations ORDER BY created_at DESC, id DESC")?;
        let locations = stmt
            .query_map([], Self::location_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(locations)
    }

    pub fn find_saved_location(
        &self,
        city: &str,
        country: Option<&str>,
    ) -> Result<Option<SavedLocation>> {
        let location = self
            .conn
            .query_row(
                "SELECT * FROM saved_locations WHERE city = ?1 AND country IS ?2",
                params![city, country],
                Self::location_from_row,
            )
            .optional()?;
        Ok(location)
    }

    /// Insert a location. A concurrent duplicate that slipped past the
    /// caller's read-then-check is rejected by the unique index.
    pub fn insert_saved_location(&self, location: &NewSavedLocation) -> Result<SavedLocation> {
        let now = now();
        let inserted = self.conn.execute(
            "INSERT INTO saved_locations (city, country, latitude, longitude, nickname, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                location.city,
                location.country,
                location.latitude,
                location.longitude,
                location.nickname,
                now,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(AppError::validation("Location already saved"));
            }
            Err(e) => return Err(e.into()),
        }
        let id = self.conn.last_insert_rowid();
        let saved = self.conn.query_row(
            "SELECT * FROM saved_locations WHERE id = ?1",
            params![id],
            Self::location_from_row,
        )?;
        Ok(saved)
    }

    pub fn delete_saved_location(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM saved_locations WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
