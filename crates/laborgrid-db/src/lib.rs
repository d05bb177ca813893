// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use laborgrid_app::{
    Dwarf, DwarfId, GridSettings, GroupBy, LaborId, Sex, SettingKey, SettingValue, Skill, SkillId,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "laborgrid";

const SCHEMA: &str = "
CREATE TABLE dwarves (
  id INTEGER PRIMARY KEY,
  name TEXT NOT NULL,
  sex TEXT NOT NULL CHECK (sex IN ('male', 'female')),
  profession TEXT NOT NULL,
  happiness INTEGER NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE skills (
  dwarf_id INTEGER NOT NULL REFERENCES dwarves(id) ON DELETE CASCADE,
  skill_id INTEGER NOT NULL,
  name TEXT NOT NULL,
  rating INTEGER NOT NULL,
  PRIMARY KEY (dwarf_id, skill_id)
);

CREATE TABLE labors (
  dwarf_id INTEGER NOT NULL REFERENCES dwarves(id) ON DELETE CASCADE,
  labor_id INTEGER NOT NULL,
  enabled INTEGER NOT NULL CHECK (enabled IN (0, 1)),
  updated_at TEXT NOT NULL,
  PRIMARY KEY (dwarf_id, labor_id)
);

CREATE TABLE settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "dwarves",
        &[
            "id",
            "name",
            "sex",
            "profession",
            "happiness",
            "created_at",
            "updated_at",
        ],
    ),
    ("skills", &["dwarf_id", "skill_id", "name", "rating"]),
    ("labors", &["dwarf_id", "labor_id", "enabled", "updated_at"]),
    ("settings", &["key", "value", "updated_at"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_skills_dwarf",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_skills_dwarf ON skills (dwarf_id)",
    },
    RequiredIndex {
        name: "idx_labors_dwarf",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_labors_dwarf ON labors (dwarf_id)",
    },
];

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        debug!(path = %path.display(), "opened database");
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(SCHEMA)
                .context("create schema")?;
            info!("created database schema");
        }

        ensure_required_indexes(&self.conn)?;
        Ok(())
    }

    /// Inserts a dwarf with its skills and labor values as persisted state.
    pub fn insert_dwarf(&mut self, dwarf: &Dwarf) -> Result<DwarfId> {
        let now = now_rfc3339()?;
        let tx = self
            .conn
            .transaction()
            .context("begin dwarf insert transaction")?;
        tx.execute(
            "
            INSERT INTO dwarves (id, name, sex, profession, happiness, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                dwarf.id.get(),
                dwarf.name,
                dwarf.sex.as_str(),
                dwarf.profession,
                dwarf.happiness,
                now,
                now
            ],
        )
        .with_context(|| format!("insert dwarf {} ({})", dwarf.id, dwarf.name))?;

        for skill in &dwarf.skills {
            tx.execute(
                "INSERT INTO skills (dwarf_id, skill_id, name, rating) VALUES (?, ?, ?, ?)",
                params![dwarf.id.get(), skill.id.get(), skill.name, skill.rating],
            )
            .with_context(|| format!("insert skill {} for dwarf {}", skill.name, dwarf.id))?;
        }

        for (labor_id, state) in dwarf.labors() {
            tx.execute(
                "INSERT INTO labors (dwarf_id, labor_id, enabled, updated_at) VALUES (?, ?, ?, ?)",
                params![dwarf.id.get(), labor_id.get(), state.enabled(), now],
            )
            .with_context(|| format!("insert labor {labor_id} for dwarf {}", dwarf.id))?;
        }

        tx.commit().context("commit dwarf insert")?;
        Ok(dwarf.id)
    }

    pub fn dwarf_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM dwarves", [], |row| row.get(0))
            .context("count dwarves")?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Every dwarf ordered by id, with skills and labors attached and no
    /// pending changes.
    pub fn list_dwarves(&self) -> Result<Vec<Dwarf>> {
        let mut skills = self.load_skills()?;
        let mut labors = self.load_labors()?;

        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, name, sex, profession, happiness
                FROM dwarves
                ORDER BY id ASC
                ",
            )
            .context("prepare dwarves query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i32>(4)?,
                ))
            })
            .context("query dwarves")?;

        let mut dwarves = Vec::new();
        for row in rows {
            let (id, name, sex, profession, happiness) = row.context("decode dwarf row")?;
            let sex = Sex::parse(&sex).ok_or_else(|| {
                anyhow!("dwarf {id} has unknown sex `{sex}`; expected `male` or `female`")
            })?;

            let id = DwarfId::new(id);
            let mut dwarf = Dwarf::new(id, name, sex, profession, happiness);
            for skill in skills.remove(&id).unwrap_or_default() {
                dwarf = dwarf.with_skill(skill);
            }
            for (labor_id, enabled) in labors.remove(&id).unwrap_or_default() {
                dwarf = dwarf.with_labor(labor_id, enabled);
            }
            dwarves.push(dwarf);
        }

        debug!(dwarves = dwarves.len(), "listed dwarves");
        Ok(dwarves)
    }

    fn load_skills(&self) -> Result<BTreeMap<DwarfId, Vec<Skill>>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT dwarf_id, skill_id, name, rating
                FROM skills
                ORDER BY dwarf_id ASC, skill_id ASC
                ",
            )
            .context("prepare skills query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    DwarfId::new(row.get(0)?),
                    Skill::new(SkillId::new(row.get(1)?), row.get::<_, String>(2)?, row.get(3)?),
                ))
            })
            .context("query skills")?;

        let mut skills = BTreeMap::<DwarfId, Vec<Skill>>::new();
        for row in rows {
            let (dwarf_id, skill) = row.context("decode skill row")?;
            skills.entry(dwarf_id).or_default().push(skill);
        }
        Ok(skills)
    }

    fn load_labors(&self) -> Result<BTreeMap<DwarfId, Vec<(LaborId, bool)>>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT dwarf_id, labor_id, enabled
                FROM labors
                ORDER BY dwarf_id ASC, labor_id ASC
                ",
            )
            .context("prepare labors query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    DwarfId::new(row.get(0)?),
                    LaborId::new(row.get(1)?),
                    row.get::<_, bool>(2)?,
                ))
            })
            .context("query labors")?;

        let mut labors = BTreeMap::<DwarfId, Vec<(LaborId, bool)>>::new();
        for row in rows {
            let (dwarf_id, labor_id, enabled) = row.context("decode labor row")?;
            labors.entry(dwarf_id).or_default().push((labor_id, enabled));
        }
        Ok(labors)
    }

    /// Writes the pending value of every dirty labor in one transaction and
    /// returns the number of labor rows written.
    pub fn persist_labors(&mut self, dwarves: &[&Dwarf]) -> Result<usize> {
        let now = now_rfc3339()?;
        let tx = self
            .conn
            .transaction()
            .context("begin labor transaction")?;

        let mut written = 0usize;
        for dwarf in dwarves {
            let exists = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM dwarves WHERE id = ?)",
                    params![dwarf.id.get()],
                    |row| row.get::<_, bool>(0),
                )
                .with_context(|| format!("look up dwarf {}", dwarf.id))?;
            if !exists {
                bail!(
                    "dwarf {} ({}) no longer exists; reload the roster before committing",
                    dwarf.id,
                    dwarf.name
                );
            }

            for (labor_id, enabled) in dwarf.dirty_labors() {
                tx.execute(
                    "
                    INSERT INTO labors (dwarf_id, labor_id, enabled, updated_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(dwarf_id, labor_id) DO UPDATE SET
                      enabled = excluded.enabled,
                      updated_at = excluded.updated_at
                    ",
                    params![dwarf.id.get(), labor_id.get(), enabled, now],
                )
                .with_context(|| format!("write labor {labor_id} for dwarf {}", dwarf.id))?;
                written += 1;
            }
        }

        tx.commit().context("commit labor changes")?;
        info!(dwarves = dwarves.len(), labors = written, "persisted labor changes");
        Ok(written)
    }

    fn get_setting_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {key}"))
    }

    fn put_setting_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert setting {key}"))?;
        Ok(())
    }

    pub fn get_setting(&self, key: SettingKey) -> Result<Option<SettingValue>> {
        let raw = self.get_setting_raw(key.as_str())?;
        raw.map(|value| {
            SettingValue::parse_for_key(key, &value).ok_or_else(|| {
                anyhow!(
                    "setting `{}` has invalid value `{}`; run `laborgrid --check`, then store a valid {:?} value",
                    key.as_str(),
                    value,
                    key.expected_value_kind()
                )
            })
        })
        .transpose()
    }

    pub fn put_setting(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        let raw = value.to_storage(key).ok_or_else(|| {
            anyhow!(
                "setting `{}` expected {:?} value; got {value:?}",
                key.as_str(),
                key.expected_value_kind()
            )
        })?;
        self.put_setting_raw(key.as_str(), &raw)
    }

    /// Every known setting, falling back to its default when unset.
    pub fn list_settings(&self) -> Result<Vec<(SettingKey, SettingValue)>> {
        let mut settings = Vec::with_capacity(SettingKey::ALL.len());
        for key in SettingKey::ALL {
            let value = self
                .get_setting(key)?
                .unwrap_or_else(|| GridSettings::default_value(key));
            settings.push((key, value));
        }
        Ok(settings)
    }

    pub fn grid_settings(&self) -> Result<GridSettings> {
        let mut settings = GridSettings::default();
        for key in SettingKey::ALL {
            if let Some(value) = self.get_setting(key)? {
                settings.apply(key, &value);
            }
        }
        Ok(settings)
    }

    pub fn group_by_preference(&self) -> Result<Option<GroupBy>> {
        match self.get_setting(SettingKey::GroupBy)? {
            Some(SettingValue::Text(raw)) => GroupBy::parse(&raw).map(Some).ok_or_else(|| {
                anyhow!(
                    "setting `{}` has unknown grouping `{raw}`; expected one of {}",
                    SettingKey::GroupBy.as_str(),
                    group_by_choices()
                )
            }),
            _ => Ok(None),
        }
    }

    pub fn put_group_by(&self, group_by: GroupBy) -> Result<()> {
        self.put_setting(
            SettingKey::GroupBy,
            SettingValue::Text(group_by.as_str().to_owned()),
        )
    }
}

pub fn group_by_choices() -> String {
    GroupBy::ALL
        .iter()
        .map(|policy| policy.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

/// Per-user data directory, created on demand.
pub fn data_dir() -> Result<PathBuf> {
    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set LABORGRID_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir)
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("LABORGRID_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("laborgrid.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point LABORGRID_DB_PATH at a laborgrid database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; recreate the database or migrate it first",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; recreate the database or migrate it first",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

#[cfg(test)]
mod tests {
    use super::Store;
    use anyhow::Result;
    use laborgrid_app::{GridSettings, GroupBy, Rgb, SettingKey, SettingValue};

    #[test]
    fn list_settings_returns_typed_defaults() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        let settings = store.list_settings()?;
        assert_eq!(settings.len(), SettingKey::ALL.len());
        assert_eq!(settings[0].0, SettingKey::ColorCursor);
        assert_eq!(
            settings[0].1,
            SettingValue::Color(GridSettings::default().colors.cursor)
        );
        assert_eq!(store.grid_settings()?, GridSettings::default());
        Ok(())
    }

    #[test]
    fn typed_settings_round_trip() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        store.put_setting(SettingKey::ColorGuides, SettingValue::Color(Rgb::BLACK))?;
        store.put_setting(SettingKey::CellPadding, SettingValue::Integer(1))?;
        store.put_group_by(GroupBy::Happiness)?;

        let settings = store.grid_settings()?;
        assert_eq!(settings.colors.guides, Rgb::BLACK);
        assert_eq!(settings.cell_padding, 1);
        assert_eq!(store.group_by_preference()?, Some(GroupBy::Happiness));
        Ok(())
    }

    #[test]
    fn invalid_color_setting_is_actionable() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        store.put_setting_raw(SettingKey::ColorBorder.as_str(), "mauve")?;
        let error = store
            .grid_settings()
            .expect_err("invalid colour should be rejected");
        assert!(error.to_string().contains("run `laborgrid --check`"));
        Ok(())
    }

    #[test]
    fn unknown_grouping_is_rejected() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        store.put_setting_raw(SettingKey::GroupBy.as_str(), "caste")?;
        let error = store
            .group_by_preference()
            .expect_err("unknown grouping should be rejected");
        assert!(error.to_string().contains("nothing|profession"));
        Ok(())
    }

    #[test]
    fn put_setting_rejects_mismatched_kind() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        let error = store
            .put_setting(SettingKey::CellPadding, SettingValue::Text("2".to_owned()))
            .expect_err("text padding should be rejected");
        assert!(error.to_string().contains("grid.cell_padding"));
        Ok(())
    }
}
