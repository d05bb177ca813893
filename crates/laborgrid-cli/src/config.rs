// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use laborgrid_app::{ColumnKind, GridLayout, GroupBy};
use laborgrid_tui::GridOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_VERSION: i64 = 1;
const MIN_CELL_SIZE: u16 = 4;
const MIN_NAME_WIDTH: u16 = 4;
const MAX_NAME_WIDTH: u16 = 80;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub layout: Option<GridLayout>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            grid: Grid::default(),
            layout: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub group_by: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Grid {
    pub cell_size: Option<u16>,
    pub name_width: Option<u16>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("LABORGRID_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!(
                "cannot resolve config directory; set LABORGRID_CONFIG_PATH to the config file"
            )
        })?;

        let app_dir = config_root.join(laborgrid_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` at the top",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            laborgrid_db::validate_db_path(db_path)?;
        }

        if let Some(raw) = &self.ui.group_by
            && GroupBy::parse(raw).is_none()
        {
            bail!(
                "ui.group_by in {} must be one of {}, got {raw:?}",
                path.display(),
                laborgrid_db::group_by_choices()
            );
        }

        if let Some(cell_size) = self.grid.cell_size
            && (cell_size < MIN_CELL_SIZE || cell_size % 2 != 0)
        {
            bail!(
                "grid.cell_size in {} must be an even number of at least {MIN_CELL_SIZE}, got {cell_size}",
                path.display()
            );
        }

        if let Some(name_width) = self.grid.name_width
            && !(MIN_NAME_WIDTH..=MAX_NAME_WIDTH).contains(&name_width)
        {
            bail!(
                "grid.name_width in {} must be between {MIN_NAME_WIDTH} and {MAX_NAME_WIDTH}, got {name_width}",
                path.display()
            );
        }

        if let Some(layout) = &self.layout {
            validate_layout(layout, path)?;
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => laborgrid_db::default_db_path(),
        }
    }

    pub fn group_by(&self) -> GroupBy {
        self.ui
            .group_by
            .as_deref()
            .and_then(GroupBy::parse)
            .unwrap_or_default()
    }

    pub fn grid_options(&self) -> GridOptions {
        let defaults = GridOptions::default();
        GridOptions {
            name_width: self.grid.name_width.unwrap_or(defaults.name_width),
            cell_size: self.grid.cell_size.unwrap_or(defaults.cell_size),
        }
    }

    pub fn layout(&self) -> GridLayout {
        self.layout.clone().unwrap_or_default()
    }

    pub fn example_config(path: &Path) -> String {
        let defaults = GridOptions::default();
        format!(
            "# laborgrid config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/laborgrid/laborgrid.db)\n# db_path = \"/absolute/path/to/laborgrid.db\"\n\n[ui]\n# One of: {}\ngroup_by = \"nothing\"\n\n[grid]\n# Row height in half-block pixels; even, at least 4.\ncell_size = {}\nname_width = {}\n\n# Optional column layout. Without it a built-in layout is used.\n# [[layout.sets]]\n# name = \"Mining\"\n# bg_color = \"#e0d8c8\"\n#\n# [[layout.sets.columns]]\n# title = \"Mining\"\n# type = \"labor\"\n# labor_id = 0\n# skill_id = 0\n#\n# [[layout.sets.columns]]\n# title = \"\"\n# type = \"spacer\"\n# width = 2\n",
            path.display(),
            laborgrid_db::group_by_choices(),
            defaults.cell_size,
            defaults.name_width,
        )
    }
}

fn validate_layout(layout: &GridLayout, path: &Path) -> Result<()> {
    if layout.sets.iter().all(|set| set.columns.is_empty()) {
        bail!(
            "layout in {} defines no columns; add [[layout.sets.columns]] entries or remove [layout]",
            path.display()
        );
    }
    for set in &layout.sets {
        for column in &set.columns {
            if let ColumnKind::Spacer { width: 0 } = column.kind {
                bail!(
                    "spacer in layout set {:?} of {} must have a positive width",
                    set.name,
                    path.display()
                );
            }
        }
    }
    Ok(())
}
