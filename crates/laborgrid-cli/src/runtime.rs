// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use laborgrid_app::{Dwarf, GridSettings, GroupBy, RosterSource};
use laborgrid_db::Store;
use tracing::info;

pub struct DbRuntime<'a> {
    store: &'a mut Store,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a mut Store) -> Self {
        Self { store }
    }
}

impl RosterSource for DbRuntime<'_> {
    fn load_dwarves(&mut self) -> Result<Vec<Dwarf>> {
        self.store.list_dwarves()
    }

    fn persist_labors(&mut self, dwarves: &[&Dwarf]) -> Result<()> {
        let written = self.store.persist_labors(dwarves)?;
        info!(dwarves = dwarves.len(), written, "persisted labor changes");
        Ok(())
    }
}

impl laborgrid_tui::AppRuntime for DbRuntime<'_> {
    fn load_grid_settings(&mut self) -> Result<GridSettings> {
        self.store.grid_settings()
    }

    fn save_group_by(&mut self, group_by: GroupBy) -> Result<()> {
        self.store.put_group_by(group_by)
    }
}
