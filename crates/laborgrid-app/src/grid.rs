// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::color::Rgb;
use crate::columns::{CellData, ColumnType, GridLayout, GroupRef};
use crate::grouping::GroupBy;
use crate::ids::*;
use crate::model::Dwarf;

pub const NAME_COLUMN: usize = 0;
pub const NAME_BG_COLOR: Rgb = Rgb::new(0xfa, 0xfa, 0xfa);

/// Position of a cell in the two-level row tree. `parent` is the top-level
/// row holding this row, `None` for top-level rows themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex {
    pub parent: Option<usize>,
    pub row: usize,
    pub column: usize,
}

impl CellIndex {
    pub const fn top(row: usize, column: usize) -> Self {
        Self {
            parent: None,
            row,
            column,
        }
    }

    pub const fn child(parent: usize, row: usize, column: usize) -> Self {
        Self {
            parent: Some(parent),
            row,
            column,
        }
    }

    pub const fn sibling(self, column: usize) -> Self {
        Self { column, ..self }
    }

    /// The cell in the same column of the parent row.
    pub const fn parent_cell(self) -> Option<Self> {
        match self.parent {
            Some(parent) => Some(Self::top(parent, self.column)),
            None => None,
        }
    }
}

/// Where dwarves come from and where committed labor changes go.
pub trait RosterSource {
    fn load_dwarves(&mut self) -> Result<Vec<Dwarf>>;
    fn persist_labors(&mut self, dwarves: &[&Dwarf]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    pub title: String,
    pub bg_color: Option<Rgb>,
    pub column_type: ColumnType,
    /// Preferred width in grid pixels; zero for the name column, which the
    /// view sizes itself.
    pub width: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Group { key: String, members: Vec<DwarfId> },
    Leaf { dwarf_id: DwarfId },
}

#[derive(Debug, Clone)]
struct DisplayRow {
    kind: RowKind,
    children: Vec<usize>,
    cells: Vec<CellData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    PendingChanged(usize),
    Reset,
    CellsChanged(Vec<CellIndex>),
    HeadersRebuilt {
        spacers: Vec<usize>,
        widths: Vec<(usize, u16)>,
    },
    RowsRebuilt {
        top_level: usize,
        leaves: usize,
    },
    GuideChanged(Option<usize>),
}

#[derive(Debug, Clone, Default)]
pub struct RosterModel {
    layout: GridLayout,
    group_by: GroupBy,
    dwarves: BTreeMap<DwarfId, Dwarf>,
    loaded: bool,
    headers: Vec<ColumnHeader>,
    rows: Vec<DisplayRow>,
    top_level: Vec<usize>,
    groups: BTreeMap<String, Vec<DwarfId>>,
    leaf_indices: HashMap<DwarfId, CellIndex>,
    selected_col: Option<usize>,
}

impl RosterModel {
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn selected_col(&self) -> Option<usize> {
        self.selected_col
    }

    pub fn load(&mut self, dwarves: Vec<Dwarf>) -> Vec<ModelEvent> {
        self.dwarves = dwarves
            .into_iter()
            .map(|dwarf| (dwarf.id, dwarf))
            .collect();
        self.loaded = true;
        info!(dwarves = self.dwarves.len(), "loaded roster");

        self.rebuild()
    }

    pub fn reload<S: RosterSource + ?Sized>(&mut self, source: &mut S) -> Result<Vec<ModelEvent>> {
        let dwarves = source.load_dwarves().context("load dwarves from roster source")?;
        Ok(self.load(dwarves))
    }

    pub fn set_group_by(&mut self, group_by: GroupBy) -> Vec<ModelEvent> {
        debug!(group_by = group_by.as_str(), "group_by changed");
        self.group_by = group_by;
        if self.loaded {
            self.rebuild()
        } else {
            Vec::new()
        }
    }

    pub fn set_layout(&mut self, layout: GridLayout) -> Vec<ModelEvent> {
        self.layout = layout;
        self.selected_col = None;
        if self.loaded {
            self.rebuild()
        } else {
            Vec::new()
        }
    }

    /// Throws away every row and header and derives them again from the
    /// current dwarves, grouping policy and layout.
    pub fn rebuild(&mut self) -> Vec<ModelEvent> {
        self.rows.clear();
        self.top_level.clear();
        self.groups.clear();
        self.leaf_indices.clear();

        let group_by = self.group_by;
        for dwarf in self.dwarves.values() {
            self.groups
                .entry(group_by.key_for(dwarf))
                .or_default()
                .push(dwarf.id);
        }

        let headers_event = self.build_headers();

        let groups = std::mem::take(&mut self.groups);
        let grouped = group_by.is_grouped();
        let mut leaves = 0;
        for (key, members) in &groups {
            let member_refs = members
                .iter()
                .filter_map(|id| self.dwarves.get(id))
                .collect::<Vec<_>>();

            let parent = if grouped {
                let mut cells = Vec::with_capacity(self.layout.column_count() + 1);
                let mut name = CellData::new(ColumnType::Default, NAME_BG_COLOR);
                name.text = format!("{key} ({})", member_refs.len());
                name.aggregate = true;
                name.group = Some(GroupRef {
                    key: key.clone(),
                    member_count: member_refs.len(),
                });
                cells.push(name);
                cells.extend(
                    self.layout
                        .columns()
                        .map(|column| column.build_aggregate(key, &member_refs)),
                );

                let arena = self.rows.len();
                self.rows.push(DisplayRow {
                    kind: RowKind::Group {
                        key: key.clone(),
                        members: members.clone(),
                    },
                    children: Vec::new(),
                    cells,
                });
                self.top_level.push(arena);
                Some((arena, self.top_level.len() - 1))
            } else {
                None
            };

            for dwarf in &member_refs {
                let mut cells = Vec::with_capacity(self.layout.column_count() + 1);
                let mut name = CellData::new(ColumnType::Default, NAME_BG_COLOR);
                name.text = dwarf.nice_name().to_owned();
                name.tooltip = Some(skill_summary(dwarf));
                name.dwarf_id = Some(dwarf.id);
                cells.push(name);
                cells.extend(self.layout.columns().map(|column| column.build_cell(dwarf)));

                let arena = self.rows.len();
                self.rows.push(DisplayRow {
                    kind: RowKind::Leaf { dwarf_id: dwarf.id },
                    children: Vec::new(),
                    cells,
                });

                let index = match parent {
                    Some((parent_arena, parent_row)) => {
                        let position = self.rows[parent_arena].children.len();
                        self.rows[parent_arena].children.push(arena);
                        CellIndex::child(parent_row, position, NAME_COLUMN)
                    }
                    None => {
                        self.top_level.push(arena);
                        CellIndex::top(self.top_level.len() - 1, NAME_COLUMN)
                    }
                };
                self.leaf_indices.insert(dwarf.id, index);
                leaves += 1;
            }
        }
        self.groups = groups;

        debug!(
            group_by = group_by.as_str(),
            groups = self.groups.len(),
            leaves,
            "rebuilt rows"
        );

        vec![
            headers_event,
            ModelEvent::RowsRebuilt {
                top_level: self.top_level.len(),
                leaves,
            },
            ModelEvent::PendingChanged(self.pending_change_count()),
        ]
    }

    fn build_headers(&mut self) -> ModelEvent {
        self.headers.clear();
        self.headers.push(ColumnHeader {
            title: String::new(),
            bg_color: None,
            column_type: ColumnType::Default,
            width: 0,
        });

        let mut spacers = Vec::new();
        let mut widths = Vec::new();
        for (offset, column) in self.layout.columns().enumerate() {
            let index = offset + 1;
            let width = column.preferred_width();
            if column.is_spacer() {
                spacers.push(index);
            }
            widths.push((index, width));
            self.headers.push(ColumnHeader {
                title: column.title().to_owned(),
                bg_color: Some(column.bg_color),
                column_type: column.column_type(),
                width,
            });
        }
        ModelEvent::HeadersRebuilt { spacers, widths }
    }

    /// Handles activation of a cell. Only labor cells react: a group cell
    /// enables the labor for every member unless all of them already have
    /// it, in which case it disables it for all; a dwarf cell flips that
    /// one dwarf.
    pub fn toggle_cell(&mut self, index: CellIndex) -> Vec<ModelEvent> {
        if index.column == NAME_COLUMN {
            return Vec::new();
        }
        let Some(arena) = self.arena_index(index) else {
            return Vec::new();
        };
        let Some(cell) = self.rows[arena].cells.get(index.column) else {
            return Vec::new();
        };
        if cell.column_type != ColumnType::Labor {
            return Vec::new();
        }
        let Some(labor_id) = cell.labor_id else {
            return Vec::new();
        };

        let mut touched = Vec::new();
        match &self.rows[arena].kind {
            RowKind::Group { key, members } => {
                let member_count = self.rows[arena].children.len();
                let enabled_count = members
                    .iter()
                    .filter_map(|id| self.dwarves.get(id))
                    .filter(|dwarf| dwarf.is_labor_enabled(labor_id))
                    .count();
                let enable = enabled_count < members.len();
                for id in members {
                    if let Some(dwarf) = self.dwarves.get_mut(id) {
                        dwarf.set_labor(labor_id, enable);
                    }
                }
                debug!(group = %key, labor = %labor_id, enable, "toggled group labor");

                touched.push(index);
                touched.extend(
                    (0..member_count).map(|position| CellIndex::child(index.row, position, index.column)),
                );
            }
            RowKind::Leaf { dwarf_id } => {
                if let Some(dwarf) = self.dwarves.get_mut(dwarf_id) {
                    dwarf.toggle_labor(labor_id);
                    debug!(
                        dwarf = %dwarf_id,
                        labor = %labor_id,
                        enabled = dwarf.is_labor_enabled(labor_id),
                        "toggled labor"
                    );
                }
                if let Some(parent) = index.parent_cell() {
                    touched.push(parent);
                }
                touched.push(index);
            }
        }

        for cell_index in &touched {
            if let Some(arena) = self.arena_index(*cell_index) {
                self.refresh_cell(arena, cell_index.column);
            }
        }

        vec![
            ModelEvent::CellsChanged(touched),
            ModelEvent::PendingChanged(self.pending_change_count()),
        ]
    }

    /// Recomputes cached metadata for one cell from dwarf state and bumps
    /// its revision so views repaint it.
    fn refresh_cell(&mut self, arena: usize, column: usize) {
        if column == NAME_COLUMN {
            return;
        }
        let Some(resolved) = self.layout.columns().nth(column - 1) else {
            return;
        };
        let row = &self.rows[arena];
        let Some(previous) = row.cells.get(column) else {
            return;
        };
        let revision = previous.revision.wrapping_add(1);
        let mut fresh = match &row.kind {
            RowKind::Group { key, members } => {
                let member_refs = members
                    .iter()
                    .filter_map(|id| self.dwarves.get(id))
                    .collect::<Vec<_>>();
                resolved.build_aggregate(key, &member_refs)
            }
            RowKind::Leaf { dwarf_id } => match self.dwarves.get(dwarf_id) {
                Some(dwarf) => resolved.build_cell(dwarf),
                None => return,
            },
        };
        fresh.revision = revision;
        self.rows[arena].cells[column] = fresh;
    }

    /// Number of dirty labor states across all dwarves.
    pub fn pending_change_count(&self) -> usize {
        self.dwarves.values().map(Dwarf::pending_changes).sum()
    }

    pub fn dirty_dwarves(&self) -> Vec<&Dwarf> {
        self.dwarves
            .values()
            .filter(|dwarf| dwarf.pending_changes() > 0)
            .collect()
    }

    /// Persists every pending labor change through `sink`, then rebuilds.
    /// Nothing is committed in memory when the sink fails.
    pub fn commit<S: RosterSource + ?Sized>(&mut self, sink: &mut S) -> Result<Vec<ModelEvent>> {
        let dirty = self.dirty_dwarves();
        let dirty_count = dirty.len();
        if !dirty.is_empty() {
            sink.persist_labors(&dirty)
                .context("persist pending labor changes")?;
        }
        for dwarf in self.dwarves.values_mut() {
            dwarf.commit_pending();
        }
        info!(dwarves = dirty_count, "committed labor changes");

        Ok(self.rebuild())
    }

    /// Reverts pending labor changes without rebuilding rows.
    pub fn discard(&mut self) -> Vec<ModelEvent> {
        let reverted = self.pending_change_count();
        for dwarf in self.dwarves.values_mut() {
            dwarf.clear_pending();
        }
        let labor_columns = self
            .layout
            .columns()
            .enumerate()
            .filter(|(_, column)| column.column_type() == ColumnType::Labor)
            .map(|(offset, _)| offset + 1)
            .collect::<Vec<_>>();
        for arena in 0..self.rows.len() {
            for column in &labor_columns {
                self.refresh_cell(arena, *column);
            }
        }
        info!(reverted, "discarded pending labor changes");

        vec![ModelEvent::Reset, ModelEvent::PendingChanged(0)]
    }

    /// Toggles the guide lines on `column`; the same column again clears them.
    pub fn section_right_clicked(&mut self, column: usize) -> Vec<ModelEvent> {
        self.selected_col = if self.selected_col == Some(column) {
            None
        } else {
            Some(column)
        };
        vec![ModelEvent::GuideChanged(self.selected_col)]
    }

    pub fn row_count(&self, parent: Option<usize>) -> usize {
        match parent {
            None => self.top_level.len(),
            Some(parent) => self
                .top_level
                .get(parent)
                .map_or(0, |arena| self.rows[*arena].children.len()),
        }
    }

    pub fn column_count(&self) -> usize {
        self.layout.column_count() + 1
    }

    pub fn header(&self, column: usize) -> Option<&ColumnHeader> {
        self.headers.get(column)
    }

    pub fn headers(&self) -> &[ColumnHeader] {
        &self.headers
    }

    pub fn cell(&self, index: CellIndex) -> Option<&CellData> {
        self.arena_index(index)
            .and_then(|arena| self.rows[arena].cells.get(index.column))
    }

    pub fn row_kind(&self, index: CellIndex) -> Option<&RowKind> {
        self.arena_index(index).map(|arena| &self.rows[arena].kind)
    }

    pub fn dwarf(&self, id: DwarfId) -> Option<&Dwarf> {
        self.dwarves.get(&id)
    }

    pub fn dwarves(&self) -> impl Iterator<Item = &Dwarf> + '_ {
        self.dwarves.values()
    }

    pub fn dwarf_count(&self) -> usize {
        self.dwarves.len()
    }

    /// Name-column index of the row showing `id`.
    pub fn leaf_index(&self, id: DwarfId) -> Option<CellIndex> {
        self.leaf_indices.get(&id).copied()
    }

    pub fn group_members(&self, key: &str) -> &[DwarfId] {
        self.groups.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn group_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    fn arena_index(&self, index: CellIndex) -> Option<usize> {
        match index.parent {
            None => self.top_level.get(index.row).copied(),
            Some(parent) => {
                let parent_arena = *self.top_level.get(parent)?;
                self.rows[parent_arena].children.get(index.row).copied()
            }
        }
    }
}

fn skill_summary(dwarf: &Dwarf) -> String {
    let mut summary = format!(
        "Happiness: {} ({})\nSkills:",
        dwarf.happiness,
        dwarf.happiness_level().label()
    );
    let skills = dwarf.skills_by_rating();
    if skills.is_empty() {
        summary.push_str("\n  (none)");
    }
    for skill in skills {
        summary.push_str("\n  - ");
        summary.push_str(&skill.to_string());
    }
    summary
}
