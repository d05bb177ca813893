// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::ids::*;
use crate::model::Dwarf;

/// Preferred width of every non-spacer column, in grid pixels.
pub const DEFAULT_COLUMN_WIDTH: u16 = 6;
pub const DEFAULT_SET_COLOR: Rgb = Rgb::new(0xf0, 0xf0, 0xf0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Default,
    Labor,
    Skill,
    Happiness,
    Spacer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnKind {
    Labor {
        labor_id: LaborId,
        #[serde(default)]
        skill_id: Option<SkillId>,
    },
    Skill {
        skill_id: SkillId,
    },
    Happiness,
    Spacer {
        width: u16,
    },
}

impl ColumnKind {
    pub const fn column_type(self) -> ColumnType {
        match self {
            Self::Labor { .. } => ColumnType::Labor,
            Self::Skill { .. } => ColumnType::Skill,
            Self::Happiness => ColumnType::Happiness,
            Self::Spacer { .. } => ColumnType::Spacer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewColumn {
    pub title: String,
    #[serde(default)]
    pub bg_color: Option<Rgb>,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    pub name: String,
    #[serde(default = "default_set_color")]
    pub bg_color: Rgb,
    #[serde(default)]
    pub columns: Vec<ViewColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    #[serde(default)]
    pub sets: Vec<ColumnSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub key: String,
    pub member_count: usize,
}

/// Metadata attached to one displayed cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellData {
    pub text: String,
    pub tooltip: Option<String>,
    pub column_type: ColumnType,
    pub labor_id: Option<LaborId>,
    pub dwarf_id: Option<DwarfId>,
    pub group: Option<GroupRef>,
    pub rating: i16,
    pub dirty: bool,
    pub bg_color: Rgb,
    pub aggregate: bool,
    pub revision: u32,
}

impl CellData {
    pub fn new(column_type: ColumnType, bg_color: Rgb) -> Self {
        Self {
            text: String::new(),
            tooltip: None,
            column_type,
            labor_id: None,
            dwarf_id: None,
            group: None,
            rating: 0,
            dirty: false,
            bg_color,
            aggregate: false,
            revision: 0,
        }
    }
}

/// A column together with the background it inherits from its set.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedColumn<'a> {
    pub column: &'a ViewColumn,
    pub bg_color: Rgb,
}

impl ResolvedColumn<'_> {
    pub fn title(&self) -> &str {
        &self.column.title
    }

    pub fn column_type(&self) -> ColumnType {
        self.column.kind.column_type()
    }

    pub fn preferred_width(&self) -> u16 {
        match self.column.kind {
            ColumnKind::Spacer { width } => width,
            _ => DEFAULT_COLUMN_WIDTH,
        }
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self.column.kind, ColumnKind::Spacer { .. })
    }

    pub fn build_cell(&self, dwarf: &Dwarf) -> CellData {
        let mut cell = CellData::new(self.column_type(), self.bg_color);
        cell.dwarf_id = Some(dwarf.id);
        match self.column.kind {
            ColumnKind::Labor { labor_id, skill_id } => {
                cell.labor_id = Some(labor_id);
                cell.dirty = dwarf.is_labor_state_dirty(labor_id);
                cell.rating = skill_id.map_or(0, |skill_id| dwarf.skill_rating(skill_id));
                cell.tooltip = Some(format!(
                    "{}: {} ({})",
                    dwarf.nice_name(),
                    self.column.title,
                    if dwarf.is_labor_enabled(labor_id) {
                        "enabled"
                    } else {
                        "disabled"
                    }
                ));
            }
            ColumnKind::Skill { skill_id } => {
                cell.rating = dwarf.skill_rating(skill_id);
                cell.tooltip = dwarf
                    .skills
                    .iter()
                    .find(|skill| skill.id == skill_id)
                    .map(|skill| format!("{}: {skill}", dwarf.nice_name()));
            }
            ColumnKind::Happiness => {
                cell.text = dwarf.happiness.to_string();
                cell.tooltip = Some(format!(
                    "{}: {}",
                    dwarf.nice_name(),
                    dwarf.happiness_level().label()
                ));
            }
            ColumnKind::Spacer { .. } => {}
        }
        cell
    }

    pub fn build_aggregate(&self, key: &str, members: &[&Dwarf]) -> CellData {
        let mut cell = CellData::new(self.column_type(), self.bg_color);
        cell.aggregate = true;
        cell.group = Some(GroupRef {
            key: key.to_owned(),
            member_count: members.len(),
        });
        match self.column.kind {
            ColumnKind::Labor { labor_id, .. } => {
                cell.labor_id = Some(labor_id);
                cell.dirty = members
                    .iter()
                    .any(|dwarf| dwarf.is_labor_state_dirty(labor_id));
                let enabled = members
                    .iter()
                    .filter(|dwarf| dwarf.is_labor_enabled(labor_id))
                    .count();
                cell.text = enabled.to_string();
            }
            ColumnKind::Skill { skill_id } => {
                cell.rating = members
                    .iter()
                    .map(|dwarf| dwarf.skill_rating(skill_id))
                    .max()
                    .unwrap_or(0);
            }
            ColumnKind::Happiness => {
                if !members.is_empty() {
                    let total = members
                        .iter()
                        .map(|dwarf| i64::from(dwarf.happiness))
                        .sum::<i64>();
                    cell.text = (total / members.len() as i64).to_string();
                }
            }
            ColumnKind::Spacer { .. } => {}
        }
        cell
    }
}

impl GridLayout {
    pub fn columns(&self) -> impl Iterator<Item = ResolvedColumn<'_>> + '_ {
        self.sets.iter().flat_map(|set| {
            set.columns.iter().map(move |column| ResolvedColumn {
                column,
                bg_color: column.bg_color.unwrap_or(set.bg_color),
            })
        })
    }

    pub fn column_count(&self) -> usize {
        self.sets.iter().map(|set| set.columns.len()).sum()
    }

    pub fn labor_ids(&self) -> Vec<LaborId> {
        self.columns()
            .filter_map(|resolved| match resolved.column.kind {
                ColumnKind::Labor { labor_id, .. } => Some(labor_id),
                _ => None,
            })
            .collect()
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        fn labor(title: &str, labor_id: i64, skill_id: Option<i64>) -> ViewColumn {
            ViewColumn {
                title: title.to_owned(),
                bg_color: None,
                kind: ColumnKind::Labor {
                    labor_id: LaborId::new(labor_id),
                    skill_id: skill_id.map(SkillId::new),
                },
            }
        }

        fn set(name: &str, bg_color: Rgb, columns: Vec<ViewColumn>) -> ColumnSet {
            ColumnSet {
                name: name.to_owned(),
                bg_color,
                columns,
            }
        }

        let spacer = || ViewColumn {
            title: String::new(),
            bg_color: None,
            kind: ColumnKind::Spacer { width: 2 },
        };

        Self {
            sets: vec![
                set(
                    "Mining",
                    Rgb::new(0xe0, 0xd8, 0xc8),
                    vec![
                        labor("Mining", 0, Some(0)),
                        labor("Engraving", 12, Some(3)),
                        labor("Masonry", 13, Some(4)),
                    ],
                ),
                set(
                    "Woodworking",
                    Rgb::new(0xd8, 0xe8, 0xc8),
                    vec![
                        labor("Woodcutting", 10, Some(1)),
                        labor("Carpentry", 11, Some(2)),
                        spacer(),
                    ],
                ),
                set(
                    "Farming",
                    Rgb::new(0xc8, 0xe0, 0xe8),
                    vec![
                        labor("Farming", 39, Some(22)),
                        labor("Herbalism", 40, Some(23)),
                        labor("Brewing", 29, Some(14)),
                        labor("Cooking", 38, Some(21)),
                        labor("Fishing", 41, Some(24)),
                    ],
                ),
                set(
                    "Hauling",
                    Rgb::new(0xe8, 0xd0, 0xe0),
                    vec![
                        labor("Stone", 1, None),
                        labor("Wood", 2, None),
                        labor("Refuse", 5, None),
                        labor("Items", 6, None),
                        spacer(),
                    ],
                ),
                set(
                    "Other",
                    DEFAULT_SET_COLOR,
                    vec![
                        ViewColumn {
                            title: "Smelting".to_owned(),
                            bg_color: None,
                            kind: ColumnKind::Skill {
                                skill_id: SkillId::new(25),
                            },
                        },
                        ViewColumn {
                            title: "Happy".to_owned(),
                            bg_color: None,
                            kind: ColumnKind::Happiness,
                        },
                    ],
                ),
            ],
        }
    }
}

fn default_set_color() -> Rgb {
    DEFAULT_SET_COLOR
}

#[cfg(test)]
mod tests {
    use super::{ColumnKind, ColumnSet, ColumnType, DEFAULT_COLUMN_WIDTH, GridLayout, ViewColumn};
    use crate::color::Rgb;
    use crate::ids::{DwarfId, LaborId, SkillId};
    use crate::model::{Dwarf, Sex, Skill};

    fn layout() -> GridLayout {
        GridLayout {
            sets: vec![ColumnSet {
                name: "Test".to_owned(),
                bg_color: Rgb::new(1, 2, 3),
                columns: vec![
                    ViewColumn {
                        title: "Mining".to_owned(),
                        bg_color: None,
                        kind: ColumnKind::Labor {
                            labor_id: LaborId::new(0),
                            skill_id: Some(SkillId::new(0)),
                        },
                    },
                    ViewColumn {
                        title: String::new(),
                        bg_color: Some(Rgb::WHITE),
                        kind: ColumnKind::Spacer { width: 3 },
                    },
                    ViewColumn {
                        title: "Mood".to_owned(),
                        bg_color: None,
                        kind: ColumnKind::Happiness,
                    },
                ],
            }],
        }
    }

    fn miners() -> Vec<Dwarf> {
        vec![
            Dwarf::new(DwarfId::new(1), "Urist", Sex::Male, "Miner", 40)
                .with_skill(Skill::new(SkillId::new(0), "Miner", 7))
                .with_labor(LaborId::new(0), true),
            Dwarf::new(DwarfId::new(2), "Domas", Sex::Male, "Miner", 61)
                .with_skill(Skill::new(SkillId::new(0), "Miner", 12)),
        ]
    }

    #[test]
    fn columns_inherit_set_background_unless_overridden() {
        let layout = layout();
        let colors = layout
            .columns()
            .map(|column| column.bg_color)
            .collect::<Vec<_>>();
        assert_eq!(colors, vec![Rgb::new(1, 2, 3), Rgb::WHITE, Rgb::new(1, 2, 3)]);
    }

    #[test]
    fn spacer_reports_its_fixed_width() {
        let layout = layout();
        let widths = layout
            .columns()
            .map(|column| column.preferred_width())
            .collect::<Vec<_>>();
        assert_eq!(widths, vec![DEFAULT_COLUMN_WIDTH, 3, DEFAULT_COLUMN_WIDTH]);
    }

    #[test]
    fn labor_cell_carries_rating_and_labor_id() {
        let layout = layout();
        let dwarves = miners();
        let mining = layout.columns().next().expect("mining column");
        let cell = mining.build_cell(&dwarves[1]);
        assert_eq!(cell.column_type, ColumnType::Labor);
        assert_eq!(cell.labor_id, Some(LaborId::new(0)));
        assert_eq!(cell.dwarf_id, Some(DwarfId::new(2)));
        assert_eq!(cell.rating, 12);
        assert!(!cell.aggregate);
    }

    #[test]
    fn aggregates_summarise_members() {
        let layout = layout();
        let dwarves = miners();
        let members = dwarves.iter().collect::<Vec<_>>();
        let columns = layout.columns().collect::<Vec<_>>();

        let labor = columns[0].build_aggregate("Miner", &members);
        assert!(labor.aggregate);
        assert_eq!(labor.text, "1");
        let group = labor.group.expect("group ref");
        assert_eq!(group.key, "Miner");
        assert_eq!(group.member_count, 2);

        let mood = columns[2].build_aggregate("Miner", &members);
        assert_eq!(mood.text, "50");
    }

    #[test]
    fn default_layout_has_labor_columns() {
        let layout = GridLayout::default();
        assert!(layout.labor_ids().len() >= 10);
        assert!(layout.columns().any(|column| column.is_spacer()));
    }
}
