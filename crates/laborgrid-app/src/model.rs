// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::color::Rgb;
use crate::ids::*;

pub const LEGENDARY_RATING: i16 = 15;

const SKILL_LEVELS: [&str; 16] = [
    "Dabbling",
    "Novice",
    "Adequate",
    "Competent",
    "Skilled",
    "Proficient",
    "Talented",
    "Adept",
    "Expert",
    "Professional",
    "Accomplished",
    "Great",
    "Master",
    "High Master",
    "Grand Master",
    "Legendary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub rating: i16,
}

impl Skill {
    pub fn new(id: SkillId, name: impl Into<String>, rating: i16) -> Self {
        Self {
            id,
            name: name.into(),
            rating,
        }
    }

    pub fn level_name(&self) -> &'static str {
        let index = self.rating.clamp(0, LEGENDARY_RATING) as usize;
        SKILL_LEVELS[index]
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.level_name(), self.name, self.rating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HappinessLevel {
    Miserable,
    Unhappy,
    Fine,
    Content,
    Happy,
    Ecstatic,
}

impl HappinessLevel {
    pub const fn from_raw(happiness: i32) -> Self {
        match happiness {
            i32::MIN..=0 => Self::Miserable,
            1..=24 => Self::Unhappy,
            25..=49 => Self::Fine,
            50..=99 => Self::Content,
            100..=149 => Self::Happy,
            _ => Self::Ecstatic,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Miserable => "Miserable",
            Self::Unhappy => "Unhappy",
            Self::Fine => "Fine",
            Self::Content => "Content",
            Self::Happy => "Happy",
            Self::Ecstatic => "Ecstatic",
        }
    }
}

/// Committed and pending value of one labor. The pending value is what the
/// grid shows; the two differ exactly when the labor is dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaborState {
    committed: bool,
    pending: bool,
}

impl LaborState {
    pub const fn persisted(enabled: bool) -> Self {
        Self {
            committed: enabled,
            pending: enabled,
        }
    }

    pub const fn enabled(self) -> bool {
        self.pending
    }

    pub const fn dirty(self) -> bool {
        self.pending != self.committed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dwarf {
    pub id: DwarfId,
    pub name: String,
    pub sex: Sex,
    pub profession: String,
    pub happiness: i32,
    pub skills: Vec<Skill>,
    labors: BTreeMap<LaborId, LaborState>,
}

impl Dwarf {
    pub fn new(
        id: DwarfId,
        name: impl Into<String>,
        sex: Sex,
        profession: impl Into<String>,
        happiness: i32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            sex,
            profession: profession.into(),
            happiness,
            skills: Vec::new(),
            labors: BTreeMap::new(),
        }
    }

    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.push(skill);
        self
    }

    /// Records a labor as already persisted, replacing any pending edit.
    pub fn with_labor(mut self, labor_id: LaborId, enabled: bool) -> Self {
        self.labors.insert(labor_id, LaborState::persisted(enabled));
        self
    }

    pub fn nice_name(&self) -> &str {
        &self.name
    }

    pub fn is_male(&self) -> bool {
        self.sex == Sex::Male
    }

    pub fn happiness_level(&self) -> HappinessLevel {
        HappinessLevel::from_raw(self.happiness)
    }

    pub fn skill_rating(&self, skill_id: SkillId) -> i16 {
        self.skills
            .iter()
            .find(|skill| skill.id == skill_id)
            .map_or(0, |skill| skill.rating)
    }

    pub fn is_legendary(&self) -> bool {
        self.skills
            .iter()
            .any(|skill| skill.rating >= LEGENDARY_RATING)
    }

    /// Skills ordered best first; equal ratings keep name order.
    pub fn skills_by_rating(&self) -> Vec<&Skill> {
        let mut skills = self.skills.iter().collect::<Vec<_>>();
        skills.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.name.cmp(&b.name)));
        skills
    }

    pub fn labor_state(&self, labor_id: LaborId) -> LaborState {
        self.labors.get(&labor_id).copied().unwrap_or_default()
    }

    pub fn is_labor_enabled(&self, labor_id: LaborId) -> bool {
        self.labor_state(labor_id).enabled()
    }

    pub fn is_labor_state_dirty(&self, labor_id: LaborId) -> bool {
        self.labor_state(labor_id).dirty()
    }

    pub fn set_labor(&mut self, labor_id: LaborId, enabled: bool) {
        self.labors.entry(labor_id).or_default().pending = enabled;
    }

    pub fn toggle_labor(&mut self, labor_id: LaborId) {
        let enabled = self.is_labor_enabled(labor_id);
        self.set_labor(labor_id, !enabled);
    }

    pub fn labors(&self) -> impl Iterator<Item = (LaborId, LaborState)> + '_ {
        self.labors.iter().map(|(id, state)| (*id, *state))
    }

    pub fn dirty_labors(&self) -> impl Iterator<Item = (LaborId, bool)> + '_ {
        self.labors
            .iter()
            .filter(|(_, state)| state.dirty())
            .map(|(id, state)| (*id, state.enabled()))
    }

    pub fn pending_changes(&self) -> usize {
        self.labors.values().filter(|state| state.dirty()).count()
    }

    pub fn commit_pending(&mut self) {
        for state in self.labors.values_mut() {
            state.committed = state.pending;
        }
    }

    pub fn clear_pending(&mut self) {
        for state in self.labors.values_mut() {
            state.pending = state.committed;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    ColorCursor,
    ColorDirtyBorder,
    ColorActiveLabor,
    ColorActiveGroup,
    ColorInactiveGroup,
    ColorPartialGroup,
    ColorGuides,
    ColorBorder,
    CellPadding,
    GroupBy,
}

impl SettingKey {
    pub const ALL: [Self; 10] = [
        Self::ColorCursor,
        Self::ColorDirtyBorder,
        Self::ColorActiveLabor,
        Self::ColorActiveGroup,
        Self::ColorInactiveGroup,
        Self::ColorPartialGroup,
        Self::ColorGuides,
        Self::ColorBorder,
        Self::CellPadding,
        Self::GroupBy,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ColorCursor => "colors.cursor",
            Self::ColorDirtyBorder => "colors.dirty_border",
            Self::ColorActiveLabor => "colors.active_labor",
            Self::ColorActiveGroup => "colors.active_group",
            Self::ColorInactiveGroup => "colors.inactive_group",
            Self::ColorPartialGroup => "colors.partial_group",
            Self::ColorGuides => "colors.guides",
            Self::ColorBorder => "colors.border",
            Self::CellPadding => "grid.cell_padding",
            Self::GroupBy => "ui.group_by",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == value)
    }

    pub const fn expected_value_kind(self) -> SettingValueKind {
        match self {
            Self::CellPadding => SettingValueKind::Integer,
            Self::GroupBy => SettingValueKind::Text,
            _ => SettingValueKind::Color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValueKind {
    Color,
    Integer,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Color(Rgb),
    Integer(i64),
    Text(String),
}

impl SettingValue {
    pub fn parse_for_key(key: SettingKey, raw: &str) -> Option<Self> {
        match key.expected_value_kind() {
            SettingValueKind::Color => Rgb::parse(raw).ok().map(Self::Color),
            SettingValueKind::Integer => raw.trim().parse().ok().map(Self::Integer),
            SettingValueKind::Text => Some(Self::Text(raw.to_owned())),
        }
    }

    pub fn to_storage(&self, key: SettingKey) -> Option<String> {
        match (key.expected_value_kind(), self) {
            (SettingValueKind::Color, Self::Color(value)) => Some(value.to_hex()),
            (SettingValueKind::Integer, Self::Integer(value)) => Some(value.to_string()),
            (SettingValueKind::Text, Self::Text(value)) => Some(value.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridColors {
    pub cursor: Rgb,
    pub dirty_border: Rgb,
    pub active_labor: Rgb,
    pub active_group: Rgb,
    pub inactive_group: Rgb,
    pub partial_group: Rgb,
    pub guides: Rgb,
    pub border: Rgb,
}

impl Default for GridColors {
    fn default() -> Self {
        Self {
            cursor: Rgb::new(0xff, 0x00, 0xff),
            dirty_border: Rgb::new(0xff, 0x96, 0x00),
            active_labor: Rgb::new(0x78, 0x78, 0xb3),
            active_group: Rgb::new(0x33, 0xcc, 0x33),
            inactive_group: Rgb::new(0xa0, 0xa0, 0xa0),
            partial_group: Rgb::new(0x99, 0x99, 0xdd),
            guides: Rgb::new(0x00, 0xb4, 0xff),
            border: Rgb::new(0xd8, 0xd8, 0xd8),
        }
    }
}

/// Everything the cell renderer reads from the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridSettings {
    pub colors: GridColors,
    pub cell_padding: u16,
}

impl GridSettings {
    pub fn default_value(key: SettingKey) -> SettingValue {
        let defaults = Self::default();
        let colors = defaults.colors;
        match key {
            SettingKey::ColorCursor => SettingValue::Color(colors.cursor),
            SettingKey::ColorDirtyBorder => SettingValue::Color(colors.dirty_border),
            SettingKey::ColorActiveLabor => SettingValue::Color(colors.active_labor),
            SettingKey::ColorActiveGroup => SettingValue::Color(colors.active_group),
            SettingKey::ColorInactiveGroup => SettingValue::Color(colors.inactive_group),
            SettingKey::ColorPartialGroup => SettingValue::Color(colors.partial_group),
            SettingKey::ColorGuides => SettingValue::Color(colors.guides),
            SettingKey::ColorBorder => SettingValue::Color(colors.border),
            SettingKey::CellPadding => SettingValue::Integer(i64::from(defaults.cell_padding)),
            SettingKey::GroupBy => SettingValue::Text(String::new()),
        }
    }

    /// Applies one stored value; values of the wrong kind are ignored.
    pub fn apply(&mut self, key: SettingKey, value: &SettingValue) {
        let slot = match key {
            SettingKey::ColorCursor => &mut self.colors.cursor,
            SettingKey::ColorDirtyBorder => &mut self.colors.dirty_border,
            SettingKey::ColorActiveLabor => &mut self.colors.active_labor,
            SettingKey::ColorActiveGroup => &mut self.colors.active_group,
            SettingKey::ColorInactiveGroup => &mut self.colors.inactive_group,
            SettingKey::ColorPartialGroup => &mut self.colors.partial_group,
            SettingKey::ColorGuides => &mut self.colors.guides,
            SettingKey::ColorBorder => &mut self.colors.border,
            SettingKey::CellPadding => {
                if let SettingValue::Integer(padding) = value {
                    self.cell_padding = (*padding).clamp(0, i64::from(u16::MAX)) as u16;
                }
                return;
            }
            SettingKey::GroupBy => return,
        };
        if let SettingValue::Color(color) = value {
            *slot = *color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Dwarf, GridSettings, HappinessLevel, LaborState, Sex, SettingKey, SettingValue, Skill,
    };
    use crate::color::Rgb;
    use crate::ids::{DwarfId, LaborId, SkillId};

    fn urist() -> Dwarf {
        Dwarf::new(DwarfId::new(1), "Urist McMiner", Sex::Male, "Miner", 80)
            .with_skill(Skill::new(SkillId::new(0), "Miner", 12))
            .with_skill(Skill::new(SkillId::new(21), "Cook", 3))
            .with_labor(LaborId::new(0), true)
    }

    #[test]
    fn toggle_marks_dirty_and_second_toggle_clears_it() {
        let mut dwarf = urist();
        let labor = LaborId::new(0);

        dwarf.toggle_labor(labor);
        assert!(!dwarf.is_labor_enabled(labor));
        assert!(dwarf.is_labor_state_dirty(labor));
        assert_eq!(dwarf.pending_changes(), 1);

        dwarf.toggle_labor(labor);
        assert!(dwarf.is_labor_enabled(labor));
        assert!(!dwarf.is_labor_state_dirty(labor));
        assert_eq!(dwarf.pending_changes(), 0);
    }

    #[test]
    fn unknown_labor_is_disabled_and_clean() {
        let dwarf = urist();
        assert_eq!(dwarf.labor_state(LaborId::new(99)), LaborState::default());
        assert!(!dwarf.is_labor_enabled(LaborId::new(99)));
    }

    #[test]
    fn commit_and_clear_pending() {
        let mut dwarf = urist();
        dwarf.set_labor(LaborId::new(38), true);
        dwarf.set_labor(LaborId::new(0), false);
        assert_eq!(dwarf.pending_changes(), 2);

        let mut reverted = dwarf.clone();
        reverted.clear_pending();
        assert_eq!(reverted.pending_changes(), 0);
        assert!(reverted.is_labor_enabled(LaborId::new(0)));
        assert!(!reverted.is_labor_enabled(LaborId::new(38)));

        dwarf.commit_pending();
        assert_eq!(dwarf.pending_changes(), 0);
        assert!(!dwarf.is_labor_enabled(LaborId::new(0)));
        assert!(dwarf.is_labor_enabled(LaborId::new(38)));
    }

    #[test]
    fn legendary_needs_rating_fifteen() {
        let mut dwarf = urist();
        assert!(!dwarf.is_legendary());
        dwarf.skills.push(Skill::new(SkillId::new(24), "Fisherdwarf", 15));
        assert!(dwarf.is_legendary());
    }

    #[test]
    fn skills_sort_best_first() {
        let dwarf = urist();
        let names = dwarf
            .skills_by_rating()
            .into_iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Master Miner (12)", "Competent Cook (3)"]);
    }

    #[test]
    fn happiness_levels_cover_thresholds() {
        assert_eq!(HappinessLevel::from_raw(-5), HappinessLevel::Miserable);
        assert_eq!(HappinessLevel::from_raw(10), HappinessLevel::Unhappy);
        assert_eq!(HappinessLevel::from_raw(80), HappinessLevel::Content);
        assert_eq!(HappinessLevel::from_raw(500), HappinessLevel::Ecstatic);
    }

    #[test]
    fn sex_round_trips_through_storage_names() {
        assert_eq!(Sex::parse(Sex::Female.as_str()), Some(Sex::Female));
        assert_eq!(Sex::parse("dwarf"), None);
    }

    #[test]
    fn setting_values_parse_by_kind() {
        assert_eq!(
            SettingValue::parse_for_key(SettingKey::ColorBorder, "#010203"),
            Some(SettingValue::Color(Rgb::new(1, 2, 3)))
        );
        assert_eq!(
            SettingValue::parse_for_key(SettingKey::CellPadding, " 2 "),
            Some(SettingValue::Integer(2))
        );
        assert_eq!(
            SettingValue::parse_for_key(SettingKey::ColorBorder, "red"),
            None
        );
        assert!(
            SettingValue::Integer(3)
                .to_storage(SettingKey::ColorGuides)
                .is_none()
        );
    }

    #[test]
    fn grid_settings_apply_ignores_mismatched_kinds() {
        let mut settings = GridSettings::default();
        settings.apply(SettingKey::ColorGuides, &SettingValue::Color(Rgb::BLACK));
        settings.apply(SettingKey::ColorBorder, &SettingValue::Integer(4));
        settings.apply(SettingKey::CellPadding, &SettingValue::Integer(2));

        assert_eq!(settings.colors.guides, Rgb::BLACK);
        assert_eq!(settings.colors.border, GridSettings::default().colors.border);
        assert_eq!(settings.cell_padding, 2);
    }

    #[test]
    fn setting_keys_parse_their_storage_names() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::parse(key.as_str()), Some(key));
        }
    }
}
