// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use laborgrid_app::{Dwarf, DwarfId, LEGENDARY_RATING, LaborId, Sex, Skill, SkillId};
use std::path::PathBuf;

const FIRST_NAMES: [&str; 20] = [
    "Urist", "Kib", "Domas", "Sibrek", "Zon", "Ast", "Bomrek", "Cerol", "Datan", "Edem", "Fikod",
    "Goden", "Ingish", "Likot", "Mafol", "Nish", "Olin", "Rigoth", "Solon", "Tobul",
];

const LAST_NAMES: [&str; 14] = [
    "Goldhammer",
    "Ironfist",
    "Stonebeard",
    "Ashlar",
    "Copperdelve",
    "Oilbrews",
    "Boulderbane",
    "Anvilstrike",
    "Cragmantle",
    "Gemcutter",
    "Deepforge",
    "Mudwalls",
    "Silverpick",
    "Tunnelwright",
];

const PROFESSIONS: [&str; 11] = [
    "Miner",
    "Mason",
    "Carpenter",
    "Woodcutter",
    "Farmer",
    "Cook",
    "Brewer",
    "Fisherdwarf",
    "Engraver",
    "Herbalist",
    "Peasant",
];

const SKILLS: [(i64, &str); 11] = [
    (0, "Miner"),
    (1, "Wood Cutter"),
    (2, "Carpenter"),
    (3, "Engraver"),
    (4, "Mason"),
    (14, "Brewer"),
    (21, "Cook"),
    (22, "Grower"),
    (23, "Herbalist"),
    (24, "Fisherdwarf"),
    (25, "Furnace Operator"),
];

const LABORS: [i64; 14] = [0, 1, 2, 5, 6, 10, 11, 12, 13, 29, 38, 39, 40, 41];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }

    fn chance(&mut self, percent: usize) -> bool {
        self.int_n(100) < percent
    }
}

/// Seeded generator of plausible fortress rosters.
#[derive(Debug, Clone)]
pub struct RosterFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl RosterFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn name(&mut self) -> String {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        format!("{first} {last}")
    }

    pub fn dwarf(&mut self, id: i64) -> Dwarf {
        let name = self.name();
        let sex = if self.rng.bool() {
            Sex::Male
        } else {
            Sex::Female
        };
        let profession = self.pick(&PROFESSIONS);
        let happiness = self.rng.int_n(200) as i32;
        let mut dwarf = Dwarf::new(DwarfId::new(id), name, sex, profession, happiness);

        let skill_count = 2 + self.rng.int_n(3);
        let mut offsets = (0..SKILLS.len()).collect::<Vec<_>>();
        for _ in 0..skill_count {
            let offset = offsets.swap_remove(self.rng.int_n(offsets.len()));
            let (skill_id, skill_name) = SKILLS[offset];
            dwarf = dwarf.with_skill(Skill::new(
                SkillId::new(skill_id),
                skill_name,
                self.rating(),
            ));
        }

        for labor in LABORS {
            if self.rng.chance(30) {
                dwarf = dwarf.with_labor(LaborId::new(labor), true);
            }
        }
        dwarf
    }

    /// Dwarves with ids `1..=count`.
    pub fn roster(&mut self, count: usize) -> Vec<Dwarf> {
        (1..=count as i64).map(|id| self.dwarf(id)).collect()
    }

    fn rating(&mut self) -> i16 {
        if self.rng.chance(8) {
            return LEGENDARY_RATING;
        }
        self.rng.int_n(LEGENDARY_RATING as usize) as i16
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("laborgrid.db");
    Ok((dir, db_path))
}

pub fn skill_catalog() -> &'static [(i64, &'static str)] {
    &SKILLS
}

pub fn labor_ids() -> Vec<LaborId> {
    LABORS.into_iter().map(LaborId::new).collect()
}

pub fn professions() -> &'static [&'static str] {
    &PROFESSIONS
}
