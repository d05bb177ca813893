// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::model::Dwarf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Nothing,
    Profession,
    Legendary,
    Sex,
    Happiness,
}

impl GroupBy {
    pub const ALL: [Self; 5] = [
        Self::Nothing,
        Self::Profession,
        Self::Legendary,
        Self::Sex,
        Self::Happiness,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::Profession => "profession",
            Self::Legendary => "legendary",
            Self::Sex => "sex",
            Self::Happiness => "happiness",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "nothing" => Some(Self::Nothing),
            "profession" => Some(Self::Profession),
            "legendary" => Some(Self::Legendary),
            "sex" => Some(Self::Sex),
            "happiness" => Some(Self::Happiness),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Nothing => "no grouping",
            Self::Profession => "profession",
            Self::Legendary => "legendary status",
            Self::Sex => "sex",
            Self::Happiness => "happiness",
        }
    }

    pub const fn is_grouped(self) -> bool {
        !matches!(self, Self::Nothing)
    }

    /// The bucket label this policy assigns to `dwarf`.
    pub fn key_for(self, dwarf: &Dwarf) -> String {
        match self {
            Self::Nothing => dwarf.id.to_string(),
            Self::Profession => dwarf.profession.clone(),
            Self::Legendary => {
                if dwarf.is_legendary() {
                    "Legends".to_owned()
                } else {
                    "Losers".to_owned()
                }
            }
            Self::Sex => {
                if dwarf.is_male() {
                    "Males".to_owned()
                } else {
                    "Females".to_owned()
                }
            }
            Self::Happiness => dwarf.happiness.to_string(),
        }
    }

    pub fn rotate(self, delta: isize) -> Self {
        let current = Self::ALL
            .iter()
            .position(|policy| *policy == self)
            .unwrap_or(0) as isize;
        let len = Self::ALL.len() as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}
