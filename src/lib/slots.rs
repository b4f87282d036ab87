//! Standard slot assignments of OOI spectrometer EEPROMs.

use lazy_static::lazy_static;
use regex::Regex;
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Text,
    Double,
    Long,
}

impl Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotKind::Text => "text".fmt(f),
            SlotKind::Double => "double".fmt(f),
            SlotKind::Long => "long".fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub name: &'static str,
    pub index: u32,
    pub kind: SlotKind,
}

impl Slot {
    pub const fn new(name: &'static str, index: u32, kind: SlotKind) -> Self {
        Slot { name, index, kind }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:3} {:<6} {}", self.index, self.kind, self.name)
    }
}

use SlotKind::*;

pub static SLOTS: &[Slot] = &[
    Slot::new("serial_number", 0, Text),
    Slot::new("wavelength_intercept", 1, Double),
    Slot::new("wavelength_first", 2, Double),
    Slot::new("wavelength_second", 3, Double),
    Slot::new("wavelength_third", 4, Double),
    Slot::new("stray_light", 5, Double),
    Slot::new("nonlinearity_0", 6, Double),
    Slot::new("nonlinearity_1", 7, Double),
    Slot::new("nonlinearity_2", 8, Double),
    Slot::new("nonlinearity_3", 9, Double),
    Slot::new("nonlinearity_4", 10, Double),
    Slot::new("nonlinearity_5", 11, Double),
    Slot::new("nonlinearity_6", 12, Double),
    Slot::new("nonlinearity_7", 13, Double),
    Slot::new("nonlinearity_order", 14, Long),
    Slot::new("bench_config", 15, Text),
    Slot::new("spectrometer_config", 16, Text),
];

pub const WAVELENGTH_SLOTS: [u32; 4] = [1, 2, 3, 4];

/// A slot named on the command line, either by name or by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSpec {
    Name(String),
    Index(u32),
}

#[derive(Error, Debug)]
pub enum SlotSpecError {
    #[error("invalid slot specification '{0}'")]
    BadSlotSpec(String),
}

impl FromStr for SlotSpec {
    type Err = SlotSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^(?:(\d+)|([_[:alnum:]]+))$").unwrap();
        }
        let cap = RE
            .captures(s)
            .ok_or_else(|| SlotSpecError::BadSlotSpec(s.to_string()))?;

        if let Some(index) = cap.get(1) {
            index
                .as_str()
                .parse()
                .map(SlotSpec::Index)
                .map_err(|_| SlotSpecError::BadSlotSpec(s.to_string()))
        } else {
            Ok(SlotSpec::Name(s.to_string()))
        }
    }
}

pub fn list_slots() -> &'static [Slot] {
    SLOTS
}

pub fn find_slot(spec: &SlotSpec) -> Option<Slot> {
    SLOTS
        .iter()
        .find(|slot| match spec {
            SlotSpec::Name(name) => slot.name == name.as_str(),
            SlotSpec::Index(index) => slot.index == *index,
        })
        .copied()
}
