mod ooi;

use anyhow::Result;
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

use crate::port::Bus;

pub use ooi::{OoiEepromProtocol, OOI_SLOT_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolId {
    Ooi,
    OceanBinary,
}

impl ProtocolId {
    pub const ALL: &'static [ProtocolId] = &[ProtocolId::Ooi, ProtocolId::OceanBinary];
}

impl Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolId::Ooi => "ooi".fmt(f),
            ProtocolId::OceanBinary => "obp".fmt(f),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolIdError {
    #[error("invalid protocol '{0}'")]
    BadProtocol(String),
}

impl FromStr for ProtocolId {
    type Err = ProtocolIdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "ooi" => Ok(ProtocolId::Ooi),
            "obp" => Ok(ProtocolId::OceanBinary),
            _ => Err(ProtocolIdError::BadProtocol(input.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("corrupted reply packet")]
    BadReply,
    #[error("invalid slot {0} for chosen protocol")]
    InvalidSlot(u32),
}

/// A protocol family implementation held by a feature.
///
/// Capabilities are exposed through accessors returning `None` when the
/// family does not provide them.
pub trait ProtocolHelper {
    fn protocol(&self) -> ProtocolId;

    fn eeprom(&self) -> Option<&dyn EepromProtocol> {
        None
    }
}

pub trait EepromProtocol {
    fn read_eeprom_slot(&self, bus: &mut dyn Bus, slot: u32) -> Result<Vec<u8>>;
    fn write_eeprom_slot(&self, bus: &mut dyn Bus, slot: u32, data: &[u8]) -> Result<usize>;
}
