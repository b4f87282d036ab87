use log::debug;

use super::{find, parse, FeatureError};
use crate::port::Bus;
use crate::protocol::{EepromProtocol, OoiEepromProtocol, ProtocolHelper, ProtocolId};

pub const DEFAULT_SLOT_COUNT: u32 = 17;

/// Access to the EEPROM slots of an instrument, independent of the wire
/// protocol it speaks.
///
/// The set of protocol implementations is fixed at construction.
pub struct EepromSlotFeature {
    protocols: Vec<Box<dyn ProtocolHelper>>,
    slot_count: u32,
}

impl EepromSlotFeature {
    pub fn new() -> Self {
        Self::with_slot_count(DEFAULT_SLOT_COUNT)
    }

    pub fn with_slot_count(slot_count: u32) -> Self {
        let protocols: Vec<Box<dyn ProtocolHelper>> = vec![Box::new(OoiEepromProtocol::new())];
        Self::with_protocols(protocols, slot_count)
    }

    pub(crate) fn with_protocols(
        protocols: Vec<Box<dyn ProtocolHelper>>,
        slot_count: u32,
    ) -> Self {
        Self {
            protocols,
            slot_count,
        }
    }

    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    pub fn protocols(&self) -> impl Iterator<Item = ProtocolId> + '_ {
        self.protocols.iter().map(|p| p.protocol())
    }

    fn lookup_eeprom(
        &self,
        protocol: ProtocolId,
        action: &str,
    ) -> Result<&dyn EepromProtocol, FeatureError> {
        find(&self.protocols, protocol)
            .ok()
            .and_then(|p| p.eeprom())
            .ok_or_else(|| {
                FeatureError::ProtocolNotFound(format!(
                    "could not find matching protocol implementation to {} EEPROM",
                    action
                ))
            })
    }

    /// Reads the raw contents of `slot`. Never succeeds with empty data.
    pub fn read_eeprom_slot(
        &self,
        protocol: ProtocolId,
        bus: &mut dyn Bus,
        slot: u32,
    ) -> Result<Vec<u8>, FeatureError> {
        let eeprom = self.lookup_eeprom(protocol, "read")?;

        let data = eeprom
            .read_eeprom_slot(bus, slot)
            .map_err(|e| FeatureError::Control(format!("caught protocol exception: {:#}", e)))?;

        if data.is_empty() {
            return Err(FeatureError::Control(
                "could not read EEPROM slot".to_string(),
            ));
        }

        debug!("slot {}: {} bytes", slot, data.len());
        Ok(data)
    }

    /// Writes `data` to `slot` and returns how many bytes the device took.
    pub fn write_eeprom_slot(
        &self,
        protocol: ProtocolId,
        bus: &mut dyn Bus,
        slot: u32,
        data: &[u8],
    ) -> Result<usize, FeatureError> {
        let eeprom = self.lookup_eeprom(protocol, "write")?;

        eeprom
            .write_eeprom_slot(bus, slot, data)
            .map_err(|e| FeatureError::Control(format!("caught protocol exception: {:#}", e)))
    }

    /// Reads slots `0..slot_count` in order, stopping at the first failure.
    pub fn read_eeprom_slots(
        &self,
        protocol: ProtocolId,
        bus: &mut dyn Bus,
    ) -> Result<Vec<Vec<u8>>, FeatureError> {
        (0..self.slot_count)
            .map(|slot| self.read_eeprom_slot(protocol, bus, slot))
            .collect()
    }

    pub fn read_double(
        &self,
        protocol: ProtocolId,
        bus: &mut dyn Bus,
        slot: u32,
    ) -> Result<f64, FeatureError> {
        let raw = self.read_eeprom_slot(protocol, bus, slot)?;
        parse::parse_double(&raw)
    }

    pub fn read_long(
        &self,
        protocol: ProtocolId,
        bus: &mut dyn Bus,
        slot: u32,
    ) -> Result<i64, FeatureError> {
        let raw = self.read_eeprom_slot(protocol, bus, slot)?;
        parse::parse_long(&raw)
    }
}

impl Default for EepromSlotFeature {
    fn default() -> Self {
        Self::new()
    }
}
