mod eeprom_slots;
pub mod parse;

use thiserror::Error;

use crate::protocol::{ProtocolHelper, ProtocolId};

pub use eeprom_slots::{EepromSlotFeature, DEFAULT_SLOT_COUNT};

/// Errors surfaced to users of a feature. Protocol and transport failures
/// are folded into `Control` with their original description.
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("{0}")]
    ProtocolNotFound(String),
    #[error("{0}")]
    Control(String),
    #[error("{0}")]
    NumberFormat(String),
}

/// Returns the first registered implementation speaking `requested`.
pub fn find(
    protocols: &[Box<dyn ProtocolHelper>],
    requested: ProtocolId,
) -> Result<&dyn ProtocolHelper, FeatureError> {
    protocols
        .iter()
        .map(|p| &**p)
        .find(|p| p.protocol() == requested)
        .ok_or_else(|| {
            FeatureError::ProtocolNotFound(format!(
                "no protocol implementation for '{}'",
                requested
            ))
        })
}
