use log::warn;

use crate::feature::{EepromSlotFeature, FeatureError};
use crate::port::Bus;
use crate::protocol::ProtocolId;
use crate::slots::WAVELENGTH_SLOTS;

const DEFAULT_COEFFICIENTS: [f64; 4] = [0.0, 1.0, 0.0, 0.0];

/// Third order pixel to wavelength polynomial stored in slots 1-4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthCalibration {
    pub coefficients: [f64; 4],
}

impl WavelengthCalibration {
    /// Reads the coefficients, substituting defaults for slots that do not
    /// hold a number. Bus and protocol failures are returned as-is.
    pub fn read(
        feature: &EepromSlotFeature,
        protocol: ProtocolId,
        bus: &mut dyn Bus,
    ) -> Result<Self, FeatureError> {
        let mut coefficients = DEFAULT_COEFFICIENTS;

        for (coefficient, slot) in coefficients.iter_mut().zip(WAVELENGTH_SLOTS) {
            match feature.read_double(protocol, bus, slot) {
                Ok(value) => *coefficient = value,
                Err(FeatureError::NumberFormat(e)) => {
                    warn!("slot {}: {}, using {}", slot, e, coefficient)
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self { coefficients })
    }

    pub fn wavelength(&self, pixel: usize) -> f64 {
        let x = pixel as f64;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }
}

impl Default for WavelengthCalibration {
    fn default() -> Self {
        Self {
            coefficients: DEFAULT_COEFFICIENTS,
        }
    }
}
