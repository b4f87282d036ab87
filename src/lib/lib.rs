pub mod calibration;
pub mod feature;
pub mod port;
pub mod protocol;
pub mod slots;

pub use feature::{EepromSlotFeature, FeatureError};
pub use protocol::ProtocolId;
