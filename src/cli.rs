use anyhow::Result;
use clap::{Parser, Subcommand};
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp;
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;

use eeprom_slots::protocol::ProtocolId;
use eeprom_slots::slots::SlotSpec;

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("invalid range '{0}'")]
    BadRange(String),
}

#[derive(Debug)]
pub struct SlotRange(Vec<u32>);

impl Deref for SlotRange {
    type Target = Vec<u32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for SlotRange {
    type Err = RangeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^(\d+)(?:-(\d+))?$").unwrap();
        }

        let mut result: Vec<u32> = Vec::new();

        for s in input.split(',') {
            let c = RE
                .captures(s)
                .ok_or_else(|| RangeError::BadRange(s.to_string()))?;
            let parse = |m: regex::Match| {
                m.as_str()
                    .parse::<u32>()
                    .map_err(|_| RangeError::BadRange(s.to_string()))
            };

            let first = match c.get(1) {
                Some(m) => parse(m)?,
                None => return Err(RangeError::BadRange(s.to_string())),
            };
            match c.get(2) {
                Some(m) => {
                    let last = parse(m)?;
                    result.extend(cmp::min(first, last)..=cmp::max(first, last));
                }
                None => result.push(first),
            }
        }

        result.sort_unstable();
        result.dedup();
        Ok(SlotRange(result))
    }
}

fn parse_with_radix<T>(input: &str) -> Result<T, T::FromStrRadixErr>
where
    T: num::Num,
    <T as num::Num>::FromStrRadixErr: std::error::Error + Send + Sync,
{
    if let Some(hex) = input.strip_prefix("0x") {
        T::from_str_radix(hex, 16)
    } else if let Some(bin) = input.strip_prefix("0b") {
        T::from_str_radix(bin, 2)
    } else {
        T::from_str_radix(input, 10)
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Skip sanity checks
    #[clap(long, short)]
    pub force: bool,

    /// enable debug output
    #[clap(long, short)]
    pub debug: bool,

    /// Serial device or 'auto'
    #[clap(long, short, default_value = "auto")]
    pub port: String,

    /// Serial baud rate
    #[clap(long, short, default_value_t = 9600)]
    pub baudrate: u32,

    /// Reply timeout in milliseconds
    #[clap(long, short, default_value_t = 1000)]
    pub timeout: u64,

    /// Use json-formatted output
    #[clap(long, short)]
    pub json: bool,

    /// Wire protocol spoken by the instrument
    #[clap(long, short = 'P', default_value = "ooi")]
    pub protocol: ProtocolId,

    /// Number of EEPROM slots on the instrument
    #[clap(long, short, default_value_t = 17)]
    pub slots: u32,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List protocols with EEPROM support
    ListProtocols,

    /// List well-known slots
    ListSlots,

    /// Read raw slot contents
    Read { slots: SlotRange },

    /// Read slot contents as text
    ReadText { slots: SlotRange },

    /// Read slot as a decimal number
    ReadDouble {
        #[clap(parse(try_from_str=parse_with_radix))]
        slot: u32,
    },

    /// Read slot as an integer
    ReadLong {
        #[clap(parse(try_from_str=parse_with_radix))]
        slot: u32,
    },

    /// Read a well-known slot by name or index
    ReadSlot { slot: SlotSpec },

    /// Write raw bytes to a slot
    Write {
        #[clap(parse(try_from_str=parse_with_radix))]
        slot: u32,
        #[clap(required = true, parse(try_from_str=parse_with_radix))]
        values: Vec<u8>,
    },

    /// Write text to a slot
    WriteText {
        #[clap(parse(try_from_str=parse_with_radix))]
        slot: u32,
        text: String,
    },

    /// Read every slot
    Dump,

    /// Read the wavelength calibration
    Wavecal {
        /// Also print wavelengths for this many pixels
        #[clap(long, default_value_t = 0)]
        pixels: usize,
    },
}
