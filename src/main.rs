mod cli;

use std::io;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells::Bash};
use itertools::Itertools;
use json::JsonValue;
use log::error;

use eeprom_slots::calibration::WavelengthCalibration;
use eeprom_slots::port::{self, Bus};
use eeprom_slots::protocol::ProtocolId;
use eeprom_slots::slots::{self, SlotKind, SlotSpec};
use eeprom_slots::{EepromSlotFeature, FeatureError};

use cli::{Cli, Commands};

enum OutputFormat {
    Plain,
    Json,
}

fn slot_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn cmd_list_protocols(feature: &EepromSlotFeature, fmt: OutputFormat) -> Result<String> {
    let names: Vec<String> = feature.protocols().map(|p| p.to_string()).collect();
    Ok(match fmt {
        OutputFormat::Plain => names.join("\n"),
        OutputFormat::Json => json::stringify(names),
    })
}

fn cmd_list_slots(fmt: OutputFormat) -> Result<String> {
    let list = slots::list_slots();
    Ok(match fmt {
        OutputFormat::Plain => list.iter().join("\n"),
        OutputFormat::Json => json::stringify(
            list.iter()
                .map(|slot| {
                    let mut obj = JsonValue::new_object();
                    obj["index"] = slot.index.into();
                    obj["name"] = slot.name.into();
                    obj["kind"] = slot.kind.to_string().into();
                    obj
                })
                .collect::<Vec<_>>(),
        ),
    })
}

fn cmd_read(
    feature: &EepromSlotFeature,
    proto: ProtocolId,
    bus: &mut dyn Bus,
    slots: &[u32],
    fmt: OutputFormat,
) -> Result<String> {
    let res = slots
        .iter()
        .map(|&slot| {
            feature
                .read_eeprom_slot(proto, bus, slot)
                .with_context(|| format!("Failed to read slot {}", slot))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(match fmt {
        OutputFormat::Plain => res
            .iter()
            .map(|raw| raw.iter().map(|b| format!("{:02x}", b)).join(" "))
            .join("\n"),
        OutputFormat::Json => json::stringify(res),
    })
}

fn cmd_read_text(
    feature: &EepromSlotFeature,
    proto: ProtocolId,
    bus: &mut dyn Bus,
    slots: &[u32],
    fmt: OutputFormat,
) -> Result<String> {
    let res = slots
        .iter()
        .map(|&slot| {
            feature
                .read_eeprom_slot(proto, bus, slot)
                .map(|raw| slot_text(&raw))
                .with_context(|| format!("Failed to read slot {}", slot))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(match fmt {
        OutputFormat::Plain => res.join("\n"),
        OutputFormat::Json => json::stringify(res),
    })
}

fn cmd_read_double(
    feature: &EepromSlotFeature,
    proto: ProtocolId,
    bus: &mut dyn Bus,
    slot: u32,
) -> Result<String> {
    feature
        .read_double(proto, bus, slot)
        .map(|v| v.to_string())
        .with_context(|| format!("Failed to read double from slot {}", slot))
}

fn cmd_read_long(
    feature: &EepromSlotFeature,
    proto: ProtocolId,
    bus: &mut dyn Bus,
    slot: u32,
) -> Result<String> {
    feature
        .read_long(proto, bus, slot)
        .map(|v| v.to_string())
        .with_context(|| format!("Failed to read long from slot {}", slot))
}

fn cmd_read_slot(
    feature: &EepromSlotFeature,
    proto: ProtocolId,
    bus: &mut dyn Bus,
    spec: SlotSpec,
    fmt: OutputFormat,
) -> Result<String> {
    let slot = slots::find_slot(&spec).ok_or_else(|| anyhow!("Slot {:?} not found", spec))?;

    match slot.kind {
        SlotKind::Double => cmd_read_double(feature, proto, bus, slot.index),
        SlotKind::Long => cmd_read_long(feature, proto, bus, slot.index),
        SlotKind::Text => cmd_read_text(feature, proto, bus, &[slot.index], fmt),
    }
}

fn cmd_write(
    feature: &EepromSlotFeature,
    proto: ProtocolId,
    bus: &mut dyn Bus,
    slot: u32,
    data: &[u8],
) -> Result<String> {
    let written = feature
        .write_eeprom_slot(proto, bus, slot, data)
        .with_context(|| format!("Failed to write slot {}", slot))?;

    if written < data.len() {
        return Err(anyhow!(
            "Slot {} took {} of {} bytes",
            slot,
            written,
            data.len()
        ));
    }
    Ok(String::new())
}

fn cmd_dump(
    feature: &EepromSlotFeature,
    proto: ProtocolId,
    bus: &mut dyn Bus,
    fmt: OutputFormat,
) -> Result<String> {
    let res = feature
        .read_eeprom_slots(proto, bus)
        .context("Failed to dump EEPROM")?;

    Ok(match fmt {
        OutputFormat::Plain => res
            .iter()
            .enumerate()
            .map(|(i, raw)| format!("{:3} {:<30} {:?}", i, hex::encode(raw), slot_text(raw)))
            .join("\n"),
        OutputFormat::Json => json::stringify(res.iter().map(hex::encode).collect::<Vec<_>>()),
    })
}

fn cmd_wavecal(
    feature: &EepromSlotFeature,
    proto: ProtocolId,
    bus: &mut dyn Bus,
    pixels: usize,
    fmt: OutputFormat,
) -> Result<String> {
    let cal = WavelengthCalibration::read(feature, proto, bus)
        .context("Failed to read wavelength calibration")?;
    let wavelengths: Vec<f64> = (0..pixels).map(|p| cal.wavelength(p)).collect();

    Ok(match fmt {
        OutputFormat::Plain => cal
            .coefficients
            .iter()
            .chain(wavelengths.iter())
            .join("\n"),
        OutputFormat::Json => {
            let mut obj = JsonValue::new_object();
            obj["coefficients"] = cal.coefficients.to_vec().into();
            obj["wavelengths"] = wavelengths.into();
            json::stringify(obj)
        }
    })
}

fn do_main() -> Result<String> {
    if std::env::var("GENERATE_COMPLETION").is_ok() {
        generate(
            Bash,
            &mut Cli::command(),
            "eeprom-slot-tool",
            &mut io::stdout(),
        );

        return Ok(String::default());
    }

    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_target(false)
    .init();

    let fmt = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };

    let feature = EepromSlotFeature::with_slot_count(cli.slots);

    match cli.command {
        Commands::ListProtocols => cmd_list_protocols(&feature, fmt),
        Commands::ListSlots => cmd_list_slots(fmt),
        _ => {
            let mut port = port::open_port(
                &cli.port,
                cli.baudrate,
                Duration::from_millis(cli.timeout),
                cli.force,
            )?;
            let bus: &mut dyn Bus = &mut port;
            let proto = cli.protocol;

            match cli.command {
                Commands::Read { slots } => cmd_read(&feature, proto, bus, &slots, fmt),
                Commands::ReadText { slots } => cmd_read_text(&feature, proto, bus, &slots, fmt),
                Commands::ReadDouble { slot } => cmd_read_double(&feature, proto, bus, slot),
                Commands::ReadLong { slot } => cmd_read_long(&feature, proto, bus, slot),
                Commands::ReadSlot { slot } => cmd_read_slot(&feature, proto, bus, slot, fmt),
                Commands::Write { slot, values } => cmd_write(&feature, proto, bus, slot, &values),
                Commands::WriteText { slot, text } => {
                    cmd_write(&feature, proto, bus, slot, text.as_bytes())
                }
                Commands::Dump => cmd_dump(&feature, proto, bus, fmt),
                Commands::Wavecal { pixels } => cmd_wavecal(&feature, proto, bus, pixels, fmt),
                _ => Err(anyhow!("unexpected command (this is a bug!)")),
            }
        }
    }
}

fn main() {
    match do_main() {
        Ok(s) => println!("{}", s),
        Err(e) => {
            error!("{:#}", e);
            if let Some(FeatureError::NumberFormat(_)) = e.downcast_ref::<FeatureError>() {
                error!("slot looks unprogrammed");
            }
            std::process::exit(1);
        }
    }
}
