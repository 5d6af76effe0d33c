//! Query (read-only) command handlers.

use super::{resolve_keys, with_keyboard, CommandContext, CommandResult};
use anyhow::Result;
use keyleds_keyboard::{BlockId, KeyColor, Keyboard};
use keyleds_transport::protocol::{feature, feature_name};
use keyledsd::color::RgbaColor;
use keyledsd::key_db::KeyDatabase;
use serde_json::json;

/// List candidate devices
pub fn list() -> CommandResult {
    let devices = keyleds_transport::list_devices()?;
    if devices.is_empty() {
        println!("No device found");
        return Ok(());
    }
    for device in devices {
        println!(
            "{}  {:04x}:{:04x}  {}{}",
            device.path,
            device.vid,
            device.pid,
            device.product_name.as_deref().unwrap_or("?"),
            device
                .serial
                .as_deref()
                .map(|s| format!(" [{s}]"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Current and supported report rates
type ReportRates = (u8, Vec<u8>);

/// Report rates, when the device has the feature
fn rates(keyboard: &mut Keyboard) -> Result<Option<ReportRates>> {
    if !keyboard.has_feature(feature::REPORTRATE)? {
        return Ok(None);
    }
    let supported = keyboard.report_rates()?;
    let current = keyboard.report_rate()?;
    Ok(Some((current, supported)))
}

/// Get device identity, features and key blocks
pub fn info(ctx: &CommandContext, as_json: bool) -> CommandResult {
    with_keyboard(ctx, |keyboard| {
        let features = keyboard.features()?;
        let report_rates = rates(keyboard)?;

        if as_json {
            let value = json!({
                "path": keyboard.path(),
                "type": keyboard.device_type().name(),
                "name": keyboard.name(),
                "model": keyboard.model(),
                "serial": keyboard.serial(),
                "firmware": keyboard.firmware(),
                "protocol": keyboard.protocol_version(),
                "layout": keyboard.layout(),
                "features": features.iter().map(|f| json!({
                    "index": f.index,
                    "id": format!("{:#06x}", f.id),
                    "name": feature_name(f.id),
                    "hidden": f.flags.hidden,
                    "obsolete": f.flags.obsolete,
                })).collect::<Vec<_>>(),
                "report_rate": report_rates.as_ref().map(|(current, supported)| json!({
                    "current": current,
                    "supported": supported,
                })),
                "blocks": keyboard.blocks().iter().map(|b| json!({
                    "name": b.name(),
                    "id": format!("{:#06x}", b.id().0),
                    "keys": b.keys().len(),
                    "max": [b.max_values().r, b.max_values().g, b.max_values().b],
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!("Device:    {}", keyboard.path());
        println!("Type:      {}", keyboard.device_type().name());
        println!("Name:      {}", keyboard.name());
        println!("Model:     {}", keyboard.model());
        println!("Serial:    {}", keyboard.serial());
        println!("Firmware:  {}", keyboard.firmware());
        println!("Protocol:  HID++ {}.0", keyboard.protocol_version());
        if let Some(layout) = keyboard.layout() {
            println!("Layout:    {layout}");
        }
        println!();
        println!("Features:");
        for f in &features {
            let mut flags = String::new();
            if f.flags.hidden {
                flags.push_str(" hidden");
            }
            if f.flags.obsolete {
                flags.push_str(" obsolete");
            }
            println!(
                "  {:2}: {:#06x} {}{}",
                f.index,
                f.id,
                feature_name(f.id).unwrap_or("?"),
                flags
            );
        }
        if let Some((current, supported)) = report_rates {
            let supported: Vec<String> = supported.iter().map(|r| format!("{r}ms")).collect();
            println!();
            println!("Report rate: {current}ms (supported: {})", supported.join(", "));
        }
        println!();
        println!("Key blocks:");
        for block in keyboard.blocks() {
            let max = block.max_values();
            println!(
                "  {:<10} {:3} keys  max #{:02x}{:02x}{:02x}",
                block.name(),
                block.keys().len(),
                max.r,
                max.g,
                max.b
            );
        }
        Ok(())
    })
}

/// Read key colors from the device
pub fn get_leds(ctx: &CommandContext, names: &[String], as_json: bool) -> CommandResult {
    with_keyboard(ctx, |keyboard| {
        let keys = KeyDatabase::from_blocks(keyboard.blocks());
        let selected: Vec<usize> = if names.is_empty() {
            (0..keys.len()).collect()
        } else {
            resolve_keys(&keys, names)?.iter().map(|k| k.index).collect()
        };

        // One read per block touched
        let mut states: Vec<(BlockId, Vec<KeyColor>)> = Vec::new();
        for &index in &selected {
            let Some(key) = keys.get(index) else { continue };
            if !states.iter().any(|(block, _)| *block == key.block) {
                states.push((key.block, keyboard.get_colors(key.block)?));
            }
        }

        let mut rows = Vec::with_capacity(selected.len());
        for &index in &selected {
            let Some(key) = keys.get(index) else { continue };
            let color = states
                .iter()
                .find(|(block, _)| *block == key.block)
                .and_then(|(_, colors)| colors.iter().find(|c| c.id == key.key_id))
                .map(|c| RgbaColor::opaque(c.red, c.green, c.blue));
            rows.push((key, color));
        }

        if as_json {
            let value: Vec<_> = rows
                .iter()
                .map(|(key, color)| {
                    json!({
                        "name": key.name,
                        "block": key.block.to_string(),
                        "id": key.key_id,
                        "color": color.map(|c| c.to_string()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        for (key, color) in rows {
            match color {
                Some(color) => println!("{:<12} {}", key.name, color),
                None => println!("{:<12} ?", key.name),
            }
        }
        Ok(())
    })
}
