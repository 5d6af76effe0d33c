//! Setting command handlers.

use super::{resolve_keys, split_assignment, with_keyboard, CommandContext, CommandResult};
use anyhow::{anyhow, bail, Result};
use keyleds_keyboard::{BlockId, KeyColor, RgbColor};
use keyleds_transport::protocol::feature;
use keyledsd::color::RgbaColor;
use keyledsd::key_db::KeyDatabase;

fn parse_color(text: &str) -> Result<RgbaColor> {
    RgbaColor::parse(text).ok_or_else(|| anyhow!("Invalid color: {text}"))
}

/// Group `KEY=COLOR` arguments by block, in argument order
fn key_directives(keys: &KeyDatabase, args: &[String]) -> Result<Vec<(BlockId, Vec<KeyColor>)>> {
    let mut directives: Vec<(BlockId, Vec<KeyColor>)> = Vec::new();
    for arg in args {
        let (name, color) = split_assignment(arg)?;
        let color = parse_color(color)?;
        let key = resolve_keys(keys, &[name])?[0];
        let entry = KeyColor::new(key.key_id, color.red, color.green, color.blue);

        match directives.iter_mut().find(|(block, _)| *block == key.block) {
            Some((_, list)) => match list.iter_mut().find(|c| c.id == key.key_id) {
                Some(existing) => *existing = entry,
                None => list.push(entry),
            },
            None => directives.push((key.block, vec![entry])),
        }
    }
    Ok(directives)
}

/// Set key colors, then commit once
pub fn set_leds(ctx: &CommandContext, args: &[String], blocks: &[String]) -> CommandResult {
    if args.is_empty() && blocks.is_empty() {
        bail!("Nothing to set: give KEY=COLOR pairs or --block BLOCK=COLOR");
    }
    with_keyboard(ctx, |keyboard| {
        for arg in blocks {
            let (name, color) = split_assignment(arg)?;
            let block =
                BlockId::from_name(name).ok_or_else(|| anyhow!("Unknown block: {name}"))?;
            let color = parse_color(color)?;
            keyboard.fill_color(block, RgbColor::new(color.red, color.green, color.blue))?;
        }

        let keys = KeyDatabase::from_blocks(keyboard.blocks());
        for (block, colors) in key_directives(&keys, args)? {
            keyboard.set_colors(block, &colors)?;
        }
        keyboard.commit_colors()?;
        println!("LEDs updated");
        Ok(())
    })
}

/// Replace the game mode key list
pub fn gamemode(ctx: &CommandContext, names: &[String]) -> CommandResult {
    with_keyboard(ctx, |keyboard| {
        if !keyboard.has_feature(feature::GAMEMODE)? {
            println!("Game mode not supported");
            return Ok(());
        }
        let keys = KeyDatabase::from_blocks(keyboard.blocks());
        let mut ids = Vec::with_capacity(names.len());
        for key in resolve_keys(&keys, names)? {
            if key.block != BlockId::KEYS {
                bail!("{} cannot be blocked in game mode", key.name);
            }
            ids.push(key.key_id);
        }

        let max = usize::from(keyboard.gamemode_max()?);
        if ids.len() > max {
            bail!("Game mode holds at most {max} keys");
        }

        keyboard.gamemode_clear()?;
        if ids.is_empty() {
            println!("Game mode cleared");
        } else {
            keyboard.gamemode_block(&ids)?;
            println!("Game mode blocks {} keys", ids.len());
        }
        Ok(())
    })
}

/// Route G-keys to software or firmware
pub fn gkeys(ctx: &CommandContext, enabled: bool) -> CommandResult {
    with_keyboard(ctx, |keyboard| {
        if !keyboard.has_gkeys()? {
            println!("No G-keys on this device");
            return Ok(());
        }
        keyboard.gkeys_enable(enabled)?;
        println!("G-keys {}", if enabled { "on" } else { "off" });
        Ok(())
    })
}

/// Show or set the report interval
pub fn report_rate(ctx: &CommandContext, millis: Option<u8>) -> CommandResult {
    with_keyboard(ctx, |keyboard| {
        if !keyboard.has_feature(feature::REPORTRATE)? {
            println!("Report rate not supported");
            return Ok(());
        }
        match millis {
            None => {
                let current = keyboard.report_rate()?;
                let supported: Vec<String> = keyboard
                    .report_rates()?
                    .iter()
                    .map(|r| format!("{r}ms"))
                    .collect();
                println!("Report rate: {current}ms (supported: {})", supported.join(", "));
            }
            Some(millis) => {
                let supported = keyboard.report_rates()?;
                if !supported.is_empty() && !supported.contains(&millis) {
                    bail!("Report rate {millis}ms not supported");
                }
                keyboard.set_report_rate(millis)?;
                println!("Report rate set to {millis}ms");
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyleds_keyboard::KeyBlock;

    fn database() -> KeyDatabase {
        KeyDatabase::from_blocks(&[
            KeyBlock::new(BlockId::KEYS, vec![0x29, 0x04, 0x05], RgbColor::WHITE),
            KeyBlock::new(BlockId::LOGO, vec![0x01], RgbColor::WHITE),
        ])
    }

    #[test]
    fn test_directives_grouped_by_block() {
        let keys = database();
        let args = vec![
            "A=red".to_string(),
            "logo-01=#00ff00".to_string(),
            "esc=blue".to_string(),
        ];
        let directives = key_directives(&keys, &args).unwrap();
        assert_eq!(
            directives,
            vec![
                (
                    BlockId::KEYS,
                    vec![KeyColor::new(0x04, 255, 0, 0), KeyColor::new(0x29, 0, 0, 255)]
                ),
                (BlockId::LOGO, vec![KeyColor::new(0x01, 0, 255, 0)]),
            ]
        );
    }

    #[test]
    fn test_last_assignment_wins() {
        let keys = database();
        let args = vec!["A=red".to_string(), "a=white".to_string()];
        let directives = key_directives(&keys, &args).unwrap();
        assert_eq!(
            directives,
            vec![(BlockId::KEYS, vec![KeyColor::new(0x04, 255, 255, 255)])]
        );
    }

    #[test]
    fn test_bad_arguments() {
        let keys = database();
        assert!(key_directives(&keys, &["A".to_string()]).is_err());
        assert!(key_directives(&keys, &["A=nocolor".to_string()]).is_err());
        assert!(key_directives(&keys, &["F24=red".to_string()]).is_err());
    }
}
