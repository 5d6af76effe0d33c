// CLI definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keyledsd")]
#[command(author, version, about = "Logitech RGB keyboard LED daemon")]
#[command(propagate_version = true)]
pub struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (default: $XDG_CONFIG_HOME/keyledsd/keyledsd.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// hidraw node to use instead of the first device found
    #[arg(short, long, global = true, value_name = "PATH")]
    pub device: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

#[derive(Subcommand)]
pub enum Commands {
    // === Query Commands ===
    /// List Logitech devices with an HID++ interface
    #[command(visible_aliases = ["ls"])]
    List,

    /// Show device identity, features, report rates and key blocks
    #[command(visible_aliases = ["i"])]
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read current key colors (all keys when none are given)
    #[command(visible_aliases = ["get"])]
    GetLeds {
        /// Key names, e.g. ESC, A, F13, or block-id like logo-01
        keys: Vec<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    // === Set Commands ===
    /// Set key colors and commit
    #[command(visible_aliases = ["set"])]
    SetLeds {
        /// KEY=COLOR pairs; COLOR is #rrggbb or a color name
        #[arg(value_name = "KEY=COLOR")]
        keys: Vec<String>,

        /// Fill a whole block: BLOCK=COLOR (keys, media, gkeys, logo, modes)
        #[arg(long = "block", value_name = "BLOCK=COLOR")]
        blocks: Vec<String>,
    },

    /// Disable keys while game mode is on (no keys clears the list)
    #[command(visible_aliases = ["game"])]
    Gamemode {
        /// Key names
        keys: Vec<String>,
    },

    /// Route G-keys to software or back to the firmware
    Gkeys {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Show or set the report interval
    #[command(visible_aliases = ["rate"])]
    ReportRate {
        /// Interval in milliseconds (1-8)
        ms: Option<u8>,
    },

    // === Daemon ===
    /// Animate every configured device until interrupted
    #[command(visible_aliases = ["daemon"])]
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_leds() {
        let cli = Cli::parse_from([
            "keyledsd",
            "-vv",
            "set-leds",
            "ESC=red",
            "A=#00ff00",
            "--block",
            "logo=blue",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::SetLeds { keys, blocks }) => {
                assert_eq!(keys, vec!["ESC=red", "A=#00ff00"]);
                assert_eq!(blocks, vec!["logo=blue"]);
            }
            _ => panic!("expected set-leds"),
        }
    }

    #[test]
    fn test_parse_global_device_after_subcommand() {
        let cli = Cli::parse_from(["keyledsd", "gkeys", "off", "--device", "/dev/hidraw2"]);
        assert_eq!(cli.device.as_deref(), Some("/dev/hidraw2"));
        assert!(matches!(
            cli.command,
            Some(Commands::Gkeys { state: Toggle::Off })
        ));
    }

    #[test]
    fn test_report_rate_optional() {
        let cli = Cli::parse_from(["keyledsd", "rate"]);
        assert!(matches!(cli.command, Some(Commands::ReportRate { ms: None })));
        let cli = Cli::parse_from(["keyledsd", "report-rate", "4"]);
        assert!(matches!(
            cli.command,
            Some(Commands::ReportRate { ms: Some(4) })
        ));
    }
}
