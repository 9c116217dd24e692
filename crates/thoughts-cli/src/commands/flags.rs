use std::path::Path;

use thoughts_core::flags::{Feature, FeatureFlags, FlagSpec};

use crate::cli::FlagsCommands;
use crate::commands::common::open_kv;
use crate::error::CliError;

pub fn run_flags(command: FlagsCommands, db_path: &Path) -> Result<(), CliError> {
    let flags = FeatureFlags::new(open_kv(db_path)?);

    match command {
        FlagsCommands::List => {
            for line in format_flag_lines(&flags) {
                println!("{line}");
            }
        }
        FlagsCommands::Enable { feature } => {
            let feature = feature.parse::<Feature>()?;
            if flags.enable(feature)? {
                println!("Enabled {feature}");
            } else {
                println!("{feature} is stable and always enabled");
            }
        }
        FlagsCommands::Disable { feature } => {
            let feature = feature.parse::<Feature>()?;
            if flags.disable(feature)? {
                println!("Disabled {feature}");
            } else {
                println!("{feature} is stable and cannot be disabled");
            }
        }
        FlagsCommands::Experimental => {
            flags.enable_experimental_mode()?;
            println!("Experimental mode on");
        }
        FlagsCommands::Stable => {
            flags.disable_experimental_mode()?;
            println!("Experimental mode off; experimental features disabled");
        }
        FlagsCommands::Apply { spec } => {
            let ignored = flags.apply(&spec.parse::<FlagSpec>()?)?;
            for name in ignored {
                eprintln!("Ignored unknown experimental feature: {name}");
            }
            for line in format_flag_lines(&flags) {
                println!("{line}");
            }
        }
    }

    Ok(())
}

pub fn format_flag_lines(flags: &FeatureFlags) -> Vec<String> {
    let mut lines = vec![format!(
        "experimental mode: {}",
        if flags.is_experimental_mode() { "on" } else { "off" }
    )];
    lines.extend(flags.list().into_iter().map(|(feature, enabled)| {
        let state = match (feature.is_stable(), enabled) {
            (true, _) => "stable",
            (false, true) => "on",
            (false, false) => "off",
        };
        format!("{:<16} {state:<7} {}", feature.as_str(), feature.description())
    }));
    lines
}
