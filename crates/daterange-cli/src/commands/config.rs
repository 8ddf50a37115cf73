use std::path::PathBuf;

use clap::Subcommand;
use daterange_core::RangeConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate a controller config file and print it with defaults filled in
    Check {
        /// Path to a TOML config
        path: PathBuf,
    },
    /// Print a config with every default
    Defaults {
        /// Component id
        #[arg(long, default_value = "date-range")]
        component_id: String,
        /// Field to filter on
        #[arg(long, default_value = "date")]
        field: String,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Check { path } => {
            let config = RangeConfig::load(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Defaults {
            component_id,
            field,
        } => {
            let config = RangeConfig::new(
                component_id,
                daterange_core::FieldConfig::Single(field),
            );
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
