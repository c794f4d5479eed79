//! Config file management (no backend connection involved).

use flowdeck_config::{Config, config_path, load_config_or_default, save_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let config = load_config_or_default();
            let out = output::render_single(
                &global.output,
                &config,
                |c| toml::to_string_pretty(c).unwrap_or_default(),
                |_| config_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init => {
            let path = config_path();
            if path.exists() {
                if !global.quiet {
                    eprintln!("Config already exists at {}", path.display());
                }
                return Ok(());
            }
            save_config(&Config::default())?;
            if !global.quiet {
                eprintln!("Wrote default config to {}", path.display());
            }
            Ok(())
        }
    }
}
