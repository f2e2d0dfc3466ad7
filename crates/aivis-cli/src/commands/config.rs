use aivis_core::AppConfig;
use clap::Args;
use std::path::Path;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the effective configuration back to the config file
    #[arg(long)]
    save: bool,
}

pub fn run(args: &ConfigArgs, config: &AppConfig, path: Option<&Path>) -> anyhow::Result<()> {
    if args.save {
        match path {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        let shown = match path {
            Some(path) => path.to_path_buf(),
            None => AppConfig::config_path()?,
        };
        tracing::info!("Saved configuration to {}", shown.display());
    }

    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
