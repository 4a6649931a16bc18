use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use recipebox_server::Settings;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print the config file path instead of its contents
    #[arg(long)]
    pub path: bool,
}

/// Print the effective configuration as TOML, or the file it came from.
pub fn run_config(args: ConfigArgs, explicit: Option<&Path>, settings: &Settings) -> Result<()> {
    if args.path {
        match explicit.map(Path::to_path_buf).or_else(Settings::default_path) {
            Some(path) => println!("{}", path.display()),
            None => println!("(no config path: home directory unknown)"),
        }
        return Ok(());
    }

    let rendered = settings
        .to_redacted_toml()
        .context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
