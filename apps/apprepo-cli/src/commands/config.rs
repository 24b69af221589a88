use anyhow::{Context, Result};
use apprepo_core::config::{config_schema_json, load_config};
use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Emit JSON Schema for apprepo.toml
    Schema(ConfigSchemaArgs),
    /// Validate a config file and print the effective settings
    Check(ConfigCheckArgs),
}

#[derive(Args, Clone)]
pub struct ConfigSchemaArgs {
    /// Output path (writes file). If not set, prints to stdout.
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Args, Clone)]
pub struct ConfigCheckArgs {
    /// Path to a TOML config file
    pub path: String,
}

pub fn execute(cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Schema(args) => cmd_schema(args),
        ConfigCmd::Check(args) => cmd_check(args),
    }
}

fn cmd_schema(args: ConfigSchemaArgs) -> Result<()> {
    let json = serde_json::to_string_pretty(&config_schema_json()?)?;
    match args.out {
        Some(path) => {
            if let Some(parent) = std::path::Path::new(&path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
            }
            std::fs::write(&path, json).with_context(|| format!("writing schema to {}", path))?;
            println!("Wrote {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_check(args: ConfigCheckArgs) -> Result<()> {
    let cfg = load_config(&args.path)?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}
