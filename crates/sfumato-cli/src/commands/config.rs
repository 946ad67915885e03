//! Settings file management commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use sfumato_config::{
    GenerationConfig, ValidationError, default_config_path, factory_presets, get_factory_preset,
};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a settings file with defaults or a factory preset
    Init {
        /// Destination (defaults to the user config file)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Start from a factory preset
        #[arg(short, long)]
        preset: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print a settings file as resolved TOML
    Show {
        /// Settings file (defaults to the user config file)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Check a settings file and list every problem
    Validate {
        /// Settings file
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// List factory presets
    Presets,

    /// Show the default settings file location
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Init {
            path,
            preset,
            force,
        } => init(path, preset.as_deref(), force),
        ConfigCommand::Show { path } => show(path),
        ConfigCommand::Validate { path } => validate(path),
        ConfigCommand::Presets => list_presets(),
        ConfigCommand::Path => {
            println!("{}", default_config_path().display());
            Ok(())
        }
    }
}

fn init(path: Option<PathBuf>, preset: Option<&str>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    if path.exists() && !force {
        anyhow::bail!(
            "'{}' already exists. Use --force to overwrite.",
            path.display()
        );
    }

    let config = match preset {
        Some(name) => get_factory_preset(name)?,
        None => GenerationConfig::default(),
    };
    config.save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn show(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    let config = GenerationConfig::load(&path)?;
    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

fn validate(path: PathBuf) -> anyhow::Result<()> {
    let config = GenerationConfig::load(&path)?;
    match config.validate() {
        Ok(()) => {
            println!("{}: ok", path.display());
            Ok(())
        }
        Err(ValidationError::Multiple(errors)) => {
            println!("{}: {} problems", path.display(), errors.len());
            for e in &errors {
                println!("  - {e}");
            }
            anyhow::bail!("validation failed")
        }
        Err(e) => {
            println!("{}: 1 problem", path.display());
            println!("  - {e}");
            anyhow::bail!("validation failed")
        }
    }
}

fn list_presets() -> anyhow::Result<()> {
    println!("Factory Presets:");
    println!("================");
    for (name, config) in factory_presets() {
        println!(
            "  {:12} {:18} {:>3} steps  guidance {}",
            name, config.sampler, config.steps, config.guidance_scale
        );
    }
    Ok(())
}
