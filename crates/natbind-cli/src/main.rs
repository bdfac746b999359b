//! natbind CLI.
//!
//! Commands:
//! - `natbind generate [manifest] [--out FILE]` - Emit the static binding and its entry point
//! - `natbind shapes [manifest]` - Print the call-shape list as JSON
//! - `natbind check [manifest]` - Open the libraries and bind every method

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use natbind_runtime::config::MANIFEST_FILE;
use natbind_runtime::{DynamicBinder, LibraryRegistry, Manifest};

#[derive(Parser)]
#[command(name = "natbind")]
#[command(about = "Native-call binding generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate Rust source for a binding manifest
    Generate {
        /// Path to natbind.toml
        #[arg(default_value = MANIFEST_FILE)]
        manifest: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the distinct call shapes of an interface as JSON
    Shapes {
        /// Path to natbind.toml
        #[arg(default_value = MANIFEST_FILE)]
        manifest: PathBuf,
    },

    /// Open the manifest's libraries and bind every method
    Check {
        /// Path to natbind.toml
        #[arg(default_value = MANIFEST_FILE)]
        manifest: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate { manifest, out } => cmd_generate(&manifest, out.as_deref()),
        Commands::Shapes { manifest } => cmd_shapes(&manifest),
        Commands::Check { manifest } => cmd_check(&manifest),
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn load(path: &Path) -> Result<(Manifest, natbind_runtime::InterfaceDescription)> {
    let manifest = Manifest::load(path)?;
    let desc = manifest.interface()?;
    log::debug!(
        "loaded `{}` ({} signature(s)) from {}",
        desc.name(),
        desc.len(),
        path.display()
    );
    Ok((manifest, desc))
}

/// Emit the binding and its entry-point module.
fn cmd_generate(path: &Path, out: Option<&Path>) -> Result<()> {
    let (manifest, desc) = load(path)?;
    let source = natbind_codegen::generate_with_entry_point(&desc, &manifest.resolver_expression())
        .with_context(|| format!("generating `{}`", desc.name()))?;

    match out {
        Some(out) => {
            fs::write(out, &source).with_context(|| format!("writing {}", out.display()))?;
            println!("Generated {} -> {}", desc.name(), out.display());
        }
        None => print!("{}", source),
    }
    Ok(())
}

fn cmd_shapes(path: &Path) -> Result<()> {
    let (_, desc) = load(path)?;
    let json = natbind_codegen::shapes_manifest(&desc)?;
    println!("{}", json);
    Ok(())
}

/// Bind every method against the real libraries.
fn cmd_check(path: &Path) -> Result<()> {
    let (manifest, desc) = load(path)?;
    let registry = LibraryRegistry::new();
    let iface = DynamicBinder::bind_library(desc, manifest.library_spec(), &registry)
        .with_context(|| format!("resolving {}", manifest.library_spec()))?;
    let table = iface
        .ensure_bound()
        .with_context(|| format!("binding `{}`", manifest.name()))?;

    println!(
        "{}: {} method(s) bound from {}",
        table.interface_name(),
        table.len(),
        iface.lookup().describe()
    );
    for method in table.methods() {
        println!("  {:>3}  {:<32} {}", method.id().index(), method.symbol(), method.shape());
    }
    Ok(())
}
