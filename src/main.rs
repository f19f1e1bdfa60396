//! jmmc - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jmmc::util::config::{load_for_dir, load_project_config};
use jmmc::util::logger;
use jmmc::{compile_file, NAME, VERSION};
use std::fs;
use std::path::{Path, PathBuf};

/// Compile J-- programs to Jasmin assembly
#[derive(Parser, Debug)]
#[command(name = "jmmc")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a JSON-encoded typed AST
    Compile {
        /// Program to compile
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// What to print
        #[arg(long, value_enum, default_value_t = Emit::Jasmin)]
        emit: Emit,

        /// Keep declaration-order slots instead of graph coloring
        #[arg(long)]
        no_regalloc: bool,

        /// Fold constant expressions first
        #[arg(long)]
        fold: bool,

        /// Configuration file (default: nearest jmmc.toml)
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Allocated three-address IR
    Ir,
    /// Jasmin assembly
    Jasmin,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli(args.verbose);

    match args.command {
        Commands::Compile {
            file,
            output,
            emit,
            no_regalloc,
            fold,
            config,
        } => {
            let project = match &config {
                Some(path) => load_project_config(path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?,
                None => {
                    let dir = file
                        .parent()
                        .filter(|dir| !dir.as_os_str().is_empty())
                        .unwrap_or(Path::new("."));
                    load_for_dir(dir).context("Failed to load jmmc.toml")?
                }
            };
            let mut compiler = project.compiler;
            if no_regalloc {
                compiler.register_allocation = false;
            }
            if fold {
                compiler.fold_constants = true;
            }

            let compilation = compile_file(&file, &compiler)?;
            let text = match emit {
                Emit::Ir => compilation.ir(),
                Emit::Jasmin => compilation.jasmin,
            };

            match output {
                Some(path) => fs::write(&path, text)
                    .with_context(|| format!("Failed to write output: {}", path.display()))?,
                None => print!("{}", text),
            }
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
