mod config;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use vx_snapshot::{ExportArgs, ExportSnapshot, ImportArgs, ImportSnapshot};
use vx_types::BlockHash;

use crate::config::Config;

const COMMAND_EXPORT_SNAPSHOT: &str = "export-snapshot";
const COMMAND_IMPORT_SNAPSHOT: &str = "import-snapshot";
const ARG_CONFIG: &str = "config";
const ARG_OUTPUT_PATH: &str = "output-path";
const ARG_SOURCE_PATH: &str = "source-path";
const ARG_BLOCK: &str = "block";
const ARG_ROLLING: &str = "rolling";
const ARG_RECONSTRUCT: &str = "reconstruct";
const ARG_SHOW_PROGRESS: &str = "show-progress";

fn read_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read(&path)
        .with_context(|| format!("read config file from {}", path.as_ref().to_string_lossy()))?;
    let config = toml::from_slice(&content).with_context(|| "parse config file")?;
    Ok(config)
}

fn clean_data_dir(path: &Path) {
    if let Err(err) = fs::remove_dir_all(path) {
        log::warn!("failed to clean {}: {}", path.display(), err);
    }
}

fn run_cli() -> Result<()> {
    let app = Command::new("Vertex")
        .about("The vertex chain node storage tooling.")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(
            Command::new(COMMAND_EXPORT_SNAPSHOT)
                .about("Package a prefix of the chain into a portable snapshot file")
                .arg(
                    Arg::new(ARG_CONFIG)
                        .short('c')
                        .long(ARG_CONFIG)
                        .takes_value(true)
                        .required(true)
                        .default_value("./config.toml")
                        .help("The config file path"),
                )
                .arg(
                    Arg::new(ARG_OUTPUT_PATH)
                        .short('o')
                        .long(ARG_OUTPUT_PATH)
                        .takes_value(true)
                        .required(true)
                        .help("The output file for the snapshot"),
                )
                .arg(
                    Arg::new(ARG_BLOCK)
                        .short('b')
                        .long(ARG_BLOCK)
                        .takes_value(true)
                        .help("Export this block instead of the current checkpoint"),
                )
                .arg(
                    Arg::new(ARG_ROLLING)
                        .long(ARG_ROLLING)
                        .takes_value(false)
                        .help("Export a rolling snapshot, recent history only"),
                )
                .arg(
                    Arg::new(ARG_SHOW_PROGRESS)
                        .short('p')
                        .long(ARG_SHOW_PROGRESS)
                        .takes_value(false)
                        .help("Show progress bar"),
                )
                .display_order(0),
        )
        .subcommand(
            Command::new(COMMAND_IMPORT_SNAPSHOT)
                .about("Rehydrate an empty data directory from a snapshot file")
                .arg(
                    Arg::new(ARG_CONFIG)
                        .short('c')
                        .long(ARG_CONFIG)
                        .takes_value(true)
                        .required(true)
                        .default_value("./config.toml")
                        .help("The config file path"),
                )
                .arg(
                    Arg::new(ARG_SOURCE_PATH)
                        .short('s')
                        .long(ARG_SOURCE_PATH)
                        .takes_value(true)
                        .required(true)
                        .help("The snapshot file to import"),
                )
                .arg(
                    Arg::new(ARG_BLOCK)
                        .short('b')
                        .long(ARG_BLOCK)
                        .takes_value(true)
                        .help("Require the snapshot head to be this block"),
                )
                .arg(
                    Arg::new(ARG_RECONSTRUCT)
                        .long(ARG_RECONSTRUCT)
                        .takes_value(false)
                        .help("Rebuild every context by re-executing blocks from genesis"),
                )
                .arg(
                    Arg::new(ARG_SHOW_PROGRESS)
                        .short('p')
                        .long(ARG_SHOW_PROGRESS)
                        .takes_value(false)
                        .help("Show progress bar"),
                )
                .display_order(1),
        )
        .subcommand_required(true);

    let matches = app.get_matches();
    match matches.subcommand() {
        Some((COMMAND_EXPORT_SNAPSHOT, m)) => {
            let config = read_config(m.value_of(ARG_CONFIG).unwrap())?;
            let block: Option<BlockHash> = m.value_of(ARG_BLOCK).map(str::parse).transpose()?;

            let args = ExportArgs {
                data_dir: config.data_dir.clone(),
                genesis: config.genesis.to_genesis()?,
                output: m.value_of(ARG_OUTPUT_PATH).unwrap().into(),
                block,
                export_rolling: m.is_present(ARG_ROLLING),
                show_progress: m.is_present(ARG_SHOW_PROGRESS),
            };
            ExportSnapshot::create(args)?.execute()?;
        }
        Some((COMMAND_IMPORT_SNAPSHOT, m)) => {
            let config = read_config(m.value_of(ARG_CONFIG).unwrap())?;
            let block: Option<BlockHash> = m.value_of(ARG_BLOCK).map(str::parse).transpose()?;

            let args = ImportArgs {
                data_dir: config.data_dir.clone(),
                genesis: config.genesis.to_genesis()?,
                source: m.value_of(ARG_SOURCE_PATH).unwrap().into(),
                block,
                reconstruct: m.is_present(ARG_RECONSTRUCT),
                show_progress: m.is_present(ARG_SHOW_PROGRESS),
            };
            ImportSnapshot::create(args, Box::new(clean_data_dir), None).execute()?;
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

/// Vertex entry
fn main() -> Result<()> {
    env_logger::init();
    run_cli()
}
