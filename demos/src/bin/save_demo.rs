//! Save and load a small game world.
//!
//! ```bash
//! cargo run -p savebox-demos --bin save_demo -- save --slot quick
//! cargo run -p savebox-demos --bin save_demo -- list
//! cargo run -p savebox-demos --bin save_demo -- load --slot quick
//! cargo run -p savebox-demos --bin save_demo -- print --compact
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use savebox::{FileSystemStorage, SaveError, SaveSettings, SceneGraph};
use savebox_demos::{build_empty_world, build_manager, build_world};

#[derive(Parser, Debug)]
#[command(name = "save_demo", about = "savebox demo world", version)]
struct Args {
    /// Directory holding save slots.
    #[arg(long, default_value = "saves")]
    dir: PathBuf,

    /// Settings file; defaults are used when it is missing.
    #[arg(long, default_value = "savebox.toml")]
    config: PathBuf,

    /// Render without whitespace.
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the starting world into a slot.
    Save {
        #[arg(long, default_value = "quick")]
        slot: String,
        /// Render with frame-budgeted suspension.
        #[arg(long = "async")]
        use_async: bool,
    },
    /// Load a slot into an empty world.
    Load {
        #[arg(long, default_value = "quick")]
        slot: String,
    },
    /// List slots, newest first.
    List,
    /// Delete a slot.
    Delete {
        #[arg(long)]
        slot: String,
    },
    /// Print the starting world's save document.
    Print,
}

fn run(args: Args) -> Result<(), SaveError> {
    let mut settings = SaveSettings::load_or_default(&args.config);
    if args.compact {
        settings.pretty_print = false;
    }
    let mut manager = build_manager(settings);
    let storage = FileSystemStorage::new(args.dir.clone());

    match args.command {
        Command::Save { slot, use_async } => {
            let scene = build_world();
            let report = if use_async {
                pollster::block_on(manager.save_slot_async(&storage, &slot, &scene))?
            } else {
                manager.save_slot(&storage, &slot, &scene)?
            };
            log::info!(
                "Saved {} entities ({} leaves) to {}",
                report.saved,
                report.underlying_node_count,
                args.dir.join(manager.settings().slot_file_name(&slot)).display()
            );
        }
        Command::Load { slot } => {
            let mut scene = build_empty_world();
            let report = manager.load_slot(&storage, &slot, &mut scene)?;
            log::info!(
                "Loaded {} entities: {} spawned, {} recreated, {} skipped, {} failed",
                report.loaded,
                report.spawned,
                report.recreated,
                report.skipped.len(),
                report.failures.len()
            );
            log::info!(
                "Scene now holds {} objects, {} more in the entity registry",
                scene.objects(true).len(),
                manager.entities().len()
            );
        }
        Command::List => {
            for info in manager.list_slots(&storage)? {
                println!(
                    "{:<16} {}  v{}  {} entities",
                    info.slot,
                    info.header.saved_at.format("%Y-%m-%d %H:%M:%S"),
                    info.header.version,
                    info.header.entity_count
                );
            }
        }
        Command::Delete { slot } => manager.delete_slot(&storage, &slot)?,
        Command::Print => {
            let scene = build_world();
            let (text, _) = manager.save_to_string(&scene)?;
            println!("{text}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
