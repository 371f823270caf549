//! Command dispatch: settings resolution, ledger access, and rendering

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use generational_arena::Index;
use tracing::{debug, instrument};

use crate::application::services::{lineage_changes, Inventory, RootSelection, TreeBuilder};
use crate::application::{dot_graph, ApplicationError, IoResultExt, TreeRender};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::LineageForest;
use crate::infrastructure::{InfraError, ResourceLedger, SqliteLedger};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Graph { output }) => cmd_graph(cli, output.as_deref()),
        Some(Commands::Inventory { json, output }) => {
            cmd_inventory(cli, *json, output.as_deref())
        }
        Some(Commands::Changes { json }) => cmd_changes(cli, *json),
        Some(Commands::Tree) => cmd_tree(cli),
        Some(Commands::Agents) => cmd_agents(cli),
        Some(Commands::Index) => cmd_index(cli),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => cmd_completion(*shell),
        None => Err(CliError::Usage(
            "no command given, see `heritage --help`".into(),
        )),
    }
}

fn config_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("get current directory", e).into()),
    }
}

/// Layered settings with command line flags applied last.
pub fn resolve_settings(cli: &Cli) -> CliResult<Settings> {
    let dir = config_dir(cli)?;
    let mut settings = Settings::load(Some(&dir))?;
    if let Some(db) = &cli.db {
        settings.database = db.clone();
    }
    if let Some(agent) = cli.agent {
        settings.agent = Some(agent);
    }
    if let Some(policy) = cli.slot_policy {
        settings.slot_policy = policy;
    }
    if cli.no_index {
        settings.create_indexes = false;
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

fn open_ledger(settings: &Settings) -> CliResult<SqliteLedger> {
    let ledger = SqliteLedger::open(&settings.database)?;
    if settings.create_indexes {
        ledger.prepare()?;
    }
    Ok(ledger)
}

/// Root selection implied by the settings.
pub fn selection(settings: &Settings) -> RootSelection {
    settings
        .agent
        .map_or(RootSelection::WholePopulation, RootSelection::BoundedAgent)
}

fn build_forest(ledger: &dyn ResourceLedger, settings: &Settings) -> CliResult<LineageForest> {
    let forest = TreeBuilder::new(ledger)
        .with_policy(settings.slot_policy)
        .build(selection(settings))?;
    Ok(forest)
}

fn serialize_err(what: &str, e: serde_json::Error) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: format!("serialize {what}"),
        source: Box::new(e),
    }
}

fn write_output(content: &str, path: &Path, what: &str) -> CliResult<()> {
    std::fs::write(path, content).with_path_context(&format!("write {what}"), path)?;
    output::success(&format!("{} written to {}", what, path.display()));
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_graph(cli: &Cli, out: Option<&Path>) -> CliResult<()> {
    let settings = resolve_settings(cli)?;
    let ledger = open_ledger(&settings)?;
    let forest = build_forest(&ledger, &settings)?;
    let graph = dot_graph(&forest);
    match out {
        Some(path) => write_output(&graph, path, "graph"),
        None => {
            print!("{}", graph);
            Ok(())
        }
    }
}

#[instrument(skip(cli))]
fn cmd_inventory(cli: &Cli, json: bool, out: Option<&Path>) -> CliResult<()> {
    let settings = resolve_settings(cli)?;
    let ledger = open_ledger(&settings)?;
    let forest = build_forest(&ledger, &settings)?;
    let inventory = Inventory::from_ledger(&ledger, &forest)?;

    let rendered = if json {
        let mut text = inventory
            .to_json()
            .map_err(|e| serialize_err("inventory", e))?;
        text.push('\n');
        text
    } else {
        inventory.to_string()
    };
    match out {
        Some(path) => write_output(&rendered, path, "inventory"),
        None => {
            print!("{}", rendered);
            Ok(())
        }
    }
}

#[instrument(skip(cli))]
fn cmd_changes(cli: &Cli, json: bool) -> CliResult<()> {
    let settings = resolve_settings(cli)?;
    let ledger = open_ledger(&settings)?;
    let forest = build_forest(&ledger, &settings)?;
    let changes = lineage_changes(&forest);

    if json {
        let text = changes
            .to_json()
            .map_err(|e| serialize_err("changes", e))?;
        output::info(&text);
        return Ok(());
    }
    for time in changes.times() {
        output::header(&format!("timestep {}", time));
        for resource in changes.added.get(&time).into_iter().flatten() {
            output::added(resource);
        }
        for resource in changes.removed.get(&time).into_iter().flatten() {
            output::removed(resource);
        }
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_tree(cli: &Cli) -> CliResult<()> {
    let settings = resolve_settings(cli)?;
    let ledger = open_ledger(&settings)?;
    let forest = build_forest(&ledger, &settings)?;

    if forest.is_empty() {
        output::warning(&format!("no lineage trees for {}", selection(&settings)));
        return Ok(());
    }
    for (i, (&root, tree)) in forest.roots().iter().zip(forest.to_trees()).enumerate() {
        output::header(&tree_heading(&forest, i, root));
        print!("{}", tree);
    }
    Ok(())
}

fn tree_heading(forest: &LineageForest, position: usize, root: Index) -> String {
    format!(
        "Tree {}: depth {}, {} leaves",
        position + 1,
        forest.depth(root),
        forest.leaves(root).len()
    )
}

#[instrument(skip(cli))]
fn cmd_agents(cli: &Cli) -> CliResult<()> {
    let settings = resolve_settings(cli)?;
    let ledger = SqliteLedger::open(&settings.database)?;
    for agent in ledger.agents()? {
        output::info(&agent);
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_index(cli: &Cli) -> CliResult<()> {
    let settings = resolve_settings(cli)?;
    let ledger = SqliteLedger::open(&settings.database)?;
    ledger.prepare()?;
    output::success(&format!("indexes ready in {}", settings.database.display()));
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = resolve_settings(cli)?;
            print!("{}", settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::info(&format!("global: {}", path.display())),
                None => output::warning("no home directory, global config unavailable"),
            }
            let dir = config_dir(cli)?;
            output::info(&format!("local:  {}", local_config_path(&dir).display()));
        }
        ConfigCommands::Template => print!("{}", Settings::template()),
    }
    Ok(())
}

fn cmd_completion(shell: Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
