//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::{AgentId, ChildSlotPolicy};

/// Resource heritage trees and frontier inventories from simulation ledgers
#[derive(Parser, Debug)]
#[command(name = "heritage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Simulation output database (default: out.sqlite)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Build trees for the resources one agent received
    #[arg(short, long, global = true)]
    pub agent: Option<AgentId>,

    /// Child slot assignment: discovery-order or parent-field
    #[arg(long, global = true, value_parser = clap::value_parser!(ChildSlotPolicy))]
    pub slot_policy: Option<ChildSlotPolicy>,

    /// Do not create lookup indexes before building
    #[arg(long, global = true)]
    pub no_index: bool,

    /// Directory holding a local .heritage.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the lineage graph in DOT format
    Graph {
        /// Write to file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Frontier of all trees at every simulation time step
    Inventory {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
        /// Write to file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Resources added and removed at each time step
    Changes {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show lineage trees
    Tree,

    /// List agent ids in the ledger
    Agents,

    /// Create lookup indexes on the ledger
    Index,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Show config file locations
    Path,
    /// Print a template config file
    Template,
}
