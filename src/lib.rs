//! heritage: resource lineage trees and frontier inventories
//!
//! Architecture:
//! - `domain`: resources, the lineage arena, and frontier queries
//! - `infrastructure`: the SQLite ledger behind the `ResourceLedger` trait
//! - `application`: root selection, tree building, inventories, and rendering
//! - `cli`: argument parsing and command dispatch
//! - `config`: layered settings

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
