//! One module per `lockbox` subcommand.

pub mod add;
#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod backup;
pub mod completions;
pub mod create;
pub mod delete;
pub mod export;
pub mod generate;
pub mod get;
pub mod import_cmd;
pub mod list;
pub mod passwd;
pub mod remove;
pub mod rename;
pub mod restore;
pub mod stats;
pub mod update;
pub mod vaults;
