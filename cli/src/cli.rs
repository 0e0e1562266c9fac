//! # CLI Interface
//!
//! Argument structure for `ledger-cli` using `clap` derive. Subcommands:
//! `estimate-fee`, `inspect`, `checksum`, and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Companion tool for the ledger SDK.
///
/// Estimates fees against a mirror, decodes encoded transactions, and
/// derives entity id checksums.
#[derive(Parser, Debug)]
#[command(
    name = "ledger-cli",
    about = "Command-line companion for the ledger SDK",
    version,
    propagate_version = true
)]
pub struct LedgerCli {
    /// Log output format. Logs go to stderr.
    #[arg(long, global = true, value_enum, env = "LEDGER_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate the fee of an HBAR transfer from the configured operator.
    EstimateFee(EstimateFeeArgs),
    /// Decode hex-encoded transaction bytes and describe them.
    Inspect(InspectArgs),
    /// Print an entity id with its checksum, or validate the one given.
    Checksum(ChecksumArgs),
    /// Print version information and exit.
    Version,
}

/// Fee model passed through to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    State,
    Intrinsic,
}

#[derive(Parser, Debug)]
pub struct EstimateFeeArgs {
    /// Path to the client configuration file (JSON). Needs an operator and
    /// at least one mirror.
    #[arg(long, short = 'c', env = "LEDGER_CLIENT_CONFIG")]
    pub config: PathBuf,

    /// Receiving account, `shard.realm.num`.
    #[arg(long)]
    pub to: String,

    /// Amount in tinybars.
    #[arg(long)]
    pub amount: i64,

    #[arg(long, value_enum, default_value = "state")]
    pub mode: ModeArg,

    /// Attempts before giving up on the mirror.
    #[arg(long, default_value_t = 10)]
    pub max_attempts: u32,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Hex-encoded transaction bytes, as produced by `to_bytes`.
    pub hex: String,
}

#[derive(Parser, Debug)]
pub struct ChecksumArgs {
    /// `shard.realm.num`, optionally with `-checksum` to validate.
    pub id: String,

    /// Ledger the checksum belongs to: mainnet, testnet, previewnet, or a
    /// hex ledger id.
    #[arg(long, default_value = "mainnet")]
    pub network: String,
}
