// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger CLI
//!
//! Entry point for the `ledger-cli` binary. Parses arguments, initializes
//! logging, and runs one subcommand:
//!
//! - `estimate-fee`: build a transfer from the operator and ask the mirror
//!   what it would cost
//! - `inspect`      : decode transaction bytes and describe them
//! - `checksum`     : derive or validate an entity id checksum
//! - `version`      : print build version information

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ledger_sdk::config;
use ledger_sdk::fees::{FeeEstimateMode, FeeEstimateQuery};
use ledger_sdk::id::{AccountId, EntityId, LedgerId};
use ledger_sdk::transaction::{AnyTransaction, TransferTransaction};
use ledger_sdk::Client;

use cli::{Commands, LedgerCli, ModeArg};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LedgerCli::parse();
    logging::init_logging("ledger_cli=info,ledger_sdk=info", cli.log_format);

    match cli.command {
        Commands::EstimateFee(args) => estimate_fee(args).await,
        Commands::Inspect(args) => inspect(args),
        Commands::Checksum(args) => checksum(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Freezes and signs a two-leg transfer, then prints the mirror's estimate
/// as JSON on stdout.
async fn estimate_fee(args: cli::EstimateFeeArgs) -> Result<()> {
    let client = Client::from_config_file(&args.config)
        .with_context(|| format!("failed to load client config {}", args.config.display()))?;
    let payer = client
        .operator()
        .map(|operator| operator.account_id.clone())
        .context("client config has no operator to pay for the transfer")?;
    let to: AccountId = args
        .to
        .parse()
        .with_context(|| format!("invalid receiving account `{}`", args.to))?;
    let debit = args
        .amount
        .checked_neg()
        .context("amount is out of range")?;

    let mut transfer = TransferTransaction::new();
    transfer
        .add_hbar_transfer(payer.clone(), debit)?
        .add_hbar_transfer(to.clone(), args.amount)?;
    transfer
        .freeze_with_client(&client)
        .context("failed to freeze transfer")?;
    transfer.sign_with_operator(&client)?;

    let mode = match args.mode {
        ModeArg::State => FeeEstimateMode::State,
        ModeArg::Intrinsic => FeeEstimateMode::Intrinsic,
    };
    let mut query = FeeEstimateQuery::new();
    query
        .set_transaction(&transfer)?
        .set_mode(mode)
        .set_max_attempts(args.max_attempts)?;

    tracing::info!(payer = %payer, to = %to, amount = args.amount, %mode, "estimating fee");
    let estimate = query
        .execute(&client)
        .await
        .context("fee estimate failed")?;

    println!("{}", serde_json::to_string_pretty(&estimate)?);
    Ok(())
}

fn inspect(args: cli::InspectArgs) -> Result<()> {
    let bytes = hex::decode(args.hex.trim()).context("input is not valid hex")?;
    let transaction =
        AnyTransaction::from_bytes(&bytes).context("bytes do not decode to a transaction")?;

    println!("kind            : {}", transaction.kind());
    println!("state           : {:?}", transaction.state());
    if let Some(id) = transaction.transaction_id() {
        println!("transaction id  : {id}");
    }
    println!("chunks          : {}", transaction.chunk_count());
    println!("signable bodies : {}", transaction.signable_body_count());
    println!("{}", transaction.to_canonical_string());
    Ok(())
}

fn checksum(args: cli::ChecksumArgs) -> Result<()> {
    let ledger = LedgerId::from_name(&args.network)?;
    let id: EntityId = args.id.parse()?;

    if id.checksum().is_none() {
        println!("{}", id.to_string_with_checksum(&ledger));
        return Ok(());
    }
    match id.validate_checksum(&ledger) {
        Ok(()) => {
            println!("{} is valid on {ledger}", args.id);
            Ok(())
        }
        Err(e) => bail!("{e}"),
    }
}

fn print_version() {
    println!("ledger-cli {}", env!("CARGO_PKG_VERSION"));
    println!("wire       v{}", config::WIRE_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
