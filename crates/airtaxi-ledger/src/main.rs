//! `atledger` - CLI for the air taxi ledger
//!
//! Every ledger command is turned into a named transaction and run through
//! the dispatcher, exactly as an external client would invoke it.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;

use airtaxi_ledger::cli::{Cli, Command, ConfigCommand, Invocation, Mode, StatusCommand};
use airtaxi_ledger::{
    init_logging, AirTaxi, AirTaxiContract, Config, Dispatcher, LedgerStats, SqliteLedger,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match &cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Transactions => handle_transactions(&config),
        Command::Status(cmd) => handle_status(&config, cmd),
        command => {
            let dispatcher = open_dispatcher(&config)?;
            for invocation in command.invocations() {
                run(&dispatcher, &invocation, cli.pretty)?;
            }
            Ok(())
        }
    }
}

fn open_dispatcher(config: &Config) -> anyhow::Result<Dispatcher<SqliteLedger>> {
    let path = config.database_path();
    let ledger = SqliteLedger::open(&path)
        .with_context(|| format!("failed to open ledger at {}", path.display()))?
        .with_page_size(config.storage.scan_page_size);
    let contract = AirTaxiContract::new(ledger, config.ledger.clone())?;
    Ok(Dispatcher::new(contract))
}

fn run(
    dispatcher: &Dispatcher<SqliteLedger>,
    invocation: &Invocation,
    pretty: bool,
) -> anyhow::Result<()> {
    let output = match invocation.mode {
        Mode::Submit => dispatcher.submit_transaction(&invocation.name, &invocation.args),
        Mode::Evaluate => dispatcher.evaluate_transaction(&invocation.name, &invocation.args),
    }
    .with_context(|| format!("transaction {} failed", invocation.name))?;

    if output.is_empty() {
        if invocation.mode == Mode::Submit {
            println!("{} committed", invocation.name);
        }
        return Ok(());
    }

    let text = String::from_utf8_lossy(&output);
    if pretty {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&output) {
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }
    }
    println!("{text}");
    Ok(())
}

fn handle_transactions(config: &Config) -> anyhow::Result<()> {
    // The table is static; an in-memory ledger is enough to list it.
    let contract = AirTaxiContract::new(SqliteLedger::open_in_memory()?, config.ledger.clone())?;
    let dispatcher = Dispatcher::new(contract);

    for def in dispatcher.transactions() {
        let kind = if def.read_only { "read" } else { "write" };
        println!("{:<22} {:<6} {}", def.name, kind, def.params.join(" "));
    }
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let dispatcher = open_dispatcher(config)?;
    let output = dispatcher
        .evaluate_transaction("readAirTaxi", &[cmd.id.clone()])
        .with_context(|| format!("failed to read air taxi {}", cmd.id))?;
    let taxi = AirTaxi::from_slice(&output)?;
    let state = taxi.state();
    let stats = dispatcher.contract().ledger().stats()?;

    if cmd.json {
        let status = serde_json::json!({
            "id": cmd.id,
            "state": state,
            "record": taxi,
            "ledger": stats_json(config, &stats),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("atledger status");
        println!("---------------");
        println!("Air taxi:      {}", cmd.id);
        println!("State:         {state}");
        if let Some(tail_number) = &taxi.tail_number {
            println!("Tail number:   {tail_number}");
        }
        if let Some(owner) = &taxi.owner {
            println!("Owner:         {owner}");
        }
        if let (Some(from), Some(to)) = (&taxi.departure_port, &taxi.arrival_port) {
            println!("Flight plan:   {from} -> {to}");
        }
        println!();
        println!("Database:      {}", config.database_path().display());
        println!("Live keys:     {}", stats.live_keys);
        println!("Writes:        {}", stats.history_entries);
        if let Some(last_write) = stats.last_write {
            println!("Last write:    {}", last_write.to_rfc3339());
        }
    }
    Ok(())
}

fn stats_json(config: &Config, stats: &LedgerStats) -> serde_json::Value {
    serde_json::json!({
        "database_path": config.database_path(),
        "live_keys": stats.live_keys,
        "history_entries": stats.history_entries,
        "last_write": stats.last_write,
        "db_size_bytes": stats.db_size_bytes,
    })
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let ledger = &config.ledger;
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Scan page size:     {}", config.storage.scan_page_size);
                println!();
                println!("[Ledger]");
                println!(
                    "  Scan range:         [{}, {})",
                    ledger.scan_start_key, ledger.scan_end_key
                );
                println!("  Approval authority: {}", ledger.approval_authority);
                println!("  Date format:        {}", ledger.date_format);
                println!("  Allocated taxi:     {}", ledger.allocated_taxi_id);
                println!(
                    "  Id pattern:         {}",
                    ledger.id_pattern.as_deref().unwrap_or("(any)")
                );
                println!("  Transition policy:  {:?}", ledger.transition_policy);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
