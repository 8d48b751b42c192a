//! asnmp-trapd: Receive and print SNMP traps and informs.
//!
//! Part of the async-snmp-manager CLI utilities.

use async_snmp_manager::cli::args::{ListenArgs, OutputArgs};
use async_snmp_manager::cli::output::{OutputContext, write_error};
use async_snmp_manager::{ManagerConfig, Trap, Trapd};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

/// Listen for SNMPv1/v2c notifications and print them.
#[derive(Debug, Parser)]
#[command(name = "asnmp-trapd", version, about)]
struct Args {
    #[command(flatten)]
    listen: ListenArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    args.output.init_tracing();

    let mut config = ManagerConfig::new()
        .host(args.listen.host.clone())
        .port(args.listen.port);
    if !args.listen.communities.is_empty() {
        config = config.accept_communities(&args.listen.communities);
    }

    let output = Arc::new(OutputContext {
        format: args.output.format,
        show_hints: !args.output.no_hints,
        force_hex: args.output.hex,
    });

    let mut trapd = Trapd::new(config);

    for entry in &args.listen.oids {
        let output = output.clone();
        let label = entry.label.clone();
        let registered = trapd.on_trap(&entry.oid.to_string(), move |trap: Trap| {
            output.write_trap(&trap, Some(&label))?;
            Ok(())
        });
        if let Err(e) = registered {
            write_error(&e);
            return ExitCode::FAILURE;
        }
    }

    // v1 traps never reach OID handlers; label them here instead
    let labels: Vec<_> = args
        .listen
        .oids
        .iter()
        .map(|entry| (entry.oid.clone(), entry.label.clone()))
        .collect();
    trapd.on_trap_default(move |trap: Trap| {
        let label = trap.trap_oid().and_then(|oid| {
            labels
                .iter()
                .find(|(candidate, _)| *candidate == oid)
                .map(|(_, label)| label.as_str())
        });
        output.write_trap(&trap, label)?;
        Ok(())
    });

    let listener = match trapd.start().await {
        Ok(listener) => listener,
        Err(e) => {
            write_error(&e);
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Listening on {}", listener.local_addr());

    tokio::select! {
        _ = listener.run() => ExitCode::SUCCESS,
        _ = tokio::signal::ctrl_c() => ExitCode::SUCCESS,
    }
}
