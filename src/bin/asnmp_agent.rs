//! asnmp-agent: serve managed scalars over SNMPv2c.
//!
//! Reads the agent configuration, loads the value file, and answers GET,
//! GETNEXT and GETBULK until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use async_snmp_agent::cli::AgentArgs;
use async_snmp_agent::handler::SnapshotProvider;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let args = AgentArgs::parse();
    args.init_tracing();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (builder, store) = match config.agent_builder().and_then(|b| Ok((b, config.object_store()?))) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let provider = Arc::new(SnapshotProvider::for_store(&config.values, &store));
    match provider.load() {
        Ok(count) => {
            tracing::info!(target: "async_snmp_agent::agent", { path = %config.values.display(), values = count }, "values loaded");
        }
        Err(e) => {
            // Objects answer noSuchObject until a refresh succeeds.
            tracing::warn!(target: "async_snmp_agent::agent", error = %e, "initial value load failed");
        }
    }

    let agent = match builder.provider(provider.clone()).build().await {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = agent.cancel();
    let refresh = config
        .refresh_interval()
        .map(|interval| provider.spawn_refresh(interval, cancel.clone()));

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    tracing::info!(target: "async_snmp_agent::agent", { snmp.local_addr = %agent.local_addr(), objects = store.len() }, "agent listening");

    let result = agent.run().await;
    cancel.cancel();
    if let Some(handle) = refresh {
        let _ = handle.await;
    }

    let counters = agent.counters();
    tracing::info!(
        target: "async_snmp_agent::agent",
        {
            bad_versions = counters.in_bad_versions(),
            parse_errors = counters.in_asn_parse_errs(),
            bad_communities = counters.in_bad_community_names(),
            unhandled_pdus = counters.unknown_pdu_handlers(),
            silent_drops = counters.silent_drops()
        },
        "agent stopped"
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
