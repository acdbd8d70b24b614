//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::config::AgentConfig;
use crate::error::Result;

/// Serve managed scalars over SNMPv2c.
#[derive(Debug, Parser)]
#[command(name = "asnmp-agent", version, about)]
pub struct AgentArgs {
    /// Agent configuration file (JSON).
    #[arg(short = 'c', long = "config", default_value = "agent.json")]
    pub config: PathBuf,

    /// Override the listen address from the configuration.
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,

    /// Override the value file from the configuration.
    #[arg(long = "values", value_name = "PATH")]
    pub values: Option<PathBuf>,

    /// Override the value refresh period, in seconds (0 disables).
    #[arg(long = "refresh", value_name = "SECS")]
    pub refresh_secs: Option<u64>,

    /// Enable debug logging (async_snmp_agent=debug).
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Enable trace logging (async_snmp_agent=trace).
    #[arg(short = 'D', long = "trace")]
    pub trace: bool,
}

impl AgentArgs {
    /// Initialize tracing based on debug/trace flags.
    ///
    /// `RUST_LOG` takes precedence when set.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let default = if self.trace {
            "async_snmp_agent=trace"
        } else if self.debug {
            "async_snmp_agent=debug"
        } else {
            "async_snmp_agent=info"
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Load the configuration file and apply command-line overrides.
    pub fn load_config(&self) -> Result<AgentConfig> {
        let mut config = AgentConfig::from_file(&self.config)?;
        if let Some(ref bind) = self.bind {
            config.bind = bind.clone();
        }
        if let Some(ref values) = self.values {
            config.values = values.clone();
        }
        if let Some(secs) = self.refresh_secs {
            config.refresh_secs = secs;
        }
        config.validate()?;
        Ok(config)
    }
}
