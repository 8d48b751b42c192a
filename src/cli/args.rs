//! Command-line argument definitions.

use crate::Oid;
use crate::cli::hints::parse_oid;
use clap::{Parser, ValueEnum};

/// Output format for CLI tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with type information.
    #[default]
    Human,
    /// One JSON object per notification, for scripting.
    Json,
}

/// Listener arguments.
#[derive(Debug, Parser)]
pub struct ListenArgs {
    /// Address to listen on.
    #[arg(short = 'H', long = "host", default_value = "0.0.0.0")]
    pub host: String,

    /// UDP port to listen on.
    #[arg(short = 'p', long = "port", default_value = "162")]
    pub port: u16,

    /// Accepted community (repeatable). Any community is accepted if omitted.
    #[arg(short = 'c', long = "community", value_name = "COMMUNITY")]
    pub communities: Vec<String>,

    /// Label notifications with this OID, given as `[LABEL=]OID`
    /// (repeatable; OID may be dotted or a well-known name).
    #[arg(long = "oid", value_name = "[LABEL=]OID", value_parser = parse_oid_label)]
    pub oids: Vec<OidLabel>,
}

/// An `--oid` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct OidLabel {
    pub oid: Oid,
    pub label: String,
}

/// Parse `[LABEL=]OID`. Without a label the OID text itself is used.
pub fn parse_oid_label(s: &str) -> Result<OidLabel, String> {
    let (label, oid_text) = match s.split_once('=') {
        Some((label, oid)) if !label.is_empty() => (label.to_string(), oid),
        Some(_) => return Err(format!("empty label in '{}'", s)),
        None => (s.to_string(), s),
    };
    Ok(OidLabel {
        oid: parse_oid(oid_text)?,
        label,
    })
}

/// Output arguments.
#[derive(Debug, Parser)]
pub struct OutputArgs {
    /// Output format: human or json.
    #[arg(short = 'O', long = "output", default_value = "human")]
    pub format: OutputFormat,

    /// Always display OctetString as hex.
    #[arg(long = "hex")]
    pub hex: bool,

    /// Disable well-known OID name hints.
    #[arg(long = "no-hints")]
    pub no_hints: bool,

    /// Enable debug logging (async_snmp_manager=debug).
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Enable trace logging (async_snmp_manager=trace).
    #[arg(short = 'D', long = "trace")]
    pub trace: bool,
}

impl OutputArgs {
    /// Initialize tracing based on debug/trace flags.
    ///
    /// `RUST_LOG`, when set, takes precedence over the flags.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let default = if self.trace {
            "async_snmp_manager=trace"
        } else if self.debug {
            "async_snmp_manager=debug"
        } else {
            "async_snmp_manager=warn"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
