//! CLI utilities for async-snmp-manager.
//!
//! Argument parsing, notification output formatting and OID name hints for
//! the `asnmp-trapd` tool.
//!
//! This module is only available with the `cli` feature.

pub mod args;
pub mod hints;
pub mod output;
