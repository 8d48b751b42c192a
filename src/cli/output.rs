//! Output formatting for received notifications.
//!
//! Supports human-readable and JSON output.

use crate::cli::args::OutputFormat;
use crate::cli::hints;
use crate::{Oid, Trap, Value, VarBind};
use serde::Serialize;
use std::io::{self, Write};

/// A received notification, ready for output.
#[derive(Debug, Serialize)]
pub struct TrapRecord {
    pub source: String,
    pub version: String,
    pub community: String,
    pub pdu_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trap_oid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u32>,
    pub varbinds: Vec<VarBindResult>,
}

/// A single varbind.
#[derive(Debug, Serialize)]
pub struct VarBindResult {
    pub oid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

/// Output context for formatting.
#[derive(Debug, Clone)]
pub struct OutputContext {
    pub format: OutputFormat,
    pub show_hints: bool,
    pub force_hex: bool,
}

impl OutputContext {
    /// Create a new output context with default settings.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            show_hints: true,
            force_hex: false,
        }
    }

    /// Write one notification to stdout.
    ///
    /// `label` comes from a matching `--oid`; without one the hint table
    /// names the notification.
    pub fn write_trap(&self, trap: &Trap, label: Option<&str>) -> io::Result<()> {
        let record = self.build_record(trap, label);
        let mut stdout = io::stdout().lock();

        match self.format {
            OutputFormat::Human => self.write_human(&mut stdout, &record),
            OutputFormat::Json => self.write_json(&mut stdout, &record),
        }
    }

    /// Build the serializable record for `trap`.
    pub fn build_record(&self, trap: &Trap, label: Option<&str>) -> TrapRecord {
        let trap_oid = trap.trap_oid();
        let label = label.map(String::from).or_else(|| {
            trap_oid
                .as_ref()
                .filter(|_| self.show_hints)
                .and_then(hints::lookup)
        });

        TrapRecord {
            source: trap.source_ip().to_string(),
            version: trap.version().to_string(),
            community: String::from_utf8_lossy(trap.community()).into_owned(),
            pdu_type: trap.pdu_type().to_string(),
            trap_oid: trap_oid.as_ref().map(format_oid),
            label,
            uptime: trap.uptime(),
            varbinds: trap
                .varbinds()
                .iter()
                .map(|vb| self.format_varbind(vb))
                .collect(),
        }
    }

    fn format_varbind(&self, vb: &VarBind) -> VarBindResult {
        let hint = if self.show_hints {
            hints::lookup(&vb.oid)
        } else {
            None
        };

        let (value_type, value, formatted) = format_value(&vb.value, self.force_hex);

        VarBindResult {
            oid: format_oid(&vb.oid),
            hint,
            value_type,
            value,
            formatted,
        }
    }

    fn write_human<W: Write>(&self, w: &mut W, record: &TrapRecord) -> io::Result<()> {
        write!(w, "{} from {} ({})", record.pdu_type, record.source, record.version)?;
        match (&record.trap_oid, &record.label) {
            (Some(oid), Some(label)) => writeln!(w, ": {} ({})", oid, label)?,
            (Some(oid), None) => writeln!(w, ": {}", oid)?,
            _ => writeln!(w)?,
        }
        writeln!(w, "  community: {}", record.community)?;
        if let Some(uptime) = record.uptime {
            writeln!(w, "  uptime: ({}) {}", uptime, format_timeticks(uptime))?;
        }

        for vb in &record.varbinds {
            if let Some(ref hint) = vb.hint {
                write!(w, "  {} ({})", vb.oid, hint)?;
            } else {
                write!(w, "  {}", vb.oid)?;
            }

            write!(w, " = {}: ", vb.value_type)?;

            if let Some(ref formatted) = vb.formatted {
                writeln!(w, "{}", formatted)?;
            } else {
                match &vb.value {
                    serde_json::Value::String(s) => writeln!(w, "\"{}\"", s)?,
                    serde_json::Value::Null => writeln!(w)?,
                    other => writeln!(w, "{}", other)?,
                }
            }
        }
        writeln!(w)
    }

    fn write_json<W: Write>(&self, w: &mut W, record: &TrapRecord) -> io::Result<()> {
        let json = serde_json::to_string(record).map_err(io::Error::other)?;
        writeln!(w, "{}", json)
    }
}

/// Format an OID as dotted string.
fn format_oid(oid: &Oid) -> String {
    oid.to_string()
}

/// Format a value, returning (type_name, json_value, formatted_string).
fn format_value(value: &Value, force_hex: bool) -> (String, serde_json::Value, Option<String>) {
    match value {
        Value::Integer(v) => ("INTEGER".into(), (*v).into(), None),

        Value::OctetString(bytes) => {
            if force_hex || !is_printable(bytes) {
                (
                    "Hex-STRING".into(),
                    serde_json::Value::String(hex_string(bytes)),
                    Some(format_hex_string(bytes)),
                )
            } else {
                let s = String::from_utf8_lossy(bytes);
                ("STRING".into(), serde_json::Value::String(s.into_owned()), None)
            }
        }

        Value::Null => ("NULL".into(), serde_json::Value::Null, None),

        Value::ObjectIdentifier(oid) => {
            let formatted = hints::lookup(oid);
            (
                "OID".into(),
                serde_json::Value::String(format_oid(oid)),
                formatted.map(|name| format!("{} ({})", oid, name)),
            )
        }

        Value::IpAddress(bytes) => {
            let s = format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3]);
            ("IpAddress".into(), serde_json::Value::String(s), None)
        }

        Value::Counter32(v) => ("Counter32".into(), (*v).into(), None),

        Value::Gauge32(v) => ("Gauge32".into(), (*v).into(), None),

        Value::TimeTicks(v) => (
            "TimeTicks".into(),
            (*v).into(),
            Some(format!("({}) {}", v, format_timeticks(*v))),
        ),

        Value::Opaque(bytes) => (
            "Opaque".into(),
            serde_json::Value::String(hex_string(bytes)),
            Some(format_hex_string(bytes)),
        ),

        Value::Counter64(v) => ("Counter64".into(), (*v).into(), None),

        Value::NoSuchObject => (
            "NoSuchObject".into(),
            serde_json::Value::Null,
            Some("No Such Object available".into()),
        ),

        Value::NoSuchInstance => (
            "NoSuchInstance".into(),
            serde_json::Value::Null,
            Some("No Such Instance currently exists".into()),
        ),

        Value::EndOfMibView => (
            "EndOfMibView".into(),
            serde_json::Value::Null,
            Some("No more variables left in this MIB View".into()),
        ),

        Value::Unknown { tag, data } => (
            format!("Unknown(0x{:02X})", tag),
            serde_json::Value::String(hex_string(data)),
            Some(format_hex_string(data)),
        ),
    }
}

/// Check if bytes are printable ASCII/UTF-8.
fn is_printable(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(s) => s
            .chars()
            .all(|c| c.is_ascii_graphic() || c.is_ascii_whitespace()),
        Err(_) => false,
    }
}

fn hex_string(bytes: &[u8]) -> String {
    crate::util::encode_hex(bytes)
}

/// Format bytes as spaced hex for display.
fn format_hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format TimeTicks as human-readable duration.
fn format_timeticks(centiseconds: u32) -> String {
    let total_seconds = centiseconds / 100;
    let cs = centiseconds % 100;

    let days = total_seconds / 86400;
    let hours = (total_seconds % 86400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if days > 0 {
        format!(
            "{}d {:02}:{:02}:{:02}.{:02}",
            days, hours, minutes, seconds, cs
        )
    } else {
        format!("{:02}:{:02}:{:02}.{:02}", hours, minutes, seconds, cs)
    }
}

/// Write an error message to stderr.
pub fn write_error(err: &crate::Error) {
    eprintln!("Error: {}", err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CommunityMessage;
    use crate::pdu::Pdu;
    use crate::trapd::oids;
    use crate::oid;
    use bytes::Bytes;

    fn link_down() -> Trap {
        let msg = CommunityMessage::v2c(
            Bytes::from_static(b"public"),
            Pdu::trap_v2(
                360000,
                oids::link_down(),
                vec![
                    VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 3), Value::Integer(3)),
                    VarBind::new(
                        oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 3),
                        Value::OctetString(Bytes::from_static(b"eth2")),
                    ),
                ],
            ),
        );
        Trap::from_message(msg, "192.0.2.9".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_record_uses_hint_without_label() {
        let ctx = OutputContext::new(OutputFormat::Json);
        let record = ctx.build_record(&link_down(), None);

        assert_eq!(record.source, "192.0.2.9");
        assert_eq!(record.trap_oid.as_deref(), Some("1.3.6.1.6.3.1.1.5.3"));
        assert_eq!(record.label.as_deref(), Some("linkDown"));
        assert_eq!(record.uptime, Some(360000));
        assert_eq!(record.varbinds.len(), 4);
        assert_eq!(record.varbinds[2].hint.as_deref(), Some("ifIndex.3"));
    }

    #[test]
    fn test_record_prefers_explicit_label() {
        let ctx = OutputContext::new(OutputFormat::Human);
        let record = ctx.build_record(&link_down(), Some("uplink"));
        assert_eq!(record.label.as_deref(), Some("uplink"));
    }

    #[test]
    fn test_human_output() {
        let ctx = OutputContext::new(OutputFormat::Human);
        let record = ctx.build_record(&link_down(), None);
        let mut out = Vec::new();
        ctx.write_human(&mut out, &record).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("TrapV2 from 192.0.2.9 (SNMPv2c): 1.3.6.1.6.3.1.1.5.3 (linkDown)\n"));
        assert!(text.contains("  uptime: (360000) 01:00:00.00\n"));
        assert!(text.contains("ifDescr.3) = STRING: \"eth2\"\n"));
    }

    #[test]
    fn test_json_output_is_one_line() {
        let ctx = OutputContext::new(OutputFormat::Json);
        let record = ctx.build_record(&link_down(), None);
        let mut out = Vec::new();
        ctx.write_json(&mut out, &record).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["label"], "linkDown");
        assert_eq!(parsed["varbinds"][2]["value"], 3);
    }

    #[test]
    fn test_format_timeticks() {
        assert_eq!(format_timeticks(12345678), "1d 10:17:36.78");
        assert_eq!(format_timeticks(0), "00:00:00.00");
    }

    #[test]
    fn test_is_printable() {
        assert!(is_printable(b"Hello World"));
        assert!(is_printable(b""));
        assert!(!is_printable(&[0x00, 0x01, 0x02]));
    }

    #[test]
    fn test_format_hex_string() {
        assert_eq!(format_hex_string(&[0x00, 0x1A, 0x2B]), "00 1A 2B");
    }
}
