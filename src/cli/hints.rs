//! Well-known OID name hints.
//!
//! A small hardcoded table of common notification and system OID names for
//! display purposes. This is NOT MIB support.

use crate::Oid;

/// Well-known OID entries.
static WELL_KNOWN_OIDS: &[(&[u32], &str)] = &[
    // SNMPv2-MIB::snmpTraps
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 1], "coldStart"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 2], "warmStart"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 3], "linkDown"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 4], "linkUp"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 5], "authenticationFailure"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 5, 6], "egpNeighborLoss"),
    // Notification header varbinds
    (&[1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0], "snmpTrapOID.0"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 4, 3, 0], "snmpTrapEnterprise.0"),
    // SNMPv2-MIB::system
    (&[1, 3, 6, 1, 2, 1, 1, 1, 0], "sysDescr.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 2, 0], "sysObjectID.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 3, 0], "sysUpTime.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 5, 0], "sysName.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 6, 0], "sysLocation.0"),
];

/// IF-MIB::ifEntry columns commonly carried by linkUp/linkDown.
static IF_ENTRY_COLUMNS: &[(u32, &str)] = &[
    (1, "ifIndex"),
    (2, "ifDescr"),
    (7, "ifAdminStatus"),
    (8, "ifOperStatus"),
];

const IF_ENTRY: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1];

/// Look up a friendly name for an OID.
///
/// `ifEntry` columns are named together with their instance
/// (`ifOperStatus.3`). Returns `None` for anything else not in the table.
pub fn lookup(oid: &Oid) -> Option<String> {
    let arcs = oid.arcs();
    if let Some((_, name)) = WELL_KNOWN_OIDS.iter().find(|(pattern, _)| *pattern == arcs) {
        return Some((*name).to_string());
    }

    let rest = arcs.strip_prefix(IF_ENTRY)?;
    let (column, instance) = rest.split_first()?;
    let (_, name) = IF_ENTRY_COLUMNS.iter().find(|(c, _)| c == column)?;
    if instance.is_empty() {
        return Some((*name).to_string());
    }
    let suffix: Vec<String> = instance.iter().map(|a| a.to_string()).collect();
    Some(format!("{}.{}", name, suffix.join(".")))
}

/// Parse an OID from string, supporting both dotted notation and well-known names.
///
/// Accepts:
/// - Dotted notation: "1.3.6.1.6.3.1.1.5.3"
/// - Well-known names: "linkDown", "sysUpTime.0"
pub fn parse_oid(s: &str) -> Result<Oid, String> {
    if s.chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '.')
        .unwrap_or(false)
    {
        return Oid::parse(s).map_err(|e| format!("invalid OID '{}': {}", s, e));
    }

    let lower = s.to_ascii_lowercase();
    for (arcs, name) in WELL_KNOWN_OIDS {
        if name.to_ascii_lowercase() == lower {
            return Ok(Oid::from_slice(arcs));
        }
    }

    Err(format!(
        "unknown OID name '{}'; use dotted notation (e.g., 1.3.6.1.6.3.1.1.5.3)",
        s
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_lookup_found() {
        assert_eq!(
            lookup(&oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3)).as_deref(),
            Some("linkDown")
        );
    }

    #[test]
    fn test_lookup_if_entry_instance() {
        assert_eq!(
            lookup(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8, 3)).as_deref(),
            Some("ifOperStatus.3")
        );
        assert_eq!(lookup(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 99, 3)), None);
    }

    #[test]
    fn test_lookup_not_found() {
        assert_eq!(lookup(&oid!(1, 3, 6, 1, 99, 99, 99)), None);
    }

    #[test]
    fn test_parse_dotted() {
        let oid = parse_oid(".1.3.6.1.6.3.1.1.5.1").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 6, 3, 1, 1, 5, 1]);
    }

    #[test]
    fn test_parse_well_known_case_insensitive() {
        let oid = parse_oid("LINKUP").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 6, 3, 1, 1, 5, 4]);
    }

    #[test]
    fn test_parse_unknown_name() {
        assert!(parse_oid("unknownTrap").is_err());
    }
}
