//! Well-known notification OIDs (RFC 3418, RFC 3416).

use crate::oid;
use crate::oid::Oid;

/// sysUpTime.0, the first varbind of every v2 notification.
pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}

/// snmpTrapOID.0, the second varbind; its value names the notification.
pub fn snmp_trap_oid() -> Oid {
    oid!(1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0)
}

/// snmpTrapEnterprise.0
pub fn snmp_trap_enterprise() -> Oid {
    oid!(1, 3, 6, 1, 6, 3, 1, 1, 4, 3, 0)
}

/// snmpTraps, parent of the standard trap OIDs.
pub fn snmp_traps() -> Oid {
    oid!(1, 3, 6, 1, 6, 3, 1, 1, 5)
}

pub fn cold_start() -> Oid {
    snmp_traps().child(1)
}

pub fn warm_start() -> Oid {
    snmp_traps().child(2)
}

pub fn link_down() -> Oid {
    snmp_traps().child(3)
}

pub fn link_up() -> Oid {
    snmp_traps().child(4)
}

pub fn authentication_failure() -> Oid {
    snmp_traps().child(5)
}

pub fn egp_neighbor_loss() -> Oid {
    snmp_traps().child(6)
}
