//! Common test fixtures and helpers.

use async_snmp_manager::message::CommunityMessage;
use async_snmp_manager::pdu::{GenericTrap, Pdu, TrapV1Pdu};
use async_snmp_manager::trapd::{Trap, TrapListener, Trapd, oids};
use async_snmp_manager::transport::UdpListenerSocket;
use async_snmp_manager::{ManagerConfig, Oid, Value, VarBind, oid};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// How long to wait for something that should happen.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait before concluding something did not happen.
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

pub const COMMUNITY: &[u8] = b"public";
pub const OTHER_COMMUNITY: &[u8] = b"private";

// =============================================================================
// OIDs
// =============================================================================

pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}

pub fn if_index(instance: u32) -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1).child(instance)
}

pub fn enterprise() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 99999)
}

// =============================================================================
// Encoded notifications
// =============================================================================

pub fn v2c_trap(community: &'static [u8], trap_oid: Oid) -> Bytes {
    CommunityMessage::v2c(
        Bytes::from_static(community),
        Pdu::trap_v2(
            4200,
            trap_oid,
            vec![VarBind::new(if_index(2), Value::Integer(2))],
        ),
    )
    .encode()
}

pub fn v2c_inform(community: &'static [u8], request_id: i32, trap_oid: Oid) -> Bytes {
    CommunityMessage::v2c(
        Bytes::from_static(community),
        Pdu::inform_request(
            request_id,
            4200,
            trap_oid,
            vec![VarBind::new(sys_name(), Value::from("core-1"))],
        ),
    )
    .encode()
}

pub fn v1_trap(community: &'static [u8], generic: GenericTrap) -> Bytes {
    CommunityMessage::v1(
        Bytes::from_static(community),
        TrapV1Pdu::new(enterprise(), [192, 0, 2, 10], generic, 0, 4200, vec![]),
    )
    .encode()
}

// =============================================================================
// Listener harness
// =============================================================================

/// A listener on an ephemeral loopback port, run in the background.
pub struct RunningListener {
    pub addr: SocketAddr,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for RunningListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Loopback config on an ephemeral port.
pub fn loopback_config() -> ManagerConfig {
    ManagerConfig::new().host("127.0.0.1").port(0)
}

/// Bind `trapd` and run it in the background.
pub async fn spawn_listener(trapd: Trapd) -> RunningListener {
    let listener: TrapListener<UdpListenerSocket> = trapd.start().await.unwrap();
    let addr = listener.local_addr();
    let task = tokio::spawn(async move { listener.run().await });
    RunningListener { addr, task }
}

/// Handler that forwards every trap into a channel.
pub fn forwarding_handler(
    tx: mpsc::UnboundedSender<(&'static str, Trap)>,
    label: &'static str,
) -> impl Fn(Trap) -> async_snmp_manager::HandlerResult + Send + Sync + 'static {
    move |trap| {
        tx.send((label, trap))?;
        Ok(())
    }
}

/// A plain client socket on loopback.
pub async fn client_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

/// Receive one datagram or `None` after `wait`.
pub async fn recv_within(socket: &UdpSocket, wait: Duration) -> Option<(Bytes, SocketAddr)> {
    let mut buf = vec![0u8; 65_535];
    match tokio::time::timeout(wait, socket.recv_from(&mut buf)).await {
        Ok(Ok((len, from))) => Some((Bytes::copy_from_slice(&buf[..len]), from)),
        _ => None,
    }
}

/// Next dispatched trap, or `None` after `wait`.
pub async fn next_dispatch(
    rx: &mut mpsc::UnboundedReceiver<(&'static str, Trap)>,
    wait: Duration,
) -> Option<(&'static str, Trap)> {
    tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
}

/// Standard trap OID helpers re-exported for brevity.
pub fn link_down() -> Oid {
    oids::link_down()
}

pub fn link_up() -> Oid {
    oids::link_up()
}
