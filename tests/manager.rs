//! Manager send path over the shared outbound socket.

mod common;

use async_snmp_manager::message::CommunityMessage;
use async_snmp_manager::pdu::{Pdu, PduType};
use async_snmp_manager::transport::SocketState;
use async_snmp_manager::{Manager, ManagerConfig, ManagerContext, Value, VarBind, Version};
use common::*;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::UdpSocket;

async fn agent() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

fn manager(context: &ManagerContext, port: u16) -> Manager {
    Manager::new(
        ManagerConfig::new()
            .host("127.0.0.1")
            .port(port)
            .community_ro("ro-secret")
            .community_rw("rw-secret"),
        context.clone(),
    )
}

#[tokio::test]
async fn managers_share_one_socket_and_unique_ids() {
    let (agent, port) = agent().await;
    let context = ManagerContext::new();
    let first = manager(&context, port);
    let second = manager(&context, port);

    let id_a = first
        .send_request(Pdu::get_request(&[sys_name()]))
        .await
        .unwrap();
    let id_b = second
        .send_request(Pdu::get_request(&[sys_name()]))
        .await
        .unwrap();
    assert_ne!(id_a, id_b);
    assert!(id_a >= 0 && id_b >= 0);

    let (a, from_a) = recv_within(&agent, EVENT_TIMEOUT).await.expect("first");
    let (b, from_b) = recv_within(&agent, EVENT_TIMEOUT).await.expect("second");
    assert_eq!(from_a, from_b);

    let ids: HashSet<i32> = [a, b]
        .into_iter()
        .map(|data| CommunityMessage::decode(data).unwrap().standard_pdu().unwrap().request_id)
        .collect();
    assert_eq!(ids, HashSet::from([id_a, id_b]));

    let tracker = context.tracker().lock().unwrap();
    assert_eq!(tracker.len(), 2);
    assert_eq!(tracker.get(id_a).unwrap().pdu.request_id, id_a);
}

#[tokio::test]
async fn set_uses_write_community() {
    let (agent, port) = agent().await;
    let context = ManagerContext::new();
    let manager = manager(&context, port);

    manager
        .send_request(Pdu::set_request(vec![VarBind::new(
            sys_name(),
            Value::from("renamed"),
        )]))
        .await
        .unwrap();
    manager
        .send_request(Pdu::get_next_request(&[sys_name()]))
        .await
        .unwrap();

    let (set, _) = recv_within(&agent, EVENT_TIMEOUT).await.expect("set");
    let set = CommunityMessage::decode(set).unwrap();
    assert_eq!(set.version, Version::V2c);
    assert_eq!(set.pdu.pdu_type(), PduType::SetRequest);
    assert_eq!(&set.community[..], b"rw-secret");

    let (get, _) = recv_within(&agent, EVENT_TIMEOUT).await.expect("getnext");
    let get = CommunityMessage::decode(get).unwrap();
    assert_eq!(&get.community[..], b"ro-secret");
}

#[tokio::test]
async fn errored_socket_is_replaced_on_next_send() {
    let (agent, port) = agent().await;
    let context = ManagerContext::new();
    let manager = manager(&context, port);

    manager
        .send_request(Pdu::get_request(&[sys_name()]))
        .await
        .unwrap();
    let (_, before) = recv_within(&agent, EVENT_TIMEOUT).await.expect("before");

    let stale = context.socket().acquire().await.unwrap();
    context.socket().mark_errored(&stale).await;
    assert_eq!(context.socket().state().await, SocketState::Errored);

    manager
        .send_request(Pdu::get_request(&[sys_name()]))
        .await
        .unwrap();
    let (_, after) = recv_within(&agent, EVENT_TIMEOUT).await.expect("after");

    assert_eq!(context.socket().state().await, SocketState::Open);
    assert_ne!(before.port(), after.port());
    assert!(!Arc::ptr_eq(&stale, &context.socket().acquire().await.unwrap()));
}
