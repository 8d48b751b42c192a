//! Per-datagram processing for the trap listener.

use super::community_allowed;
use super::dispatch::TrapDispatcher;
use super::trap::Trap;
use crate::codec::{BerCodec, Codec, MibContext};
use crate::error::{Error, Result};
use crate::manager::ManagerConfig;
use crate::transport::AgentTransport;
use crate::util::HexBytes;
use bytes::Bytes;
use std::backtrace::Backtrace;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Largest datagram the listener reads.
const RECV_BUFFER_SIZE: usize = 65_535;

const RECV_BACKOFF_MIN: Duration = Duration::from_millis(1);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// What happened to one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramOutcome {
    /// A handler (possibly the no-op) ran to completion.
    Dispatched,
    /// The community was not accepted; the datagram was dropped.
    Unauthorized,
    /// Decoding, the inform ack or the handler failed. Already logged.
    Failed,
}

/// Receives notifications on an [`AgentTransport`] and dispatches them.
pub struct TrapListener<T: AgentTransport> {
    transport: T,
    dispatcher: Arc<TrapDispatcher>,
    codec: Arc<dyn Codec>,
    mib: MibContext,
    accepted: Option<Vec<Bytes>>,
}

impl<T: AgentTransport> TrapListener<T> {
    /// Listener on `transport` using the communities and MIB context of `config`.
    pub fn new(transport: T, dispatcher: TrapDispatcher, config: &ManagerConfig) -> Self {
        Self {
            transport,
            dispatcher: Arc::new(dispatcher),
            codec: Arc::new(BerCodec),
            mib: config.mib.clone(),
            accepted: config.accepted_communities.clone(),
        }
    }

    /// Replace the codec.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Local address of the listening socket.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &TrapDispatcher {
        &self.dispatcher
    }

    /// Receive and process datagrams until the task is dropped.
    ///
    /// Datagrams are handled one at a time in arrival order. Receive errors
    /// are logged and the loop carries on after a delay that doubles with
    /// each consecutive failure.
    pub async fn run(&self) {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut failures = 0u32;
        tracing::info!(snmp.local_addr = %self.local_addr(), "trap listener running");

        loop {
            let (len, source) = match self.transport.recv_from(&mut buf).await {
                Ok(received) => {
                    failures = 0;
                    received
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = recv_backoff(failures);
                    tracing::warn!(error = %e, failures, ?delay, "receive failed");
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let data = Bytes::copy_from_slice(&buf[..len]);
            self.handle_datagram(data, source).await;
        }
    }

    /// Process one datagram from `source`.
    ///
    /// Never fails: every error is logged with the raw bytes and a backtrace
    /// and reported as [`DatagramOutcome::Failed`].
    pub async fn handle_datagram(&self, data: Bytes, source: SocketAddr) -> DatagramOutcome {
        tracing::trace!(snmp.source = %source, snmp.bytes = data.len(), "datagram received");

        match self.process(data.clone(), source).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    snmp.source = %source,
                    snmp.data = %HexBytes(&data),
                    error = %e,
                    backtrace = %Backtrace::capture(),
                    "failed to process datagram"
                );
                DatagramOutcome::Failed
            }
        }
    }

    async fn process(&self, data: Bytes, source: SocketAddr) -> Result<DatagramOutcome> {
        let message = self.codec.decode(data, &self.mib)?;

        if !community_allowed(self.accepted.as_deref(), &message.community) {
            tracing::trace!(
                snmp.source = %source,
                snmp.community = %String::from_utf8_lossy(&message.community),
                "community not accepted, dropping"
            );
            return Ok(DatagramOutcome::Unauthorized);
        }

        // Informs are acknowledged before the handler sees them
        if message.is_inform()
            && let Some(response) = message.response()
        {
            let encoded = self.codec.encode(&response);
            self.transport.send_to(&encoded, source).await?;
            tracing::debug!(
                snmp.source = %source,
                snmp.request_id = response.standard_pdu().map(|p| p.request_id),
                "inform acknowledged"
            );
        }

        let trap = Trap::from_message(message, source.ip())?;
        let handler = self.dispatcher.select_handler(&trap);

        match std::panic::catch_unwind(AssertUnwindSafe(|| handler(trap))) {
            Ok(Ok(())) => Ok(DatagramOutcome::Dispatched),
            Ok(Err(e)) => Err(Error::handler(e)),
            Err(payload) => Err(Error::handler(panic_message(payload.as_ref()))),
        }
    }
}

impl<T: AgentTransport + std::fmt::Debug> std::fmt::Debug for TrapListener<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrapListener")
            .field("transport", &self.transport)
            .field("dispatcher", &self.dispatcher)
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

/// Delay before receiving again after `failures` consecutive errors.
fn recv_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(10);
    (RECV_BACKOFF_MIN * (1 << shift)).min(RECV_BACKOFF_MAX)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CommunityMessage;
    use crate::pdu::{GenericTrap, Pdu, PduType, TrapV1Pdu};
    use crate::transport::MockAgentTransport;
    use crate::trapd::oids;
    use std::sync::Mutex;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn listener(
        dispatcher: TrapDispatcher,
        config: &ManagerConfig,
    ) -> TrapListener<MockAgentTransport> {
        TrapListener::new(
            MockAgentTransport::new(addr("127.0.0.1:162")),
            dispatcher,
            config,
        )
    }

    fn recording() -> (TrapDispatcher, Arc<Mutex<Vec<Trap>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = TrapDispatcher::new();
        let sink = seen.clone();
        dispatcher.on_trap_default(move |trap| {
            sink.lock().unwrap().push(trap);
            Ok(())
        });
        (dispatcher, seen)
    }

    fn inform(community: &'static [u8]) -> Bytes {
        CommunityMessage::v2c(
            Bytes::from_static(community),
            Pdu::inform_request(77, 500, oids::link_down(), vec![]),
        )
        .encode()
    }

    #[tokio::test]
    async fn test_trap_dispatched_with_source_ip() {
        let (dispatcher, seen) = recording();
        let listener = listener(dispatcher, &ManagerConfig::new());
        let msg = CommunityMessage::v2c(
            Bytes::from_static(b"public"),
            Pdu::trap_v2(1, oids::cold_start(), vec![]),
        );

        let outcome = listener
            .handle_datagram(msg.encode(), addr("198.51.100.4:5000"))
            .await;

        assert_eq!(outcome, DatagramOutcome::Dispatched);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].source_ip(), addr("198.51.100.4:5000").ip());
        // Plain traps are never acknowledged
        assert!(listener.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn test_inform_acked_before_dispatch() {
        let transport = MockAgentTransport::new(addr("127.0.0.1:162"));
        let probe = transport.clone();
        let acked_first = Arc::new(Mutex::new(None));
        let flag = acked_first.clone();

        let mut dispatcher = TrapDispatcher::new();
        dispatcher.on_trap_v2c(move |_| {
            *flag.lock().unwrap() = Some(probe.sent().len());
            Ok(())
        });
        let listener = TrapListener::new(
            transport,
            dispatcher,
            &ManagerConfig::new().accept_communities(["public"]),
        );

        let source = addr("198.51.100.4:5000");
        let outcome = listener.handle_datagram(inform(b"public"), source).await;
        assert_eq!(outcome, DatagramOutcome::Dispatched);
        assert_eq!(*acked_first.lock().unwrap(), Some(1));

        let sent = listener.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, source);
        let ack = CommunityMessage::decode(sent[0].data.clone()).unwrap();
        let pdu = ack.standard_pdu().unwrap();
        assert_eq!(pdu.pdu_type, PduType::Response);
        assert_eq!(pdu.request_id, 77);
        assert_eq!(pdu.error_status, 0);
        assert_eq!(&ack.community[..], b"public");
    }

    #[tokio::test]
    async fn test_wrong_community_dropped_silently() {
        let (dispatcher, seen) = recording();
        let listener = listener(dispatcher, &ManagerConfig::new().accept_communities(["public"]));

        let outcome = listener
            .handle_datagram(inform(b"private"), addr("198.51.100.4:5000"))
            .await;

        assert_eq!(outcome, DatagramOutcome::Unauthorized);
        assert!(seen.lock().unwrap().is_empty());
        assert!(listener.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn test_unset_accepted_set_allows_any_community() {
        let (dispatcher, seen) = recording();
        let listener = listener(dispatcher, &ManagerConfig::new());

        let outcome = listener
            .handle_datagram(inform(b"anything"), addr("198.51.100.4:5000"))
            .await;
        assert_eq!(outcome, DatagramOutcome::Dispatched);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_garbage_fails_then_recovers() {
        let (dispatcher, seen) = recording();
        let listener = listener(dispatcher, &ManagerConfig::new());
        let source = addr("198.51.100.4:5000");

        let outcome = listener
            .handle_datagram(Bytes::from_static(b"\xde\xad\xbe\xef"), source)
            .await;
        assert_eq!(outcome, DatagramOutcome::Failed);
        assert!(seen.lock().unwrap().is_empty());

        let outcome = listener.handle_datagram(inform(b"public"), source).await;
        assert_eq!(outcome, DatagramOutcome::Dispatched);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_are_contained() {
        let mut dispatcher = TrapDispatcher::new();
        dispatcher.on_trap("1.3.6.1.6.3.1.1.5.3", |_| Err("rejected".into())).unwrap();
        dispatcher.on_trap("1.3.6.1.6.3.1.1.5.4", |_| panic!("handler bug")).unwrap();
        let listener = listener(dispatcher, &ManagerConfig::new());
        let source = addr("198.51.100.4:5000");

        for trap_oid in [oids::link_down(), oids::link_up()] {
            let msg = CommunityMessage::v2c(
                Bytes::from_static(b"public"),
                Pdu::trap_v2(0, trap_oid, vec![]),
            );
            assert_eq!(
                listener.handle_datagram(msg.encode(), source).await,
                DatagramOutcome::Failed
            );
        }
    }

    #[tokio::test]
    async fn test_failed_ack_skips_handler() {
        let (dispatcher, seen) = recording();
        let listener = listener(dispatcher, &ManagerConfig::new());
        listener.transport().fail_sends(true);

        let outcome = listener
            .handle_datagram(inform(b"public"), addr("198.51.100.4:5000"))
            .await;
        assert_eq!(outcome, DatagramOutcome::Failed);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_processes_queue_in_order() {
        let (dispatcher, seen) = recording();
        let listener = Arc::new(listener(dispatcher, &ManagerConfig::new()));
        let source = addr("198.51.100.4:5000");

        for trap_oid in [oids::cold_start(), oids::warm_start()] {
            let msg = CommunityMessage::v2c(
                Bytes::from_static(b"public"),
                Pdu::trap_v2(0, trap_oid, vec![]),
            );
            listener.transport().queue_datagram(msg.encode(), source);
        }
        listener.transport().queue_io_error("transient");
        listener.transport().queue_datagram(inform(b"public"), source);

        let runner = listener.clone();
        let task = tokio::spawn(async move { runner.run().await });
        while listener.transport().pending() > 0 || seen.lock().unwrap().len() < 3 {
            tokio::task::yield_now().await;
        }
        task.abort();

        let received: Vec<_> = seen.lock().unwrap().iter().filter_map(Trap::trap_oid).collect();
        assert_eq!(
            received,
            vec![oids::cold_start(), oids::warm_start(), oids::link_down()]
        );
    }

    #[test]
    fn test_recv_backoff_doubles_up_to_cap() {
        assert_eq!(recv_backoff(1), Duration::from_millis(1));
        assert_eq!(recv_backoff(2), Duration::from_millis(2));
        assert_eq!(recv_backoff(5), Duration::from_millis(16));
        assert_eq!(recv_backoff(11), Duration::from_secs(1));
        assert_eq!(recv_backoff(u32::MAX), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_survives_repeated_receive_errors() {
        let (dispatcher, seen) = recording();
        let listener = Arc::new(listener(dispatcher, &ManagerConfig::new()));
        for _ in 0..5 {
            listener.transport().queue_io_error("socket gone");
        }
        listener
            .transport()
            .queue_datagram(inform(b"public"), addr("198.51.100.4:5000"));

        let runner = listener.clone();
        let task = tokio::spawn(async move { runner.run().await });
        tokio::time::timeout(Duration::from_secs(2), async {
            while seen.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        task.abort();

        assert_eq!(listener.transport().pending(), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_v1_trap_with_unknown_generic_code_is_dispatched() {
        let (dispatcher, seen) = recording();
        let listener = listener(dispatcher, &ManagerConfig::new());

        for generic in [i32::MAX, -5] {
            let mut pdu = TrapV1Pdu::new(
                oids::snmp_traps(),
                [10, 0, 0, 1],
                GenericTrap::ColdStart,
                0,
                0,
                vec![],
            );
            pdu.generic_trap = generic;
            let msg = CommunityMessage::v1(Bytes::from_static(b"public"), pdu);

            let outcome = listener
                .handle_datagram(msg.encode(), addr("198.51.100.4:5000"))
                .await;
            assert_eq!(outcome, DatagramOutcome::Dispatched);
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|trap| trap.trap_oid().is_none()));
    }
}
