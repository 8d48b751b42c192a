//! Mock listener transport for testing.
//!
//! Queued datagrams are handed out by `recv_from` in order; everything passed
//! to `send_to` is recorded for later inspection.

use super::AgentTransport;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A datagram sent through the mock transport.
#[derive(Clone, Debug, PartialEq)]
pub struct SentDatagram {
    /// The raw bytes
    pub data: Bytes,
    /// Destination address
    pub target: SocketAddr,
}

enum Incoming {
    Datagram(Bytes, SocketAddr),
    IoError(String),
}

struct MockInner {
    incoming: VecDeque<Incoming>,
    sent: Vec<SentDatagram>,
    fail_sends: bool,
}

/// Mock [`AgentTransport`] for driving a listener without a network.
///
/// `recv_from` waits while the queue is empty, like a quiet socket.
#[derive(Clone)]
pub struct MockAgentTransport {
    local_addr: SocketAddr,
    inner: Arc<Mutex<MockInner>>,
    arrived: Arc<Notify>,
}

impl MockAgentTransport {
    /// Create a new mock bound to `local_addr`.
    pub fn new(local_addr: SocketAddr) -> Self {
        Self {
            local_addr,
            inner: Arc::new(Mutex::new(MockInner {
                incoming: VecDeque::new(),
                sent: Vec::new(),
                fail_sends: false,
            })),
            arrived: Arc::new(Notify::new()),
        }
    }

    /// Queue a datagram to be received from `source`.
    pub fn queue_datagram(&self, data: impl Into<Bytes>, source: SocketAddr) {
        self.push(Incoming::Datagram(data.into(), source));
    }

    /// Queue a receive error.
    pub fn queue_io_error(&self, msg: impl Into<String>) {
        self.push(Incoming::IoError(msg.into()));
    }

    /// Make every subsequent `send_to` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.inner.lock().unwrap().fail_sends = fail;
    }

    /// All datagrams sent so far.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Number of queued datagrams not yet received.
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().incoming.len()
    }

    fn push(&self, item: Incoming) {
        self.inner.lock().unwrap().incoming.push_back(item);
        self.arrived.notify_one();
    }
}

impl AgentTransport for MockAgentTransport {
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        loop {
            let next = self.inner.lock().unwrap().incoming.pop_front();
            match next {
                Some(Incoming::Datagram(data, source)) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    return Ok((len, source));
                }
                Some(Incoming::IoError(msg)) => {
                    return Err(Error::Io {
                        target: None,
                        source: std::io::Error::other(msg),
                    });
                }
                None => self.arrived.notified().await,
            }
        }
    }

    async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_sends {
            return Err(Error::Io {
                target: Some(target),
                source: std::io::Error::other("mock send failure"),
            });
        }
        inner.sent.push(SentDatagram {
            data: Bytes::copy_from_slice(data),
            target,
        });
        Ok(())
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
