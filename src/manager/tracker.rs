//! Request-id allocation and the pending-request table.
//!
//! Ids are drawn uniformly from `[0, 2^31)`, the non-negative range of an
//! SNMP INTEGER, and redrawn until they collide with no pending request.
//! Uniqueness holds only among requests that are pending at the same time;
//! an id can come back once its request has been removed.

use crate::error::{Error, Result};
use crate::pdu::Pdu;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Tracker shared by every manager in the process.
pub type SharedTracker = Arc<Mutex<RequestTracker>>;

/// Source of raw 32-bit random values.
pub type IdSource = Box<dyn FnMut() -> std::io::Result<u32> + Send>;

const ID_MASK: u32 = 0x7FFF_FFFF;

/// A request awaiting its response.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Where the request was sent.
    pub target: SocketAddr,
    /// The request PDU; its `request_id` mirrors the assigned id.
    pub pdu: Pdu,
    request_id: Option<i32>,
}

impl PendingRequest {
    /// Create an untracked request.
    pub fn new(target: SocketAddr, pdu: Pdu) -> Self {
        Self {
            target,
            pdu,
            request_id: None,
        }
    }

    /// Id assigned by the tracker, `None` until tracked.
    pub fn request_id(&self) -> Option<i32> {
        self.request_id
    }

    fn assign(&mut self, id: i32) {
        self.request_id = Some(id);
        self.pdu.request_id = id;
    }
}

/// Maps request ids to in-flight requests.
pub struct RequestTracker {
    pending: HashMap<i32, PendingRequest>,
    ids: IdSource,
}

impl RequestTracker {
    /// Tracker drawing ids from the OS random source.
    pub fn new() -> Self {
        Self::with_id_source(Box::new(os_random_u32))
    }

    /// Tracker drawing ids from `ids`. Values are masked to 31 bits.
    pub fn with_id_source(ids: IdSource) -> Self {
        Self {
            pending: HashMap::new(),
            ids,
        }
    }

    /// Wrap a new tracker for sharing.
    pub fn shared() -> SharedTracker {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Assign a fresh id to `request` and record it.
    ///
    /// If the request already carries an id, whatever is pending under that
    /// id is evicted once the new id has been drawn. A failed draw leaves the
    /// table untouched.
    pub fn track(&mut self, mut request: PendingRequest) -> Result<i32> {
        let id = self.fresh_id()?;
        if let Some(old) = request.request_id.take() {
            self.pending.remove(&old);
        }
        request.assign(id);
        self.pending.insert(id, request);
        tracing::trace!(snmp.request_id = id, "request tracked");
        Ok(id)
    }

    /// Move the request pending under `old_id` to a fresh id.
    ///
    /// The old id is released before the new one is drawn. Returns `None` if
    /// nothing is pending under `old_id`.
    pub fn retrack(&mut self, old_id: i32) -> Result<Option<i32>> {
        let Some(mut request) = self.pending.remove(&old_id) else {
            return Ok(None);
        };
        let id = match self.fresh_id() {
            Ok(id) => id,
            Err(err) => {
                // Put it back so a failed draw loses nothing
                self.pending.insert(old_id, request);
                return Err(err);
            }
        };
        request.assign(id);
        self.pending.insert(id, request);
        tracing::trace!(
            snmp.request_id = id,
            snmp.previous_request_id = old_id,
            "request retracked"
        );
        Ok(Some(id))
    }

    /// Look up a pending request.
    pub fn get(&self, id: i32) -> Option<&PendingRequest> {
        self.pending.get(&id)
    }

    /// Remove a pending request (response received, timed out or abandoned).
    pub fn remove(&mut self, id: i32) -> Option<PendingRequest> {
        self.pending.remove(&id)
    }

    /// Check whether `id` is pending.
    pub fn contains(&self, id: i32) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Ids of all pending requests, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.pending.keys().copied()
    }

    fn fresh_id(&mut self) -> Result<i32> {
        loop {
            let raw = (self.ids)().map_err(|source| Error::Io {
                target: None,
                source,
            })?;
            let id = (raw & ID_MASK) as i32;
            if !self.pending.contains_key(&id) {
                return Ok(id);
            }
        }
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracker")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

fn os_random_u32() -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    getrandom::fill(&mut buf).map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(u32::from_ne_bytes(buf))
}
