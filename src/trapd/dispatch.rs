//! Handler registration and selection.
//!
//! Exactly one handler is chosen per notification:
//!
//! | Notification | Candidates, first match wins |
//! |--------------|------------------------------|
//! | v2c Trap / Inform | handler for its `snmpTrapOID.0`, v2c handler, default handler |
//! | v1 Trap | v1 handler, default handler |
//! | anything else | none |
//!
//! When no candidate is registered the no-op handler is selected.

use super::trap::Trap;
use crate::error::{BoxError, Error, Result};
use crate::oid::Oid;
use std::sync::Arc;

/// Result returned by a trap handler.
pub type HandlerResult = std::result::Result<(), BoxError>;

/// A registered trap handler.
pub type TrapHandler = Arc<dyn Fn(Trap) -> HandlerResult + Send + Sync>;

/// Where a handler is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// v2c notifications with this `snmpTrapOID.0`.
    Oid(Oid),
    /// Fallback for v1 and v2c notifications.
    Default,
    /// v1 notifications.
    V1,
    /// v2c notifications without an OID-specific handler.
    V2c,
}

/// Values keyed by exact OID, stored sorted.
///
/// Inserting an OID that is already present replaces its value.
#[derive(Debug, Clone)]
pub struct RouteTable<V> {
    entries: Vec<(Oid, V)>,
}

impl<V> RouteTable<V> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace the value for `oid`.
    pub fn insert(&mut self, oid: Oid, value: V) {
        match self.entries.binary_search_by(|(o, _)| o.cmp(&oid)) {
            Ok(idx) => self.entries[idx].1 = value,
            Err(idx) => self.entries.insert(idx, (oid, value)),
        }
    }

    /// Remove `oid`, returning its value if present.
    pub fn remove(&mut self, oid: &Oid) -> Option<V> {
        match self.entries.binary_search_by(|(o, _)| o.cmp(oid)) {
            Ok(idx) => Some(self.entries.remove(idx).1),
            Err(_) => None,
        }
    }

    /// Exact-match lookup.
    pub fn get(&self, oid: &Oid) -> Option<&V> {
        self.entries
            .binary_search_by(|(o, _)| o.cmp(oid))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in OID order.
    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &V)> {
        self.entries.iter().map(|(o, v)| (o, v))
    }
}

impl<V> Default for RouteTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Routing table plus the default, v1 and v2c fallbacks.
pub struct TrapDispatcher {
    by_oid: RouteTable<TrapHandler>,
    default: Option<TrapHandler>,
    v1: Option<TrapHandler>,
    v2c: Option<TrapHandler>,
    noop: TrapHandler,
}

impl TrapDispatcher {
    /// Dispatcher with no handlers; everything goes to the no-op handler.
    pub fn new() -> Self {
        Self {
            by_oid: RouteTable::new(),
            default: None,
            v1: None,
            v2c: None,
            noop: Arc::new(|_| Ok(())),
        }
    }

    /// Register `handler` on `route`, replacing any previous one.
    ///
    /// Fails with [`Error::InvalidArgument`] when `handler` is `None`.
    pub fn register(&mut self, route: Route, handler: Option<TrapHandler>) -> Result<()> {
        let handler =
            handler.ok_or_else(|| Error::invalid_argument("a handler must be provided"))?;
        tracing::debug!(snmp.route = ?route, "trap handler registered");
        match route {
            Route::Oid(oid) => self.by_oid.insert(oid, handler),
            Route::Default => self.default = Some(handler),
            Route::V1 => self.v1 = Some(handler),
            Route::V2c => self.v2c = Some(handler),
        }
        Ok(())
    }

    /// Remove the handler on `route`, returning it if one was registered.
    pub fn unregister(&mut self, route: &Route) -> Option<TrapHandler> {
        let removed = match route {
            Route::Oid(oid) => self.by_oid.remove(oid),
            Route::Default => self.default.take(),
            Route::V1 => self.v1.take(),
            Route::V2c => self.v2c.take(),
        };
        if removed.is_some() {
            tracing::debug!(snmp.route = ?route, "trap handler unregistered");
        }
        removed
    }

    /// Handle v2c notifications whose `snmpTrapOID.0` is `oid`.
    ///
    /// `oid` is dotted-decimal text; anything else fails with
    /// [`Error::InvalidArgument`].
    pub fn on_trap<F>(&mut self, oid: &str, handler: F) -> Result<()>
    where
        F: Fn(Trap) -> HandlerResult + Send + Sync + 'static,
    {
        let oid = Oid::parse(oid)
            .map_err(|e| Error::invalid_argument(format!("trap OID {:?}: {}", oid, e)))?;
        self.register(Route::Oid(oid), Some(Arc::new(handler)))
    }

    /// Handle any v1 or v2c notification without a more specific handler.
    pub fn on_trap_default<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Trap) -> HandlerResult + Send + Sync + 'static,
    {
        self.set(Route::Default, Arc::new(handler))
    }

    /// Handle v1 notifications.
    pub fn on_trap_v1<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Trap) -> HandlerResult + Send + Sync + 'static,
    {
        self.set(Route::V1, Arc::new(handler))
    }

    /// Handle v2c notifications without an OID-specific handler.
    pub fn on_trap_v2c<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Trap) -> HandlerResult + Send + Sync + 'static,
    {
        self.set(Route::V2c, Arc::new(handler))
    }

    fn set(&mut self, route: Route, handler: TrapHandler) -> &mut Self {
        // Infallible: the handler is always present
        let _ = self.register(route, Some(handler));
        self
    }

    /// Pick the handler for `trap`.
    pub fn select_handler(&self, trap: &Trap) -> &TrapHandler {
        let selected = match trap {
            Trap::V2c { trap_oid, .. } => self
                .by_oid
                .get(trap_oid)
                .or(self.v2c.as_ref())
                .or(self.default.as_ref()),
            Trap::V1 { .. } => self.v1.as_ref().or(self.default.as_ref()),
            Trap::Other { .. } => None,
        };
        selected.unwrap_or(&self.noop)
    }

    /// Select the handler for `trap` and run it.
    pub fn dispatch(&self, trap: Trap) -> HandlerResult {
        let handler = self.select_handler(&trap);
        handler(trap)
    }

    /// Check whether `handler` is the built-in no-op.
    pub fn is_noop(&self, handler: &TrapHandler) -> bool {
        Arc::ptr_eq(handler, &self.noop)
    }

    /// The OID-specific routes.
    pub fn routes(&self) -> &RouteTable<TrapHandler> {
        &self.by_oid
    }
}

impl Default for TrapDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TrapDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrapDispatcher")
            .field("oid_routes", &self.by_oid.iter().map(|(o, _)| o).collect::<Vec<_>>())
            .field("default", &self.default.is_some())
            .field("v1", &self.v1.is_some())
            .field("v2c", &self.v2c.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CommunityMessage;
    use crate::oid;
    use crate::pdu::{GenericTrap, Pdu, TrapV1Pdu};
    use crate::trapd::oids;
    use bytes::Bytes;
    use std::sync::Mutex;

    fn v2c_trap(trap_oid: Oid) -> Trap {
        let msg = CommunityMessage::v2c(
            Bytes::from_static(b"public"),
            Pdu::trap_v2(0, trap_oid, vec![]),
        );
        Trap::from_message(msg, "192.0.2.1".parse().unwrap()).unwrap()
    }

    fn v1_trap() -> Trap {
        let pdu = TrapV1Pdu::new(
            oid!(1, 3, 6, 1, 4, 1, 9999),
            [192, 0, 2, 1],
            GenericTrap::LinkDown,
            0,
            0,
            vec![],
        );
        let msg = CommunityMessage::v1(Bytes::from_static(b"public"), pdu);
        Trap::from_message(msg, "192.0.2.1".parse().unwrap()).unwrap()
    }

    fn other() -> Trap {
        let msg = CommunityMessage::v2c(
            Bytes::from_static(b"public"),
            Pdu::get_request(&[oids::sys_uptime()]),
        );
        Trap::from_message(msg, "192.0.2.1".parse().unwrap()).unwrap()
    }

    /// Dispatcher whose handlers record their label when invoked.
    struct Recorder {
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn handler(&self, label: &'static str) -> Box<dyn Fn(Trap) -> HandlerResult + Send + Sync> {
            let calls = self.calls.clone();
            Box::new(move |_| {
                calls.lock().unwrap().push(label);
                Ok(())
            })
        }

        fn take(&self) -> Vec<&'static str> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    #[test]
    fn test_no_handlers_selects_noop() {
        let dispatcher = TrapDispatcher::new();
        for trap in [v2c_trap(oids::link_up()), v1_trap(), other()] {
            let handler = dispatcher.select_handler(&trap);
            assert!(dispatcher.is_noop(handler));
            assert!(handler(trap).is_ok());
        }
    }

    #[test]
    fn test_oid_handler_beats_default() {
        let rec = Recorder::new();
        let mut dispatcher = TrapDispatcher::new();
        dispatcher.on_trap_default(rec.handler("default"));
        dispatcher
            .on_trap("1.3.6.1.6.3.1.1.5.3", rec.handler("linkDown"))
            .unwrap();

        dispatcher.dispatch(v2c_trap(oids::link_down())).unwrap();
        dispatcher.dispatch(v2c_trap(oids::link_up())).unwrap();
        assert_eq!(rec.take(), vec!["linkDown", "default"]);
    }

    #[test]
    fn test_specific_handler_registered_after_default_takes_over() {
        let rec = Recorder::new();
        let mut dispatcher = TrapDispatcher::new();
        dispatcher.on_trap_default(rec.handler("default"));

        dispatcher.dispatch(v2c_trap(oids::link_down())).unwrap();
        assert_eq!(rec.take(), vec!["default"]);

        dispatcher
            .on_trap("1.3.6.1.6.3.1.1.5.3", rec.handler("linkDown"))
            .unwrap();
        dispatcher.dispatch(v2c_trap(oids::link_down())).unwrap();
        assert_eq!(rec.take(), vec!["linkDown"]);
    }

    #[test]
    fn test_unregister_falls_back() {
        let rec = Recorder::new();
        let mut dispatcher = TrapDispatcher::new();
        dispatcher
            .on_trap_default(rec.handler("default"))
            .on_trap_v1(rec.handler("v1"));
        dispatcher
            .on_trap("1.3.6.1.6.3.1.1.5.3", rec.handler("linkDown"))
            .unwrap();

        assert!(dispatcher.unregister(&Route::Oid(oids::link_down())).is_some());
        assert!(dispatcher.unregister(&Route::Oid(oids::link_down())).is_none());
        assert!(dispatcher.unregister(&Route::V1).is_some());
        assert!(dispatcher.routes().is_empty());

        dispatcher.dispatch(v2c_trap(oids::link_down())).unwrap();
        dispatcher.dispatch(v1_trap()).unwrap();
        assert_eq!(rec.take(), vec!["default", "default"]);

        assert!(dispatcher.unregister(&Route::Default).is_some());
        assert!(dispatcher.is_noop(dispatcher.select_handler(&v1_trap())));
    }

    #[test]
    fn test_v2c_precedence() {
        let rec = Recorder::new();
        let mut dispatcher = TrapDispatcher::new();
        dispatcher
            .on_trap_default(rec.handler("default"))
            .on_trap_v2c(rec.handler("v2c"));
        dispatcher.on_trap(".1.3.6.1.6.3.1.1.5.1", rec.handler("coldStart")).unwrap();

        dispatcher.dispatch(v2c_trap(oids::cold_start())).unwrap();
        dispatcher.dispatch(v2c_trap(oids::warm_start())).unwrap();
        dispatcher.dispatch(v1_trap()).unwrap();
        assert_eq!(rec.take(), vec!["coldStart", "v2c", "default"]);
    }

    #[test]
    fn test_versions_do_not_cross() {
        let rec = Recorder::new();
        let mut dispatcher = TrapDispatcher::new();
        dispatcher.on_trap_v2c(rec.handler("v2c"));
        dispatcher
            .on_trap(&oids::link_down().to_string(), rec.handler("linkDown"))
            .unwrap();

        // v1 linkDown maps to the same v2 OID but must not reach either handler
        let trap = v1_trap();
        assert!(dispatcher.is_noop(dispatcher.select_handler(&trap)));

        let mut dispatcher = TrapDispatcher::new();
        dispatcher.on_trap_v1(rec.handler("v1"));
        assert!(dispatcher.is_noop(dispatcher.select_handler(&v2c_trap(oids::link_down()))));
        dispatcher.dispatch(v1_trap()).unwrap();
        assert_eq!(rec.take(), vec!["v1"]);
    }

    #[test]
    fn test_other_pdus_always_noop() {
        let rec = Recorder::new();
        let mut dispatcher = TrapDispatcher::new();
        dispatcher
            .on_trap_default(rec.handler("default"))
            .on_trap_v1(rec.handler("v1"))
            .on_trap_v2c(rec.handler("v2c"));

        dispatcher.dispatch(other()).unwrap();
        assert!(rec.take().is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let rec = Recorder::new();
        let mut dispatcher = TrapDispatcher::new();
        dispatcher.on_trap("1.3.6.1.6.3.1.1.5.4", rec.handler("first")).unwrap();
        dispatcher.on_trap("1.3.6.1.6.3.1.1.5.4", rec.handler("second")).unwrap();
        dispatcher.on_trap_default(rec.handler("d1")).on_trap_default(rec.handler("d2"));

        dispatcher.dispatch(v2c_trap(oids::link_up())).unwrap();
        dispatcher.dispatch(v1_trap()).unwrap();
        assert_eq!(rec.take(), vec!["second", "d2"]);
        assert_eq!(dispatcher.routes().len(), 1);
    }

    #[test]
    fn test_register_without_handler_fails() {
        let mut dispatcher = TrapDispatcher::new();
        let err = dispatcher.register(Route::Default, None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(dispatcher.is_noop(dispatcher.select_handler(&v1_trap())));
    }

    #[test]
    fn test_on_trap_rejects_bad_oid() {
        let mut dispatcher = TrapDispatcher::new();
        for bad in ["", "linkDown", "1.3.x"] {
            let err = dispatcher.on_trap(bad, |_| Ok(())).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { .. }), "{bad}");
        }
        assert!(dispatcher.routes().is_empty());
    }

    #[test]
    fn test_handler_error_is_returned() {
        let mut dispatcher = TrapDispatcher::new();
        dispatcher.on_trap_v1(|_| Err("disk full".into()));
        let err = dispatcher.dispatch(v1_trap()).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_route_table_sorted_and_replaces() {
        let mut table = RouteTable::new();
        table.insert(oid!(1, 3, 6, 1, 3), 3);
        table.insert(oid!(1, 3, 6, 1, 1), 1);
        table.insert(oid!(1, 3, 6, 1, 1), 10);

        assert_eq!(table.get(&oid!(1, 3, 6, 1, 1)), Some(&10));
        assert_eq!(table.get(&oid!(1, 3, 6, 1, 2)), None);
        let keys: Vec<_> = table.iter().map(|(o, _)| o.clone()).collect();
        assert_eq!(keys, vec![oid!(1, 3, 6, 1, 1), oid!(1, 3, 6, 1, 3)]);

        assert_eq!(table.remove(&oid!(1, 3, 6, 1, 3)), Some(3));
        assert_eq!(table.remove(&oid!(1, 3, 6, 1, 3)), None);
        assert_eq!(table.len(), 1);
    }
}
