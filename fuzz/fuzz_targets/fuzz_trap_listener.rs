#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use async_snmp_manager::testing::MockAgentTransport;
use async_snmp_manager::{ManagerConfig, Trapd};

fuzz_target!(|data: &[u8]| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let mut trapd = Trapd::new(ManagerConfig::new());
    trapd.on_trap_default(|trap| {
        let _ = trap.varbinds().len();
        Ok(())
    });
    let listener = trapd.listen_on(MockAgentTransport::new("127.0.0.1:162".parse().unwrap()));

    runtime.block_on(listener.handle_datagram(
        Bytes::copy_from_slice(data),
        "192.0.2.1:1024".parse().unwrap(),
    ));
});
