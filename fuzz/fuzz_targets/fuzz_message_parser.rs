#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use async_snmp_manager::ber::Decoder;
use async_snmp_manager::message::CommunityMessage;
use async_snmp_manager::pdu::{Pdu, TrapV1Pdu};
use async_snmp_manager::trapd::Trap;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    if let Ok(message) = CommunityMessage::decode(bytes.clone()) {
        // Anything that decodes must re-encode and classify without panicking
        let _ = message.encode();
        let _ = message.response();
        let _ = Trap::from_message(message, [127, 0, 0, 1].into());
    }

    let mut decoder = Decoder::new(bytes.clone());
    let _ = Pdu::decode(&mut decoder);

    let mut decoder = Decoder::new(bytes);
    let _ = TrapV1Pdu::decode(&mut decoder);
});
