#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use async_snmp_agent::ber::Decoder;
use async_snmp_agent::message::CommunityMessage;
use async_snmp_agent::pdu::Pdu;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    // Anything that decodes must re-encode to something that decodes the same.
    if let Ok(msg) = CommunityMessage::decode(bytes.clone()) {
        let again = CommunityMessage::decode(msg.encode()).expect("re-encoded message decodes");
        assert_eq!(again, msg);
    }

    let mut decoder = Decoder::new(bytes);
    let _ = Pdu::decode(&mut decoder);
});
