#![no_main]

use libfuzzer_sys::fuzz_target;

use async_snmp_agent::oid::Oid;

fuzz_target!(|data: &[u8]| {
    if let Ok(oid) = Oid::from_ber(data) {
        // Decoded OIDs order consistently with their own re-encoding.
        let again = Oid::from_ber(&oid.to_ber()).expect("re-encoded OID decodes");
        assert_eq!(again.cmp(&oid), std::cmp::Ordering::Equal);
    }

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = Oid::parse(s);
    }
});
