#![no_main]

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use async_snmp_agent::agent::{CommunityTable, Dispatcher};
use async_snmp_agent::handler::{ManagedObject, ObjectStore};
use async_snmp_agent::message::CommunityMessage;
use async_snmp_agent::pdu::PduType;
use async_snmp_agent::{Oid, Syntax, Value};

fn dispatcher() -> &'static Dispatcher {
    static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();
    DISPATCHER.get_or_init(|| {
        let enterprise = Oid::from_slice(&[1, 3, 6, 1, 4, 1, 99999]);
        let mut objects = Vec::new();
        let mut values = HashMap::new();
        for n in 1..=39 {
            let key = format!("param{}", n);
            objects.push(ManagedObject::new(
                enterprise.join(&Oid::from_slice(&[1, n, 0])),
                Syntax::Integer32,
                key.as_str(),
            ));
            values.insert(key, Value::Integer(n as i32));
        }
        let store = ObjectStore::from_objects(objects).expect("valid store");
        let communities = CommunityTable::builder()
            .community("public", "fuzz", |p| p.include(enterprise.clone()))
            .build()
            .expect("valid communities");
        Dispatcher::new(store, communities, Arc::new(values)).max_bulk_varbinds(50)
    })
}

fuzz_target!(|data: &[u8]| {
    let request = CommunityMessage::decode(Bytes::copy_from_slice(data));
    let Some(reply) = dispatcher().handle(Bytes::copy_from_slice(data), None) else {
        return;
    };

    // A reply only ever answers a well-formed request, echoing its ID.
    let request = request.expect("reply to undecodable datagram");
    let reply = CommunityMessage::decode(reply).expect("reply decodes");
    assert_eq!(reply.pdu.pdu_type, PduType::Response);
    assert_eq!(reply.pdu.request_id, request.pdu.request_id);
    assert!(reply.pdu.varbinds.len() <= request.pdu.varbinds.len().max(50));
});
