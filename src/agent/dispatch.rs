//! Request dispatch: datagram in, datagram (or nothing) out.
//!
//! [`Dispatcher`] holds everything needed to answer a request and none of the
//! transport. It is shared by every request task; all of its state is
//! immutable apart from the drop counters.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;

use crate::error::{DecodeErrorKind, Error, ErrorStatus};
use crate::handler::{ManagedObject, ObjectStore, RequestContext, ValueProvider};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::value::Value;
use crate::varbind::VarBind;

use super::vacm::{Community, CommunityTable};

/// Default maximum message size for UDP (RFC 3417 recommendation).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1472;

/// Default cap on the number of varbinds in one GETBULK response.
pub const DEFAULT_MAX_BULK_VARBINDS: usize = 100;

/// Overhead for SNMP message encoding, excluding the community string.
/// Conservative upper bound for version, PDU header and list framing.
const RESPONSE_OVERHEAD: usize = 64;

/// Counters for requests that received no response.
///
/// Named after the SNMPv2-MIB `snmp` group objects they correspond to.
#[derive(Debug, Default)]
pub struct DropCounters {
    in_bad_versions: AtomicU32,
    in_asn_parse_errs: AtomicU32,
    in_bad_community_names: AtomicU32,
    unknown_pdu_handlers: AtomicU32,
    silent_drops: AtomicU32,
}

impl DropCounters {
    /// Messages for a version other than SNMPv2c (snmpInBadVersions).
    pub fn in_bad_versions(&self) -> u32 {
        self.in_bad_versions.load(Ordering::Relaxed)
    }

    /// Messages that failed to decode (snmpInASNParseErrs).
    pub fn in_asn_parse_errs(&self) -> u32 {
        self.in_asn_parse_errs.load(Ordering::Relaxed)
    }

    /// Messages with an unknown community (snmpInBadCommunityNames).
    pub fn in_bad_community_names(&self) -> u32 {
        self.in_bad_community_names.load(Ordering::Relaxed)
    }

    /// Well-formed messages carrying a PDU type the agent does not serve,
    /// such as SetRequest (snmpUnknownPDUHandlers).
    pub fn unknown_pdu_handlers(&self) -> u32 {
        self.unknown_pdu_handlers.load(Ordering::Relaxed)
    }

    /// Requests whose response would not fit in a datagram even with an empty
    /// varbind list (snmpSilentDrops).
    pub fn silent_drops(&self) -> u32 {
        self.silent_drops.load(Ordering::Relaxed)
    }

    /// Sum of all counters.
    pub fn total(&self) -> u64 {
        [
            self.in_bad_versions(),
            self.in_asn_parse_errs(),
            self.in_bad_community_names(),
            self.unknown_pdu_handlers(),
            self.silent_drops(),
        ]
        .into_iter()
        .map(u64::from)
        .sum()
    }

    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Resolves SNMPv2c requests against an object store.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// use async_snmp_agent::agent::{CommunityTable, Dispatcher};
/// use async_snmp_agent::handler::{ManagedObject, ObjectStore};
/// use async_snmp_agent::message::CommunityMessage;
/// use async_snmp_agent::pdu::Pdu;
/// use async_snmp_agent::{Syntax, Value, oid};
///
/// let store = ObjectStore::from_objects(vec![ManagedObject::new(
///     oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0),
///     Syntax::Integer32,
///     "temp",
/// )])
/// .unwrap();
/// let communities = CommunityTable::builder()
///     .community("public", "my-area", |p| p.include(oid!(1, 3, 6, 1, 4, 1, 99999)))
///     .build()
///     .unwrap();
/// let values = HashMap::from([("temp".to_string(), Value::Integer(21))]);
///
/// let dispatcher = Dispatcher::new(store, communities, Arc::new(values));
///
/// let request = CommunityMessage::v2c(
///     "public",
///     Pdu::get_request(7, &[oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0)]),
/// );
/// let reply = dispatcher.handle(request.encode(), None).unwrap();
/// let reply = CommunityMessage::decode(reply).unwrap();
///
/// assert_eq!(reply.pdu.request_id, 7);
/// assert_eq!(reply.pdu.varbinds[0].value, Value::Integer(21));
/// ```
pub struct Dispatcher {
    store: Arc<ObjectStore>,
    communities: Arc<CommunityTable>,
    provider: Arc<dyn ValueProvider>,
    max_bulk_varbinds: usize,
    max_message_size: usize,
    counters: DropCounters,
}

impl Dispatcher {
    pub fn new(
        store: impl Into<Arc<ObjectStore>>,
        communities: impl Into<Arc<CommunityTable>>,
        provider: Arc<dyn ValueProvider>,
    ) -> Self {
        Self {
            store: store.into(),
            communities: communities.into(),
            provider,
            max_bulk_varbinds: DEFAULT_MAX_BULK_VARBINDS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            counters: DropCounters::default(),
        }
    }

    /// Set the most varbinds a GETBULK response may carry (minimum 1).
    pub fn max_bulk_varbinds(mut self, limit: usize) -> Self {
        self.max_bulk_varbinds = limit.max(1);
        self
    }

    /// Set the largest response datagram the agent will send.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn communities(&self) -> &CommunityTable {
        &self.communities
    }

    pub fn counters(&self) -> &DropCounters {
        &self.counters
    }

    /// Answer one datagram.
    ///
    /// Returns `None` when nothing should be sent back: the datagram did not
    /// decode, named an unknown community, carried a PDU type other than
    /// GET, GETNEXT or GETBULK, or the response could not be made to fit in
    /// [`max_message_size`](Self::max_message_size).
    pub fn handle(&self, data: Bytes, source: Option<SocketAddr>) -> Option<Bytes> {
        let msg = match CommunityMessage::decode(data) {
            Ok(msg) => msg,
            Err(e) => {
                self.count_decode_error(&e);
                tracing::debug!(target: "async_snmp_agent::agent", { snmp.source = ?source, error = %e }, "dropping undecodable message");
                return None;
            }
        };

        let Some(community) = self.communities.authenticate(&msg.community) else {
            DropCounters::bump(&self.counters.in_bad_community_names);
            tracing::debug!(target: "async_snmp_agent::agent", { snmp.source = ?source }, "invalid community string");
            return None;
        };

        let ctx = RequestContext {
            source,
            community,
            request_id: msg.pdu.request_id,
            pdu_type: msg.pdu.pdu_type,
        };

        let Some(response) = self.dispatch(&ctx, &msg.pdu) else {
            DropCounters::bump(&self.counters.unknown_pdu_handlers);
            tracing::debug!(target: "async_snmp_agent::agent", { snmp.source = ?source, snmp.pdu_type = %msg.pdu.pdu_type, snmp.security_name = ctx.security_name() }, "no handler for PDU type");
            return None;
        };

        tracing::trace!(target: "async_snmp_agent::agent", { snmp.source = ?source, snmp.request_id = ctx.request_id, snmp.pdu_type = %ctx.pdu_type, snmp.security_name = ctx.security_name(), snmp.varbinds = response.varbinds.len() }, "request resolved");

        let encoded = CommunityMessage::v2c(msg.community.clone(), response).encode();
        if encoded.len() <= self.max_message_size {
            return Some(encoded);
        }

        // RFC 3416 4.2.1: tooBig with an empty varbind list.
        let too_big = Pdu {
            varbinds: Vec::new(),
            ..msg.pdu.to_error_response(ErrorStatus::TooBig, 0)
        };
        let encoded = CommunityMessage::v2c(msg.community, too_big).encode();
        if encoded.len() <= self.max_message_size {
            tracing::debug!(target: "async_snmp_agent::agent", { snmp.source = ?source, snmp.request_id = ctx.request_id }, "response too big");
            return Some(encoded);
        }

        DropCounters::bump(&self.counters.silent_drops);
        tracing::debug!(target: "async_snmp_agent::agent", { snmp.source = ?source, snmp.request_id = ctx.request_id }, "even tooBig response exceeds max message size, dropping");
        None
    }

    /// Resolve a decoded request for an authenticated community.
    ///
    /// Returns `None` for PDU types the agent does not answer.
    pub fn dispatch(&self, ctx: &RequestContext<'_>, pdu: &Pdu) -> Option<Pdu> {
        let varbinds = match pdu.pdu_type {
            PduType::GetRequest => self.handle_get(ctx, pdu),
            PduType::GetNextRequest => self.handle_get_next(ctx, pdu),
            PduType::GetBulkRequest => self.handle_get_bulk(ctx, pdu),
            PduType::SetRequest | PduType::Response => return None,
        };
        Some(Pdu::response(pdu.request_id, varbinds))
    }

    /// Convenience for callers that already hold a [`Community`].
    pub fn dispatch_for(&self, community: &Community, pdu: &Pdu) -> Option<Pdu> {
        let ctx = RequestContext {
            source: None,
            community,
            request_id: pdu.request_id,
            pdu_type: pdu.pdu_type,
        };
        self.dispatch(&ctx, pdu)
    }

    fn handle_get(&self, ctx: &RequestContext<'_>, pdu: &Pdu) -> Vec<VarBind> {
        pdu.varbinds
            .iter()
            .map(|vb| {
                let value = match self.store.get(&vb.oid) {
                    // Denied reads look exactly like missing objects.
                    Some(object) if ctx.can_read(&object.oid) => self.fetch(object),
                    _ => Value::NoSuchObject,
                };
                VarBind::new(vb.oid.clone(), value)
            })
            .collect()
    }

    fn handle_get_next(&self, ctx: &RequestContext<'_>, pdu: &Pdu) -> Vec<VarBind> {
        pdu.varbinds
            .iter()
            .map(|vb| self.next_varbind(ctx, &vb.oid).0)
            .collect()
    }

    /// GETBULK per RFC 3416 4.2.3.
    ///
    /// Non-repeaters get one GETNEXT step each. Repeaters are then walked in
    /// rows of one binding per repeater, in request order, so binding `i` of
    /// the repeater section always belongs to repeater `i % R`. A repeater
    /// past the end of the view fills its column with `endOfMibView`; the
    /// walk stops after a row in which no repeater advanced. The response
    /// stops at the varbind cap or the datagram budget, whichever comes
    /// first.
    fn handle_get_bulk(&self, ctx: &RequestContext<'_>, pdu: &Pdu) -> Vec<VarBind> {
        let non_repeaters = pdu.non_repeaters().min(pdu.varbinds.len());
        let max_repetitions = pdu.max_repetitions();
        let (fixed, repeaters) = pdu.varbinds.split_at(non_repeaters);

        let budget = self
            .max_message_size
            .saturating_sub(RESPONSE_OVERHEAD + ctx.community.token_len());
        let mut out = BulkResponse::new(self.max_bulk_varbinds, budget);

        for vb in fixed {
            if !out.push(self.next_varbind(ctx, &vb.oid).0) {
                return out.finish(ctx);
            }
        }

        let mut cursors: Vec<Oid> = repeaters.iter().map(|vb| vb.oid.clone()).collect();
        let mut finished = vec![false; cursors.len()];

        for _ in 0..max_repetitions {
            let mut advanced = false;
            for (cursor, done) in cursors.iter_mut().zip(finished.iter_mut()) {
                let vb = if *done {
                    VarBind::new(cursor.clone(), Value::EndOfMibView)
                } else {
                    let (vb, live) = self.next_varbind(ctx, cursor);
                    if live {
                        *cursor = vb.oid.clone();
                        advanced = true;
                    } else {
                        *done = true;
                    }
                    vb
                };
                if !out.push(vb) {
                    return out.finish(ctx);
                }
            }
            if !advanced {
                break;
            }
        }

        out.finish(ctx)
    }

    /// One GETNEXT step from `oid`, skipping objects the community cannot read.
    ///
    /// The flag is false when the walk ran off the end of the view.
    fn next_varbind(&self, ctx: &RequestContext<'_>, oid: &Oid) -> (VarBind, bool) {
        match self.store.after(oid).find(|object| ctx.can_read(&object.oid)) {
            Some(object) => (VarBind::new(object.oid.clone(), self.fetch(object)), true),
            None => (VarBind::new(oid.clone(), Value::EndOfMibView), false),
        }
    }

    /// Current value of `object`, or `noSuchObject` if the provider has none
    /// or returns a value of the wrong type.
    fn fetch(&self, object: &ManagedObject) -> Value {
        match self.provider.fetch(&object.key) {
            Some(value) if object.syntax.accepts(&value) => value,
            Some(value) => {
                tracing::warn!(target: "async_snmp_agent::agent", { snmp.oid = %object.oid, key = %object.key, syntax = %object.syntax, %value }, "value does not match object syntax");
                Value::NoSuchObject
            }
            None => {
                tracing::warn!(target: "async_snmp_agent::agent", { snmp.oid = %object.oid, key = %object.key }, "no value for managed object");
                Value::NoSuchObject
            }
        }
    }

    fn count_decode_error(&self, e: &Error) {
        let counter = match e {
            Error::Decode {
                kind: DecodeErrorKind::UnsupportedVersion(_) | DecodeErrorKind::UnknownVersion(_),
                ..
            } => &self.counters.in_bad_versions,
            _ => &self.counters.in_asn_parse_errs,
        };
        DropCounters::bump(counter);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("objects", &self.store.len())
            .field("communities", &self.communities.len())
            .field("max_bulk_varbinds", &self.max_bulk_varbinds)
            .field("max_message_size", &self.max_message_size)
            .finish_non_exhaustive()
    }
}

/// Accumulates GETBULK varbinds under a count cap and a byte budget.
struct BulkResponse {
    varbinds: Vec<VarBind>,
    cap: usize,
    budget: usize,
    size: usize,
    truncated: bool,
}

impl BulkResponse {
    fn new(cap: usize, budget: usize) -> Self {
        Self {
            varbinds: Vec::new(),
            cap,
            budget,
            size: 0,
            truncated: false,
        }
    }

    /// Append `vb`, or return false if it would exceed either limit.
    fn push(&mut self, vb: VarBind) -> bool {
        if self.varbinds.len() >= self.cap {
            self.truncated = true;
            return false;
        }
        let size = vb.encoded_size();
        if self.size + size > self.budget {
            self.truncated = true;
            return false;
        }
        self.size += size;
        self.varbinds.push(vb);
        true
    }

    fn finish(self, ctx: &RequestContext<'_>) -> Vec<VarBind> {
        if self.truncated {
            tracing::debug!(target: "async_snmp_agent::agent", { snmp.request_id = ctx.request_id, snmp.varbinds = self.varbinds.len(), bytes = self.size }, "GETBULK response truncated");
        }
        self.varbinds
    }
}
