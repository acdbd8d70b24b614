//! Per-request context.

use std::net::SocketAddr;

use crate::agent::Community;
use crate::oid::Oid;
use crate::pdu::PduType;

/// Information about the request being resolved.
///
/// Built by the dispatcher after the community has been authenticated and
/// dropped when the response is encoded.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Source address, when the request arrived over a socket.
    pub source: Option<SocketAddr>,
    /// Authenticated community.
    pub community: &'a Community,
    /// Request ID from the PDU, echoed in the response.
    pub request_id: i32,
    /// PDU type (GetRequest, GetNextRequest, GetBulkRequest).
    pub pdu_type: PduType,
}

impl RequestContext<'_> {
    /// Whether the requesting community may read `oid`.
    pub fn can_read(&self, oid: &Oid) -> bool {
        self.community.can_read(oid)
    }

    pub fn security_name(&self) -> &str {
        self.community.security_name()
    }
}
