use crate::error::*;
use crate::header::Header;
use crate::mac::{Mac, MacType};
use crate::payload::{self, Supplied};
use crate::receiver::SeenNonce;
use crate::resource::Resource;
use crate::util;
use ring::constant_time;

/// The default tolerated clock difference between peers, in seconds.
pub const DEFAULT_TIMESTAMP_SKEW: u64 = 60;

/// Everything the verification pipeline needs beyond the header and
/// resource themselves. Shared between the receiver (verifying requests)
/// and the sender (verifying responses).
pub(crate) struct Verification<'a> {
    /// The timestamp under scrutiny: the header's own for a request, the
    /// original request's for a response (a responder reuses it rather
    /// than minting its own).
    pub their_timestamp: u64,
    pub timestamp_skew: u64,
    pub localtime_offset: i64,
    pub accept_untrusted_content: bool,
    pub content: Supplied<&'a [u8]>,
    pub content_type: Supplied<&'a str>,
    /// Consulted only for requests; responses carry no fresh nonce.
    pub seen_nonce: Option<&'a dyn SeenNonce>,
}

/// Verify a parsed header against a locally constructed resource.
///
/// The checks run in a fixed order that callers may rely on: timestamp
/// skew, then MAC, then payload hash, then the nonce. The nonce comes last
/// so that requests failing any other check never consume nonce-store
/// entries.
pub(crate) fn authorize(
    mac_type: MacType,
    header: &Header,
    resource: &Resource,
    v: &Verification,
) -> Result<()> {
    let now = util::utc_now(v.localtime_offset);
    let skew = (v.their_timestamp as i64 - now as i64).abs() as u64;
    if skew > v.timestamp_skew {
        log::debug!(
            "token expired: timestamp {} outside skew {} of local time {}",
            v.their_timestamp,
            v.timestamp_skew,
            now
        );
        return Err(expired(resource, now));
    }

    let their_mac = header
        .mac
        .as_ref()
        .ok_or_else(|| Error::BadHeaderValue("header has no mac".to_string()))?;
    let our_mac = resource.mac(mac_type, header.hash.as_deref(), header.ext.as_deref())?;
    if our_mac != *their_mac {
        return Err(Error::MacMismatch);
    }

    verify_content_hash(header, resource, v)?;

    if mac_type == MacType::Header {
        match v.seen_nonce {
            Some(store) => {
                if store.seen(&resource.credentials().id, resource.nonce(), v.their_timestamp) {
                    return Err(Error::AlreadyProcessed);
                }
            }
            None => log::warn!("no nonce store configured; replays will not be detected"),
        }
    }

    Ok(())
}

fn verify_content_hash(header: &Header, resource: &Resource, v: &Verification) -> Result<()> {
    // Supplying only half of the payload is a caller error no matter what
    // the peer sent.
    if v.content.is_omitted() != v.content_type.is_omitted() {
        return Err(Error::MissingContent);
    }

    let algorithm = resource.credentials().key.algorithm();
    match header.hash {
        Some(ref their_hash) => {
            let ours = payload::expected_hash(v.content, v.content_type, algorithm)?;
            constant_time::verify_slices_are_equal(&ours, their_hash)
                .map_err(|_| Error::MisComputedContentHash)
        }
        None => {
            // The peer did not vouch for its payload. That is acceptable
            // when the caller opted in, or when there is no payload on our
            // side either; a real body with no hash to check is not.
            if v.accept_untrusted_content {
                log::debug!("not verifying payload hash (no hash in header)");
                return Ok(());
            }
            let content_empty = match v.content {
                Supplied::Omitted => true,
                Supplied::Value(c) => c.is_empty(),
            };
            let content_type_empty = match v.content_type {
                Supplied::Omitted => true,
                Supplied::Value(t) => t.is_empty(),
            };
            if content_empty && content_type_empty {
                Ok(())
            } else {
                Err(Error::MisComputedContentHash)
            }
        }
    }
}

/// Build the TokenExpired outcome, challenge included: the local clock
/// reading plus its MAC, so the peer can verify the value before using it
/// to compute an offset.
fn expired(resource: &Resource, now: u64) -> Error {
    let challenge = Header {
        ts: Some(now),
        tsm: Some(Mac::for_timestamp(&resource.credentials().key, now)),
        error: Some("timestamp skew too high".to_string()),
        ..Header::default()
    };
    Error::TokenExpired {
        localtime_in_seconds: now,
        www_authenticate: Some(challenge.to_string()),
    }
}
