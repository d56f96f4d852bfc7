use crate::credentials::DigestAlgorithm;
use crate::error::*;
use ring::digest;
use std::io::Read;

/// Bytes consumed from a streaming payload per hasher update. The chunking
/// never changes the resulting hash.
const BLOCK_SIZE: usize = 1024;

/// Distinguishes "the caller said nothing about this value" from an
/// explicitly supplied (possibly empty) value.
///
/// A sender that omits both the content and the content type is declining
/// to vouch for the payload; a sender that supplies an empty body is
/// vouching for emptiness. The two produce different headers — no `hash`
/// parameter versus the hash of the empty payload — so the distinction has
/// to survive into the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supplied<T> {
    /// Nothing was supplied at all.
    Omitted,
    /// The supplied value, which may be empty.
    Value(T),
}

impl<T> Supplied<T> {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Supplied::Omitted)
    }
}

/// A utility for hashing payloads. Feed the entity body to this, then pass
/// the `finish` result to a request or response.
pub struct PayloadHasher {
    context: digest::Context,
}

impl PayloadHasher {
    /// Create a new hasher for a payload of the given content type.
    ///
    /// The content type is normalized the way the peers will normalize it:
    /// lowercased, surrounding whitespace trimmed, and any `;`-delimited
    /// parameters dropped, so `application/json; charset=utf8` hashes the
    /// same as `application/json`. The digest is assumed to be the same as
    /// the one used for the credentials in the request.
    pub fn new(content_type: &str, algorithm: DigestAlgorithm) -> Self {
        let mut hasher = PayloadHasher {
            context: digest::Context::new(algorithm.digest_algorithm()),
        };
        hasher.update("hawk.1.payload\n");
        hasher.update(normalize_content_type(content_type));
        hasher.update("\n");
        hasher
    }

    /// Hash a single in-memory payload and return the result.
    pub fn hash<B>(content_type: &str, algorithm: DigestAlgorithm, payload: B) -> Vec<u8>
    where
        B: AsRef<[u8]>,
    {
        let mut hasher = PayloadHasher::new(content_type, algorithm);
        hasher.update(payload);
        hasher.finish()
    }

    /// Hash a payload streamed from a reader, consuming it in fixed-size
    /// blocks.
    pub fn hash_reader<R>(content_type: &str, algorithm: DigestAlgorithm, reader: R) -> Result<Vec<u8>>
    where
        R: Read,
    {
        let mut hasher = PayloadHasher::new(content_type, algorithm);
        let mut reader = reader;
        let mut block = [0u8; BLOCK_SIZE];
        loop {
            let n = reader.read(&mut block)?;
            if n == 0 {
                break;
            }
            hasher.update(&block[..n]);
        }
        Ok(hasher.finish())
    }

    /// Update the hash with new data.
    pub fn update<B>(&mut self, data: B)
    where
        B: AsRef<[u8]>,
    {
        self.context.update(data.as_ref());
    }

    /// Finish hashing and return the result.
    pub fn finish(mut self) -> Vec<u8> {
        // The normalized payload message carries a trailing LF.
        self.update("\n");
        self.context.finish().as_ref().to_vec()
    }
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// The hash an issuer (a sender, or a receiver responding) should embed,
/// if any.
///
/// Omitting both halves of the payload means no `hash` parameter, but only
/// when the caller has turned `always_hash_content` off; omitting exactly
/// one half is always an error.
pub(crate) fn issued_hash(
    content: Supplied<&[u8]>,
    content_type: Supplied<&str>,
    always_hash_content: bool,
    algorithm: DigestAlgorithm,
) -> Result<Option<Vec<u8>>> {
    match (content, content_type) {
        (Supplied::Value(content), Supplied::Value(content_type)) => {
            Ok(Some(PayloadHasher::hash(content_type, algorithm, content)))
        }
        (Supplied::Omitted, Supplied::Omitted) => {
            if always_hash_content {
                Err(Error::MissingContent)
            } else {
                log::debug!("not hashing payload content");
                Ok(None)
            }
        }
        _ => Err(Error::MissingContent),
    }
}

/// The hash a verifier should compare against a peer's `hash` parameter.
///
/// A verifier that was given neither content nor content type still
/// recomputes, over the empty payload — a peer that hashed a real body will
/// then fail the comparison rather than slip through unchecked.
pub(crate) fn expected_hash(
    content: Supplied<&[u8]>,
    content_type: Supplied<&str>,
    algorithm: DigestAlgorithm,
) -> Result<Vec<u8>> {
    match (content, content_type) {
        (Supplied::Value(content), Supplied::Value(content_type)) => {
            Ok(PayloadHasher::hash(content_type, algorithm, content))
        }
        (Supplied::Omitted, Supplied::Omitted) => {
            Ok(PayloadHasher::hash("", algorithm, b""))
        }
        _ => Err(Error::MissingContent),
    }
}
