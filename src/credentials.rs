use crate::error::*;
use crate::mac::Mac;
use ring::{digest, hmac};
use std::str::FromStr;

/// The MAC primitives a set of credentials can name.
///
/// The wire names are the lowercase forms, as they appear in a stored
/// credentials record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// The lowercase name used in credentials records.
    pub fn as_str(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    pub(crate) fn hmac_algorithm(self) -> hmac::Algorithm {
        match self {
            DigestAlgorithm::Sha256 => hmac::HMAC_SHA256,
            DigestAlgorithm::Sha512 => hmac::HMAC_SHA512,
        }
    }

    pub(crate) fn digest_algorithm(self) -> &'static digest::Algorithm {
        match self {
            DigestAlgorithm::Sha256 => &digest::SHA256,
            DigestAlgorithm::Sha512 => &digest::SHA512,
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;
    fn from_str(name: &str) -> Result<DigestAlgorithm> {
        match name {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(Error::InvalidCredentials),
        }
    }
}

/// A Hawk key: the shared secret bound to its digest algorithm.
///
/// While any sequence of bytes can be specified as a key, note that each
/// digest algorithm has a suggested key length, and that passwords should
/// *not* be used as keys.
pub struct Key {
    key: hmac::Key,
    algorithm: DigestAlgorithm,
}

impl Key {
    pub fn new<B>(key: B, algorithm: DigestAlgorithm) -> Result<Key>
    where
        B: AsRef<[u8]>,
    {
        Ok(Key {
            key: hmac::Key::new(algorithm.hmac_algorithm(), key.as_ref()),
            algorithm,
        })
    }

    /// The digest algorithm this key signs with, which is also the one
    /// used for payload hashes made on its behalf.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Sign `data`, producing a MAC of the algorithm's output length.
    pub fn sign(&self, data: &[u8]) -> Mac {
        let tag = hmac::sign(&self.key, data);
        Mac::from(tag.as_ref().to_vec())
    }
}

impl std::fmt::Debug for Key {
    // The secret itself stays out of debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Key {{ algorithm: {:?} }}", self.algorithm)
    }
}

/// Hawk credentials: an id and the key associated with it.
///
/// The digest algorithm must be agreed between the server and the client;
/// it travels inside the [`Key`]. A `Credentials` value that exists is
/// well-formed — records with a missing or unrecognized algorithm fail at
/// construction with `InvalidCredentials`, before any MAC is attempted.
#[derive(Debug)]
pub struct Credentials {
    pub id: String,
    pub key: Key,
}

impl Credentials {
    /// Build credentials from a stored record's fields, resolving the
    /// algorithm by its lowercase name.
    pub fn new<S, B>(id: S, key: B, algorithm: &str) -> Result<Credentials>
    where
        S: Into<String>,
        B: AsRef<[u8]>,
    {
        Ok(Credentials {
            id: id.into(),
            key: Key::new(key, algorithm.parse()?)?,
        })
    }
}

/// Maps a client id from an incoming header to its credentials.
///
/// This is the receiver's hook into the caller's credentials database.
/// Implementations return `Error::CredentialsLookupError` for an unknown
/// id; building the `Credentials` from a stored record surfaces
/// `Error::InvalidCredentials` if the record is malformed. The lookup must
/// be side-effect free — it may be consulted more than once for a request.
pub trait CredentialsLookup {
    fn lookup(&self, id: &str) -> Result<Credentials>;
}

impl<F> CredentialsLookup for F
where
    F: Fn(&str) -> Result<Credentials>,
{
    fn lookup(&self, id: &str) -> Result<Credentials> {
        self(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_sha256() {
        let credentials = Credentials::new("clientId", vec![0u8; 32], "sha256").unwrap();
        assert_eq!(credentials.id, "clientId");
        assert_eq!(credentials.key.algorithm(), DigestAlgorithm::Sha256);
    }

    #[test]
    fn test_new_sha512() {
        let credentials = Credentials::new("clientId", "a password-like key", "sha512").unwrap();
        assert_eq!(credentials.key.algorithm(), DigestAlgorithm::Sha512);
    }

    #[test]
    fn test_unknown_algorithm() {
        match Credentials::new("clientId", vec![0u8; 32], "sha1") {
            Err(Error::InvalidCredentials) => (),
            other => panic!("expected InvalidCredentials, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_lookup_closure() {
        let lookup = |id: &str| {
            if id == "known" {
                Credentials::new("known", "some secret", "sha256")
            } else {
                Err(Error::CredentialsLookupError)
            }
        };
        assert!(lookup.lookup("known").is_ok());
        assert!(lookup.lookup("unknown").is_err());
    }
}
