use crate::error::*;
use crate::mac::Mac;
use std::fmt;
use std::str::FromStr;

/// The longest header, in bytes, that the parser will look at.
pub const MAX_HEADER_LEN: usize = 4096;

/// The parameter names that may appear in a Hawk header. `tsm` and `error`
/// occur only in `WWW-Authenticate` expiry challenges.
const KNOWN_KEYS: &[&str] = &[
    "id", "ts", "nonce", "mac", "ext", "hash", "app", "dlg", "tsm", "error",
];

/// A parameter value may contain printable ASCII except the quote that
/// would end it early and the backslash the grammar reserves. Tab, newline
/// and anything non-ASCII are out.
fn valid_value_byte(b: u8) -> bool {
    (0x20..=0x7e).contains(&b) && b != b'"' && b != b'\\'
}

/// Representation of a Hawk `Authorization` header value, including the
/// scheme token.
///
/// Headers can be derived from strings using the `FromStr` trait, and
/// formatted into a string using the `Display` trait.
///
/// All fields are optional, although for specific purposes some fields must
/// be present: a request carries at least id, ts, nonce and mac; a response
/// carries mac with optional hash and ext; an expiry challenge carries ts,
/// tsm and error.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Header {
    pub id: Option<String>,
    pub ts: Option<u64>,
    pub nonce: Option<String>,
    pub mac: Option<Mac>,
    pub ext: Option<String>,
    pub hash: Option<Vec<u8>>,
    pub app: Option<String>,
    pub dlg: Option<String>,
    pub tsm: Option<Mac>,
    pub error: Option<String>,
}

impl Header {
    /// Create a new Header with the fields a request or response uses.
    ///
    /// Each textual component is checked against the permitted value
    /// character class, so a header that renders is a header that parses.
    #[allow(clippy::too_many_arguments)]
    pub fn new<S>(
        id: Option<S>,
        ts: Option<u64>,
        nonce: Option<S>,
        mac: Option<Mac>,
        ext: Option<S>,
        hash: Option<Vec<u8>>,
        app: Option<S>,
        dlg: Option<S>,
    ) -> Result<Header>
    where
        S: Into<String>,
    {
        Ok(Header {
            id: Header::check_component(id)?,
            ts,
            nonce: Header::check_component(nonce)?,
            mac,
            ext: Header::check_component(ext)?,
            hash,
            app: Header::check_component(app)?,
            dlg: Header::check_component(dlg)?,
            tsm: None,
            error: None,
        })
    }

    /// Check a textual header component for validity.
    fn check_component<S>(value: Option<S>) -> Result<Option<String>>
    where
        S: Into<String>,
    {
        match value {
            None => Ok(None),
            Some(value) => {
                let value = value.into();
                if !value.bytes().all(valid_value_byte) {
                    return Err(Error::BadHeaderValue(
                        "header value contains an illegal character".to_string(),
                    ));
                }
                Ok(Some(value))
            }
        }
    }
}

impl fmt::Display for Header {
    /// Format the header for transmission, parameters in the stable order
    /// id, ts, nonce, ext, mac, hash, app, dlg, tsm, error.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hawk ")?;
        let mut sep = "";
        if let Some(ref id) = self.id {
            write!(f, "{}id=\"{}\"", sep, id)?;
            sep = ", ";
        }
        if let Some(ts) = self.ts {
            write!(f, "{}ts=\"{}\"", sep, ts)?;
            sep = ", ";
        }
        if let Some(ref nonce) = self.nonce {
            write!(f, "{}nonce=\"{}\"", sep, nonce)?;
            sep = ", ";
        }
        if let Some(ref ext) = self.ext {
            write!(f, "{}ext=\"{}\"", sep, ext)?;
            sep = ", ";
        }
        if let Some(ref mac) = self.mac {
            write!(f, "{}mac=\"{}\"", sep, base64::encode(mac.as_ref()))?;
            sep = ", ";
        }
        if let Some(ref hash) = self.hash {
            write!(f, "{}hash=\"{}\"", sep, base64::encode(hash))?;
            sep = ", ";
        }
        if let Some(ref app) = self.app {
            write!(f, "{}app=\"{}\"", sep, app)?;
            sep = ", ";
        }
        if let Some(ref dlg) = self.dlg {
            write!(f, "{}dlg=\"{}\"", sep, dlg)?;
            sep = ", ";
        }
        if let Some(ref tsm) = self.tsm {
            write!(f, "{}tsm=\"{}\"", sep, base64::encode(tsm.as_ref()))?;
            sep = ", ";
        }
        if let Some(ref error) = self.error {
            write!(f, "{}error=\"{}\"", sep, error)?;
        }
        Ok(())
    }
}

impl FromStr for Header {
    type Err = Error;

    /// Parse a complete header value, scheme token included.
    fn from_str(s: &str) -> Result<Header> {
        if s.len() > MAX_HEADER_LEN {
            return Err(Error::BadHeaderValue(format!(
                "header exceeds {} bytes",
                MAX_HEADER_LEN
            )));
        }

        let (scheme, mut rest) = match s.find(char::is_whitespace) {
            Some(at) => (&s[..at], s[at..].trim_start()),
            None => (s, ""),
        };
        if scheme != "Hawk" {
            return Err(Error::UnknownScheme(scheme.to_string()));
        }

        let mut header = Header::default();
        while !rest.is_empty() {
            let eq = rest.find('=').ok_or_else(|| {
                Error::BadHeaderValue(format!("couldn't parse Hawk header at: {}", rest))
            })?;
            let key = rest[..eq].trim();
            rest = rest[eq + 1..].trim_start();

            if !rest.starts_with('"') {
                return Err(Error::BadHeaderValue(format!(
                    "value of `{}` is not quoted",
                    key
                )));
            }
            rest = &rest[1..];
            let end = rest.find('"').ok_or_else(|| {
                Error::BadHeaderValue(format!("value of `{}` has no closing quote", key))
            })?;
            let value = &rest[..end];
            rest = &rest[end + 1..];

            if !value.bytes().all(valid_value_byte) {
                return Err(Error::BadHeaderValue(format!(
                    "value of `{}` contains an illegal character",
                    key
                )));
            }
            header.set(key, value)?;

            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if !rest.starts_with(',') {
                return Err(Error::BadHeaderValue(format!(
                    "couldn't parse Hawk header at: {}",
                    rest
                )));
            }
            rest = rest[1..].trim_start();
        }

        Ok(header)
    }
}

impl Header {
    /// Assign one parsed parameter, rejecting repeats and names outside
    /// the Hawk vocabulary.
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if !KNOWN_KEYS.contains(&key) {
            return Err(Error::BadHeaderValue(format!("unknown key `{}`", key)));
        }

        fn put<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<()> {
            if slot.is_some() {
                return Err(Error::BadHeaderValue(format!("duplicate key `{}`", key)));
            }
            *slot = Some(value);
            Ok(())
        }

        match key {
            "id" => put(&mut self.id, key, value.to_string()),
            "ts" => {
                let ts = u64::from_str(value).map_err(|_| {
                    Error::BadHeaderValue("`ts` is not a unix timestamp".to_string())
                })?;
                put(&mut self.ts, key, ts)
            }
            "nonce" => put(&mut self.nonce, key, value.to_string()),
            "mac" => put(&mut self.mac, key, Mac::from(decode_b64(key, value)?)),
            "ext" => put(&mut self.ext, key, value.to_string()),
            "hash" => put(&mut self.hash, key, decode_b64(key, value)?),
            "app" => put(&mut self.app, key, value.to_string()),
            "dlg" => put(&mut self.dlg, key, value.to_string()),
            "tsm" => put(&mut self.tsm, key, Mac::from(decode_b64(key, value)?)),
            "error" => put(&mut self.error, key, value.to_string()),
            _ => unreachable!("key was checked against KNOWN_KEYS"),
        }
    }
}

fn decode_b64(key: &str, value: &str) -> Result<Vec<u8>> {
    base64::decode(value)
        .map_err(|_| Error::BadHeaderValue(format!("value of `{}` is not base64", key)))
}
