use crate::credentials::CredentialsLookup;
use crate::error::*;
use crate::mac::{Mac, MacType};
use crate::resource::{Resource, ResourceBuilder};
use crate::util;
use std::borrow::Cow;
use std::str;
use std::str::FromStr;

const BACKSLASH: u8 = b'\\';

/// A Bewit is a piece of data attached to a GET request's URL that
/// functions in place of a Hawk Authorization header. It contains an id,
/// an expiration timestamp, a MAC, and an optional `ext` value. These are
/// available using accessor functions.
#[derive(Clone, Debug, PartialEq)]
pub struct Bewit<'a> {
    id: Cow<'a, str>,
    exp: u64,
    mac: Cow<'a, Mac>,
    ext: Option<Cow<'a, str>>,
}

impl<'a> Bewit<'a> {
    /// Create a new Bewit with the given values.
    ///
    /// See [`Resource::make_bewit`] for the usual way to make one. The
    /// serialized form is backslash-delimited, so neither the id nor the
    /// ext may contain a backslash.
    pub fn new(id: &'a str, exp: u64, mac: Mac, ext: Option<&'a str>) -> Result<Bewit<'a>> {
        if id.as_bytes().contains(&BACKSLASH) {
            return Err(Error::BadHeaderValue(
                "bewit id contains a backslash".to_string(),
            ));
        }
        if let Some(ext) = ext {
            if ext.as_bytes().contains(&BACKSLASH) {
                return Err(Error::BadHeaderValue(
                    "bewit ext contains a backslash".to_string(),
                ));
            }
        }
        Ok(Bewit {
            id: Cow::Borrowed(id),
            exp,
            mac: Cow::Owned(mac),
            ext: ext.map(Cow::Borrowed),
        })
    }

    /// Generate the fully-encoded string for this Bewit, suitable for a
    /// `bewit=` query parameter.
    pub fn to_str(&self) -> String {
        let raw = format!(
            "{}\\{}\\{}\\{}",
            self.id,
            self.exp,
            base64::encode(self.mac.as_ref()),
            self.ext.as_deref().unwrap_or("")
        );
        base64::encode_config(&raw, base64::URL_SAFE)
    }

    /// Get the Bewit's client identifier.
    pub fn id(&self) -> &str {
        self.id.as_ref()
    }

    /// Get the expiration time of the bewit, in unix seconds.
    pub fn exp(&self) -> u64 {
        self.exp
    }

    /// Get the MAC included in the Bewit.
    pub fn mac(&self) -> &Mac {
        self.mac.as_ref()
    }

    /// Get the Bewit's `ext` field.
    pub fn ext(&self) -> Option<&str> {
        self.ext.as_deref()
    }
}

impl FromStr for Bewit<'static> {
    type Err = Error;
    fn from_str(bewit: &str) -> Result<Bewit<'static>> {
        let bewit =
            base64::decode_config(bewit, base64::URL_SAFE).map_err(|_| InvalidBewit::Format)?;

        let parts: Vec<&[u8]> = bewit.split(|c| *c == BACKSLASH).collect();
        if parts.len() != 4 {
            return Err(InvalidBewit::Format.into());
        }

        let id = String::from_utf8(parts[0].to_vec()).map_err(|_| InvalidBewit::Id)?;

        let exp = str::from_utf8(parts[1]).map_err(|_| InvalidBewit::Exp)?;
        let exp = u64::from_str(exp).map_err(|_| InvalidBewit::Exp)?;

        let mac = str::from_utf8(parts[2]).map_err(|_| InvalidBewit::Mac)?;
        let mac = Mac::from(base64::decode(mac).map_err(|_| InvalidBewit::Mac)?);

        let ext = match parts[3].len() {
            0 => None,
            _ => Some(Cow::Owned(
                String::from_utf8(parts[3].to_vec()).map_err(|_| InvalidBewit::Ext)?,
            )),
        };

        Ok(Bewit {
            id: Cow::Owned(id),
            exp,
            mac: Cow::Owned(mac),
            ext,
        })
    }
}

impl<'a> Resource<'a> {
    /// Issue a bewit for this resource: a URL-embedded token authorizing a
    /// GET of exactly this URL until the resource's timestamp, which here
    /// plays the role of the expiration time.
    ///
    /// Only GET requests can carry a bewit, and a bewit takes the place of
    /// a nonce, so the resource must have been built with an empty one.
    pub fn make_bewit(&self) -> Result<Bewit<'_>> {
        if self.method() != "GET" {
            return Err(Error::Usage("bewits can only authorize GET requests"));
        }
        if !self.nonce().is_empty() {
            return Err(Error::Usage("a bewit resource must have an empty nonce"));
        }
        let mac = self.mac(MacType::Bewit, None, self.ext())?;
        Bewit::new(&self.credentials().id, self.ts(), mac, self.ext())
    }
}

/// Extract the `bewit` query parameter from a URL.
///
/// Returns the raw (still encoded) bewit and the URL with the parameter
/// and its separator removed — the URL the bewit's MAC actually covers.
pub fn strip_bewit(url: &str) -> Result<(String, String)> {
    const PREFIX: &str = "bewit=";

    let (base, query) = match url.find('?') {
        Some(at) => (&url[..at], &url[at + 1..]),
        None => return Err(InvalidBewit::Missing.into()),
    };

    let mut bewits: Vec<&str> = vec![];
    let rest: Vec<&str> = query
        .split('&')
        .filter(|comp| {
            if comp.starts_with(PREFIX) {
                bewits.push(&comp[PREFIX.len()..]);
                false
            } else {
                true
            }
        })
        .collect();

    match bewits.len() {
        0 => Err(InvalidBewit::Missing.into()),
        1 => {
            let stripped = if rest.is_empty() {
                base.to_string()
            } else {
                format!("{}?{}", base, rest.join("&"))
            };
            Ok((bewits[0].to_string(), stripped))
        }
        _ => Err(InvalidBewit::Multiple.into()),
    }
}

/// Validate a bewit-carrying URL end to end: strip, parse, look up the
/// credentials, verify the MAC over the stripped URL, and check
/// expiration. `now` defaults to the current time.
///
/// The MAC is checked before expiration, so an expired token is only
/// reported as expired when it was genuine.
pub fn check_bewit(
    url: &str,
    lookup: &dyn CredentialsLookup,
    now: Option<u64>,
) -> Result<Bewit<'static>> {
    let (raw, stripped_url) = strip_bewit(url)?;
    let bewit = Bewit::from_str(&raw)?;

    let credentials = lookup.lookup(bewit.id())?;

    let resource = ResourceBuilder::new(&credentials, &stripped_url, "GET")?
        .timestamp(bewit.exp())
        .nonce("")
        .build();
    let mac = resource.mac(MacType::Bewit, None, bewit.ext())?;
    if mac != *bewit.mac() {
        return Err(Error::MacMismatch);
    }

    let now = now.unwrap_or_else(|| util::utc_now(0));
    if bewit.exp() < now {
        log::debug!("bewit expired at {}, local time {}", bewit.exp(), now);
        return Err(Error::TokenExpired {
            localtime_in_seconds: now,
            www_authenticate: None,
        });
    }

    Ok(bewit)
}
