use crate::credentials::Credentials;
use crate::error::*;
use crate::mac::{Mac, MacType};
use crate::util;
use url::Url;

/// How many random characters go into a generated nonce.
const NONCE_LENGTH: usize = 6;

/// The immutable bundle of facts a MAC is computed over: method, URL
/// parts, timestamp, nonce, the optional ext/app/dlg annotations, and a
/// reference to the credentials doing the signing.
///
/// A `Resource` is built once per request or response and shared by
/// nothing; senders, receivers and bewits all construct their own view of
/// the resource and compare MACs.
#[derive(Debug)]
pub struct Resource<'a> {
    credentials: &'a Credentials,
    method: String,
    host: String,
    port: u16,
    path: String,
    ts: u64,
    nonce: String,
    ext: Option<String>,
    app: Option<String>,
    dlg: Option<String>,
}

impl<'a> Resource<'a> {
    pub fn credentials(&self) -> &Credentials {
        self.credentials
    }

    /// The HTTP method, uppercased.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The explicit port, or the scheme default.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The path and query exactly as they appear on the request line.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Unix seconds; for a bewit this is the expiration time.
    pub fn ts(&self) -> u64 {
        self.ts
    }

    /// The per-request nonce; empty only for bewits.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn ext(&self) -> Option<&str> {
        self.ext.as_deref()
    }

    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    pub fn dlg(&self) -> Option<&str> {
        self.dlg.as_deref()
    }

    /// Compute a MAC over this resource. The hash and ext are supplied by
    /// the caller because they differ by direction: a request MAC covers
    /// the sender's own values, while response and bewit MACs cover values
    /// carried beside the MAC.
    pub(crate) fn mac(
        &self,
        mac_type: MacType,
        hash: Option<&[u8]>,
        ext: Option<&str>,
    ) -> Result<Mac> {
        Mac::new(
            mac_type,
            &self.credentials.key,
            self.ts,
            &self.nonce,
            &self.method,
            &self.host,
            self.port,
            &self.path,
            hash,
            ext,
            self.app.as_deref(),
            self.dlg.as_deref(),
        )
    }
}

/// Builder for [`Resource`].
///
/// The URL is decomposed eagerly, so an unusable URL fails here rather than
/// at MAC time. An unset timestamp becomes the current time and an unset
/// nonce becomes a fresh random string when the resource is built.
#[derive(Debug)]
pub struct ResourceBuilder<'a> {
    credentials: &'a Credentials,
    method: String,
    host: String,
    port: u16,
    path: String,
    ts: Option<u64>,
    nonce: Option<String>,
    ext: Option<String>,
    app: Option<String>,
    dlg: Option<String>,
}

impl<'a> ResourceBuilder<'a> {
    pub fn new(credentials: &'a Credentials, url: &str, method: &str) -> Result<Self> {
        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::Usage("method must be a non-empty token"));
        }

        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("{} has no host", url)))?
            .to_string();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| Error::InvalidUrl(format!("{} has no port", url)))?;
        let path = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };

        Ok(ResourceBuilder {
            credentials,
            method: method.to_uppercase(),
            host,
            port,
            path,
            ts: None,
            nonce: None,
            ext: None,
            app: None,
            dlg: None,
        })
    }

    /// Set the timestamp, in unix seconds. For bewits this is the
    /// expiration time.
    pub fn timestamp(mut self, ts: u64) -> Self {
        self.ts = Some(ts);
        self
    }

    pub fn nonce<S: Into<String>>(mut self, nonce: S) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn ext<S: Into<String>>(mut self, ext: S) -> Self {
        self.ext = Some(ext.into());
        self
    }

    pub fn app<S: Into<String>>(mut self, app: S) -> Self {
        self.app = Some(app.into());
        self
    }

    pub fn dlg<S: Into<String>>(mut self, dlg: S) -> Self {
        self.dlg = Some(dlg.into());
        self
    }

    pub fn build(self) -> Resource<'a> {
        Resource {
            credentials: self.credentials,
            method: self.method,
            host: self.host,
            port: self.port,
            path: self.path,
            ts: self.ts.unwrap_or_else(|| util::utc_now(0)),
            nonce: self
                .nonce
                .unwrap_or_else(|| util::random_string(NONCE_LENGTH)),
            ext: self.ext,
            app: self.app,
            dlg: self.dlg,
        }
    }
}
