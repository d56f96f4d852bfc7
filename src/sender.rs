use crate::authority::{self, Verification, DEFAULT_TIMESTAMP_SKEW};
use crate::credentials::Credentials;
use crate::error::*;
use crate::header::Header;
use crate::mac::{Mac, MacType};
use crate::payload::{self, Supplied};
use crate::resource::{Resource, ResourceBuilder};
use std::str::FromStr;

/// Knobs for accepting a server's response.
#[derive(Debug, Clone)]
pub struct AcceptOptions {
    /// Accept a response whose header carries no payload hash, whatever the
    /// body was.
    pub accept_untrusted_content: bool,
    /// Correction, in seconds, applied to the local clock.
    pub localtime_offset: i64,
    /// Tolerated clock difference, in seconds.
    pub timestamp_skew: u64,
}

impl Default for AcceptOptions {
    fn default() -> Self {
        AcceptOptions {
            accept_untrusted_content: false,
            localtime_offset: 0,
            timestamp_skew: DEFAULT_TIMESTAMP_SKEW,
        }
    }
}

/// Builds the client half of a Hawk exchange.
///
/// ```
/// use harrier::{Credentials, SenderBuilder};
///
/// let credentials = Credentials::new("my-hawk-id", "my hAwK sekret", "sha256").unwrap();
/// let sender = SenderBuilder::new(&credentials, "http://site.com/foo?bar=1", "POST")
///     .content(b"foo=bar")
///     .content_type("application/x-www-form-urlencoded")
///     .send()
///     .unwrap();
/// assert!(sender.request_header().starts_with("Hawk id=\"my-hawk-id\""));
/// ```
pub struct SenderBuilder<'a> {
    credentials: &'a Credentials,
    url: &'a str,
    method: &'a str,
    content: Supplied<&'a [u8]>,
    content_type: Supplied<&'a str>,
    always_hash_content: bool,
    timestamp: Option<u64>,
    nonce: Option<&'a str>,
    ext: Option<&'a str>,
    app: Option<&'a str>,
    dlg: Option<&'a str>,
}

impl<'a> SenderBuilder<'a> {
    pub fn new(credentials: &'a Credentials, url: &'a str, method: &'a str) -> Self {
        SenderBuilder {
            credentials,
            url,
            method,
            content: Supplied::Omitted,
            content_type: Supplied::Omitted,
            always_hash_content: true,
            timestamp: None,
            nonce: None,
            ext: None,
            app: None,
            dlg: None,
        }
    }

    /// The request body. Pass an empty slice for a bodyless request you
    /// still want vouched for; not calling this at all means the payload
    /// goes unvouched (see [`Supplied`]).
    pub fn content(mut self, content: &'a [u8]) -> Self {
        self.content = Supplied::Value(content);
        self
    }

    pub fn content_type(mut self, content_type: &'a str) -> Self {
        self.content_type = Supplied::Value(content_type);
        self
    }

    /// When true (the default), refusing to say anything about the payload
    /// is an error rather than a header without a `hash` parameter.
    pub fn always_hash_content(mut self, always: bool) -> Self {
        self.always_hash_content = always;
        self
    }

    /// Override the generated timestamp (unix seconds).
    pub fn timestamp(mut self, ts: u64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Override the generated nonce.
    pub fn nonce(mut self, nonce: &'a str) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn ext(mut self, ext: &'a str) -> Self {
        self.ext = Some(ext);
        self
    }

    pub fn app(mut self, app: &'a str) -> Self {
        self.app = Some(app);
        self
    }

    pub fn dlg(mut self, dlg: &'a str) -> Self {
        self.dlg = Some(dlg);
        self
    }

    /// Issue the request: hash the payload, MAC the resource, and render
    /// the `Authorization` header.
    pub fn send(self) -> Result<Sender<'a>> {
        let mut builder = ResourceBuilder::new(self.credentials, self.url, self.method)?;
        if let Some(ts) = self.timestamp {
            builder = builder.timestamp(ts);
        }
        if let Some(nonce) = self.nonce {
            builder = builder.nonce(nonce);
        }
        if let Some(ext) = self.ext {
            builder = builder.ext(ext);
        }
        if let Some(app) = self.app {
            builder = builder.app(app);
        }
        if let Some(dlg) = self.dlg {
            builder = builder.dlg(dlg);
        }
        let resource = builder.build();

        let hash = payload::issued_hash(
            self.content,
            self.content_type,
            self.always_hash_content,
            self.credentials.key.algorithm(),
        )?;
        let mac = resource.mac(MacType::Header, hash.as_deref(), resource.ext())?;

        let header = Header::new(
            Some(&self.credentials.id[..]),
            Some(resource.ts()),
            Some(resource.nonce()),
            Some(mac),
            resource.ext(),
            hash,
            resource.app(),
            resource.dlg(),
        )?;
        log::debug!("issued request header for id {}", self.credentials.id);

        Ok(Sender {
            resource,
            request_header: header.to_string(),
        })
    }
}

/// An issued request, holding the header to transmit and the state needed
/// to verify the eventual response.
pub struct Sender<'a> {
    resource: Resource<'a>,
    request_header: String,
}

impl<'a> Sender<'a> {
    /// The value for the request's `Authorization` header.
    pub fn request_header(&self) -> &str {
        &self.request_header
    }

    /// Verify a `Server-Authorization` response header against this
    /// request, with default options.
    ///
    /// The response MAC is recomputed from the request's own method, URL
    /// parts, timestamp and nonce — a responder reuses the request's
    /// identity rather than minting its own — combined with the hash and
    /// ext the server sent.
    pub fn accept_response(
        &self,
        response_header: &str,
        content: Supplied<&[u8]>,
        content_type: Supplied<&str>,
    ) -> Result<()> {
        self.accept_response_with(response_header, content, content_type, &AcceptOptions::default())
    }

    /// As [`accept_response`](Self::accept_response), with explicit
    /// clock-handling and payload options.
    pub fn accept_response_with(
        &self,
        response_header: &str,
        content: Supplied<&[u8]>,
        content_type: Supplied<&str>,
        options: &AcceptOptions,
    ) -> Result<()> {
        log::debug!("accepting response header {}", response_header);
        let header = Header::from_str(response_header)?;
        authority::authorize(
            MacType::Response,
            &header,
            &self.resource,
            &Verification {
                their_timestamp: self.resource.ts(),
                timestamp_skew: options.timestamp_skew,
                localtime_offset: options.localtime_offset,
                accept_untrusted_content: options.accept_untrusted_content,
                content,
                content_type,
                seen_nonce: None,
            },
        )
    }

    /// Validate a `WWW-Authenticate` expiry challenge and recover the
    /// server's clock reading, so the caller can compute a local offset
    /// without trusting an unauthenticated time value. A challenge whose
    /// `tsm` does not verify is a MAC mismatch like any other.
    pub fn accept_timestamp_challenge(&self, www_authenticate: &str) -> Result<u64> {
        let header = Header::from_str(www_authenticate)?;
        let ts = header
            .ts
            .ok_or_else(|| Error::BadHeaderValue("challenge has no ts".to_string()))?;
        let tsm = header
            .tsm
            .ok_or_else(|| Error::BadHeaderValue("challenge has no tsm".to_string()))?;
        let expected = Mac::for_timestamp(&self.resource.credentials().key, ts);
        if expected != tsm {
            return Err(Error::MacMismatch);
        }
        Ok(ts)
    }
}
