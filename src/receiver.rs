use crate::authority::{self, Verification, DEFAULT_TIMESTAMP_SKEW};
use crate::credentials::{Credentials, CredentialsLookup};
use crate::error::*;
use crate::header::Header;
use crate::mac::MacType;
use crate::payload::{self, Supplied};
use crate::resource::ResourceBuilder;
use std::str::FromStr;

/// The replay predicate: has this (id, nonce, ts) triple been seen inside
/// the skew window?
///
/// The store is owned by the caller; a first call for a triple must return
/// false and subsequent calls true, atomically with respect to concurrent
/// receivers. Verification consults it only after every other check has
/// passed, so invalid requests never consume store entries.
pub trait SeenNonce {
    fn seen(&self, id: &str, nonce: &str, ts: u64) -> bool;
}

impl<F> SeenNonce for F
where
    F: Fn(&str, &str, u64) -> bool,
{
    fn seen(&self, id: &str, nonce: &str, ts: u64) -> bool {
        self(id, nonce, ts)
    }
}

/// Builds the server half of a Hawk exchange: parse the incoming
/// `Authorization` header, look up the sender's credentials, and verify.
///
/// ```no_run
/// use harrier::{Credentials, Error, ReceiverBuilder, Supplied};
///
/// let lookup = |id: &str| match id {
///     "my-hawk-id" => Credentials::new("my-hawk-id", "my hAwK sekret", "sha256"),
///     _ => Err(Error::CredentialsLookupError),
/// };
/// # let incoming = String::new();
/// let receiver = ReceiverBuilder::new(&lookup, Some(&incoming), "http://site.com/foo?bar=1", "POST")
///     .content(b"foo=bar")
///     .content_type("application/x-www-form-urlencoded")
///     .receive()
///     .unwrap();
/// let response_header = receiver
///     .respond(Supplied::Value(b"we are friends".as_ref()), Supplied::Value("text/plain"), None)
///     .unwrap();
/// ```
pub struct ReceiverBuilder<'a> {
    lookup: &'a dyn CredentialsLookup,
    authorization: Option<&'a str>,
    url: &'a str,
    method: &'a str,
    content: Supplied<&'a [u8]>,
    content_type: Supplied<&'a str>,
    seen_nonce: Option<&'a dyn SeenNonce>,
    localtime_offset: i64,
    timestamp_skew: u64,
    accept_untrusted_content: bool,
}

impl<'a> ReceiverBuilder<'a> {
    pub fn new(
        lookup: &'a dyn CredentialsLookup,
        authorization: Option<&'a str>,
        url: &'a str,
        method: &'a str,
    ) -> Self {
        ReceiverBuilder {
            lookup,
            authorization,
            url,
            method,
            content: Supplied::Omitted,
            content_type: Supplied::Omitted,
            seen_nonce: None,
            localtime_offset: 0,
            timestamp_skew: DEFAULT_TIMESTAMP_SKEW,
            accept_untrusted_content: false,
        }
    }

    /// The request body as received. Not calling this leaves the payload
    /// unvouched-for on our side; the header's `hash` parameter then
    /// decides what happens (see [`Supplied`]).
    pub fn content(mut self, content: &'a [u8]) -> Self {
        self.content = Supplied::Value(content);
        self
    }

    pub fn content_type(mut self, content_type: &'a str) -> Self {
        self.content_type = Supplied::Value(content_type);
        self
    }

    /// Provide the replay-detection store. Without one, replays are not
    /// detected (and a warning is logged).
    pub fn seen_nonce(mut self, seen_nonce: &'a dyn SeenNonce) -> Self {
        self.seen_nonce = Some(seen_nonce);
        self
    }

    /// Correction, in seconds, applied to the local clock before the skew
    /// check.
    pub fn localtime_offset(mut self, offset: i64) -> Self {
        self.localtime_offset = offset;
        self
    }

    /// Tolerated clock difference, in seconds. Defaults to 60.
    pub fn timestamp_skew(mut self, skew: u64) -> Self {
        self.timestamp_skew = skew;
        self
    }

    /// Accept requests whose header carries no payload hash even though a
    /// payload was received.
    pub fn accept_untrusted_content(mut self, accept: bool) -> Self {
        self.accept_untrusted_content = accept;
        self
    }

    /// Authenticate the request.
    ///
    /// Checks run in a fixed order — timestamp skew, MAC, payload hash,
    /// nonce — and the error reports the first failure.
    pub fn receive(self) -> Result<Receiver> {
        let authorization = self.authorization.ok_or(Error::MissingAuthorization)?;
        let header = Header::from_str(authorization)?;

        let id = required(&header.id, "id")?.to_string();
        let ts = header
            .ts
            .ok_or_else(|| Error::BadHeaderValue("header has no ts".to_string()))?;
        let nonce = required(&header.nonce, "nonce")?.to_string();
        if header.mac.is_none() {
            return Err(Error::BadHeaderValue("header has no mac".to_string()));
        }

        let credentials = self.lookup.lookup(&id)?;
        log::debug!("looked up credentials for id {}", id);

        let mut builder = ResourceBuilder::new(&credentials, self.url, self.method)?
            .timestamp(ts)
            .nonce(&nonce[..]);
        if let Some(ref ext) = header.ext {
            builder = builder.ext(&ext[..]);
        }
        if let Some(ref app) = header.app {
            builder = builder.app(&app[..]);
        }
        if let Some(ref dlg) = header.dlg {
            builder = builder.dlg(&dlg[..]);
        }
        let resource = builder.build();

        authority::authorize(
            MacType::Header,
            &header,
            &resource,
            &Verification {
                their_timestamp: ts,
                timestamp_skew: self.timestamp_skew,
                localtime_offset: self.localtime_offset,
                accept_untrusted_content: self.accept_untrusted_content,
                content: self.content,
                content_type: self.content_type,
                seen_nonce: self.seen_nonce,
            },
        )?;

        Ok(Receiver {
            credentials,
            url: self.url.to_string(),
            method: self.method.to_string(),
            ts,
            nonce,
            app: header.app,
            dlg: header.dlg,
        })
    }
}

fn required<'h>(value: &'h Option<String>, key: &str) -> Result<&'h str> {
    value
        .as_deref()
        .ok_or_else(|| Error::BadHeaderValue(format!("header has no {}", key)))
}

/// An authenticated request, ready to produce a `Server-Authorization`
/// response header.
pub struct Receiver {
    credentials: Credentials,
    url: String,
    method: String,
    ts: u64,
    nonce: String,
    app: Option<String>,
    dlg: Option<String>,
}

impl Receiver {
    /// The credentials the request authenticated with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Produce the `Server-Authorization` header for a response payload.
    ///
    /// The response reuses the request's timestamp and nonce — the server
    /// does not mint new ones — and binds the request's app/dlg if they
    /// were present. The header carries only `mac`, `hash` and `ext`.
    pub fn respond(
        &self,
        content: Supplied<&[u8]>,
        content_type: Supplied<&str>,
        ext: Option<&str>,
    ) -> Result<String> {
        self.respond_with(content, content_type, ext, true)
    }

    /// As [`respond`](Self::respond), with control over whether an
    /// entirely omitted payload is an error or an unhashed response.
    pub fn respond_with(
        &self,
        content: Supplied<&[u8]>,
        content_type: Supplied<&str>,
        ext: Option<&str>,
        always_hash_content: bool,
    ) -> Result<String> {
        log::debug!("generating response header for id {}", self.credentials.id);
        let mut builder = ResourceBuilder::new(&self.credentials, &self.url, &self.method)?
            .timestamp(self.ts)
            .nonce(&self.nonce[..]);
        if let Some(ref app) = self.app {
            builder = builder.app(&app[..]);
        }
        if let Some(ref dlg) = self.dlg {
            builder = builder.dlg(&dlg[..]);
        }
        let resource = builder.build();

        let hash = payload::issued_hash(
            content,
            content_type,
            always_hash_content,
            self.credentials.key.algorithm(),
        )?;
        let mac = resource.mac(MacType::Response, hash.as_deref(), ext)?;

        let header = Header::new(None, None, None, Some(mac), ext, hash, None, None)?;
        Ok(header.to_string())
    }
}
