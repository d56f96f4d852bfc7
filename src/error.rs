use failure::Fail;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The ways a Hawk transaction can fail.
///
/// Every variant is a terminal outcome; nothing is retried internally.
/// Display messages are intended for the operator's logs — never echo
/// them to the remote party, as they can hint at what went wrong to an
/// attacker probing the endpoint.
#[derive(Debug, Fail)]
pub enum Error {
    /// A credentials record was malformed, such as an unknown algorithm name.
    #[fail(display = "invalid credentials")]
    InvalidCredentials,

    /// The credentials lookup could not resolve the given id.
    #[fail(display = "could not look up credentials for id")]
    CredentialsLookupError,

    /// A receiver was invoked without an Authorization header.
    #[fail(display = "no authorization header was provided")]
    MissingAuthorization,

    /// A header could not be parsed or rendered: bad grammar, an illegal
    /// byte in a value, an unknown or duplicated key, or an oversized header.
    #[fail(display = "bad header value: {}", _0)]
    BadHeaderValue(String),

    /// The authorization scheme was something other than `Hawk`.
    #[fail(display = "unknown authorization scheme: {}", _0)]
    UnknownScheme(String),

    /// The locally calculated MAC did not match the one that was sent.
    #[fail(display = "MACs do not match")]
    MacMismatch,

    /// The payload hash did not match the received content.
    #[fail(display = "payload hash does not match the content")]
    MisComputedContentHash,

    /// A timestamp (or bewit expiration) fell outside the allowed window.
    ///
    /// `localtime_in_seconds` is the local clock reading used for the
    /// comparison. For header verification, `www_authenticate` carries a
    /// challenge with that timestamp and its MAC, which the peer can verify
    /// before trusting it to compute a clock offset.
    #[fail(display = "token expired; local time {}", localtime_in_seconds)]
    TokenExpired {
        localtime_in_seconds: u64,
        www_authenticate: Option<String>,
    },

    /// The nonce store has seen this (id, nonce, ts) before.
    #[fail(display = "request was already processed")]
    AlreadyProcessed,

    /// A payload's content or content type was required but not supplied.
    #[fail(display = "payload content and/or content type were missing")]
    MissingContent,

    /// A bewit was structurally invalid.
    #[fail(display = "invalid bewit: {}", _0)]
    InvalidBewit(InvalidBewit),

    /// A URL could not be broken into the parts a resource needs.
    #[fail(display = "invalid URL: {}", _0)]
    InvalidUrl(String),

    /// The caller asked for something the protocol does not permit, such as
    /// a bewit for a non-GET request. Not a security failure.
    #[fail(display = "{}", _0)]
    Usage(&'static str),

    /// An I/O failure while streaming a payload through the hasher.
    #[fail(display = "{}", _0)]
    Io(#[fail(cause)] std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(original: std::io::Error) -> Self {
        Error::Io(original)
    }
}

/// The specific way a bewit failed to parse or be located.
#[derive(Debug, Fail, PartialEq, Eq)]
pub enum InvalidBewit {
    #[fail(display = "no bewit in URL")]
    Missing,
    #[fail(display = "multiple bewits in URL")]
    Multiple,
    #[fail(display = "invalid bewit format")]
    Format,
    #[fail(display = "invalid bewit id")]
    Id,
    #[fail(display = "invalid bewit expiration")]
    Exp,
    #[fail(display = "invalid bewit mac")]
    Mac,
    #[fail(display = "invalid bewit ext")]
    Ext,
}

impl From<InvalidBewit> for Error {
    fn from(original: InvalidBewit) -> Self {
        Error::InvalidBewit(original)
    }
}
