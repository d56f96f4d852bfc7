//! The `harrier` crate authenticates HTTP requests and responses with
//! [Hawk](https://github.com/hueniverse/hawk): a symmetric-key MAC scheme
//! that binds a request's method, URL, timestamp, nonce and (optionally)
//! payload to a shared credential, without sending the secret itself. It is
//! a low-level crate: it produces and verifies header strings, and leaves
//! the HTTP transport, the credentials database and the nonce store to the
//! caller.
//!
//! # Examples
//!
//! ## Request and response
//!
//! A client issues an `Authorization` header with a [`SenderBuilder`]; the
//! server authenticates it with a [`ReceiverBuilder`], using a credentials
//! lookup it supplies, and answers with a `Server-Authorization` header
//! that the client verifies in turn.
//!
//! ```
//! use harrier::{Credentials, Error, ReceiverBuilder, SenderBuilder, Supplied};
//!
//! let credentials = Credentials::new("some-id", "some secret", "sha256").unwrap();
//!
//! // The client signs a request.
//! let sender = SenderBuilder::new(&credentials, "https://my-site.com/", "POST")
//!     .content(b"foo=bar&baz=nooz")
//!     .content_type("application/x-www-form-urlencoded")
//!     .send()
//!     .unwrap();
//! let request_header = sender.request_header().to_string();
//!
//! // The server authenticates the request and responds.
//! let lookup = |id: &str| match id {
//!     "some-id" => Credentials::new("some-id", "some secret", "sha256"),
//!     _ => Err(Error::CredentialsLookupError),
//! };
//! let receiver =
//!     ReceiverBuilder::new(&lookup, Some(&request_header), "https://my-site.com/", "POST")
//!         .content(b"foo=bar&baz=nooz")
//!         .content_type("application/x-www-form-urlencoded")
//!         .receive()
//!         .unwrap();
//! let response_header = receiver
//!     .respond(
//!         Supplied::Value(b"we are friends".as_ref()),
//!         Supplied::Value("text/plain"),
//!         None,
//!     )
//!     .unwrap();
//!
//! // The client verifies the response.
//! sender
//!     .accept_response(
//!         &response_header,
//!         Supplied::Value(b"we are friends".as_ref()),
//!         Supplied::Value("text/plain"),
//!     )
//!     .unwrap();
//! ```
//!
//! ## Bewits
//!
//! A bewit stands in for the header on a GET request, authorizing exactly
//! one URL until an expiration time.
//!
//! ```
//! use harrier::{check_bewit, Credentials, Error, ResourceBuilder};
//!
//! let credentials = Credentials::new("123456", "2983d45yun89q", "sha256").unwrap();
//! let resource = ResourceBuilder::new(
//!     &credentials,
//!     "https://example.com/somewhere/over/the/rainbow",
//!     "GET",
//! )
//! .unwrap()
//! .timestamp(1356420707) // the expiration, as unix seconds
//! .nonce("")
//! .build();
//! let bewit = resource.make_bewit().unwrap();
//!
//! let url = format!(
//!     "https://example.com/somewhere/over/the/rainbow?bewit={}",
//!     bewit.to_str()
//! );
//! let lookup = |id: &str| match id {
//!     "123456" => Credentials::new("123456", "2983d45yun89q", "sha256"),
//!     _ => Err(Error::CredentialsLookupError),
//! };
//! assert!(check_bewit(&url, &lookup, Some(1356420417)).is_ok());
//! ```

mod authority;
mod bewit;
mod credentials;
mod error;
mod header;
mod mac;
mod payload;
mod receiver;
mod resource;
mod sender;
mod util;

pub use crate::authority::DEFAULT_TIMESTAMP_SKEW;
pub use crate::bewit::{check_bewit, strip_bewit, Bewit};
pub use crate::credentials::{Credentials, CredentialsLookup, DigestAlgorithm, Key};
pub use crate::error::{Error, InvalidBewit, Result};
pub use crate::header::{Header, MAX_HEADER_LEN};
pub use crate::mac::{Mac, MacType};
pub use crate::payload::{PayloadHasher, Supplied};
pub use crate::receiver::{Receiver, ReceiverBuilder, SeenNonce};
pub use crate::resource::{Resource, ResourceBuilder};
pub use crate::sender::{AcceptOptions, Sender, SenderBuilder};
