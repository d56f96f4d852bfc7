//! End-to-end exercises of the sender/receiver protocol: a client issues a
//! request header, a server authenticates it and responds, and the client
//! verifies the response. No HTTP transport is involved; the headers are
//! exchanged as strings, which is all the protocol ever sees.

use harrier::{
    AcceptOptions, Credentials, Error, Header, Mac, ReceiverBuilder, Result, SeenNonce,
    SenderBuilder, Supplied,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

const URL: &str = "http://site.com/foo?bar=1";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn credentials() -> Credentials {
    Credentials::new("my-hawk-id", "my hAwK sekret", "sha256").unwrap()
}

fn lookup(id: &str) -> Result<Credentials> {
    if id == "my-hawk-id" {
        Ok(credentials())
    } else {
        Err(Error::CredentialsLookupError)
    }
}

/// A tiny in-memory nonce store: first sighting of a triple is false,
/// everything after is true.
struct MemoryNonceStore(RefCell<HashSet<(String, String, u64)>>);

impl MemoryNonceStore {
    fn new() -> Self {
        MemoryNonceStore(RefCell::new(HashSet::new()))
    }
}

impl SeenNonce for MemoryNonceStore {
    fn seen(&self, id: &str, nonce: &str, ts: u64) -> bool {
        !self
            .0
            .borrow_mut()
            .insert((id.to_string(), nonce.to_string(), ts))
    }
}

/// Issue a request with empty (but vouched-for) content, in the way most
/// tests need it.
fn issue(method: &str) -> String {
    let credentials = credentials();
    SenderBuilder::new(&credentials, URL, method)
        .content(b"")
        .content_type("")
        .send()
        .unwrap()
        .request_header()
        .to_string()
}

/// Authenticate a request header with empty content and default options.
fn receive(header: &str, url: &str, method: &str) -> Result<harrier::Receiver> {
    ReceiverBuilder::new(&lookup, Some(header), url, method)
        .content(b"")
        .content_type("")
        .receive()
}

#[test]
fn send_and_receive() {
    // The full exchange, with the payloads bound on both legs.
    let credentials = Credentials::new("some-id", "some secret", "sha256").unwrap();
    let url = "https://my-site.com/";

    let sender = SenderBuilder::new(&credentials, url, "POST")
        .content(b"foo=bar&baz=nooz")
        .content_type("application/x-www-form-urlencoded")
        .send()
        .unwrap();

    let lookup = |id: &str| match id {
        "some-id" => Credentials::new("some-id", "some secret", "sha256"),
        _ => Err(Error::CredentialsLookupError),
    };
    let receiver = ReceiverBuilder::new(&lookup, Some(sender.request_header()), url, "POST")
        .content(b"foo=bar&baz=nooz")
        .content_type("application/x-www-form-urlencoded")
        .receive()
        .unwrap();

    let response_header = receiver
        .respond(
            Supplied::Value(b"we are friends".as_ref()),
            Supplied::Value("text/plain"),
            None,
        )
        .unwrap();

    sender
        .accept_response(
            &response_header,
            Supplied::Value(b"we are friends".as_ref()),
            Supplied::Value("text/plain"),
        )
        .unwrap();
}

#[test]
fn get_and_post_round_trips() {
    for method in &["GET", "POST"] {
        let header = issue(method);
        receive(&header, URL, method).unwrap();
    }
}

#[test]
fn sha512_round_trip() {
    let credentials = Credentials::new("my-hawk-id", "my hAwK sekret", "sha512").unwrap();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    let lookup = |_: &str| Credentials::new("my-hawk-id", "my hAwK sekret", "sha512");
    ReceiverBuilder::new(&lookup, Some(sender.request_header()), URL, "GET")
        .content(b"")
        .content_type("")
        .receive()
        .unwrap();
}

#[test]
fn content_type_parameters_do_not_affect_verification() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "POST")
        .content(b"{\"bar\": \"foobs\"}")
        .content_type("application/json; charset=utf8")
        .send()
        .unwrap();
    ReceiverBuilder::new(&lookup, Some(sender.request_header()), URL, "POST")
        .content(b"{\"bar\": \"foobs\"}")
        .content_type("application/json; charset=other")
        .receive()
        .unwrap();
}

#[test]
fn non_ascii_content() {
    let body = "Ivan Kristi\u{0107}".as_bytes();
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "POST")
        .content(body)
        .content_type("")
        .send()
        .unwrap();
    ReceiverBuilder::new(&lookup, Some(sender.request_header()), URL, "POST")
        .content(body)
        .content_type("")
        .receive()
        .unwrap();
}

#[test]
fn tampering_with_the_request_line_is_detected() {
    let cases: &[(&str, &str)] = &[
        ("http://tampered-with.com/foo?bar=1", "GET"), // host
        ("http://site.com/TAMPERED?bar=1", "GET"),     // path
        ("http://site.com/foo?bar=TAMPERED", "GET"),   // query
        ("https://site.com/foo?bar=1", "GET"),         // scheme (and default port)
        ("http://site.com:8000/foo?bar=1", "GET"),     // port
        (URL, "POST"),                                 // method
    ];
    for (url, method) in cases {
        let header = issue("GET");
        match receive(&header, url, method) {
            Err(Error::MacMismatch) => (),
            other => panic!(
                "expected MacMismatch for {} {}, got {:?}",
                method,
                url,
                other.map(|_| ())
            ),
        }
    }
}

#[test]
fn tampering_with_content_is_detected() {
    let header = issue("POST");
    let result = ReceiverBuilder::new(&lookup, Some(&header), URL, "POST")
        .content(b"stuff=nope")
        .content_type("")
        .receive();
    assert!(matches!(result, Err(Error::MisComputedContentHash)));
}

#[test]
fn tampering_with_header_parameters_is_detected() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .ext("my external data")
        .app("real-app")
        .dlg("real-dlg")
        .send()
        .unwrap();
    let header = sender.request_header();

    for (from, to) in &[
        ("my external data", "TAMPERED"),
        ("real-app", "TAMPERED-WITH"),
        ("real-dlg", "TAMPERED-WITH"),
        ("hash=\"", "hash=\"AAAA"),
    ] {
        let tampered = header.replace(from, to);
        match receive(&tampered, URL, "GET") {
            Err(Error::MacMismatch) => (),
            other => panic!(
                "expected MacMismatch for {} -> {}, got {:?}",
                from,
                to,
                other.map(|_| ())
            ),
        }
    }
}

#[test]
fn wrong_secret_is_detected() {
    let bad = Credentials::new("my-hawk-id", "INCORRECT; YOU FAIL", "sha256").unwrap();
    let sender = SenderBuilder::new(&bad, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    assert!(matches!(
        receive(sender.request_header(), URL, "GET"),
        Err(Error::MacMismatch)
    ));
}

#[test]
fn wrong_algorithm_is_detected() {
    // The receiver looks up sha256 for this id; a sender signing with
    // sha512 is just a bad MAC from its point of view.
    let other = Credentials::new("my-hawk-id", "my hAwK sekret", "sha512").unwrap();
    let sender = SenderBuilder::new(&other, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    assert!(matches!(
        receive(sender.request_header(), URL, "GET"),
        Err(Error::MacMismatch)
    ));
}

#[test]
fn unknown_id_is_a_lookup_error() {
    let other = Credentials::new("someone-else", "my hAwK sekret", "sha256").unwrap();
    let sender = SenderBuilder::new(&other, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    assert!(matches!(
        receive(sender.request_header(), URL, "GET"),
        Err(Error::CredentialsLookupError)
    ));
}

#[test]
fn lookup_may_reject_a_malformed_record() {
    let header = issue("GET");
    let bad_lookup = |_: &str| -> Result<Credentials> { Err(Error::InvalidCredentials) };
    let result = ReceiverBuilder::new(&bad_lookup, Some(&header), URL, "GET")
        .content(b"")
        .content_type("")
        .receive();
    assert!(matches!(result, Err(Error::InvalidCredentials)));
}

#[test]
fn missing_authorization() {
    let result = ReceiverBuilder::new(&lookup, None, URL, "GET")
        .content(b"")
        .content_type("")
        .receive();
    assert!(matches!(result, Err(Error::MissingAuthorization)));
}

#[test]
fn duplicate_keys_are_rejected() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .ext("someext")
        .send()
        .unwrap();
    let header = format!("{}, ext=\"otherext\"", sender.request_header());
    assert!(matches!(
        receive(&header, URL, "GET"),
        Err(Error::BadHeaderValue(_))
    ));
}

#[test]
fn oversized_headers_are_rejected_on_receipt() {
    let credentials = credentials();
    let big_ext = "a".repeat(5000);
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .ext(&big_ext)
        .send()
        .unwrap();
    assert!(matches!(
        receive(sender.request_header(), URL, "GET"),
        Err(Error::BadHeaderValue(_))
    ));
}

#[test]
fn illegal_ext_bytes_are_rejected_at_issue() {
    let credentials = credentials();
    // every control byte, the quote, the backslash, DEL, and a couple of
    // non-ASCII characters
    let mut bad: Vec<char> = (0x00u8..=0x1f).map(char::from).collect();
    bad.extend(&['"', '\\', '\u{7f}', '\u{107}', '\u{2603}']);
    for ch in bad {
        let ext = format!("prefix{}suffix", ch);
        let result = SenderBuilder::new(&credentials, URL, "GET")
            .content(b"")
            .content_type("")
            .ext(&ext)
            .send();
        assert!(
            matches!(result, Err(Error::BadHeaderValue(_))),
            "ext byte {:?} must be rejected",
            ch
        );
    }
}

#[test]
fn replayed_nonce_is_rejected() {
    let store = MemoryNonceStore::new();
    let header = issue("GET");

    ReceiverBuilder::new(&lookup, Some(&header), URL, "GET")
        .content(b"")
        .content_type("")
        .seen_nonce(&store)
        .receive()
        .unwrap();

    let replay = ReceiverBuilder::new(&lookup, Some(&header), URL, "GET")
        .content(b"")
        .content_type("")
        .seen_nonce(&store)
        .receive();
    assert!(matches!(replay, Err(Error::AlreadyProcessed)));
}

#[test]
fn nonce_is_checked_last() {
    // A request that fails MAC verification must not reach the nonce
    // store, and must report the MAC failure even when the store would
    // also have flagged it.
    let header = issue("GET");
    let always_seen = |_: &str, _: &str, _: u64| true;
    let result = ReceiverBuilder::new(&lookup, Some(&header), URL, "POST")
        .content(b"")
        .content_type("")
        .seen_nonce(&always_seen)
        .receive();
    assert!(matches!(result, Err(Error::MacMismatch)));
}

#[test]
fn expired_timestamp_yields_a_verifiable_challenge() {
    let credentials = credentials();
    let stale = now() - 120;
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .timestamp(stale)
        .send()
        .unwrap();

    match receive(sender.request_header(), URL, "GET") {
        Err(Error::TokenExpired {
            localtime_in_seconds,
            www_authenticate,
        }) => {
            assert!(localtime_in_seconds >= stale + 119);
            let challenge = www_authenticate.expect("challenge must be present");

            // the challenge's tsm verifies under the shared credentials and
            // surfaces the receiver's clock
            let server_time = sender.accept_timestamp_challenge(&challenge).unwrap();
            assert_eq!(server_time, localtime_in_seconds);

            // and it is exactly the MAC of the ts message
            let parsed = Header::from_str(&challenge).unwrap();
            let expected = Mac::for_timestamp(&credentials.key, localtime_in_seconds);
            assert!(parsed.tsm.unwrap() == expected);
        }
        other => panic!("expected TokenExpired, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn localtime_offset_and_skew_overrides() {
    let credentials = credentials();
    let stale = now() - 120;
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .timestamp(stale)
        .send()
        .unwrap();

    // without an adjustment this request is expired
    assert!(matches!(
        receive(sender.request_header(), URL, "GET"),
        Err(Error::TokenExpired { .. })
    ));

    // ...but an offset puts the local clock back within range
    ReceiverBuilder::new(&lookup, Some(sender.request_header()), URL, "GET")
        .content(b"")
        .content_type("")
        .localtime_offset(-120)
        .receive()
        .unwrap();

    // ...and so does widening the skew
    ReceiverBuilder::new(&lookup, Some(sender.request_header()), URL, "GET")
        .content(b"")
        .content_type("")
        .timestamp_skew(125)
        .receive()
        .unwrap();
}

#[test]
fn unhashed_content_needs_an_opt_in() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "POST")
        .always_hash_content(false)
        .send()
        .unwrap();
    assert!(!sender.request_header().contains("hash=\""));

    // opted in: fine
    ReceiverBuilder::new(&lookup, Some(sender.request_header()), URL, "POST")
        .content(b"{\"bar\": \"foobs\"}")
        .content_type("application/json")
        .accept_untrusted_content(true)
        .receive()
        .unwrap();

    // not opted in, with a real payload on our side: rejected
    let result = ReceiverBuilder::new(&lookup, Some(sender.request_header()), URL, "POST")
        .content(b"{\"bar\": \"foobs\"}")
        .content_type("application/json")
        .receive();
    assert!(matches!(result, Err(Error::MisComputedContentHash)));
}

#[test]
fn unhashed_requests_with_no_payload_are_accepted() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .always_hash_content(false)
        .send()
        .unwrap();

    // empty body and content type: nothing was expected, nothing arrived
    receive(sender.request_header(), URL, "GET").unwrap();

    // an unvouched-for body, or a content type suggesting one, is another
    // story
    let cases: &[(&[u8], &str)] = &[(b"", "text/plain"), (b"some content", "")];
    for (content, content_type) in cases {
        let result = ReceiverBuilder::new(&lookup, Some(sender.request_header()), URL, "GET")
            .content(content)
            .content_type(content_type)
            .receive();
        assert!(
            matches!(result, Err(Error::MisComputedContentHash)),
            "content {:?} type {:?}",
            content,
            content_type
        );
    }
}

#[test]
fn empty_payloads_still_get_hashed() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    assert!(sender.request_header().contains("hash=\""));
    receive(sender.request_header(), URL, "GET").unwrap();
}

#[test]
fn half_supplied_receiver_payload_is_an_error() {
    let header = issue("POST");
    let result = ReceiverBuilder::new(&lookup, Some(&header), URL, "POST")
        .content_type("text/plain")
        .receive();
    assert!(matches!(result, Err(Error::MissingContent)));

    let result = ReceiverBuilder::new(&lookup, Some(&header), URL, "POST")
        .content(b"<content>")
        .receive();
    assert!(matches!(result, Err(Error::MissingContent)));
}

#[test]
fn respond_and_accept() {
    let header = issue("GET");
    let receiver = receive(&header, URL, "GET").unwrap();
    let response = receiver
        .respond(
            Supplied::Value(b"real content".as_ref()),
            Supplied::Value("text/html"),
            None,
        )
        .unwrap();

    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    // a *different* sender cannot accept it: its nonce differs
    assert!(matches!(
        sender.accept_response(
            &response,
            Supplied::Value(b"real content".as_ref()),
            Supplied::Value("text/html")
        ),
        Err(Error::MacMismatch)
    ));
}

#[test]
fn respond_with_wrong_content_is_detected() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    let receiver = receive(sender.request_header(), URL, "GET").unwrap();

    let response = receiver
        .respond(
            Supplied::Value(b"real content".as_ref()),
            Supplied::Value("text/html"),
            None,
        )
        .unwrap();

    // body tampered in transit
    assert!(matches!(
        sender.accept_response(
            &response,
            Supplied::Value(b"TAMPERED WITH".as_ref()),
            Supplied::Value("text/html")
        ),
        Err(Error::MisComputedContentHash)
    ));

    // content type tampered in transit
    assert!(matches!(
        sender.accept_response(
            &response,
            Supplied::Value(b"real content".as_ref()),
            Supplied::Value("application/json")
        ),
        Err(Error::MisComputedContentHash)
    ));
}

#[test]
fn respond_with_ext() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    let receiver = receive(sender.request_header(), URL, "GET").unwrap();

    let response = receiver
        .respond(
            Supplied::Value(b"".as_ref()),
            Supplied::Value(""),
            Some("custom-ext"),
        )
        .unwrap();
    let parsed = Header::from_str(&response).unwrap();
    assert_eq!(parsed.ext, Some("custom-ext".to_string()));
    assert!(parsed.id.is_none());
    assert!(parsed.ts.is_none());
    assert!(parsed.nonce.is_none());

    sender
        .accept_response(&response, Supplied::Value(b"".as_ref()), Supplied::Value(""))
        .unwrap();
}

#[test]
fn response_binds_app_and_dlg() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .app("real-app")
        .dlg("delegation")
        .send()
        .unwrap();
    let receiver = receive(sender.request_header(), URL, "GET").unwrap();
    let response = receiver
        .respond(Supplied::Value(b"".as_ref()), Supplied::Value(""), None)
        .unwrap();

    // the right sender accepts it
    sender
        .accept_response(&response, Supplied::Value(b"".as_ref()), Supplied::Value(""))
        .unwrap();

    // a sender with a different app/dlg pair does not, even with matching
    // ts and nonce
    let imposter = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .app("other-app")
        .dlg("delegation")
        .send()
        .unwrap();
    let impostor_receiver = receive(imposter.request_header(), URL, "GET").unwrap();
    let other_response = impostor_receiver
        .respond(Supplied::Value(b"".as_ref()), Supplied::Value(""), None)
        .unwrap();
    assert!(matches!(
        sender.accept_response(
            &other_response,
            Supplied::Value(b"".as_ref()),
            Supplied::Value("")
        ),
        Err(Error::MacMismatch)
    ));
}

#[test]
fn respond_with_expired_ts() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    let receiver = receive(sender.request_header(), URL, "GET").unwrap();
    let response = receiver
        .respond(Supplied::Value(b"".as_ref()), Supplied::Value(""), None)
        .unwrap();

    // wind the local clock back to the epoch; the request's own timestamp
    // is now impossibly far away
    let options = AcceptOptions {
        localtime_offset: -(now() as i64),
        ..AcceptOptions::default()
    };
    match sender.accept_response_with(
        &response,
        Supplied::Value(b"".as_ref()),
        Supplied::Value(""),
        &options,
    ) {
        Err(Error::TokenExpired {
            localtime_in_seconds,
            www_authenticate,
        }) => {
            assert!(localtime_in_seconds <= 2);
            let challenge = www_authenticate.expect("challenge must be present");
            let parsed = Header::from_str(&challenge).unwrap();
            let expected = Mac::for_timestamp(&credentials.key, localtime_in_seconds);
            assert!(parsed.tsm.unwrap() == expected);
        }
        other => panic!("expected TokenExpired, got {:?}", other.map(|_| ())),
    }

    // a skew wide enough to cover the difference makes the same clock fine
    let options = AcceptOptions {
        localtime_offset: -(now() as i64),
        timestamp_skew: now() + 120,
        ..AcceptOptions::default()
    };
    sender
        .accept_response_with(
            &response,
            Supplied::Value(b"".as_ref()),
            Supplied::Value(""),
            &options,
        )
        .unwrap();
}

#[test]
fn respond_without_hash_needs_opt_in_too() {
    let credentials = credentials();
    let sender = SenderBuilder::new(&credentials, URL, "GET")
        .content(b"")
        .content_type("")
        .send()
        .unwrap();
    let receiver = receive(sender.request_header(), URL, "GET").unwrap();

    let response = receiver
        .respond_with(Supplied::Omitted, Supplied::Omitted, None, false)
        .unwrap();
    assert!(!response.contains("hash=\""));

    sender
        .accept_response_with(
            &response,
            Supplied::Omitted,
            Supplied::Omitted,
            &AcceptOptions {
                accept_untrusted_content: true,
                ..AcceptOptions::default()
            },
        )
        .unwrap();
}
