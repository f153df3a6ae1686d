mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::mocks::{MockKeyring, MockTransport};
use keyflock::core::errors::KeyflockError;
use keyflock::core::models::fingerprint::Fingerprint;
use keyflock::core::services::validator::{AuthorityValidator, ValidatorParams, ValidatorPhase};

const AUTHORITY: &str = "927F419567FC5CE5E29520B2126838368A4E3B5D";
const MEMBER_A: &str = "AAAABBBBCCCCDDDDEEEEFFFF0000111122223333";
const MEMBER_B: &str = "BBBBCCCCDDDDEEEEFFFF0000111122223333AAAA";
const URL: &str = "https://example.org/keylist.txt";
const SIG_URL: &str = "https://example.org/keylist.txt.sig";

const KEYLIST_BODY: &[u8] =
    b"# org keys\nAAAABBBBCCCCDDDDEEEEFFFF0000111122223333\n\nBBBBCCCCDDDDEEEEFFFF0000111122223333AAAA\n";
const SIGNATURE: &[u8] = b"-----BEGIN PGP SIGNATURE-----\nfake\n-----END PGP SIGNATURE-----\n";

fn fpr(s: &str) -> Fingerprint {
    Fingerprint::parse(s).unwrap()
}

fn setup() -> (Arc<MockTransport>, Arc<MockKeyring>, AuthorityValidator) {
    let transport = Arc::new(MockTransport::new());
    let keyring = Arc::new(MockKeyring::new());
    let validator = AuthorityValidator::new(
        transport.clone(),
        keyring.clone(),
        "hkps://keys.example.net",
        Duration::from_secs(5),
    );
    (transport, keyring, validator)
}

fn params() -> ValidatorParams {
    ValidatorParams {
        fingerprint: AUTHORITY.to_string(),
        url: URL.to_string(),
        keyserver: String::new(),
        use_proxy: false,
        proxy_host: String::new(),
        proxy_port: String::new(),
    }
}

/// Script a world where the keylist validates cleanly.
fn script_happy_path(transport: &MockTransport, keyring: &MockKeyring) {
    keyring.serve_key(&fpr(AUTHORITY));
    transport.respond(URL, KEYLIST_BODY);
    transport.respond(SIG_URL, SIGNATURE);
    keyring.trust_signature(KEYLIST_BODY, SIGNATURE, &fpr(AUTHORITY));
}

// ─── Success path ───────────────────────────────────────────────

#[test]
fn returns_fingerprints_in_file_order() {
    let (transport, keyring, validator) = setup();
    script_happy_path(&transport, &keyring);

    let validated = validator.validate(&params()).unwrap();
    assert_eq!(validated.config.fingerprint, fpr(AUTHORITY));
    assert_eq!(
        validated.members,
        vec![fpr(MEMBER_A), fpr(MEMBER_B)],
        "comments and blank lines dropped, order preserved"
    );
}

#[test]
fn imports_the_authority_key() {
    let (transport, keyring, validator) = setup();
    script_happy_path(&transport, &keyring);

    validator.validate(&params()).unwrap();
    assert!(keyring.has_local(&fpr(AUTHORITY)));
}

#[test]
fn normalizes_the_input_fingerprint() {
    let (transport, keyring, validator) = setup();
    script_happy_path(&transport, &keyring);

    let mut params = params();
    params.fingerprint = "0x927f 4195 67fc 5ce5 e295 20b2 1268 3836 8a4e 3b5d".to_string();
    let validated = validator.validate(&params).unwrap();
    assert_eq!(validated.config.fingerprint, fpr(AUTHORITY));
}

#[test]
fn reports_phases_in_order() {
    let (transport, keyring, validator) = setup();
    script_happy_path(&transport, &keyring);

    let handle = validator.start(params());
    let phases: Vec<ValidatorPhase> = handle.phases().iter().collect();
    assert_eq!(
        phases,
        vec![
            ValidatorPhase::FetchingAuthorityKey,
            ValidatorPhase::FetchingKeylist,
            ValidatorPhase::VerifyingSignature,
            ValidatorPhase::ParsingFingerprints,
        ]
    );
    assert!(matches!(handle.wait(), Some(Ok(_))));
}

// ─── Input validation, before any network access ────────────────

#[test]
fn empty_fingerprint_fails_without_network() {
    let (transport, keyring, validator) = setup();
    script_happy_path(&transport, &keyring);

    let mut params = params();
    params.fingerprint = String::new();
    let err = validator.validate(&params).unwrap_err();
    assert!(matches!(err, KeyflockError::InvalidFingerprint { .. }));
    assert_eq!(transport.call_count(), 0);
    assert_eq!(keyring.fetch_calls(), 0);
}

#[test]
fn invalid_proxy_port_fails_without_network() {
    let (transport, keyring, validator) = setup();
    script_happy_path(&transport, &keyring);

    let mut params = params();
    params.use_proxy = true;
    params.proxy_host = "127.0.0.1".to_string();
    params.proxy_port = "99999".to_string();
    let err = validator.validate(&params).unwrap_err();
    assert!(matches!(err, KeyflockError::InvalidProxyConfig { .. }));
    assert_eq!(transport.call_count(), 0);
    assert_eq!(keyring.fetch_calls(), 0);
}

// ─── Failure classification ─────────────────────────────────────

#[test]
fn unreachable_keyserver_is_authority_fetch_failure() {
    let (_transport, keyring, validator) = setup();
    keyring.set_keyserver_down(true);

    let err = validator.validate(&params()).unwrap_err();
    assert!(matches!(err, KeyflockError::AuthorityKeyFetchFailed { .. }));
}

#[test]
fn keylist_timeout_is_fetch_failure() {
    let (transport, keyring, validator) = setup();
    keyring.serve_key(&fpr(AUTHORITY));
    transport.time_out(URL);

    let err = validator.validate(&params()).unwrap_err();
    match err {
        KeyflockError::KeylistFetchFailed { url, .. } => assert_eq!(url, URL),
        other => panic!("expected KeylistFetchFailed, got {other:?}"),
    }
}

#[test]
fn missing_signature_file_is_fetch_failure() {
    let (transport, keyring, validator) = setup();
    keyring.serve_key(&fpr(AUTHORITY));
    transport.respond(URL, KEYLIST_BODY);
    transport.fail(SIG_URL, "404 Not Found");

    let err = validator.validate(&params()).unwrap_err();
    match err {
        KeyflockError::KeylistFetchFailed { url, .. } => assert_eq!(url, SIG_URL),
        other => panic!("expected KeylistFetchFailed, got {other:?}"),
    }
}

/// The initial verification failing is a hard stop: the caller gets an
/// error and must not persist the record. This is deliberately stricter
/// than the recurring sync, which records the same failure as a warning
/// on an already-trusted record.
#[test]
fn initial_verification_failure_is_a_hard_error() {
    let (transport, keyring, validator) = setup();
    keyring.serve_key(&fpr(AUTHORITY));
    transport.respond(URL, KEYLIST_BODY);
    transport.respond(SIG_URL, SIGNATURE);
    // No trust_signature: verification fails.

    let err = validator.validate(&params()).unwrap_err();
    assert!(matches!(
        err,
        KeyflockError::SignatureVerificationFailed { .. }
    ));
    // The authority key import is persistent even when validation
    // fails later; caching a public key grants no trust.
    assert!(keyring.has_local(&fpr(AUTHORITY)));
}

#[test]
fn signature_by_wrong_key_fails_verification() {
    let (transport, keyring, validator) = setup();
    keyring.serve_key(&fpr(AUTHORITY));
    transport.respond(URL, KEYLIST_BODY);
    transport.respond(SIG_URL, SIGNATURE);
    keyring.trust_signature(KEYLIST_BODY, SIGNATURE, &fpr(MEMBER_A));

    let err = validator.validate(&params()).unwrap_err();
    assert!(matches!(
        err,
        KeyflockError::SignatureVerificationFailed { .. }
    ));
}

#[test]
fn malformed_keylist_line_fails_parse() {
    let (transport, keyring, validator) = setup();
    let body = b"AAAABBBBCCCCDDDDEEEEFFFF0000111122223333\nthis is not a fingerprint\n";
    keyring.serve_key(&fpr(AUTHORITY));
    transport.respond(URL, body);
    transport.respond(SIG_URL, SIGNATURE);
    keyring.trust_signature(body, SIGNATURE, &fpr(AUTHORITY));

    let err = validator.validate(&params()).unwrap_err();
    match err {
        KeyflockError::KeylistParseError { line_number, line } => {
            assert_eq!(line_number, 2);
            assert_eq!(line, "this is not a fingerprint");
        }
        other => panic!("expected KeylistParseError, got {other:?}"),
    }
}

// ─── Cancellation ───────────────────────────────────────────────

#[test]
fn cancelled_validation_discards_its_result() {
    let (transport, keyring, validator) = setup();
    script_happy_path(&transport, &keyring);
    keyring.set_hold(true);

    let handle = validator.start(params());

    // Wait until the worker is inside the authority key fetch.
    let deadline = Instant::now() + Duration::from_secs(5);
    while keyring.fetch_calls() == 0 {
        assert!(Instant::now() < deadline, "worker never started fetching");
        std::thread::sleep(Duration::from_millis(2));
    }

    handle.cancel();
    keyring.set_hold(false);

    // The in-flight fetch completes, but the result is discarded.
    assert!(handle.wait().is_none());
}

#[test]
fn cancel_before_wait_discards_even_a_finished_result() {
    let (transport, keyring, validator) = setup();
    script_happy_path(&transport, &keyring);

    let handle = validator.start(params());
    // Let the workflow finish completely.
    for _ in handle.phases().iter() {}
    handle.cancel();
    assert!(handle.wait().is_none());
}
