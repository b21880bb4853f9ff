mod common;

use base64::{engine::general_purpose::STANDARD, Engine};
use common::{rsa_keypair, rsa_public_key, sign_rsa, valid_signed_data};
use pretty_assertions::assert_eq;
use rsa::pkcs8::EncodePublicKey;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};
use tollgate_license::{LicenseError, PublicKey, SignatureAlgorithm, SignatureAuthenticator};

fn rsa_sha1() -> SignatureAuthenticator {
    SignatureAuthenticator::default()
}

// ── RSA / SHA-1 ──────────────────────────────────────────────────

#[test]
fn default_algorithm_is_rsa_sha1() {
    assert_eq!(rsa_sha1().algorithm(), SignatureAlgorithm::RsaSha1);
}

#[test]
fn accepts_valid_signature() {
    let data = valid_signed_data(0);
    assert!(rsa_sha1().authenticate(rsa_public_key(), &data, &sign_rsa(&data)).unwrap());
}

#[test]
fn rejects_empty_signed_data() {
    let sig = sign_rsa("");
    assert!(!rsa_sha1().authenticate(rsa_public_key(), "", &sig).unwrap());
}

#[test]
fn rejects_tampered_data() {
    let data = valid_signed_data(0);
    let sig = sign_rsa(&data);
    let mut tampered = data.into_bytes();
    tampered[0] ^= 0x01;
    let tampered = String::from_utf8(tampered).unwrap();
    assert!(!rsa_sha1().authenticate(rsa_public_key(), &tampered, &sig).unwrap());
}

#[test]
fn rejects_tampered_signature() {
    let data = valid_signed_data(0);
    let mut sig = STANDARD.decode(sign_rsa(&data)).unwrap();
    let last = sig.len() - 1;
    sig[last] ^= 0x80;
    assert!(!rsa_sha1()
        .authenticate(rsa_public_key(), &data, &STANDARD.encode(sig))
        .unwrap());
}

#[test]
fn rejects_undecodable_base64() {
    let data = valid_signed_data(0);
    assert!(!rsa_sha1().authenticate(rsa_public_key(), &data, "%%%").unwrap());
}

#[test]
fn rejects_truncated_signature() {
    let data = valid_signed_data(0);
    assert!(!rsa_sha1().authenticate(rsa_public_key(), &data, "AAAA").unwrap());
}

// ── Other algorithms ─────────────────────────────────────────────

#[test]
fn rsa_sha256_round_trip() {
    let data = valid_signed_data(0);
    let digest = Sha256::digest(data.as_bytes());
    let sig = rsa_keypair()
        .0
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .unwrap();
    let auth = SignatureAuthenticator::new(SignatureAlgorithm::RsaSha256);

    assert!(auth.authenticate(rsa_public_key(), &data, &STANDARD.encode(&sig)).unwrap());
    // A SHA-1 signature does not pass as SHA-256.
    assert!(!auth.authenticate(rsa_public_key(), &data, &sign_rsa(&data)).unwrap());
}

#[test]
fn ed25519_round_trip() {
    let (signing_key, public) = common::ed25519_keypair();
    let auth = SignatureAuthenticator::new(SignatureAlgorithm::Ed25519);
    let data = valid_signed_data(0);
    let sig = common::sign_ed25519(&signing_key, &data);

    assert!(auth.authenticate(&public, &data, &sig).unwrap());
    assert!(!auth.authenticate(&public, "0|other", &sig).unwrap());
    assert!(!auth.authenticate(&public, &data, "AAAA").unwrap());
}

#[test]
fn key_algorithm_mismatch_is_invalid_public_key() {
    let (_, ed_key) = common::ed25519_keypair();
    let data = valid_signed_data(0);

    let err = rsa_sha1().authenticate(&ed_key, &data, "AAAA").unwrap_err();
    assert!(matches!(err, LicenseError::InvalidPublicKey(_)), "got {err:?}");

    let ed = SignatureAuthenticator::new(SignatureAlgorithm::Ed25519);
    let err = ed.authenticate(rsa_public_key(), &data, "AAAA").unwrap_err();
    assert!(matches!(err, LicenseError::InvalidPublicKey(_)), "got {err:?}");
}

// ── Algorithm names ──────────────────────────────────────────────

#[test]
fn algorithm_names_parse() {
    for (name, expected) in [
        ("rsa-sha1", SignatureAlgorithm::RsaSha1),
        ("SHA1withRSA", SignatureAlgorithm::RsaSha1),
        ("rsa-sha256", SignatureAlgorithm::RsaSha256),
        ("sha256withrsa", SignatureAlgorithm::RsaSha256),
        (" ed25519 ", SignatureAlgorithm::Ed25519),
    ] {
        assert_eq!(name.parse::<SignatureAlgorithm>().unwrap(), expected, "{name}");
    }
}

#[test]
fn display_round_trips_through_from_str() {
    for alg in [
        SignatureAlgorithm::RsaSha1,
        SignatureAlgorithm::RsaSha256,
        SignatureAlgorithm::Ed25519,
    ] {
        assert_eq!(alg.to_string().parse::<SignatureAlgorithm>().unwrap(), alg);
    }
}

#[test]
fn unknown_algorithm_is_rejected() {
    let err = "dsa".parse::<SignatureAlgorithm>().unwrap_err();
    assert!(matches!(err, LicenseError::UnsupportedAlgorithm(ref s) if s == "dsa"));
}

// ── Public key parsing ───────────────────────────────────────────

#[test]
fn rsa_key_from_spki_base64() {
    let PublicKey::Rsa(key) = rsa_public_key() else {
        unreachable!()
    };
    let der = key.to_public_key_der().unwrap();
    let parsed = PublicKey::from_base64(&STANDARD.encode(der.as_bytes())).unwrap();
    assert_eq!(&parsed, rsa_public_key());
}

#[test]
fn ed25519_key_from_raw_bytes() {
    let (signing_key, public) = common::ed25519_keypair();
    let raw = signing_key.verifying_key().to_bytes();
    assert_eq!(PublicKey::from_der(&raw).unwrap(), public);
}

#[test]
fn ed25519_key_from_spki() {
    use ed25519_dalek::pkcs8::EncodePublicKey as _;
    let (signing_key, public) = common::ed25519_keypair();
    let der = signing_key.verifying_key().to_public_key_der().unwrap();
    assert_eq!(PublicKey::from_der(der.as_bytes()).unwrap(), public);
}

#[test]
fn invalid_key_bytes_are_rejected() {
    let err = PublicKey::from_der(b"definitely not a key").unwrap_err();
    assert!(matches!(err, LicenseError::InvalidPublicKey(_)));
}

#[test]
fn invalid_key_base64_is_rejected() {
    let err = PublicKey::from_base64("not base64!").unwrap_err();
    assert!(matches!(err, LicenseError::InvalidPublicKey(_)));
}
