// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sponsor-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token-level tests: signing algorithms and tamper detection

use base64::Engine;
use chrono::Duration;
use jsonwebtoken::{Algorithm, EncodingKey};
use uuid::Uuid;

use sponsor_auth::keys::{generate_rsa_keypair, KeySource};
use sponsor_auth::token::{decode_claims, TokenIssuer};

fn issuer_with(algorithm: Algorithm) -> (TokenIssuer, Vec<u8>) {
    let (private_pem, public_pem) = generate_rsa_keypair(2048).expect("keypair generation");
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    let issuer = TokenIssuer::new(KeySource::Cached(key))
        .with_algorithm(algorithm)
        .with_issuer("test-deployment")
        .with_app_id(Uuid::new_v4())
        .valid_for(Duration::minutes(5));
    (issuer, public_pem.into_bytes())
}

#[test]
fn test_rs_family_algorithms_round_trip() {
    for algorithm in [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512] {
        let (issuer, public_pem) = issuer_with(algorithm);
        let token = issuer.issue("0xABC").unwrap();
        let claims = decode_claims(&token, &public_pem, algorithm).unwrap();
        assert_eq!(claims.sender, "0xABC");
    }
}

#[test]
fn test_tampered_claim_segment_fails_verification() {
    let (issuer, public_pem) = issuer_with(Algorithm::RS256);
    let token = issuer.issue("0xABC").unwrap();

    // Rewrite the sender inside the claim segment, leaving the signature as is
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);

    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let payload = engine.decode(parts[1]).unwrap();
    let tampered_payload = String::from_utf8(payload)
        .unwrap()
        .replace("0xABC", "0xEVIL");
    let tampered = format!(
        "{}.{}.{}",
        parts[0],
        engine.encode(tampered_payload.as_bytes()),
        parts[2]
    );

    assert!(decode_claims(&tampered, &public_pem, Algorithm::RS256).is_err());

    // The untouched token still verifies
    assert!(decode_claims(&token, &public_pem, Algorithm::RS256).is_ok());
}

#[test]
fn test_single_byte_flip_in_claim_segment_fails_verification() {
    let (issuer, public_pem) = issuer_with(Algorithm::RS256);
    let token = issuer.issue("0xABC").unwrap();

    let parts: Vec<&str> = token.split('.').collect();
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let mut payload = engine.decode(parts[1]).unwrap();
    payload[0] ^= 0x01;
    let tampered = format!("{}.{}.{}", parts[0], engine.encode(&payload), parts[2]);

    assert!(decode_claims(&tampered, &public_pem, Algorithm::RS256).is_err());
}
