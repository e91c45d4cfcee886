//! Shared fixtures for the verifier and key provider tests.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tapis_hasura_core::ClaimSchema;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::AuthConfig;

pub const SIGNING_KEY: &str = include_str!("../testdata/signing_key.pem");
pub const PUBLIC_KEY: &str = include_str!("../testdata/signing_key.pub.pem");
pub const FOREIGN_KEY: &str = include_str!("../testdata/foreign_key.pem");

/// RSA modulus of `signing_key.pem`, base64url.
pub const SIGNING_KEY_N: &str = "t4HqsR_fvsu8CL_A8OX5eMPl154walzFTJVQ-nRrX0XJIUQgWgOBNeUbVTWOiWUwyYE04VNDM45e_bTJMbX1hAbdGSyLaS9IpZoDSHMJBCuF1uxed6rnDx8ogivk51rsbbWaTynFa1PuuBon_fBILUoMz4Cg305Vy3OgpiCLAkq50iaya2IYOIbV9BcLt5W21RGIpIJqAw1jhyZ2mE6ILDtxnbuGaFC6ICuYFQdEvpJxhxRKCDkyUojHJr_B-Jeu24AFwsXfTKwu4BLQa0q0Y3eFpiPf0nMSwu3xYHirgEGm01g7XSAV0xHdNo7cw2U7fYVpPeR-MROJ6u8VzYUTZQ";
pub const SIGNING_KEY_E: &str = "AQAB";

pub const ISSUER: &str = "https://tacc.tapis.io/v3/tokens";
pub const TENANT_PATH: &str = "/v3/tenants/tacc";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Sign `claims` with RS256.
pub fn sign(claims: &Value, private_key_pem: &str, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// A Unix timestamp `seconds` from now (negative for the past).
pub fn expires_in(seconds: i64) -> i64 {
    (Utc::now() + chrono::Duration::seconds(seconds)).timestamp()
}

/// The Tapis tenant envelope carrying `PUBLIC_KEY`.
pub fn tenant_body() -> Value {
    json!({
        "result": {
            "tenant_id": "tacc",
            "public_key": PUBLIC_KEY
        },
        "status": "success",
        "message": "Tenant retrieved.",
        "version": "1.3.0"
    })
}

/// A JWK Set publishing `SIGNING_KEY` under `kid`.
pub fn jwks_body(kid: &str) -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": kid,
            "use": "sig",
            "alg": "RS256",
            "n": SIGNING_KEY_N,
            "e": SIGNING_KEY_E
        }]
    })
}

/// Mount `body` at `route`, expecting exactly `calls` fetches.
pub async fn serve_keys(server: &MockServer, route: &str, body: Value, calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn config(server: &MockServer, route: &str, schema: ClaimSchema) -> AuthConfig {
    AuthConfig {
        key_url: format!("{}{route}", server.uri()),
        issuer: ISSUER.to_string(),
        claim_schema: schema,
        ..AuthConfig::default()
    }
}
