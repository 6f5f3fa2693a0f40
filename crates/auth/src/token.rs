//! Compact signed session token codec.
//!
//! Tokens are three base64url segments (`header.payload.signature`, no
//! padding) signed with HMAC-SHA256 over `header.payload`. The payload
//! carries the subject id, a principal-kind tag and an absolute expiry
//! epoch, so no server-side session storage is needed.

use std::env;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Duration;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use franops_core::{Clock, OpsError, OpsResult, SystemClock};

type HmacSha256 = Hmac<Sha256>;

const SECRET_ENV: &str = "FRANOPS_TOKEN_SECRET";
const TTL_ENV: &str = "FRANOPS_TOKEN_TTL_MINUTES";
const DEFAULT_TTL_MINUTES: i64 = 60 * 24;

/// Which principal table the token subject points into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Franchisor,
    User,
}

#[derive(Debug, Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

/// Verified token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject id (row id in the table named by `typ`).
    pub sub: i64,
    /// Principal kind tag.
    pub typ: PrincipalKind,
    /// Absolute expiry, epoch seconds.
    pub exp: i64,
}

/// Signing secret and token lifetime.
#[derive(Clone)]
pub struct SigningConfig {
    pub secret: Vec<u8>,
    pub ttl: Duration,
}

impl SigningConfig {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self { secret: secret.into(), ttl }
    }

    /// Environment-driven config: `FRANOPS_TOKEN_SECRET` and
    /// `FRANOPS_TOKEN_TTL_MINUTES`, with development fallbacks.
    pub fn from_env() -> Self {
        let secret = env::var(SECRET_ENV).unwrap_or_else(|_| "dev-secret-key".to_string());
        let minutes = env::var(TTL_ENV)
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TTL_MINUTES);
        Self::new(secret.into_bytes(), Duration::minutes(minutes))
    }
}

/// Issues and verifies session tokens.
pub struct TokenCodec {
    config: SigningConfig,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: SigningConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn with_system_clock(config: SigningConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Issue a token for the given subject. Pure apart from the clock.
    pub fn issue(&self, subject: i64, kind: PrincipalKind) -> OpsResult<String> {
        let header = Header { alg: "HS256", typ: "JWT" };
        let claims = TokenClaims {
            sub: subject,
            typ: kind,
            exp: (self.clock.now() + self.config.ttl).timestamp(),
        };

        let header_segment = encode_segment(&header)?;
        let payload_segment = encode_segment(&claims)?;
        let signing_input = format!("{header_segment}.{payload_segment}");
        let signature = self.sign(signing_input.as_bytes())?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify a token and return its payload.
    ///
    /// Malformed structure, signature mismatch and expiry all collapse into
    /// `Unauthenticated`; callers learn nothing about which check failed.
    pub fn verify(&self, token: &str) -> OpsResult<TokenClaims> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(reject("token does not have exactly three segments"));
        };

        let signing_input = format!("{header}.{payload}");
        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| reject("signature segment is not base64url"))?;

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        // Constant-time comparison; a byte-wise `==` would leak a timing
        // side-channel on the signature prefix.
        mac.verify_slice(&provided)
            .map_err(|_| reject("signature mismatch"))?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| reject("payload segment is not base64url"))?;
        let claims: TokenClaims = serde_json::from_slice(&payload_bytes)
            .map_err(|_| reject("payload is not a valid claims document"))?;

        if self.clock.now().timestamp() > claims.exp {
            return Err(reject("token expired"));
        }

        Ok(claims)
    }

    fn mac(&self) -> OpsResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| OpsError::internal(format!("unusable signing secret: {e}")))
    }

    fn sign(&self, input: &[u8]) -> OpsResult<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn encode_segment<T: Serialize>(value: &T) -> OpsResult<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| OpsError::internal(format!("token segment serialization: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn reject(reason: &'static str) -> OpsError {
    tracing::debug!(reason, "token rejected");
    OpsError::Unauthenticated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use franops_core::FixedClock;

    fn codec(clock: Arc<FixedClock>) -> TokenCodec {
        TokenCodec::new(
            SigningConfig::new(*b"unit-test-secret", Duration::minutes(30)),
            clock,
        )
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let codec = codec(clock);

        let token = codec.issue(7, PrincipalKind::User).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.typ, PrincipalKind::User);
    }

    #[test]
    fn expired_token_is_unauthenticated_even_with_valid_signature() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let codec = codec(Arc::clone(&clock));

        let token = codec.issue(7, PrincipalKind::User).unwrap();
        clock.advance(Duration::minutes(31));

        assert_eq!(codec.verify(&token).unwrap_err(), OpsError::Unauthenticated);
    }

    #[test]
    fn tampered_payload_is_unauthenticated() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let codec = codec(clock);

        let token = codec.issue(7, PrincipalKind::User).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        // Swap the subject for another user, keep signature fixed.
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&TokenClaims {
                sub: 8,
                typ: PrincipalKind::User,
                exp: i64::MAX,
            })
            .unwrap(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(codec.verify(&forged).unwrap_err(), OpsError::Unauthenticated);
    }

    #[test]
    fn wrong_segment_count_is_unauthenticated() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let codec = codec(clock);

        for token in ["", "a.b", "a.b.c.d", "justone"] {
            assert_eq!(codec.verify(token).unwrap_err(), OpsError::Unauthenticated);
        }
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let codec_a = codec(Arc::clone(&clock));
        let codec_b = TokenCodec::new(
            SigningConfig::new(*b"a-different-secret", Duration::minutes(30)),
            clock,
        );

        let token = codec_a.issue(7, PrincipalKind::Franchisor).unwrap();
        assert_eq!(codec_b.verify(&token).unwrap_err(), OpsError::Unauthenticated);
    }
}
