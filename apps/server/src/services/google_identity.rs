//! Google ID token verification.
//!
//! Verifies ID tokens minted by Google Sign-In against Google's JWKS and
//! turns the verified claims into a [`GoogleProfile`].
//!
//! - RS256 only, algorithm pinned
//! - JWKS cached with TTL, refreshed once on kid miss (key rotation)
//! - Stale keys served if a routine refresh fails
//! - Whole verification bounded by a configurable timeout
//! - Detailed failures logged server-side; clients see the error kind only

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::GoogleSettings;
use crate::error::{AppResult, TokenVerificationError, ValidationError};
use crate::models::{GoogleIdTokenClaims, GoogleProfile};

/// JWKS cache TTL. Google rotates keys roughly daily and publishes them ahead.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// HTTP connect timeout for JWKS fetch.
const JWKS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP total timeout for JWKS fetch.
const JWKS_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Decodes a raw ID token into claims whose signature, issuer, audience and
/// expiry have been checked.
#[async_trait]
pub trait ClaimsDecoder: Send + Sync {
    async fn decode_claims(&self, token: &str)
    -> Result<GoogleIdTokenClaims, TokenVerificationError>;
}

/// Cached JWKS keys.
struct CachedKeys {
    keys: Vec<(String, DecodingKey)>,
    fetched_at: Instant,
}

/// JWKS response from the issuer.
#[derive(serde::Deserialize)]
struct JwksResponse {
    keys: Vec<serde_json::Value>,
}

/// [`ClaimsDecoder`] backed by the issuer's published JWKS.
pub struct JwksClaimsDecoder {
    issuers: Vec<String>,
    audiences: Vec<String>,
    jwks_url: String,
    jwks_cache: RwLock<Option<CachedKeys>>,
    http_client: reqwest::Client,
}

impl JwksClaimsDecoder {
    /// Create a new decoder from settings.
    pub fn new(settings: &GoogleSettings) -> Result<Self, TokenVerificationError> {
        if settings.client_ids.is_empty() {
            warn!(
                "RPT_GOOGLE_CLIENT_IDS is empty. \
                 ID tokens issued to any Google client will be accepted."
            );
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(JWKS_CONNECT_TIMEOUT)
            .timeout(JWKS_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                TokenVerificationError::KeyFetch(format!("Failed to build HTTP client: {}", e))
            })?;

        info!(
            "Google identity verifier initialized (issuers={:?}, jwks_url={}, client_ids={})",
            settings.issuers,
            settings.jwks_url,
            settings.client_ids.len()
        );

        Ok(Self {
            issuers: settings.issuers.clone(),
            audiences: settings.client_ids.clone(),
            jwks_url: settings.jwks_url.clone(),
            jwks_cache: RwLock::new(None),
            http_client,
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&self.issuers);
        if self.audiences.is_empty() {
            validation.validate_aud = false;
            validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        } else {
            validation.set_audience(&self.audiences);
            validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        }
        validation
    }

    /// Find a decoding key by kid. On miss, force a JWKS refresh and retry once.
    async fn find_key_with_retry(&self, kid: &str) -> Result<DecodingKey, TokenVerificationError> {
        let keys = self.get_or_fetch_keys(false).await?;
        if let Some((_, key)) = keys.iter().find(|(k, _)| k == kid) {
            return Ok(key.clone());
        }

        info!(
            "Google: kid '{}' not in cache, forcing JWKS refresh for key rotation",
            kid
        );
        let keys = self.get_or_fetch_keys(true).await?;
        keys.iter()
            .find(|(k, _)| k == kid)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| {
                warn!("Google: unknown key ID '{}' after JWKS refresh", kid);
                TokenVerificationError::UnknownKey
            })
    }

    /// Get cached JWKS keys or fetch from the issuer. If `force_refresh` is true, skip cache.
    async fn get_or_fetch_keys(
        &self,
        force_refresh: bool,
    ) -> Result<Vec<(String, DecodingKey)>, TokenVerificationError> {
        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if let Some(ref cached) = *cache
                && cached.fetched_at.elapsed() < JWKS_CACHE_TTL
            {
                return Ok(cached.keys.clone());
            }
        }

        match self.fetch_jwks().await {
            Ok(keys) => {
                let mut cache = self.jwks_cache.write().await;
                *cache = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => {
                if !force_refresh {
                    let cache = self.jwks_cache.read().await;
                    if let Some(ref cached) = *cache {
                        warn!("Failed to refresh JWKS, using stale cache: {}", e);
                        return Ok(cached.keys.clone());
                    }
                }
                warn!("Google: {}", e);
                Err(TokenVerificationError::KeyFetch(e))
            }
        }
    }

    async fn fetch_jwks(&self) -> Result<Vec<(String, DecodingKey)>, String> {
        info!("Fetching Google JWKS from {}", self.jwks_url);

        let response: JwksResponse = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("Failed to fetch JWKS: {}", e))?
            .json()
            .await
            .map_err(|e| format!("Failed to parse JWKS response: {}", e))?;

        let mut keys = Vec::new();
        for jwk_value in &response.keys {
            let jwk: jsonwebtoken::jwk::Jwk = match serde_json::from_value(jwk_value.clone()) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to parse JWK: {}", e);
                    continue;
                }
            };

            if let Some(ref kid) = jwk.common.key_id {
                match DecodingKey::from_jwk(&jwk) {
                    Ok(key) => keys.push((kid.clone(), key)),
                    Err(e) => warn!("Failed to create decoding key from JWK {}: {}", kid, e),
                }
            }
        }

        info!("Loaded {} JWKS keys from Google", keys.len());
        Ok(keys)
    }
}

#[async_trait]
impl ClaimsDecoder for JwksClaimsDecoder {
    async fn decode_claims(
        &self,
        token: &str,
    ) -> Result<GoogleIdTokenClaims, TokenVerificationError> {
        let header = decode_header(token).map_err(|e| {
            warn!("Google: invalid JWT header: {}", e);
            TokenVerificationError::Malformed
        })?;

        if header.alg != Algorithm::RS256 {
            warn!("Google: rejected JWT with algorithm {:?}", header.alg);
            return Err(TokenVerificationError::InvalidSignature);
        }

        let kid = header.kid.ok_or_else(|| {
            warn!("Google: JWT missing 'kid' header");
            TokenVerificationError::Malformed
        })?;

        let decoding_key = self.find_key_with_retry(&kid).await?;

        let token_data = decode::<GoogleIdTokenClaims>(token, &decoding_key, &self.validation())
            .map_err(|e| {
                warn!("Google: JWT verification failed: {}", e);
                classify_jwt_error(e.kind())
            })?;

        Ok(token_data.claims)
    }
}

/// Map a jsonwebtoken failure onto the reason reported to clients.
fn classify_jwt_error(kind: &ErrorKind) -> TokenVerificationError {
    match kind {
        ErrorKind::ExpiredSignature => TokenVerificationError::Expired,
        ErrorKind::InvalidIssuer => TokenVerificationError::InvalidIssuer,
        ErrorKind::InvalidAudience => TokenVerificationError::InvalidAudience,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            TokenVerificationError::InvalidSignature
        }
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "sub" => TokenVerificationError::MissingClaim("sub"),
            "aud" => TokenVerificationError::InvalidAudience,
            "iss" => TokenVerificationError::InvalidIssuer,
            _ => TokenVerificationError::Malformed,
        },
        _ => TokenVerificationError::Malformed,
    }
}

/// Turns a client-supplied ID token into a verified Google profile.
#[derive(Clone)]
pub struct GoogleIdentityVerifier {
    decoder: Arc<dyn ClaimsDecoder>,
    timeout: Duration,
}

impl GoogleIdentityVerifier {
    /// Create a verifier that checks tokens against the configured JWKS.
    pub fn new(settings: &GoogleSettings) -> Result<Self, TokenVerificationError> {
        let decoder = JwksClaimsDecoder::new(settings)?;
        Ok(Self::with_decoder(
            Arc::new(decoder),
            settings.verify_timeout,
        ))
    }

    /// Create a verifier around any decoder.
    pub fn with_decoder(decoder: Arc<dyn ClaimsDecoder>, timeout: Duration) -> Self {
        Self { decoder, timeout }
    }

    /// Verify an ID token and return the profile it asserts.
    ///
    /// An absent or blank token is a validation error and never reaches the
    /// decoder. Every other failure is a [`TokenVerificationError`]; no
    /// partial profile is ever returned.
    pub async fn verify(&self, id_token: Option<&str>) -> AppResult<GoogleProfile> {
        let token = id_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ValidationError::new("idToken", "idToken is required"))?;

        let claims = tokio::time::timeout(self.timeout, self.decoder.decode_claims(token))
            .await
            .map_err(|_| {
                warn!(
                    "Google: ID token verification exceeded {:?}",
                    self.timeout
                );
                TokenVerificationError::Timeout
            })??;

        let profile = GoogleProfile::from_claims(claims).map_err(|e| {
            warn!("Google: verified token rejected: {}", e);
            e
        })?;

        debug!(google_id = %profile.id(), "Google ID token verified");
        Ok(profile)
    }
}
