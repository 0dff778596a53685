//! Google identity models: ID token claims and the verified profile.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidateEmail;

use crate::error::TokenVerificationError;

/// Claims read from a Google ID token.
///
/// Registered claims (iss, aud, exp, iat) are checked by the decoder and not
/// kept here. Identity claims are optional at the serde level so that a token
/// lacking them surfaces as a missing-claim failure rather than a parse error.
///
/// See: <https://developers.google.com/identity/openid-connect/openid-connect#an-id-tokens-payload>
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleIdTokenClaims {
    /// Subject: Google's stable account identifier.
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    /// Full display name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    /// Profile picture URL.
    #[serde(default)]
    pub picture: Option<String>,
}

/// Normalized identity produced by a successful ID token verification.
///
/// There is no public constructor: a profile only ever comes out of
/// [`GoogleProfile::from_claims`], which the identity verifier feeds with
/// claims from a token whose signature, issuer, audience and expiry passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProfile {
    id: String,
    email: String,
    full_name: String,
    /// Empty when the account has no picture.
    avatar_url: String,
}

impl GoogleProfile {
    /// Map verified claims to a profile, all or nothing.
    pub(crate) fn from_claims(claims: GoogleIdTokenClaims) -> Result<Self, TokenVerificationError> {
        let id = non_empty(claims.sub).ok_or(TokenVerificationError::MissingClaim("sub"))?;
        let email = non_empty(claims.email).ok_or(TokenVerificationError::MissingClaim("email"))?;

        if !email.validate_email() {
            return Err(TokenVerificationError::MissingClaim("email"));
        }
        if claims.email_verified == Some(false) {
            return Err(TokenVerificationError::UnverifiedEmail);
        }

        let full_name = non_empty(claims.name)
            .or_else(|| {
                let joined = [claims.given_name, claims.family_name]
                    .into_iter()
                    .flatten()
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                non_empty(Some(joined))
            })
            .ok_or(TokenVerificationError::MissingClaim("name"))?;

        Ok(Self {
            id,
            email,
            full_name,
            avatar_url: claims.picture.unwrap_or_default(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn avatar_url(&self) -> &str {
        &self.avatar_url
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
