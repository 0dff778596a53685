//! E2E tests: signing key rotation.

use street_reports_lib::error::{AppError, TokenVerificationError};
use street_reports_lib::services::GoogleIdentityVerifier;

use super::mock_google_provider::{MockGoogleProvider, TestIdTokenClaims, TestKeyPair};
use super::test_helpers::google_settings;

#[actix_rt::test]
async fn test_rotated_key_picked_up_on_kid_miss() {
    // Own provider: rotating the shared one would race other tests.
    let old_key = TestKeyPair::generate("rotation-old");
    let new_key = TestKeyPair::generate("rotation-new");
    let mock = MockGoogleProvider::start(old_key.clone());
    let verifier = GoogleIdentityVerifier::new(&google_settings(&mock.jwks_url)).unwrap();

    // Warm the cache with the old key.
    let old_token = mock.issue_token(&TestIdTokenClaims::valid(), &old_key);
    assert!(verifier.verify(Some(&old_token)).await.is_ok());

    mock.rotate_keys(new_key.clone());

    // Unknown kid forces a refresh.
    let new_token = mock.issue_token(&TestIdTokenClaims::valid(), &new_key);
    assert!(verifier.verify(Some(&new_token)).await.is_ok());

    // The old key is gone after the refresh.
    match verifier.verify(Some(&old_token)).await {
        Err(AppError::TokenVerification(TokenVerificationError::UnknownKey)) => {}
        other => panic!("expected unknown key, got {other:?}"),
    }
}
