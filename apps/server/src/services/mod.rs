//! Business logic services.

pub mod auth_google;
pub mod event_broadcaster;
pub mod google_identity;
pub mod report_status;
pub mod session;

pub use auth_google::configure_routes as configure_auth_routes;
pub use event_broadcaster::EventBroadcaster;
pub use google_identity::{ClaimsDecoder, GoogleIdentityVerifier, JwksClaimsDecoder};
pub use report_status::TransitionPolicy;
