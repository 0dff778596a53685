//! Authentication module for session token verification.

mod extractor;

pub use extractor::{AuthError, SessionAuth};
