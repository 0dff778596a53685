//! Report API test suite.
//!
//! Drives the report routes over a mock database backend, with session
//! tokens minted the same way sign-in does.
//!
//! Run with: cargo test --test status_api


mod test_reports_api;
mod test_update_status;
