//! Street Reports Server library.
//!
//! Citizen street reports with Google sign-in: identity verification, report
//! storage, the admin-only status lifecycle, and real-time event fan-out.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
