//! SeaORM entity definitions for PostgreSQL database.

pub mod report;
pub mod user;
