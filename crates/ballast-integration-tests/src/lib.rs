//! Integration test crate for the Ballast stability engine.
//!
//! This crate has no library code. It only contains integration tests
//! that drive the engine end to end across the workspace crates:
//! oracle, controller, distributor, SQLite and in-memory stores.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p ballast-integration-tests
//! ```
