//! Cross-module tests for searchfs.
//!
//! ## Test Modules
//!
//! - **search_tests**: Traversal completeness, ordering, limits and the channel producer
//! - **loader_tests**: Config loading, proxy resolution and cycle detection
//! - **config_tests**: Application configuration loading and validation
//! - **error_tests**: Error messages and helpers
//!
//! Individual test modules can be run with:
//! ```bash
//! cargo test search_tests
//! cargo test loader_tests
//! # etc.
//! ```

pub mod search_tests;
