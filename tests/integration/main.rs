//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the in-memory mock transport. All tests run on the host
//! (x86_64) with no radio required.

mod client_tests;
mod mock_transport;
mod queue_tests;
mod server_tests;
mod tree_tests;
