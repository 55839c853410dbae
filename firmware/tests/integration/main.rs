//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! through a fully assembled bridge with mock links. All tests run on the
//! host with no real hardware required.

mod dispatcher_tests;
mod mock_link;
mod print_tests;
mod telemetry_tests;
mod transfer_tests;
