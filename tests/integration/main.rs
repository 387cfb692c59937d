//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with virtual time
//! and no real hardware required.

mod controller_tests;
mod mock_hw;
mod status_led_tests;
