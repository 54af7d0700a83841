//! Test suites for the event consumer daemon.

mod process_behaviour;
pub(crate) mod support;
