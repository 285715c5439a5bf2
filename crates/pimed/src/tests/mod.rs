//! Test suites for the PIME bridge daemon.

pub(crate) mod support;
