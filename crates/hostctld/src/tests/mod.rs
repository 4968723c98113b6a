//! Test suites for the hostctl daemon.

mod behaviour;
mod support;
