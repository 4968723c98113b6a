//! Startup scenarios: configuration, logging and the socket directory.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{self, HealthEvent, StartupWorld};
use crate::BootstrapError;

#[fixture]
fn world() -> RefCell<StartupWorld> {
    support::world()
}

#[given("a configuration with a Unix control socket")]
fn valid_configuration(world: &RefCell<StartupWorld>) {
    assert!(!world.borrow().socket_dir_ready());
}

#[given("a command line naming an unsupported socket scheme")]
fn bad_endpoint(world: &RefCell<StartupWorld>) {
    world.borrow_mut().use_bad_endpoint();
}

#[given("a plain file where the socket directory belongs")]
fn blocked_socket_dir(world: &RefCell<StartupWorld>) {
    world.borrow().block_socket_dir();
}

#[when("the daemon starts")]
fn daemon_starts(world: &RefCell<StartupWorld>) {
    world.borrow_mut().start();
}

#[then("the daemon is ready")]
fn daemon_ready(world: &RefCell<StartupWorld>) {
    let world = world.borrow();
    assert!(world.failure().is_none(), "startup failed: {:?}", world.failure());
    let config = world.daemon().expect("daemon running").config();
    assert!(!config.stdio_enabled());
    assert!(config.script_socket().is_some());
}

#[then("the socket directory has been created")]
fn socket_dir_created(world: &RefCell<StartupWorld>) {
    assert!(world.borrow().socket_dir_ready());
}

#[then("startup fails on the configuration")]
fn fails_on_configuration(world: &RefCell<StartupWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.failure(), Some(BootstrapError::Config(_))),
        "unexpected outcome: {:?}",
        world.failure()
    );
}

#[then("startup fails on the socket directory")]
fn fails_on_socket_dir(world: &RefCell<StartupWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.failure(), Some(BootstrapError::SocketDir(_))),
        "unexpected outcome: {:?}",
        world.failure()
    );
}

#[then("the lifecycle shows the attempt and its success")]
fn lifecycle_success(world: &RefCell<StartupWorld>) {
    assert_eq!(
        world.borrow().events(),
        vec![HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
    );
}

#[then("the lifecycle shows the attempt and its failure")]
fn lifecycle_failure(world: &RefCell<StartupWorld>) {
    let events = world.borrow().events();
    assert!(
        matches!(
            events.as_slice(),
            [HealthEvent::BootstrapStarting, HealthEvent::BootstrapFailed(_)]
        ),
        "unexpected lifecycle: {events:?}"
    );
}

#[scenario(path = "tests/features/daemon_bootstrap.feature", index = 0)]
fn starts_with_valid_configuration(#[from(world)] world: RefCell<StartupWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/daemon_bootstrap.feature", index = 1)]
fn refuses_unsupported_socket_scheme(#[from(world)] world: RefCell<StartupWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/daemon_bootstrap.feature", index = 2)]
fn refuses_blocked_socket_directory(#[from(world)] world: RefCell<StartupWorld>) {
    drop(world);
}
