//! Behavioural tests for the per-request state machine.

use std::cell::RefCell;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::device::SimulatedChassis;
use crate::dispatch::Dispatcher;
use crate::session::{AutoLoginStore, SessionContext, SessionSettings, SettleDelays};
use crate::subsystems::CommandTrees;

use super::support::{RecordingHealthReporter, strip_quotes};

struct SessionWorld {
    dispatcher: Dispatcher,
    ctx: SessionContext,
    response: String,
}

impl SessionWorld {
    fn new() -> Self {
        let dispatcher = Dispatcher::new(
            Arc::new(CommandTrees::build().expect("command trees")),
            Arc::new(SimulatedChassis::new()),
            Arc::new(RecordingHealthReporter::default()),
        );
        let ctx = SessionContext::new(
            1,
            SessionSettings {
                transport: "tcp",
                device_address: "127.0.0.1".to_owned(),
                autologin: AutoLoginStore::in_memory(),
                settle: SettleDelays::none(),
            },
        );
        Self {
            dispatcher,
            ctx,
            response: String::new(),
        }
    }

    fn send(&mut self, line: &str) {
        let response = self
            .dispatcher
            .execute(&mut self.ctx, line.as_bytes())
            .expect("session should stay open");
        self.response = String::from_utf8(response).expect("utf-8 response");
    }
}

#[fixture]
fn world() -> RefCell<SessionWorld> {
    RefCell::new(SessionWorld::new())
}

#[given("an anonymous session")]
fn given_anonymous(world: &RefCell<SessionWorld>) {
    assert!(!world.borrow().ctx.is_logged_in());
}

#[given("a logged-in session")]
fn given_logged_in(world: &RefCell<SessionWorld>) {
    let mut world = world.borrow_mut();
    world.send("LOGIN admin secret");
    assert!(world.ctx.is_logged_in(), "login failed: {}", world.response);
}

#[when("the client floods the session with {line} {count} times")]
fn when_client_repeats(world: &RefCell<SessionWorld>, line: String, count: usize) {
    let mut world = world.borrow_mut();
    for _ in 0..count {
        world.send(strip_quotes(&line));
    }
}

#[when("the client sends {line}")]
fn when_client_sends(world: &RefCell<SessionWorld>, line: String) {
    world.borrow_mut().send(strip_quotes(&line));
}

#[then("the response is {expected}")]
fn then_response_is(world: &RefCell<SessionWorld>, expected: String) {
    assert_eq!(world.borrow().response, expected);
}

#[then("the error queue is empty")]
fn then_queue_empty(world: &RefCell<SessionWorld>) {
    let mut world = world.borrow_mut();
    world.send("SYST:ERR:COUNt?");
    assert_eq!(world.response, "0");
}

#[scenario(path = "tests/features/scpi_session.feature")]
fn scpi_session(#[from(world)] world: RefCell<SessionWorld>) {
    drop(world);
}
