use crate::error::{RuntimeError, RuntimeResult};
use crate::message::{MethodCall, Reply};
use crate::subscription::MatchRule;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Bus connection underneath a [`crate::Connection`]: sends calls and
/// manages the daemon-side match rules
pub trait Transport: Send + Sync {
    fn call(&self, call: MethodCall) -> BoxFuture<'_, RuntimeResult<Reply>>;

    fn add_match(&self, rule: &MatchRule) -> RuntimeResult<()>;

    fn remove_match(&self, rule: &MatchRule) -> RuntimeResult<()>;
}

/// Scripted transport for testing
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    replies: HashMap<(String, String), VecDeque<RuntimeResult<Reply>>>,
    calls: Vec<MethodCall>,
    added: Vec<MatchRule>,
    removed: Vec<MatchRule>,
    reject_matches: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the reply for the next call to `interface.member`
    pub fn push_reply(&self, interface: &str, member: &str, reply: Reply) {
        self.push_result(interface, member, Ok(reply));
    }

    pub fn push_error(&self, interface: &str, member: &str, error: RuntimeError) {
        self.push_result(interface, member, Err(error));
    }

    fn push_result(&self, interface: &str, member: &str, result: RuntimeResult<Reply>) {
        self.state()
            .replies
            .entry((interface.to_string(), member.to_string()))
            .or_default()
            .push_back(result);
    }

    /// Every call sent so far, oldest first
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().calls.clone()
    }

    pub fn added_matches(&self) -> Vec<MatchRule> {
        self.state().added.clone()
    }

    pub fn removed_matches(&self) -> Vec<MatchRule> {
        self.state().removed.clone()
    }

    /// Make `add_match` fail from now on
    pub fn reject_matches(&self, reject: bool) {
        self.state().reject_matches = reject;
    }
}

impl Transport for MockTransport {
    fn call(&self, call: MethodCall) -> BoxFuture<'_, RuntimeResult<Reply>> {
        let key = (call.interface.clone(), call.member.clone());
        let mut state = self.state();
        state.calls.push(call);
        let result = state
            .replies
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(RuntimeError::remote(
                    "org.freedesktop.DBus.Error.UnknownMethod",
                    format!("No reply scripted for {}.{}", key.0, key.1),
                ))
            });
        futures::future::ready(result).boxed()
    }

    fn add_match(&self, rule: &MatchRule) -> RuntimeResult<()> {
        let mut state = self.state();
        if state.reject_matches {
            return Err(RuntimeError::Transport(format!(
                "AddMatch rejected: {}",
                rule
            )));
        }
        state.added.push(rule.clone());
        Ok(())
    }

    fn remove_match(&self, rule: &MatchRule) -> RuntimeResult<()> {
        self.state().removed.push(rule.clone());
        Ok(())
    }
}
