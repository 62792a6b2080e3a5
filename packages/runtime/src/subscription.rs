use crate::error::RuntimeResult;
use crate::message::SignalMessage;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Filter a signal subscription is registered under
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchRule {
    pub sender: Option<String>,
    pub path: Option<String>,
    pub interface: String,
    pub member: String,
}

impl MatchRule {
    pub fn new(interface: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            sender: None,
            path: None,
            interface: interface.into(),
            member: member.into(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn matches(&self, signal: &SignalMessage) -> bool {
        self.interface == signal.interface
            && self.member == signal.member
            && self.path.as_ref().map_or(true, |path| *path == signal.path)
            && self
                .sender
                .as_ref()
                .map_or(true, |sender| *sender == signal.sender)
    }

    /// Bus daemon match-rule string
    pub fn to_rule_string(&self) -> String {
        let mut rule = String::from("type='signal'");
        if let Some(sender) = &self.sender {
            rule.push_str(&format!(",sender='{}'", sender));
        }
        if let Some(path) = &self.path {
            rule.push_str(&format!(",path='{}'", path));
        }
        rule.push_str(&format!(
            ",interface='{}',member='{}'",
            self.interface, self.member
        ));
        rule
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rule_string())
    }
}

/// Callback subscriber; receives its own copy of every matching signal
pub type SignalHandler = Arc<dyn Fn(SignalMessage) -> RuntimeResult<()> + Send + Sync>;

/// Receiver side of one subscription
#[derive(Clone)]
pub enum Subscriber {
    Stream(UnboundedSender<SignalMessage>),
    Callback { handler: SignalHandler, once: bool },
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscriber::Stream(_) => f.write_str("Stream"),
            Subscriber::Callback { once, .. } => {
                f.debug_struct("Callback").field("once", once).finish()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

/// Outcome of [`SubscriptionTable::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub id: SubscriberId,
    /// The rule had no subscribers before, so the bus needs a new match.
    /// The rule stays [`MatchState::Adding`] until confirmed or abandoned.
    pub first: bool,
}

/// Where a rule's bus-side match stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    /// `AddMatch` is in flight for the first subscriber
    Adding,
    Active,
    /// The last subscriber left and `RemoveMatch` is in flight
    Removing,
}

/// Subscribers to hand a signal to, plus rules that lost their last
/// subscriber while dispatching
#[derive(Debug, Default)]
pub struct Delivery {
    pub targets: Vec<(SubscriberId, Subscriber)>,
    pub emptied: Vec<MatchRule>,
}

#[derive(Debug)]
struct RuleEntry {
    state: MatchState,
    subscribers: Vec<(SubscriberId, Subscriber)>,
}

/// Rule → subscribers. A rule has subscribers iff its match is registered
/// with the bus or being registered. While a rule is [`MatchState::Adding`]
/// or [`MatchState::Removing`] it is settling, and new subscribers must
/// wait for it to settle before calling [`SubscriptionTable::insert`].
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    entries: BTreeMap<MatchRule, RuleEntry>,
    next_id: u64,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a bus-side add or remove for `rule` is still in flight
    pub fn is_settling(&self, rule: &MatchRule) -> bool {
        self.state(rule)
            .map_or(false, |state| state != MatchState::Active)
    }

    pub fn state(&self, rule: &MatchRule) -> Option<MatchState> {
        self.entries.get(rule).map(|entry| entry.state)
    }

    pub fn insert(&mut self, rule: MatchRule, subscriber: Subscriber) -> Registration {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let entry = self.entries.entry(rule).or_insert_with(|| RuleEntry {
            state: MatchState::Adding,
            subscribers: Vec::new(),
        });
        let first = entry.subscribers.is_empty();
        if first {
            entry.state = MatchState::Adding;
        }
        entry.subscribers.push((id, subscriber));
        Registration { id, first }
    }

    /// The bus accepted the match for a rule that was being added
    pub fn confirm(&mut self, rule: &MatchRule) {
        if let Some(entry) = self.entries.get_mut(rule) {
            if entry.state == MatchState::Adding {
                entry.state = MatchState::Active;
            }
        }
    }

    /// The bus rejected the match; the rule and its pending subscriber go
    pub fn abandon(&mut self, rule: &MatchRule) {
        if self.state(rule) == Some(MatchState::Adding) {
            self.entries.remove(rule);
        }
    }

    /// Returns `Some(true)` when `id` was the rule's last subscriber, which
    /// leaves the rule [`MatchState::Removing`], and `None` when it wasn't
    /// registered
    pub fn remove(&mut self, rule: &MatchRule, id: SubscriberId) -> Option<bool> {
        let entry = self.entries.get_mut(rule)?;
        let index = entry.subscribers.iter().position(|(entry, _)| *entry == id)?;
        entry.subscribers.remove(index);

        if entry.subscribers.is_empty() {
            entry.state = MatchState::Removing;
            Some(true)
        } else {
            Some(false)
        }
    }

    /// The bus-side removal finished; forget the rule unless someone
    /// subscribed again in the meantime
    pub fn finish_removal(&mut self, rule: &MatchRule) {
        let done = self
            .entries
            .get(rule)
            .map_or(false, |entry| entry.subscribers.is_empty());
        if done {
            self.entries.remove(rule);
        }
    }

    pub fn subscriber_count(&self, rule: &MatchRule) -> usize {
        self.entries.get(rule).map_or(0, |entry| entry.subscribers.len())
    }

    pub fn is_active(&self, rule: &MatchRule) -> bool {
        self.subscriber_count(rule) > 0
    }

    /// Rules that currently have subscribers
    pub fn rules(&self) -> impl Iterator<Item = &MatchRule> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.subscribers.is_empty())
            .map(|(rule, _)| rule)
    }

    pub fn is_empty(&self) -> bool {
        self.rules().next().is_none()
    }

    /// Collect every subscriber whose rule matches `signal`. One-shot
    /// callbacks are unregistered as part of the collection. Rules whose
    /// match isn't confirmed yet receive nothing.
    pub fn deliveries(&mut self, signal: &SignalMessage) -> Delivery {
        let mut delivery = Delivery::default();

        for (rule, entry) in self.entries.iter_mut() {
            if entry.state != MatchState::Active || !rule.matches(signal) {
                continue;
            }
            delivery.targets.extend(entry.subscribers.iter().cloned());
            entry.subscribers.retain(|(_, subscriber)| {
                !matches!(subscriber, Subscriber::Callback { once: true, .. })
            });
            if entry.subscribers.is_empty() {
                entry.state = MatchState::Removing;
                delivery.emptied.push(rule.clone());
            }
        }
        delivery
    }
}
