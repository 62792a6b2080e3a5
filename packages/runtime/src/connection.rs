use crate::error::RuntimeResult;
use crate::message::{MessageReader, MessageWriter, MethodCall, Reply, SignalMessage};
use crate::standard::PROPERTIES_INTERFACE;
use crate::subscription::{MatchRule, Subscriber, SubscriberId, SubscriptionTable};
use crate::transport::Transport;
use crate::value::{FromValue, Value};
use futures::Stream;
use indexmap::IndexMap;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

/// Shared handle to one bus connection. Clones refer to the same
/// transport and subscription table.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    subscriptions: Mutex<SubscriptionTable>,
    /// Signalled whenever a rule's bus-side add or remove finishes
    settled: Condvar,
}

impl Shared {
    fn table(&self) -> MutexGuard<'_, SubscriptionTable> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the table once no bus-side add or remove for `rule` is in flight
    fn settled_table(&self, rule: &MatchRule) -> MutexGuard<'_, SubscriptionTable> {
        let mut table = self.table();
        while table.is_settling(rule) {
            table = self
                .settled
                .wait(table)
                .unwrap_or_else(PoisonError::into_inner);
        }
        table
    }

    /// Called without the table lock; the rule stays `Removing` until the
    /// transport returns
    fn drop_match(&self, rule: &MatchRule) {
        match self.transport.remove_match(rule) {
            Ok(()) => debug!(rule = %rule, "Removed match rule"),
            Err(error) => warn!(rule = %rule, error = %error, "Failed to remove match rule"),
        }
        self.table().finish_removal(rule);
        self.settled.notify_all();
    }

    fn release(&self, rule: &MatchRule, id: SubscriberId) {
        let last = self.table().remove(rule, id);
        if last == Some(true) {
            self.drop_match(rule);
        }
    }
}

impl Connection {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                subscriptions: Mutex::new(SubscriptionTable::new()),
                settled: Condvar::new(),
            }),
        }
    }

    pub fn new_method_call(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        member: &str,
    ) -> MethodCall {
        MethodCall::new(destination, path, interface, member)
    }

    pub async fn call(&self, call: MethodCall) -> RuntimeResult<Reply> {
        debug!(
            destination = %call.destination,
            path = %call.path,
            interface = %call.interface,
            member = %call.member,
            "Calling method"
        );
        self.shared.transport.call(call).await
    }

    /// `org.freedesktop.DBus.Properties.Get`, converted to `T`
    pub async fn get_property<T: FromValue>(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        name: &str,
    ) -> RuntimeResult<T> {
        let mut call = self.new_method_call(destination, path, PROPERTIES_INTERFACE, "Get");
        call.write_string(interface)?;
        call.write_string(name)?;
        let mut reply = call.await_reply(self).await?;
        reply.read_variant()?.cast::<T>()
    }

    /// `org.freedesktop.DBus.Properties.Set`; the variant carries the
    /// property's declared signature
    pub async fn set_property(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        name: &str,
        signature: &str,
        value: Value,
    ) -> RuntimeResult<()> {
        let mut call = self.new_method_call(destination, path, PROPERTIES_INTERFACE, "Set");
        call.write_string(interface)?;
        call.write_string(name)?;
        call.write_variant_as(signature, &value)?;
        call.await_reply(self).await?;
        Ok(())
    }

    pub async fn get_all_properties(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
    ) -> RuntimeResult<IndexMap<String, Value>> {
        let mut call = self.new_method_call(destination, path, PROPERTIES_INTERFACE, "GetAll");
        call.write_string(interface)?;
        let mut reply = call.await_reply(self).await?;
        reply.read_string_variant_dict()
    }

    /// Subscribe to a signal as a stream. The match rule is registered with
    /// the bus on the first subscriber and removed when the last one drops.
    /// While another thread is adding or removing the same rule's match,
    /// this waits for that to finish.
    pub fn subscribe(
        &self,
        interface: &str,
        member: &str,
        path: Option<&str>,
        sender: Option<&str>,
    ) -> RuntimeResult<SignalStream> {
        let mut rule = MatchRule::new(interface, member);
        rule.path = path.map(str::to_string);
        rule.sender = sender.map(str::to_string);

        let (tx, rx) = mpsc::unbounded_channel();
        let guard = self.register(rule, Subscriber::Stream(tx))?;
        Ok(SignalStream {
            receiver: UnboundedReceiverStream::new(rx),
            guard,
        })
    }

    /// Subscribe with a callback that runs for every matching signal
    pub fn on_signal<F>(&self, rule: MatchRule, handler: F) -> RuntimeResult<SignalHandle>
    where
        F: Fn(SignalMessage) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        self.add_callback(rule, handler, false)
    }

    /// Like [`Connection::on_signal`], but unsubscribes after the first
    /// delivery
    pub fn on_signal_once<F>(&self, rule: MatchRule, handler: F) -> RuntimeResult<SignalHandle>
    where
        F: Fn(SignalMessage) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        self.add_callback(rule, handler, true)
    }

    fn add_callback<F>(&self, rule: MatchRule, handler: F, once: bool) -> RuntimeResult<SignalHandle>
    where
        F: Fn(SignalMessage) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        let subscriber = Subscriber::Callback {
            handler: Arc::new(handler),
            once,
        };
        let guard = self.register(rule, subscriber)?;
        Ok(SignalHandle { guard })
    }

    fn register(&self, rule: MatchRule, subscriber: Subscriber) -> RuntimeResult<SubscriptionGuard> {
        let registration = self
            .shared
            .settled_table(&rule)
            .insert(rule.clone(), subscriber);

        if registration.first {
            let added = self.shared.transport.add_match(&rule);
            {
                let mut table = self.shared.table();
                match &added {
                    Ok(()) => table.confirm(&rule),
                    Err(_) => table.abandon(&rule),
                }
            }
            self.shared.settled.notify_all();
            added?;
            debug!(rule = %rule, "Added match rule");
        }

        Ok(SubscriptionGuard {
            shared: self.shared.clone(),
            rule,
            id: registration.id,
        })
    }

    /// Hand an incoming signal to every matching subscriber. A failing
    /// subscriber is logged and skipped. Returns the number of deliveries.
    pub fn dispatch(&self, signal: &SignalMessage) -> usize {
        let delivery = self.shared.table().deliveries(signal);
        for rule in &delivery.emptied {
            self.shared.drop_match(rule);
        }

        let mut delivered = 0;
        for (_, subscriber) in delivery.targets {
            let mut message = signal.clone();
            message.body.rewind();

            match subscriber {
                Subscriber::Stream(sender) => {
                    if sender.send(message).is_ok() {
                        delivered += 1;
                    } else {
                        debug!(member = %signal.member, "Signal stream already closed");
                    }
                }
                Subscriber::Callback { handler, .. } => match handler(message) {
                    Ok(()) => delivered += 1,
                    Err(error) => warn!(
                        interface = %signal.interface,
                        member = %signal.member,
                        error = %error,
                        "Signal handler failed"
                    ),
                },
            }
        }
        delivered
    }

    /// Match rules that currently have subscribers
    pub fn active_rules(&self) -> Vec<MatchRule> {
        self.shared.table().rules().cloned().collect()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("active_rules", &self.active_rules().len())
            .finish()
    }
}

/// Unregisters its subscriber when dropped
struct SubscriptionGuard {
    shared: Arc<Shared>,
    rule: MatchRule,
    id: SubscriberId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.shared.release(&self.rule, self.id);
    }
}

/// Stream of matching signals. Dropping it unsubscribes.
pub struct SignalStream {
    receiver: UnboundedReceiverStream<SignalMessage>,
    guard: SubscriptionGuard,
}

impl SignalStream {
    pub fn rule(&self) -> &MatchRule {
        &self.guard.rule
    }
}

impl Stream for SignalStream {
    type Item = SignalMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl fmt::Debug for SignalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalStream")
            .field("rule", &self.guard.rule)
            .finish()
    }
}

/// Callback subscription. Dropping it (or calling
/// [`SignalHandle::unsubscribe`]) removes the callback.
pub struct SignalHandle {
    guard: SubscriptionGuard,
}

impl SignalHandle {
    pub fn rule(&self) -> &MatchRule {
        &self.guard.rule
    }

    pub fn unsubscribe(self) {}
}

impl fmt::Debug for SignalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHandle")
            .field("rule", &self.guard.rule)
            .finish()
    }
}
