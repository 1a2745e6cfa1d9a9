//! Named publish/subscribe.
//!
//! [`EventBus`] is the primitive every stateful type in this crate uses to
//! expose asynchronous occurrences: the connection publishes one event per
//! command, channels publish joins and messages, users publish WHOIS results.
//!
//! # Semantics
//!
//! - Event names are case-insensitive; `"PRIVMSG"` and `"privmsg"` are the
//!   same event. Command names arrive in mixed case from the wire, so lookups
//!   always normalize.
//! - [`emit`](EventBus::emit) runs matching listeners inline, in registration
//!   order, on the caller's task. A listener that blocks stalls the emitter.
//! - A `once` listener is dropped after its first invocation.
//! - A `once` + `queued` listener is a mailbox slot: queued slots for an event
//!   form a FIFO and each emission consumes exactly one of them, the oldest.
//! - Emitting an event nobody listens to is a no-op.
//!
//! Listeners may register further listeners, or emit other events, from
//! inside a callback. Listeners added during an emission do not see the
//! emission that is in progress.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// How a listener is retained after it fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenOptions {
    /// Drop the listener after it fires.
    pub once: bool,
    /// With `once`, consume one listener per emission in FIFO order.
    pub queued: bool,
}

impl ListenOptions {
    /// Listener that stays registered.
    pub const PERSISTENT: Self = Self {
        once: false,
        queued: false,
    };

    /// Listener dropped after its first invocation.
    pub const ONCE: Self = Self {
        once: true,
        queued: false,
    };

    /// Queued one-shot listener.
    pub const QUEUED: Self = Self {
        once: true,
        queued: true,
    };
}

struct Listener<T> {
    options: ListenOptions,
    callback: Callback<T>,
}

/// Ordered, named-event publish/subscribe.
pub struct EventBus<T> {
    listeners: Mutex<HashMap<String, Vec<Listener<T>>>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        let mut map = f.debug_map();
        for (name, entries) in listeners.iter() {
            map.entry(name, &entries.len());
        }
        map.finish()
    }
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl<T> EventBus<T> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent listener.
    pub fn on<F>(&self, name: &str, listener: F)
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.on_with(name, ListenOptions::PERSISTENT, listener);
    }

    /// Register a listener that fires at most once.
    pub fn once<F>(&self, name: &str, listener: F)
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.on_with(name, ListenOptions::ONCE, listener);
    }

    /// Register a listener with explicit retention options.
    pub fn on_with<F>(&self, name: &str, options: ListenOptions, listener: F)
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.listeners
            .lock()
            .entry(normalize(name))
            .or_default()
            .push(Listener {
                options,
                callback: Box::new(listener),
            });
    }

    /// Whether at least one listener is registered for `name`.
    pub fn has_handler(&self, name: &str) -> bool {
        self.listeners
            .lock()
            .get(&normalize(name))
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Number of listeners registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .lock()
            .get(&normalize(name))
            .map_or(0, Vec::len)
    }

    /// Invoke the listeners for `name` with `payload`.
    ///
    /// Returns how many listeners ran.
    pub fn emit(&self, name: &str, payload: &T) -> usize {
        let key = normalize(name);

        // The lock is released while callbacks run so they can re-enter the bus.
        let current = match self.listeners.lock().get_mut(&key) {
            Some(entries) if !entries.is_empty() => std::mem::take(entries),
            _ => return 0,
        };

        let mut retained = Vec::with_capacity(current.len());
        let mut mailbox_consumed = false;
        let mut fired = 0;

        for mut listener in current {
            let ListenOptions { once, queued } = listener.options;
            if once && queued {
                if mailbox_consumed {
                    retained.push(listener);
                    continue;
                }
                mailbox_consumed = true;
            }

            (listener.callback)(payload);
            fired += 1;

            if !once {
                retained.push(listener);
            }
        }

        let mut listeners = self.listeners.lock();
        let slot = listeners.entry(key.clone()).or_default();
        retained.append(slot);
        if retained.is_empty() {
            listeners.remove(&key);
        } else {
            *slot = retained;
        }

        fired
    }

    /// Drop every listener for `name`.
    pub fn clear(&self, name: &str) {
        self.listeners.lock().remove(&normalize(name));
    }
}

/// An entity that exposes its occurrences through an [`EventBus`].
///
/// Implemented by the connection, the client, channels and users so callers
/// subscribe to all of them the same way.
pub trait Observable {
    /// Payload carried by this entity's events.
    type Event;

    /// The entity's event surface.
    fn events(&self) -> &EventBus<Self::Event>;

    /// Subscribe to `name` until the entity is dropped.
    fn on<F>(&self, name: &str, listener: F)
    where
        F: FnMut(&Self::Event) + Send + 'static,
    {
        self.events().on(name, listener);
    }

    /// Subscribe to the next occurrence of `name` only.
    fn once<F>(&self, name: &str, listener: F)
    where
        F: FnMut(&Self::Event) + Send + 'static,
    {
        self.events().once(name, listener);
    }

    /// Whether anything listens for `name`.
    fn has_handler(&self, name: &str) -> bool {
        self.events().has_handler(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Callback<u32>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |tag: &'static str| -> Callback<u32> {
            let sink = Arc::clone(&sink);
            Box::new(move |v: &u32| sink.lock().push(format!("{tag}:{v}")))
        };
        (log, make)
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.on("tick", make("a"));
        bus.on("tick", make("b"));

        assert_eq!(bus.emit("tick", &1), 2);
        assert_eq!(*log.lock(), vec!["a:1", "b:1"]);
    }

    #[test]
    fn names_are_case_insensitive() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.on("PRIVMSG", make("m"));

        assert!(bus.has_handler("privmsg"));
        bus.emit("PrivMsg", &7);
        assert_eq!(*log.lock(), vec!["m:7"]);
    }

    #[test]
    fn emit_without_listeners_is_noop() {
        let bus: EventBus<u32> = EventBus::new();
        assert_eq!(bus.emit("nothing", &0), 0);
        assert!(!bus.has_handler("nothing"));
    }

    #[test]
    fn once_listener_is_removed_after_first_call() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.once("ready", make("o"));
        bus.on("ready", make("p"));

        bus.emit("ready", &1);
        bus.emit("ready", &2);
        assert_eq!(*log.lock(), vec!["o:1", "p:1", "p:2"]);
        assert_eq!(bus.listener_count("ready"), 1);
    }

    #[test]
    fn queued_listeners_consume_one_per_emission() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.on_with("reply", ListenOptions::QUEUED, make("q1"));
        bus.on_with("reply", ListenOptions::QUEUED, make("q2"));

        bus.emit("reply", &1);
        assert_eq!(*log.lock(), vec!["q1:1"]);
        assert!(bus.has_handler("reply"));

        bus.emit("reply", &2);
        assert_eq!(*log.lock(), vec!["q1:1", "q2:2"]);
        assert!(!bus.has_handler("reply"));
    }

    #[test]
    fn listener_may_register_during_emit() {
        let bus = Arc::new(EventBus::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let inner_bus = Arc::clone(&bus);
        let inner_calls = Arc::clone(&calls);
        bus.once("join", move |_| {
            let calls = Arc::clone(&inner_calls);
            inner_bus.on("join", move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.emit("join", &1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        bus.emit("join", &2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
