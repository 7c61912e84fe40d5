//! Bounded hand-off between the host's logging threads and the delivery
//! worker.
//!
//! `append` must never block the application for the duration of a remote
//! round-trip, so composed messages are queued here and a dedicated worker
//! thread drains the queue, one submission at a time. The queue is bounded;
//! what happens on overflow is an explicit policy, not an accident.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::gmail::Transport;
use crate::message::ComposedMessage;

const DEFAULT_CAPACITY: usize = 128;

/// What to do with an incoming message when the queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the oldest queued message to make room.
    DropOldest,
    /// Discard the incoming message.
    DropNewest,
    /// Wait for room up to the timeout, then discard the incoming message.
    Block(Duration),
}

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub capacity: usize,
    pub policy: OverflowPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: OverflowPolicy::DropNewest,
        }
    }
}

struct State {
    messages: VecDeque<ComposedMessage>,
    closed: bool,
    // Worker is in the middle of a submission; the queue may be empty
    // while a delivery is still outstanding.
    in_flight: bool,
}

struct Shared {
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
}

/// Producer half of the delivery queue. Dropping it drains and joins the
/// worker.
pub struct Dispatcher {
    shared: Arc<Shared>,
    capacity: usize,
    policy: OverflowPolicy,
    worker: Option<thread::JoinHandle<()>>,
}

impl Dispatcher {
    pub fn spawn(
        transport: Arc<dyn Transport>,
        sender: String,
        config: DispatchConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                messages: VecDeque::new(),
                closed: false,
                in_flight: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let worker = thread::spawn(move || run(worker_shared, transport, sender));

        Self {
            shared,
            capacity: config.capacity.max(1),
            policy: config.policy,
            worker: Some(worker),
        }
    }

    /// Queue one message for delivery. Returns false if the message was
    /// discarded because of the overflow policy or a closed queue.
    pub fn dispatch(&self, message: ComposedMessage) -> bool {
        let mut state = match self.shared.state.lock() {
            Ok(state) => state,
            Err(_) => return false,
        };

        if state.closed {
            return false;
        }

        if state.messages.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropOldest => {
                    state.messages.pop_front();
                }
                OverflowPolicy::DropNewest => return false,
                OverflowPolicy::Block(timeout) => {
                    let capacity = self.capacity;
                    let result = self.shared.not_full.wait_timeout_while(
                        state,
                        timeout,
                        |s| !s.closed && s.messages.len() >= capacity,
                    );
                    state = match result {
                        Ok((state, _)) => state,
                        Err(_) => return false,
                    };
                    if state.closed || state.messages.len() >= self.capacity {
                        return false;
                    }
                }
            }
        }

        state.messages.push_back(message);
        self.shared.not_empty.notify_one();
        true
    }

    /// Block until every queued message has been handed to the transport
    /// and the outstanding submission, if any, has completed.
    pub fn flush(&self) {
        let state = match self.shared.state.lock() {
            Ok(state) => state,
            Err(_) => return,
        };
        let _state = self
            .shared
            .not_full
            .wait_while(state, |s| !s.messages.is_empty() || s.in_flight);
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.closed = true;
        }
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run(shared: Arc<Shared>, transport: Arc<dyn Transport>, sender: String) {
    loop {
        let message = {
            let mut state = match shared.state.lock() {
                Ok(state) => state,
                Err(_) => return,
            };
            loop {
                if let Some(message) = state.messages.pop_front() {
                    state.in_flight = true;
                    break message;
                }
                if state.closed {
                    return;
                }
                state = match shared.not_empty.wait(state) {
                    Ok(state) => state,
                    Err(_) => return,
                };
            }
        };
        // Room just opened up for blocked producers
        shared.not_full.notify_all();

        match transport.submit(&sender, &message) {
            Ok(()) => log::debug!("log record delivered"),
            Err(e) => log::error!("failed to deliver log record: {}", e),
        }

        if let Ok(mut state) = shared.state.lock() {
            state.in_flight = false;
        }
        shared.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Condvar as StdCondvar, Mutex as StdMutex};

    use super::*;
    use crate::gmail::TransportError;
    use crate::message::compose;

    fn message(body: &str) -> ComposedMessage {
        compose("a@x.com", "Alert", body, None).unwrap()
    }

    fn body_of(raw: &[u8]) -> String {
        let text = std::str::from_utf8(raw).unwrap();
        text.split("\r\n\r\n").nth(1).unwrap().to_string()
    }

    /// Records every submission; can be gated so the worker stays busy
    /// while a test fills the queue.
    struct GateTransport {
        gate: StdMutex<bool>,
        opened: StdCondvar,
        started: StdMutex<bool>,
        started_cond: StdCondvar,
        bodies: StdMutex<Vec<String>>,
        senders: StdMutex<Vec<String>>,
    }

    impl GateTransport {
        fn new(open: bool) -> Arc<Self> {
            Arc::new(Self {
                gate: StdMutex::new(open),
                opened: StdCondvar::new(),
                started: StdMutex::new(false),
                started_cond: StdCondvar::new(),
                bodies: StdMutex::new(Vec::new()),
                senders: StdMutex::new(Vec::new()),
            })
        }

        fn open(&self) {
            *self.gate.lock().unwrap() = true;
            self.opened.notify_all();
        }

        fn wait_until_submitting(&self) {
            let started = self.started.lock().unwrap();
            let _started = self
                .started_cond
                .wait_while(started, |s| !*s)
                .unwrap();
        }
    }

    impl Transport for GateTransport {
        fn submit(&self, sender: &str, message: &ComposedMessage) -> Result<(), TransportError> {
            {
                let mut started = self.started.lock().unwrap();
                *started = true;
                self.started_cond.notify_all();
            }
            {
                let gate = self.gate.lock().unwrap();
                let _gate = self.opened.wait_while(gate, |open| !*open).unwrap();
            }
            self.senders.lock().unwrap().push(sender.to_string());
            self.bodies
                .lock()
                .unwrap()
                .push(body_of(message.as_bytes()));
            Ok(())
        }
    }

    struct FailingTransport {
        calls: AtomicUsize,
    }

    impl Transport for FailingTransport {
        fn submit(&self, _sender: &str, _message: &ComposedMessage) -> Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::NetworkUnavailable("no route to host".into()))
        }
    }

    #[test]
    fn delivers_in_order() {
        let transport = GateTransport::new(true);
        let dispatcher = Dispatcher::spawn(
            transport.clone(),
            "ops@x.com".into(),
            DispatchConfig::default(),
        );

        assert!(dispatcher.dispatch(message("one")));
        assert!(dispatcher.dispatch(message("two")));
        dispatcher.flush();

        assert_eq!(*transport.bodies.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(
            *transport.senders.lock().unwrap(),
            vec!["ops@x.com", "ops@x.com"]
        );
    }

    #[test]
    fn drop_newest_discards_incoming_when_full() {
        let transport = GateTransport::new(false);
        let dispatcher = Dispatcher::spawn(
            transport.clone(),
            "ops@x.com".into(),
            DispatchConfig {
                capacity: 1,
                policy: OverflowPolicy::DropNewest,
            },
        );

        assert!(dispatcher.dispatch(message("one")));
        transport.wait_until_submitting();

        assert!(dispatcher.dispatch(message("two")));
        assert!(!dispatcher.dispatch(message("three")));

        transport.open();
        dispatcher.flush();

        assert_eq!(*transport.bodies.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn drop_oldest_evicts_queued_message_when_full() {
        let transport = GateTransport::new(false);
        let dispatcher = Dispatcher::spawn(
            transport.clone(),
            "ops@x.com".into(),
            DispatchConfig {
                capacity: 1,
                policy: OverflowPolicy::DropOldest,
            },
        );

        assert!(dispatcher.dispatch(message("one")));
        transport.wait_until_submitting();

        assert!(dispatcher.dispatch(message("two")));
        assert!(dispatcher.dispatch(message("three")));

        transport.open();
        dispatcher.flush();

        assert_eq!(*transport.bodies.lock().unwrap(), vec!["one", "three"]);
    }

    #[test]
    fn block_policy_times_out_and_discards() {
        let transport = GateTransport::new(false);
        let dispatcher = Dispatcher::spawn(
            transport.clone(),
            "ops@x.com".into(),
            DispatchConfig {
                capacity: 1,
                policy: OverflowPolicy::Block(Duration::from_millis(50)),
            },
        );

        assert!(dispatcher.dispatch(message("one")));
        transport.wait_until_submitting();

        assert!(dispatcher.dispatch(message("two")));
        assert!(!dispatcher.dispatch(message("three")));

        transport.open();
        dispatcher.flush();

        assert_eq!(*transport.bodies.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn failure_is_contained_and_not_retried() {
        let transport = Arc::new(FailingTransport {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = Dispatcher::spawn(
            transport.clone(),
            "ops@x.com".into(),
            DispatchConfig::default(),
        );

        assert!(dispatcher.dispatch(message("one")));
        dispatcher.flush();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_drains_queued_messages() {
        let transport = GateTransport::new(true);
        {
            let dispatcher = Dispatcher::spawn(
                transport.clone(),
                "ops@x.com".into(),
                DispatchConfig::default(),
            );
            assert!(dispatcher.dispatch(message("one")));
            assert!(dispatcher.dispatch(message("two")));
        }

        assert_eq!(*transport.bodies.lock().unwrap(), vec!["one", "two"]);
    }
}
