use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use flicklab_timing::Clock;

use crate::mailbox::{Address, Envelope, Mailbox, Payload};

/// How often a blocked receive re-checks the stop flag.
const STOP_POLL: Duration = Duration::from_millis(50);

/// Shared cooperative stop flag; one flip ends every task's loop.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> StopToken {
        StopToken::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-address inboxes for one session; hands out one [`Node`] per task.
///
/// Messages from one sender arrive in send order; nothing is guaranteed
/// across senders.
pub struct Post {
    senders: HashMap<Address, Sender<Envelope>>,
    inboxes: HashMap<Address, Receiver<Envelope>>,
    stop: StopToken,
    clock: Clock,
}

impl Post {
    pub fn open(addresses: &[Address]) -> Post {
        let mut senders = HashMap::new();
        let mut inboxes = HashMap::new();
        for &address in addresses {
            let (tx, rx) = unbounded();
            senders.insert(address, tx);
            inboxes.insert(address, rx);
        }
        Post { senders, inboxes, stop: StopToken::new(), clock: Clock::new() }
    }

    /// Claims the node for `address`; each address can be claimed once.
    pub fn node(&mut self, address: Address) -> Option<Node> {
        let inbox = self.inboxes.remove(&address)?;
        Some(Node {
            address,
            inbox,
            senders: self.senders.clone(),
            stop: self.stop.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn clock(&self) -> Clock {
        self.clock.clone()
    }
}

/// One task's end of the post office.
pub struct Node {
    address: Address,
    inbox: Receiver<Envelope>,
    senders: HashMap<Address, Sender<Envelope>>,
    stop: StopToken,
    clock: Clock,
}

impl Node {
    pub fn address(&self) -> Address {
        self.address
    }
}

impl Mailbox for Node {
    fn send(&self, to: Address, payload: Payload) {
        if let Some(tx) = self.senders.get(&to) {
            // a receiver gone mid-shutdown is not an error
            let _ = tx.send(Envelope { from: self.address, payload });
        }
    }

    fn try_receive(&self, timeout: Duration) -> Option<Envelope> {
        let deadline = Instant::now() + timeout;
        loop {
            // already-delivered messages win over a stop, so sinks can
            // drain their inbox during teardown
            if let Ok(envelope) = self.inbox.try_recv() {
                return Some(envelope);
            }
            if self.stop.is_stopped() {
                return None;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match self.inbox.recv_timeout(remaining.min(STOP_POLL)) {
                Ok(envelope) => return Some(envelope),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    fn working(&self) -> bool {
        !self.stop.is_stopped()
    }
}
