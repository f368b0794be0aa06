//! In-process queue broker.
//!
//! # Responsibilities
//! - Host named queues per queue manager
//! - Give each session a unit of work: syncpoint gets stay hidden until
//!   commit and return to the head of the queue on backout; syncpoint puts
//!   stay invisible until commit
//! - Block receivers until a message is committed or the wait expires
//! - Inject failures (outages, failing operations) for tests
//!
//! # Design Decisions
//! - One std mutex over the whole broker state; no await while it is held
//! - Disconnecting or dropping a session backs out its unit of work
//! - Taking a queue manager down breaks its sessions and backs them out

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::transport::{
    AccessMode, ConnectionParams, GetOptions, Message, PutOptions, QueueHandle, QueueTransport, Received,
    Session, TransportError,
};

/// Operation targeted by an injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    Connect,
    Get,
    Put,
    Commit,
}

type QueueKey = (String, String);

#[derive(Debug, Default)]
struct UnitOfWork {
    queue_manager: String,
    connected: bool,
    gets: Vec<(QueueKey, Message)>,
    puts: Vec<(QueueKey, Message)>,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<QueueKey, VecDeque<Message>>,
    sessions: HashMap<u64, UnitOfWork>,
    next_session: u64,
    down: HashSet<String>,
    faults: HashMap<(String, FaultOp), usize>,
    connects: HashMap<String, usize>,
}

impl BrokerState {
    fn take_fault(&mut self, queue_manager: &str, op: FaultOp) -> bool {
        match self.faults.get_mut(&(queue_manager.to_string(), op)) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn session(&mut self, id: u64) -> Option<&mut UnitOfWork> {
        self.sessions.get_mut(&id).filter(|uow| uow.connected)
    }

    /// Undo a session's unit of work. Returns true if anything changed.
    fn backout(&mut self, id: u64) -> bool {
        let Some(uow) = self.sessions.get_mut(&id) else {
            return false;
        };
        let gets = std::mem::take(&mut uow.gets);
        let had_puts = !uow.puts.is_empty();
        uow.puts.clear();

        let restored = !gets.is_empty();
        for (key, message) in gets.into_iter().rev() {
            self.queues.entry(key).or_default().push_front(message);
        }
        restored || had_puts
    }
}

struct BrokerInner {
    state: Mutex<BrokerState>,
    changed: Notify,
}

/// Shared handle to an in-process broker. Clones see the same queues.
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                state: Mutex::new(BrokerState::default()),
                changed: Notify::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(queue_manager: &str, queue: &str) -> QueueKey {
        (queue_manager.to_string(), queue.to_string())
    }

    /// Create an empty queue. Existing queues are kept.
    pub fn define_queue(&self, queue_manager: &str, queue: &str) {
        self.lock().queues.entry(Self::key(queue_manager, queue)).or_default();
    }

    /// Append a committed message to a queue, defining it if needed.
    pub fn enqueue(&self, queue_manager: &str, queue: &str, message: Message) {
        self.lock()
            .queues
            .entry(Self::key(queue_manager, queue))
            .or_default()
            .push_back(message);
        self.inner.changed.notify_waiters();
    }

    /// Number of committed messages visible on a queue.
    pub fn depth(&self, queue_manager: &str, queue: &str) -> usize {
        self.lock()
            .queues
            .get(&Self::key(queue_manager, queue))
            .map_or(0, VecDeque::len)
    }

    /// Snapshot of the committed messages on a queue.
    pub fn messages(&self, queue_manager: &str, queue: &str) -> Vec<Message> {
        self.lock()
            .queues
            .get(&Self::key(queue_manager, queue))
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Take a queue manager down or bring it back.
    ///
    /// Going down breaks every session on it and backs out their work.
    pub fn set_available(&self, queue_manager: &str, available: bool) {
        let mut state = self.lock();
        if available {
            state.down.remove(queue_manager);
        } else {
            state.down.insert(queue_manager.to_string());
            let ids: Vec<u64> = state
                .sessions
                .iter()
                .filter(|(_, uow)| uow.connected && uow.queue_manager == queue_manager)
                .map(|(id, _)| *id)
                .collect();
            for id in ids {
                state.backout(id);
                if let Some(uow) = state.sessions.get_mut(&id) {
                    uow.connected = false;
                }
            }
        }
        drop(state);
        self.inner.changed.notify_waiters();
    }

    /// Make the next `count` operations of a kind fail on a queue manager.
    pub fn fail_next(&self, queue_manager: &str, op: FaultOp, count: usize) {
        *self
            .lock()
            .faults
            .entry((queue_manager.to_string(), op))
            .or_default() += count;
    }

    /// Successful connects so far.
    pub fn connect_count(&self, queue_manager: &str) -> usize {
        self.lock().connects.get(queue_manager).copied().unwrap_or(0)
    }

    /// Sessions currently connected.
    pub fn open_sessions(&self) -> usize {
        self.lock().sessions.values().filter(|uow| uow.connected).count()
    }

    fn broken(queue_manager: &str) -> TransportError {
        TransportError::ConnectionBroken {
            queue_manager: queue_manager.to_string(),
        }
    }

    fn try_get(&self, session: u64, key: &QueueKey, syncpoint: bool) -> Result<Option<Message>, TransportError> {
        let mut state = self.lock();
        let queue_manager = &key.0;
        if state.session(session).is_none() {
            return Err(Self::broken(queue_manager));
        }
        if state.take_fault(queue_manager, FaultOp::Get) {
            return Err(TransportError::Get {
                queue: key.1.clone(),
                reason: "injected fault".to_string(),
            });
        }

        let Some(message) = state.queues.get_mut(key).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        if syncpoint {
            if let Some(uow) = state.session(session) {
                uow.gets.push((key.clone(), message.clone()));
            }
        }
        Ok(Some(message))
    }

    fn end_session(&self, session: u64) {
        let mut state = self.lock();
        let changed = state.backout(session);
        state.sessions.remove(&session);
        drop(state);
        if changed {
            self.inner.changed.notify_waiters();
        }
    }
}

#[async_trait]
impl QueueTransport for MemoryBroker {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Session>, TransportError> {
        let mut state = self.lock();
        let queue_manager = params.queue_manager.clone();

        if state.down.contains(&queue_manager) {
            return Err(TransportError::Connect {
                queue_manager,
                reason: "queue manager not available".to_string(),
            });
        }
        if state.take_fault(&queue_manager, FaultOp::Connect) {
            return Err(TransportError::Connect {
                queue_manager,
                reason: "injected fault".to_string(),
            });
        }

        let id = state.next_session;
        state.next_session += 1;
        state.sessions.insert(
            id,
            UnitOfWork {
                queue_manager: queue_manager.clone(),
                connected: true,
                ..Default::default()
            },
        );
        *state.connects.entry(queue_manager.clone()).or_default() += 1;

        Ok(Box::new(MemorySession {
            broker: self.clone(),
            id,
            queue_manager,
            open: true,
        }))
    }
}

/// Session on a [`MemoryBroker`].
pub struct MemorySession {
    broker: MemoryBroker,
    id: u64,
    queue_manager: String,
    open: bool,
}

#[async_trait]
impl Session for MemorySession {
    async fn access_queue(&mut self, queue: &str, mode: AccessMode) -> Result<Box<dyn QueueHandle>, TransportError> {
        let key = MemoryBroker::key(&self.queue_manager, queue);
        let mut state = self.broker.lock();
        if state.session(self.id).is_none() {
            return Err(MemoryBroker::broken(&self.queue_manager));
        }
        if !state.queues.contains_key(&key) {
            return Err(TransportError::Access {
                queue: queue.to_string(),
                reason: "unknown object name".to_string(),
            });
        }

        Ok(Box::new(MemoryQueue {
            broker: self.broker.clone(),
            session: self.id,
            key,
            mode,
        }))
    }

    async fn commit(&mut self) -> Result<(), TransportError> {
        let mut state = self.broker.lock();
        if state.session(self.id).is_none() {
            return Err(MemoryBroker::broken(&self.queue_manager));
        }
        if state.take_fault(&self.queue_manager, FaultOp::Commit) {
            return Err(TransportError::Commit {
                queue_manager: self.queue_manager.clone(),
                reason: "injected fault".to_string(),
            });
        }

        let Some(uow) = state.session(self.id) else {
            return Err(MemoryBroker::broken(&self.queue_manager));
        };
        uow.gets.clear();
        let puts = std::mem::take(&mut uow.puts);
        let published = !puts.is_empty();
        for (key, message) in puts {
            state.queues.entry(key).or_default().push_back(message);
        }
        drop(state);

        if published {
            self.broker.inner.changed.notify_waiters();
        }
        Ok(())
    }

    async fn backout(&mut self) -> Result<(), TransportError> {
        let mut state = self.broker.lock();
        if state.session(self.id).is_none() {
            return Err(MemoryBroker::broken(&self.queue_manager));
        }
        let changed = state.backout(self.id);
        drop(state);

        if changed {
            self.broker.inner.changed.notify_waiters();
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open && self.broker.lock().session(self.id).is_some()
    }

    async fn disconnect(&mut self) {
        if self.open {
            self.open = false;
            self.broker.end_session(self.id);
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if self.open {
            self.broker.end_session(self.id);
        }
    }
}

/// Queue opened through a [`MemorySession`].
pub struct MemoryQueue {
    broker: MemoryBroker,
    session: u64,
    key: QueueKey,
    mode: AccessMode,
}

#[async_trait]
impl QueueHandle for MemoryQueue {
    fn queue_name(&self) -> &str {
        &self.key.1
    }

    async fn get(&mut self, options: GetOptions) -> Result<Received, TransportError> {
        if self.mode != AccessMode::Input {
            return Err(TransportError::Get {
                queue: self.key.1.clone(),
                reason: "queue not open for input".to_string(),
            });
        }

        let deadline = options.wait.map(|wait| Instant::now() + wait);
        loop {
            let notified = self.broker.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.broker.try_get(self.session, &self.key, options.syncpoint)? {
                return Ok(Received::Message(message));
            }

            let Some(deadline) = deadline else {
                return Ok(Received::Empty);
            };
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Received::Empty);
            }
        }
    }

    async fn put(&mut self, message: &Message, options: PutOptions) -> Result<(), TransportError> {
        if self.mode != AccessMode::Output {
            return Err(TransportError::Put {
                queue: self.key.1.clone(),
                reason: "queue not open for output".to_string(),
            });
        }

        let mut state = self.broker.lock();
        let queue_manager = self.key.0.clone();
        if state.session(self.session).is_none() {
            return Err(MemoryBroker::broken(&queue_manager));
        }
        if state.take_fault(&queue_manager, FaultOp::Put) {
            return Err(TransportError::Put {
                queue: self.key.1.clone(),
                reason: "injected fault".to_string(),
            });
        }

        if options.syncpoint {
            if let Some(uow) = state.session(self.session) {
                uow.puts.push((self.key.clone(), message.clone()));
            }
            return Ok(());
        }

        state.queues.entry(self.key.clone()).or_default().push_back(message.clone());
        drop(state);
        self.broker.inner.changed.notify_waiters();
        Ok(())
    }
}
