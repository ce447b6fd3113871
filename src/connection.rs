//! Session connection state machine.
//!
//! Every connect attempt is tagged with a generation number. Transport
//! callbacks and late connect completions carry the generation they belong
//! to and are ignored once a teardown or a newer attempt has moved on, which
//! is what makes `teardown` safe to call at any point of an in-flight connect.

use crate::ui::{UiEvent, UiPublisher};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Slot {
    state: ConnectionState,
    generation: u64,
}

pub struct ConnectionStateMachine {
    slot: Mutex<Slot>,
    watch_tx: watch::Sender<ConnectionState>,
    ui: UiPublisher,
}

impl ConnectionStateMachine {
    pub fn new(ui: UiPublisher) -> Self {
        let (watch_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            slot: Mutex::new(Slot {
                state: ConnectionState::Disconnected,
                generation: 0,
            }),
            watch_tx,
            ui,
        }
    }

    pub fn current(&self) -> ConnectionState {
        self.with_slot(|slot| slot.state)
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.watch_tx.subscribe()
    }

    /// Starts a connect attempt. Returns `None` while an attempt is pending or
    /// a session is already up.
    pub fn begin_connect(&self) -> Option<u64> {
        self.with_slot(|slot| match slot.state {
            ConnectionState::Connecting | ConnectionState::Connected => None,
            ConnectionState::Disconnected | ConnectionState::Error => {
                slot.generation += 1;
                self.transition(slot, ConnectionState::Connecting);
                Some(slot.generation)
            }
        })
    }

    /// The transport for `generation` is open. False if the attempt is stale.
    pub fn opened(&self, generation: u64) -> bool {
        self.advance(generation, &[ConnectionState::Connecting], ConnectionState::Connected)
    }

    /// Device or transport open failure for `generation`.
    pub fn failed(&self, generation: u64) -> bool {
        self.advance(generation, &[ConnectionState::Connecting], ConnectionState::Error)
    }

    pub fn transport_closed(&self, generation: u64) -> bool {
        self.advance(generation, &[ConnectionState::Connected], ConnectionState::Disconnected)
    }

    pub fn transport_error(&self, generation: u64) -> bool {
        self.advance(
            generation,
            &[ConnectionState::Connecting, ConnectionState::Connected],
            ConnectionState::Error,
        )
    }

    /// Caller-initiated teardown. Invalidates every outstanding generation and
    /// settles on `Disconnected`, publishing only if the state actually moved.
    pub fn reset(&self) -> bool {
        self.with_slot(|slot| {
            slot.generation += 1;
            self.transition(slot, ConnectionState::Disconnected)
        })
    }

    fn advance(&self, generation: u64, from: &[ConnectionState], to: ConnectionState) -> bool {
        self.with_slot(|slot| {
            if slot.generation != generation {
                debug!(
                    "Ignoring {} for stale generation {} (current {})",
                    to, generation, slot.generation
                );
                return false;
            }
            if !from.contains(&slot.state) {
                return false;
            }
            self.transition(slot, to)
        })
    }

    fn transition(&self, slot: &mut Slot, to: ConnectionState) -> bool {
        if slot.state == to {
            return false;
        }
        info!("Connection state {} -> {}", slot.state, to);
        slot.state = to;
        self.watch_tx.send_replace(to);
        self.ui.publish(UiEvent::ConnectionStateChanged(to));
        true
    }

    fn with_slot<R>(&self, f: impl FnOnce(&mut Slot) -> R) -> R {
        let mut guard = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}
