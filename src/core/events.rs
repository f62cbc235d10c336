//! Event hub: typed in-process pub/sub between the execution core and
//! platform adapters, with a synchronous path and a queued path for
//! cross-thread delivery.
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use log::*;

use crate::core::account::AccountInfoUpdate;
use crate::core::common::{BridgeStatusUpdate, POISONED_MUTEX};
use crate::core::platform::{AuthData, ConnectionCallback, DisconnectCallback};
use crate::core::ticks::TickData;
use crate::core::trade::Transaction;

//==================================================================================================
/// Messages brokered between the execution core and platform adapters
#[derive(Clone)]
pub enum Event {
    /// Authorization data handed to the adapter's auth pipeline
    AuthData(Arc<dyn AuthData>),
    /// Request to establish a connection
    ConnectRequest { callback: ConnectionCallback },
    /// Request to drop the connection; the queue manager finalizes all
    /// trades when it sees this
    DisconnectRequest { callback: DisconnectCallback },
    /// Request to restart the authorization flow
    RestartAuth,
    /// Result of automatic host selection
    AutoDomainSelected { success: bool, host: String },
    AccountInfoUpdate(AccountInfoUpdate),
    /// Ask the adapter to refresh the balance; polling itself is an
    /// adapter-private concern
    BalanceRequest,
    /// Fresh ticks for one or more symbols
    PriceUpdate(Vec<TickData>),
    /// An admitted trade the adapter must execute
    TradeRequest(Transaction),
    /// A trade past its close date the adapter must resolve
    TradeStatus(Transaction),
    /// Any observable change of a transaction
    TradeTransaction(Transaction),
    /// Open-trade counter change
    OpenTrades { count: i64, transaction: Transaction },
    BridgeStatus(BridgeStatusUpdate),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::AuthData(_) => EventKind::AuthData,
            Event::ConnectRequest { .. } => EventKind::ConnectRequest,
            Event::DisconnectRequest { .. } => EventKind::DisconnectRequest,
            Event::RestartAuth => EventKind::RestartAuth,
            Event::AutoDomainSelected { .. } => EventKind::AutoDomainSelected,
            Event::AccountInfoUpdate(_) => EventKind::AccountInfoUpdate,
            Event::BalanceRequest => EventKind::BalanceRequest,
            Event::PriceUpdate(_) => EventKind::PriceUpdate,
            Event::TradeRequest(_) => EventKind::TradeRequest,
            Event::TradeStatus(_) => EventKind::TradeStatus,
            Event::TradeTransaction(_) => EventKind::TradeTransaction,
            Event::OpenTrades { .. } => EventKind::OpenTrades,
            Event::BridgeStatus(_) => EventKind::BridgeStatus,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Event::{:?}", self.kind())
    }
}

//==================================================================================================
/// Type tag used to key subscriptions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    AuthData,
    ConnectRequest,
    DisconnectRequest,
    RestartAuth,
    AutoDomainSelected,
    AccountInfoUpdate,
    BalanceRequest,
    PriceUpdate,
    TradeRequest,
    TradeStatus,
    TradeTransaction,
    OpenTrades,
    BridgeStatus,
}

//--------------------------------------------------------------------------------------------------
/// Finds the tick for a symbol within a price update payload
pub fn tick_by_symbol<'a>(ticks: &'a [TickData], symbol: &str) -> Option<&'a TickData> {
    ticks.iter().find(|tick| tick.symbol == symbol)
}

//==================================================================================================
/// Handler registered for a single event kind
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Polymorphic subscriber; one `on_event` receives every kind it registered
/// for
pub trait EventListener: Send {
    fn on_event(&mut self, event: &Event);
}

//==================================================================================================
/// Manages subscriptions and notifications.  `notify` runs handlers
/// synchronously on the caller's thread in registration order;
/// `notify_async` enqueues for the driving thread's `process()`.
pub struct EventHub {
    callbacks: Mutex<HashMap<EventKind, Vec<EventCallback>>>,
    listeners: Mutex<HashMap<EventKind, Vec<Weak<Mutex<dyn EventListener>>>>>,
    event_queue: Mutex<VecDeque<Event>>,
}

impl EventHub {
    pub fn new() -> Self {
        EventHub {
            callbacks: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            event_queue: Mutex::new(VecDeque::new()),
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Registers a callback for one event kind
    pub fn subscribe(&self, kind: EventKind, callback: EventCallback) {
        let mut callbacks = self.callbacks.lock().expect(POISONED_MUTEX);
        callbacks.entry(kind).or_default().push(callback);
    }

    //----------------------------------------------------------------------------------------------
    /// Registers a listener for one event kind.  The hub keeps a weak
    /// reference; dropped listeners are pruned on the next notify.
    pub fn subscribe_listener(&self, kind: EventKind, listener: Weak<Mutex<dyn EventListener>>) {
        let mut listeners = self.listeners.lock().expect(POISONED_MUTEX);
        listeners.entry(kind).or_default().push(listener);
    }

    //----------------------------------------------------------------------------------------------
    /// Synchronously notifies all subscribers of the event's kind.  A
    /// panicking handler is isolated: it is logged and siblings still run.
    pub fn notify(&self, event: &Event) {
        let kind = event.kind();

        let callbacks: Vec<EventCallback> = {
            let map = self.callbacks.lock().expect(POISONED_MUTEX);
            map.get(&kind).cloned().unwrap_or_default()
        };
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!("event callback panicked while handling {:?}", kind);
            }
        }

        let listeners: Vec<Weak<Mutex<dyn EventListener>>> = {
            let map = self.listeners.lock().expect(POISONED_MUTEX);
            map.get(&kind).cloned().unwrap_or_default()
        };
        let mut dropped = false;
        for weak in listeners {
            match weak.upgrade() {
                Some(listener) => {
                    let outcome = catch_unwind(AssertUnwindSafe(|| match listener.lock() {
                        Ok(mut guard) => guard.on_event(event),
                        Err(_) => error!("listener mutex poisoned, skipping {:?}", kind),
                    }));
                    if outcome.is_err() {
                        error!("event listener panicked while handling {:?}", kind);
                    }
                }
                None => dropped = true,
            }
        }
        if dropped {
            let mut map = self.listeners.lock().expect(POISONED_MUTEX);
            if let Some(list) = map.get_mut(&kind) {
                list.retain(|weak| weak.strong_count() > 0);
            }
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Queues an event for delivery from the driving thread.  FIFO order is
    /// preserved across `notify_async` calls.
    pub fn notify_async(&self, event: Event) {
        let mut queue = self.event_queue.lock().expect(POISONED_MUTEX);
        queue.push_back(event);
    }

    //----------------------------------------------------------------------------------------------
    /// Drains the async queue via synchronous `notify`.  Call from the
    /// designated consumer thread only.
    pub fn process(&self) {
        let drained: VecDeque<Event> = {
            let mut queue = self.event_queue.lock().expect(POISONED_MUTEX);
            std::mem::take(&mut *queue)
        };
        for event in drained {
            self.notify(&event);
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        EventHub::new()
    }
}
