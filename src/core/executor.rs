//! Trade execution façade: binds the event hub, account info provider, state
//! rules and the queue manager into a single handle that adapters embed.
use std::sync::{Arc, Mutex};

use log::*;

use crate::core::account::{AccountInfoData, AccountInfoProvider};
use crate::core::clock::Clock;
use crate::core::common::{PlatformType, POISONED_MUTEX};
use crate::core::events::{EventHub, EventKind, EventListener};
use crate::core::ids::TradeIdGenerator;
use crate::core::queue::{TradeQueueHandle, TradeQueueManager};
use crate::core::state::TradeStateManager;
use crate::core::trade::{TradeRequest, TradeResult, TradeResultCallback, TradeSignal};

//==================================================================================================
/// Front end of the execution core.  `place_trade` and
/// `set_trade_result_callback` are safe from any thread (including from
/// result callbacks); `process`, `update_trade` and `shutdown` belong to the
/// driving thread.
pub struct TradeExecutor {
    hub: Arc<EventHub>,
    account_info: AccountInfoProvider,
    queue: Arc<Mutex<TradeQueueManager>>,
    handle: TradeQueueHandle,
    platform_type: PlatformType,
}

impl TradeExecutor {
    pub fn new(
        account_info: Arc<dyn AccountInfoData>,
        platform_type: PlatformType,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let hub = Arc::new(EventHub::new());
        let provider = AccountInfoProvider::new(account_info);
        let id_generator = Arc::new(TradeIdGenerator::new());
        let state_manager = TradeStateManager::new(provider.clone(), clock.clone());
        let (manager, handle) = TradeQueueManager::new(
            hub.clone(),
            provider.clone(),
            state_manager,
            clock,
            id_generator,
        );
        let queue = Arc::new(Mutex::new(manager));

        let listener: Arc<Mutex<dyn EventListener>> = queue.clone();
        hub.subscribe_listener(EventKind::PriceUpdate, Arc::downgrade(&listener));
        hub.subscribe_listener(EventKind::DisconnectRequest, Arc::downgrade(&listener));

        TradeExecutor {
            hub,
            account_info: provider,
            queue,
            handle,
            platform_type,
        }
    }

    //----------------------------------------------------------------------------------------------
    /// Installs the process-wide trade result callback.  Invoked with cloned
    /// request/result pairs on every dispatch.
    pub fn set_trade_result_callback(&self, callback: TradeResultCallback) {
        self.handle.set_trade_result_callback(callback);
    }

    //----------------------------------------------------------------------------------------------
    /// Queues a trade for validation and execution
    pub fn place_trade(&self, request: TradeRequest) -> bool {
        self.handle
            .add_trade(request, self.platform_type, |_, _| true)
    }

    //----------------------------------------------------------------------------------------------
    /// Queues a trade with a preprocess hook that may veto or annotate the
    /// freshly created result
    pub fn place_trade_with<F>(&self, request: TradeRequest, preprocess: F) -> bool
    where
        F: FnMut(&TradeRequest, &mut TradeResult) -> bool,
    {
        self.handle
            .add_trade(request, self.platform_type, preprocess)
    }

    //----------------------------------------------------------------------------------------------
    /// Queues the request carried by a trade signal.  Strategy parameters on
    /// the signal are opaque to the engine and simply left with the caller.
    pub fn place_signal(&self, signal: TradeSignal) -> bool {
        self.place_trade(signal.request)
    }

    //----------------------------------------------------------------------------------------------
    /// Forwards a broker-reported result to the queue manager.  Driving
    /// thread only; do not call from inside an event handler.
    pub fn update_trade(&self, update: TradeResult) -> bool {
        self.queue.lock().expect(POISONED_MUTEX).update_trade(update)
    }

    //----------------------------------------------------------------------------------------------
    pub fn initialize(&self) {
        debug!("trade executor initialized for {}", self.platform_type);
    }

    //----------------------------------------------------------------------------------------------
    /// One engine tick: drains the hub's async queue, then runs the queue
    /// manager's pending/closing/finalizing passes.  Strictly non-blocking.
    pub fn process(&self) {
        self.hub.process();
        self.queue.lock().expect(POISONED_MUTEX).process();
    }

    //----------------------------------------------------------------------------------------------
    /// Finalizes every pending and open trade with `ClientForcedClose`
    pub fn shutdown(&self) {
        self.queue
            .lock()
            .expect(POISONED_MUTEX)
            .finalize_all_trades();
    }

    //----------------------------------------------------------------------------------------------
    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    //----------------------------------------------------------------------------------------------
    pub fn account_info(&self) -> &AccountInfoProvider {
        &self.account_info
    }

    //----------------------------------------------------------------------------------------------
    pub fn platform_type(&self) -> PlatformType {
        self.platform_type
    }

    //----------------------------------------------------------------------------------------------
    /// Current size of the open set
    pub fn open_trades(&self) -> i64 {
        self.queue.lock().expect(POISONED_MUTEX).open_trades()
    }
}
