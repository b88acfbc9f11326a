//! Live triggers.
//!
//! A [`Trigger`] is hydrated from a [`TriggerConfig`] and moves between two
//! states. While **activated** it watches the desktop (capability
//! subscriptions, scheduler timers) and emits [`TriggerEvent::Triggered`] on
//! its own [`EventChannel`] whenever something relevant changes. The owner
//! decides what to do with that; the trigger never evaluates routines itself.
//!
//! [`Trigger::check`] answers "does the condition hold now", filtered by the
//! trigger's [`TriggerStrategy`].

mod watch;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use regex::Regex;
use routines_domain::desktop::{Change, ClipboardContent, Signal, Switch};
use routines_domain::error::{CapabilityError, HydrationError};
use routines_domain::id::TriggerId;
use routines_domain::routine::{SystemFlag, TriggerConfig, TriggerSpec, TriggerStrategy, TriggerType};

use self::watch::{ClipboardWatch, TimePoll, TimerSlot};
use crate::channel::EventChannel;
use crate::ports::{Capabilities, Clock, Scheduler, Subscription};

/// Notifications a trigger sends to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Something the condition depends on changed.
    Triggered,
    Activated,
    Deactivated,
}

/// Timing knobs shared by every trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSettings {
    pub time_poll: Duration,
    pub clipboard_debounce: Duration,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            time_poll: Duration::from_secs(60),
            clipboard_debounce: Duration::from_millis(500),
        }
    }
}

/// Services injected into every trigger.
#[derive(Clone)]
pub struct TriggerContext {
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,
    pub settings: TriggerSettings,
}

/// Strategy bookkeeping shared with listeners and timers.
pub(crate) struct Gate {
    witnessed: AtomicBool,
    latched: AtomicBool,
    events: Arc<EventChannel<TriggerEvent>>,
}

impl Gate {
    fn reset(&self) {
        self.witnessed.store(false, Ordering::SeqCst);
        self.latched.store(false, Ordering::SeqCst);
    }

    /// A change notification was received.
    fn fire(&self) {
        self.witnessed.store(true, Ordering::SeqCst);
        self.latched.store(true, Ordering::SeqCst);
        self.events.emit(&TriggerEvent::Triggered);
    }

    /// Ask for re-evaluation without counting as a witnessed change.
    fn announce(&self) {
        self.events.emit(&TriggerEvent::Triggered);
    }
}

#[derive(Default)]
struct Listening {
    subscriptions: Vec<Subscription>,
    timers: Vec<Arc<TimerSlot>>,
}

pub struct Trigger<C> {
    id: TriggerId,
    kind: TriggerType,
    spec: TriggerSpec,
    strategy: TriggerStrategy,
    pattern: Option<Regex>,
    capabilities: Arc<C>,
    context: TriggerContext,
    events: Arc<EventChannel<TriggerEvent>>,
    gate: Arc<Gate>,
    active: bool,
    claimed: bool,
    last_app_match: Arc<Mutex<Option<bool>>>,
    listening: Listening,
}

impl<C: Capabilities> Trigger<C> {
    /// Hydrate a trigger from its configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`HydrationError`] when the config does not fit the
    /// trigger type, or when a clipboard pattern is not a valid regex.
    pub fn new(
        config: &TriggerConfig,
        capabilities: Arc<C>,
        context: TriggerContext,
    ) -> Result<Self, HydrationError> {
        let spec = TriggerSpec::parse(config)?;
        let strategy = config.strategy.unwrap_or_else(|| spec.default_strategy());
        let pattern = match &spec {
            TriggerSpec::Clipboard(filter) => filter
                .pattern
                .as_deref()
                .map(Regex::new)
                .transpose()
                .map_err(|err| HydrationError::InvalidValue {
                    kind: "trigger",
                    id: config.id.to_string(),
                    field: "regex",
                    reason: err.to_string(),
                })?,
            _ => None,
        };
        let events = Arc::new(EventChannel::new());
        Ok(Self {
            id: config.id.clone(),
            kind: config.kind,
            spec,
            strategy,
            pattern,
            capabilities,
            context,
            gate: Arc::new(Gate {
                witnessed: AtomicBool::new(false),
                latched: AtomicBool::new(false),
                events: Arc::clone(&events),
            }),
            events,
            active: false,
            claimed: false,
            last_app_match: Arc::new(Mutex::new(None)),
            listening: Listening::default(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &TriggerId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> TriggerType {
        self.kind
    }

    #[must_use]
    pub fn strategy(&self) -> TriggerStrategy {
        self.strategy
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn events(&self) -> &EventChannel<TriggerEvent> {
        &self.events
    }

    /// Start watching. Does nothing when already activated.
    ///
    /// # Errors
    ///
    /// Returns the capability error that prevented activation; the trigger
    /// is then left inactive so a later call retries.
    #[tracing::instrument(skip(self), fields(trigger = %self.id, kind = %self.kind))]
    pub async fn activate(&mut self) -> Result<(), CapabilityError> {
        if self.active {
            return Ok(());
        }
        self.active = true;
        self.gate.reset();
        if let Err(err) = self.start().await {
            self.stop_listening();
            self.active = false;
            return Err(err);
        }
        tracing::debug!(strategy = ?self.strategy, "trigger activated");
        self.events.emit(&TriggerEvent::Activated);
        Ok(())
    }

    /// Stop watching. Does nothing when not activated.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.stop_listening();
        self.active = false;
        tracing::debug!(trigger = %self.id, "trigger deactivated");
        self.events.emit(&TriggerEvent::Deactivated);
    }

    /// Whether the condition holds, as seen through the strategy.
    ///
    /// Read failures count as "does not hold".
    pub async fn check(&self) -> bool {
        let admitted = match self.strategy {
            TriggerStrategy::Level => true,
            TriggerStrategy::InitialIgnore => self.gate.witnessed.load(Ordering::SeqCst),
            TriggerStrategy::EventLatched => self.gate.latched.swap(false, Ordering::SeqCst),
        };
        if !admitted {
            return false;
        }
        match self.probe().await {
            Ok(holds) => holds,
            Err(err) => {
                tracing::debug!(trigger = %self.id, error = %err, "trigger probe failed");
                false
            }
        }
    }

    async fn probe(&self) -> Result<bool, CapabilityError> {
        let desktop = &*self.capabilities;
        let holds = match &self.spec {
            TriggerSpec::Time(window) => window.contains(self.context.clock.local_now()),
            TriggerSpec::App(condition) => condition.matches(&desktop.running_apps().await?),
            TriggerSpec::Wifi(condition) => condition.matches(
                desktop.switch(Switch::Wifi).await?,
                desktop.active_ssid().await?.as_deref(),
            ),
            TriggerSpec::Bluetooth(condition) => condition.matches(
                desktop.switch(Switch::Bluetooth).await?,
                &desktop.bluetooth_devices().await?,
            ),
            TriggerSpec::Battery(condition) => condition.matches(desktop.battery().await?),
            TriggerSpec::SystemFlag { flag, expected } => {
                let current = match flag {
                    SystemFlag::PowerSaver => desktop.switch(Switch::PowerSaver).await?,
                    SystemFlag::DarkMode => desktop.switch(Switch::DarkMode).await?,
                    SystemFlag::AirplaneMode => desktop.switch(Switch::AirplaneMode).await?,
                    SystemFlag::Headphones => desktop.headphones_connected().await?,
                };
                current == *expected
            }
            TriggerSpec::Clipboard(filter) => {
                watch::accepts(filter, self.pattern.as_ref(), &desktop.clipboard().await?)
            }
            TriggerSpec::Startup => self.claimed,
        };
        Ok(holds)
    }

    async fn start(&mut self) -> Result<(), CapabilityError> {
        match &self.spec {
            TriggerSpec::Time(window) => {
                let inside = window.contains(self.context.clock.local_now());
                let slot = Arc::new(TimerSlot::default());
                let poll = Arc::new(TimePoll {
                    window: window.clone(),
                    inside: AtomicBool::new(inside),
                    clock: Arc::clone(&self.context.clock),
                    scheduler: Arc::clone(&self.context.scheduler),
                    every: self.context.settings.time_poll,
                    gate: Arc::clone(&self.gate),
                    slot: Arc::clone(&slot),
                });
                poll.arm();
                self.listening.timers.push(slot);
            }
            TriggerSpec::App(condition) => {
                let watched = condition.clone();
                let gate = Arc::clone(&self.gate);
                let last = Arc::clone(&self.last_app_match);
                let subscription = self.capabilities.subscribe(
                    Signal::RunningApps,
                    Arc::new(move |change: &Change| {
                        if let Change::RunningApps(running) = change {
                            let matches = watched.matches(running);
                            let previous = last
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .replace(matches);
                            if previous != Some(matches) {
                                gate.fire();
                            }
                        }
                    }),
                );
                self.listening.subscriptions.push(subscription);

                let matches = condition.matches(&self.capabilities.running_apps().await?);
                let previous = self
                    .last_app_match
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .replace(matches);
                if previous != Some(matches) {
                    self.gate.announce();
                }
            }
            TriggerSpec::Clipboard(filter) => {
                let slot = Arc::new(TimerSlot::default());
                let watch = Arc::new(ClipboardWatch {
                    filter: filter.clone(),
                    pattern: self.pattern.clone(),
                    latest: Mutex::new(ClipboardContent::Empty),
                    scheduler: Arc::clone(&self.context.scheduler),
                    debounce: self.context.settings.clipboard_debounce,
                    gate: Arc::clone(&self.gate),
                    slot: Arc::clone(&slot),
                });
                let subscription = self.capabilities.subscribe(
                    Signal::Clipboard,
                    Arc::new(move |change: &Change| {
                        if let Change::Clipboard(content) = change {
                            watch.changed(content);
                        }
                    }),
                );
                self.listening.subscriptions.push(subscription);
                self.listening.timers.push(slot);
            }
            TriggerSpec::Startup => {
                if !self.claimed {
                    self.claimed = self.capabilities.claim_startup_marker().await?;
                }
            }
            spec => {
                for signal in level_signals(spec) {
                    let gate = Arc::clone(&self.gate);
                    let subscription = self
                        .capabilities
                        .subscribe(signal, Arc::new(move |_: &Change| gate.fire()));
                    self.listening.subscriptions.push(subscription);
                }
            }
        }
        Ok(())
    }

    fn stop_listening(&mut self) {
        for subscription in self.listening.subscriptions.drain(..) {
            subscription.cancel();
        }
        for slot in self.listening.timers.drain(..) {
            slot.stop();
        }
    }
}

impl<C> Drop for Trigger<C> {
    fn drop(&mut self) {
        for slot in &self.listening.timers {
            slot.stop();
        }
    }
}

/// Signals after which a level-style trigger re-reads its condition.
fn level_signals(spec: &TriggerSpec) -> Vec<Signal> {
    match spec {
        TriggerSpec::Wifi(_) => vec![Signal::Switch(Switch::Wifi), Signal::WifiConnection],
        TriggerSpec::Bluetooth(_) => vec![Signal::Switch(Switch::Bluetooth), Signal::BluetoothDevices],
        TriggerSpec::Battery(_) => vec![Signal::Battery],
        TriggerSpec::SystemFlag { flag, .. } => vec![match flag {
            SystemFlag::PowerSaver => Signal::Switch(Switch::PowerSaver),
            SystemFlag::DarkMode => Signal::Switch(Switch::DarkMode),
            SystemFlag::AirplaneMode => Signal::Switch(Switch::AirplaneMode),
            SystemFlag::Headphones => Signal::Headphones,
        }],
        TriggerSpec::Time(_)
        | TriggerSpec::App(_)
        | TriggerSpec::Clipboard(_)
        | TriggerSpec::Startup => Vec::new(),
    }
}
