//! Routine orchestration.
//!
//! The [`RoutineEngine`] owns every live routine. It hydrates stored
//! configurations into triggers and actions, decides on each
//! [`evaluate`](RoutineEngine::evaluate) pass which routines should be
//! active, and runs the activation and deactivation protocols.
//!
//! The engine never runs on its own: passes are requested through the
//! signal queue returned by [`RoutineEngine::new`] and executed by
//! [`drive`], or called directly by the API layer.

mod driver;
mod matching;
mod routine;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::TimeDelta;
use routines_domain::error::{HydrationError, NotFoundError, RoutinesError};
use routines_domain::evaluation::{EvaluationOutcome, ReloadSummary, RoutineStatus};
use routines_domain::event::{Event, EventType};
use routines_domain::health::{ExecutionKind, ExecutionStatus};
use routines_domain::id::RoutineId;
use routines_domain::routine::RoutineConfig;
use routines_domain::transfer::{EXPORT_VERSION, TransferDocument};
use serde_json::{Value, json};

pub use self::driver::{SignalReceiver, SignalSender, drive, signal_channel};
use self::routine::LiveRoutine;
use crate::action::{Action, ActionContext, Deactivation};
use crate::circuit_breaker::{CircuitBreaker, Verdict};
use crate::ports::{Capabilities, Clock, EventPublisher, ROUTINES_KEY, StateStore};
use crate::state_manager::StateManager;
use crate::trigger::TriggerContext;

const OVERLOAD_TITLE: &str = "Routines Error";
const OVERLOAD_MESSAGE: &str = "Excessive activity detected. Routines paused for safety.";

/// Circuit breaker limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Evaluations allowed per window.
    pub max_evaluations: u32,
    pub window: TimeDelta,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_evaluations: 100,
            window: TimeDelta::seconds(60),
        }
    }
}

/// Everything the protocols need besides the routine list itself.
struct Runtime<S, C, P> {
    store: Arc<S>,
    capabilities: Arc<C>,
    states: StateManager<S>,
    publisher: P,
    clock: Arc<dyn Clock>,
}

pub struct RoutineEngine<S, C, P> {
    runtime: Runtime<S, C, P>,
    routines: Vec<LiveRoutine<C>>,
    breaker: CircuitBreaker,
    context: TriggerContext,
    signals: SignalSender,
}

impl<S, C, P> RoutineEngine<S, C, P>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Create an empty engine and the queue its triggers signal into.
    pub fn new(
        store: Arc<S>,
        capabilities: Arc<C>,
        publisher: P,
        context: TriggerContext,
        settings: EngineSettings,
    ) -> (Self, SignalReceiver) {
        let (signals, receiver) = signal_channel();
        let engine = Self {
            runtime: Runtime {
                states: StateManager::new(Arc::clone(&store)),
                store,
                capabilities,
                publisher,
                clock: Arc::clone(&context.clock),
            },
            routines: Vec::new(),
            breaker: CircuitBreaker::new(settings.max_evaluations, settings.window),
            context,
            signals,
        };
        (engine, receiver)
    }

    /// Read the stored routines and captured state, then evaluate once.
    ///
    /// Routines that fail to hydrate are logged and skipped.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    #[tracing::instrument(skip(self))]
    pub async fn load(&mut self) -> Result<EvaluationOutcome, RoutinesError> {
        self.runtime.states.load().await?;
        let configs = self.fetch().await?;
        for mut routine in self.routines.drain(..) {
            routine.deactivate_triggers();
        }
        for config in configs {
            self.hydrate_stored(config);
        }
        tracing::info!(count = self.routines.len(), "routines loaded");
        self.evaluate().await
    }

    /// Re-read the stored routines and apply the difference.
    ///
    /// Every routine still present is replaced by a fresh hydration, whether
    /// or not its configuration changed.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    #[tracing::instrument(skip(self))]
    pub async fn reload(&mut self) -> Result<ReloadSummary, RoutinesError> {
        let configs = self.fetch().await?;
        let wanted: HashSet<RoutineId> = configs.iter().map(|config| config.id.clone()).collect();
        let mut summary = ReloadSummary::default();

        let mut previous = std::mem::take(&mut self.routines);
        for routine in previous
            .iter_mut()
            .filter(|routine| !wanted.contains(&routine.config.id))
        {
            self.runtime.retire(routine).await;
            summary.removed.push(routine.config.id.clone());
        }

        for config in configs {
            let id = config.id.clone();
            let replaced = match previous.iter().position(|routine| routine.config.id == id) {
                Some(index) => {
                    let mut old = previous.swap_remove(index);
                    self.runtime.retire(&mut old).await;
                    true
                }
                None => false,
            };
            match (self.hydrate_stored(config), replaced) {
                (true, true) => summary.replaced.push(id),
                (true, false) => summary.added.push(id),
                (false, true) => summary.removed.push(id),
                (false, false) => {}
            }
        }
        tracing::info!(
            added = summary.added.len(),
            removed = summary.removed.len(),
            replaced = summary.replaced.len(),
            "routines reloaded",
        );
        self.evaluate().await?;
        Ok(summary)
    }

    /// Hydrate and insert a routine, replacing one with the same id.
    ///
    /// A missing `id` is generated.
    ///
    /// # Errors
    ///
    /// Returns the hydration or validation error of the routine, or a
    /// storage failure while persisting.
    #[tracing::instrument(skip(self, raw))]
    pub async fn add_routine(&mut self, mut raw: Value) -> Result<RoutineId, RoutinesError> {
        if let Value::Object(fields) = &mut raw {
            fields
                .entry("id")
                .or_insert_with(|| json!(RoutineId::new()));
        }
        let config: RoutineConfig = serde_json::from_value(raw).map_err(HydrationError::from)?;
        let id = config.id.clone();
        let routine = self.hydrate(config)?;
        let name = routine.config.name.clone();

        match self.position(&id) {
            Some(index) => {
                tracing::info!(routine = %name, %id, "replacing routine");
                self.runtime.retire(&mut self.routines[index]).await;
                self.routines[index] = routine;
            }
            None => {
                tracing::info!(routine = %name, %id, "adding routine");
                self.routines.push(routine);
            }
        }
        self.persist().await?;
        self.runtime
            .publish(Event::new(
                EventType::RoutineAdded,
                Some(id.clone()),
                json!({ "name": name }),
            ))
            .await;
        self.evaluate().await?;
        Ok(id)
    }

    /// Deactivate and drop a routine, forgetting its captured state.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] for an unknown id, or a storage failure.
    #[tracing::instrument(skip(self))]
    pub async fn remove_routine(&mut self, id: &RoutineId) -> Result<(), RoutinesError> {
        let index = self.position(id).ok_or_else(|| NotFoundError {
            entity: "Routine",
            id: id.to_string(),
        })?;
        let mut routine = self.routines.remove(index);
        tracing::info!(routine = %routine.config.name, "removing routine");
        self.runtime.retire(&mut routine).await;
        self.runtime.states.clear_state(id).await?;
        self.persist().await?;
        self.runtime
            .publish(Event::new(
                EventType::RoutineRemoved,
                Some(id.clone()),
                json!({ "name": routine.config.name }),
            ))
            .await;
        self.evaluate().await?;
        Ok(())
    }

    /// One evaluation pass over every routine, in stored order.
    ///
    /// Action failures and storage failures while recording health are
    /// logged; neither stops the pass.
    ///
    /// # Errors
    ///
    /// None today; the signature leaves room for passes that can fail.
    #[tracing::instrument(skip(self), fields(routines = self.routines.len()))]
    pub async fn evaluate(&mut self) -> Result<EvaluationOutcome, RoutinesError> {
        match self.breaker.check(self.runtime.clock.now()) {
            Verdict::Allowed => {}
            Verdict::Tripped => {
                self.runtime
                    .overloaded(self.breaker.limit(), self.breaker.window())
                    .await;
                return Ok(EvaluationOutcome::Suppressed);
            }
            Verdict::Suppressed => return Ok(EvaluationOutcome::Suppressed),
        }

        let mut activated = Vec::new();
        let mut deactivated = Vec::new();
        for index in 0..self.routines.len() {
            let routine = &mut self.routines[index];
            if !routine.config.enabled {
                routine.deactivate_triggers();
                if routine.active {
                    self.runtime.deactivate(routine).await;
                    deactivated.push(routine.config.id.clone());
                }
                continue;
            }

            routine.activate_triggers().await;
            let should_be_active =
                matching::is_satisfied(routine.config.match_type, &routine.triggers).await;
            match (routine.active, should_be_active) {
                (false, true) => {
                    let conflicts = self.conflicts(index);
                    let routine = &mut self.routines[index];
                    self.runtime.activate(routine, &conflicts).await;
                    activated.push(routine.config.id.clone());
                }
                (true, false) => {
                    self.runtime.deactivate(routine).await;
                    deactivated.push(routine.config.id.clone());
                }
                _ => {}
            }
        }
        Ok(EvaluationOutcome::Completed {
            activated,
            deactivated,
        })
    }

    /// Export every routine without ids or runtime state.
    #[must_use]
    pub fn export(&self) -> TransferDocument {
        TransferDocument::export(&self.configs(), self.runtime.clock.now())
    }

    /// Append the routines of an export document under fresh ids.
    ///
    /// Nothing is changed unless every routine of the document hydrates.
    ///
    /// # Errors
    ///
    /// Returns an [`ImportFormatError`](routines_domain::error::ImportFormatError)
    /// for a foreign or malformed document, the first hydration error, or a
    /// storage failure.
    #[tracing::instrument(skip(self, document))]
    pub async fn import(&mut self, document: Value) -> Result<Vec<RoutineId>, RoutinesError> {
        let document = TransferDocument::parse(document)?;
        if !document.is_current_version() {
            tracing::warn!(
                version = %document.version,
                expected = EXPORT_VERSION,
                "importing document written by another version",
            );
        }
        let hydrated = document
            .into_routines()
            .into_iter()
            .map(|config| self.hydrate(config))
            .collect::<Result<Vec<_>, _>>()?;

        let imported: Vec<RoutineId> = hydrated
            .iter()
            .map(|routine| routine.config.id.clone())
            .collect();
        let names: Vec<String> = hydrated
            .iter()
            .map(|routine| routine.config.name.clone())
            .collect();
        self.routines.extend(hydrated);
        self.persist().await?;
        tracing::info!(count = imported.len(), "routines imported");
        for (id, name) in imported.iter().zip(names) {
            self.runtime
                .publish(Event::new(
                    EventType::RoutineAdded,
                    Some(id.clone()),
                    json!({ "name": name, "imported": true }),
                ))
                .await;
        }
        self.evaluate().await?;
        Ok(imported)
    }

    #[must_use]
    pub fn status(&self, id: &RoutineId) -> Option<RoutineStatus> {
        self.position(id)
            .map(|index| self.status_of(&self.routines[index]))
    }

    #[must_use]
    pub fn list(&self) -> Vec<RoutineStatus> {
        self.routines
            .iter()
            .map(|routine| self.status_of(routine))
            .collect()
    }

    /// Stop every trigger. Action effects are left in place.
    pub fn shutdown(&mut self) {
        for routine in &mut self.routines {
            routine.deactivate_triggers();
        }
        tracing::info!(count = self.routines.len(), "routine engine stopped");
    }

    fn status_of(&self, routine: &LiveRoutine<C>) -> RoutineStatus {
        RoutineStatus {
            config: routine.config.clone(),
            is_active: routine.active,
            health: self.runtime.states.health(&routine.config.id),
        }
    }

    fn position(&self, id: &RoutineId) -> Option<usize> {
        self.routines
            .iter()
            .position(|routine| routine.config.id == *id)
    }

    fn configs(&self) -> Vec<RoutineConfig> {
        self.routines
            .iter()
            .map(|routine| routine.config.clone())
            .collect()
    }

    fn hydrate(&self, config: RoutineConfig) -> Result<LiveRoutine<C>, RoutinesError> {
        LiveRoutine::hydrate(
            config,
            &self.runtime.capabilities,
            &self.context,
            &self.signals,
        )
    }

    /// Hydrate a stored routine, logging instead of failing. Returns whether
    /// the routine was added.
    fn hydrate_stored(&mut self, config: RoutineConfig) -> bool {
        if self.position(&config.id).is_some() {
            tracing::warn!(id = %config.id, "skipping duplicate stored routine");
            return false;
        }
        let name = config.name.clone();
        match self.hydrate(config) {
            Ok(routine) => {
                self.routines.push(routine);
                true
            }
            Err(err) => {
                tracing::warn!(routine = %name, error = %describe(&err), "dropping routine that failed to hydrate");
                false
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<RoutineConfig>, RoutinesError> {
        let Some(document) = self.runtime.store.load(ROUTINES_KEY).await? else {
            return Ok(Vec::new());
        };
        let Value::Array(entries) = document else {
            tracing::warn!("stored routines are not a list, ignoring them");
            return Ok(Vec::new());
        };
        let configs = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<RoutineConfig>(entry) {
                Ok(config) => Some(config),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping unreadable stored routine");
                    None
                }
            })
            .collect();
        Ok(configs)
    }

    async fn persist(&self) -> Result<(), RoutinesError> {
        let document = serde_json::to_value(self.configs())
            .map_err(|err| RoutinesError::Storage(Box::new(err)))?;
        self.runtime.store.save(ROUTINES_KEY, document).await
    }

    /// Resources the routine at `index` shares with other active routines.
    fn conflicts(&self, index: usize) -> Vec<String> {
        let routine = &self.routines[index];
        let mut conflicts = Vec::new();
        for (other_index, other) in self.routines.iter().enumerate() {
            if other_index == index || !other.active {
                continue;
            }
            for resource in routine.resources() {
                let message = format!("{resource} is also controlled by {}", other.config.name);
                if other.resources().any(|used| used == resource) && !conflicts.contains(&message) {
                    conflicts.push(message);
                }
            }
        }
        conflicts
    }
}

impl<S, C, P> Runtime<S, C, P>
where
    S: StateStore,
    C: Capabilities,
    P: EventPublisher + Send + Sync + 'static,
{
    async fn publish(&self, event: Event) {
        if let Err(err) = self.publisher.publish(event).await {
            tracing::debug!(error = %err, "failed to publish engine event");
        }
    }

    /// Run every action forward, in order. Failures do not stop the pass.
    async fn activate(
        &mut self,
        routine: &mut LiveRoutine<C>,
        conflicts: &[String],
    ) {
        let routine_id = routine.config.id.clone();
        let name = &routine.config.name;
        tracing::info!(routine = %name, "activating routine");
        for conflict in conflicts {
            tracing::warn!(routine = %name, conflict = %conflict, "resource conflict");
        }

        let mut failures = Vec::new();
        for action in &mut routine.actions {
            let mut ctx = ActionContext {
                capabilities: &*self.capabilities,
                states: &mut self.states,
                routine_id: &routine_id,
            };
            if let Err(err) = action.execute(&mut ctx).await {
                failures.push(self.action_failed(name, &routine_id, action, &err).await);
            }
        }
        routine.active = true;

        let (status, message) = if !failures.is_empty() {
            (ExecutionStatus::Failure, Some(failures.join("; ")))
        } else if !conflicts.is_empty() {
            (ExecutionStatus::Warning, Some(conflicts.join("; ")))
        } else {
            (ExecutionStatus::Success, None)
        };
        self.record_health(&routine_id, ExecutionKind::Activate, status, message)
            .await;
        self.publish(Event::new(
            EventType::RoutineActivated,
            Some(routine_id),
            json!({ "name": name, "failures": failures.len() }),
        ))
        .await;
    }

    /// Undo the routine's actions in reverse order, per their policy.
    async fn deactivate(&mut self, routine: &mut LiveRoutine<C>) {
        let routine_id = routine.config.id.clone();
        let name = &routine.config.name;
        tracing::info!(routine = %name, "deactivating routine");

        let mut failures = Vec::new();
        for action in routine.actions.iter_mut().rev() {
            let mut ctx = ActionContext {
                capabilities: &*self.capabilities,
                states: &mut self.states,
                routine_id: &routine_id,
            };
            let result = match action.deactivation() {
                Deactivation::Keep | Deactivation::Skip => continue,
                Deactivation::Custom(custom) => custom.execute(&mut ctx).await,
                Deactivation::Revert => action.revert(&mut ctx).await,
            };
            if let Err(err) = result {
                failures.push(self.action_failed(name, &routine_id, action, &err).await);
            }
        }
        routine.active = false;

        let (status, message) = if failures.is_empty() {
            (ExecutionStatus::Success, None)
        } else {
            (ExecutionStatus::Failure, Some(failures.join("; ")))
        };
        self.record_health(&routine_id, ExecutionKind::Deactivate, status, message)
            .await;
        self.publish(Event::new(
            EventType::RoutineDeactivated,
            Some(routine_id),
            json!({ "name": name, "failures": failures.len() }),
        ))
        .await;
    }

    /// Stop a routine that is leaving the engine or being replaced.
    async fn retire(&mut self, routine: &mut LiveRoutine<C>) {
        routine.deactivate_triggers();
        if routine.active {
            self.deactivate(routine).await;
        }
    }

    /// A health record that cannot be stored is still kept in memory.
    async fn record_health(
        &mut self,
        routine_id: &RoutineId,
        kind: ExecutionKind,
        status: ExecutionStatus,
        message: Option<String>,
    ) {
        let at = self.clock.now();
        if let Err(err) = self
            .states
            .record_health(routine_id, at, kind, status, message)
            .await
        {
            tracing::warn!(
                %routine_id,
                ?kind,
                error = %describe(&err),
                "could not persist health record",
            );
        }
    }

    async fn action_failed(
        &self,
        routine: &str,
        routine_id: &RoutineId,
        action: &Action,
        err: &RoutinesError,
    ) -> String {
        let reason = describe(err);
        tracing::warn!(
            routine,
            action = %action.id(),
            kind = %action.kind(),
            error = %reason,
            "action failed",
        );
        self.publish(Event::new(
            EventType::ActionFailed,
            Some(routine_id.clone()),
            json!({ "action_id": action.id(), "type": action.kind(), "error": reason }),
        ))
        .await;
        format!("{}: {reason}", action.kind())
    }

    async fn overloaded(&self, limit: u32, window: TimeDelta) {
        tracing::error!(
            limit,
            window_seconds = window.num_seconds(),
            "excessive evaluation activity, routines paused",
        );
        if let Err(err) = self
            .capabilities
            .notify(OVERLOAD_TITLE, OVERLOAD_MESSAGE)
            .await
        {
            tracing::warn!(error = %err, "could not show overload notification");
        }
        self.publish(Event::new(
            EventType::RoutinesOverloaded,
            None,
            json!({ "limit": limit, "window_seconds": window.num_seconds() }),
        ))
        .await;
    }
}

/// Render an error with its chain of sources.
fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
