//! Implementación de `WorkflowOrchestrator`.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};
use uuid::Uuid;

use crate::constants::ENGINE_VERSION;
use crate::contract::ContractValidator;
use crate::engine::{HaltReason, OrchestratorBuilder, OrchestratorPolicy, RunReport, RunStatus};
use crate::errors::{classify_failure, CoreEngineError, FailureClass};
use crate::event::{EventStore, InMemoryEventStore, RunEvent, RunEventKind};
use crate::hashing::hash_value;
use crate::model::Context;
use crate::resolve::{ProfileManager, ReferenceResolver};
use crate::rules::RuleEngine;
use crate::services::SharedServices;
use crate::session::{SessionGuard, SessionStatus};
use crate::state::{InMemoryRunStateStore, RunState, RunStateStore, ShrinkPermit, StateWriteOutcome};
use crate::step::{HandlerRegistry, OnError, SkipReason, StepDefinition, StepOutcome, WorkflowConfig};

/// Opciones por corrida. `None` delega en la política:
/// `resume` en `execution.resume_from_state`, `allow_shrink` en
/// `security.size_shrink_guard.allow_fresh_run_reset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub resume: Option<bool>,
    /// Permite que una corrida nueva reemplace un run-state más grande.
    pub allow_shrink: Option<bool>,
}

impl RunOptions {
    pub fn resume() -> Self {
        Self { resume: Some(true),
               ..Self::default() }
    }

    pub fn fresh_reset() -> Self {
        Self { resume:       Some(false),
               allow_shrink: Some(true) }
    }
}

/// Motor de ejecución de workflows declarativos.
///
/// Ejecuta los steps en orden sobre un `Context` propio. `run(&self)` puede
/// llamarse desde varios hilos sobre la misma instancia: sólo una corrida
/// avanza, las demás reciben `CoreEngineError::Busy`.
pub struct WorkflowOrchestrator<E = InMemoryEventStore, S = InMemoryRunStateStore>
    where E: EventStore,
          S: RunStateStore
{
    workflow: WorkflowConfig,
    definition_hash: String,
    registry: HandlerRegistry,
    rules: RuleEngine,
    contracts: ContractValidator,
    profiles: ProfileManager,
    policy: OrchestratorPolicy,
    services: SharedServices,
    session: SessionGuard,
    events: Mutex<E>,
    state: Mutex<S>,
    last_context: Mutex<Context>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}

impl WorkflowOrchestrator<InMemoryEventStore, InMemoryRunStateStore> {
    /// Crea un builder con stores en memoria.
    pub fn builder(workflow: WorkflowConfig) -> OrchestratorBuilder<InMemoryEventStore, InMemoryRunStateStore> {
        OrchestratorBuilder::new(workflow)
    }
}

impl<E, S> WorkflowOrchestrator<E, S>
    where E: EventStore,
          S: RunStateStore
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(workflow: WorkflowConfig,
                             registry: HandlerRegistry,
                             rules: RuleEngine,
                             contracts: ContractValidator,
                             profiles: ProfileManager,
                             policy: OrchestratorPolicy,
                             services: SharedServices,
                             event_store: E,
                             state_store: S)
                             -> Self {
        let definition_hash = workflow.definition_hash();
        let session = SessionGuard::new(policy.session.clone());
        Self { workflow,
               definition_hash,
               registry,
               rules,
               contracts,
               profiles,
               policy,
               services,
               session,
               events: Mutex::new(event_store),
               state: Mutex::new(state_store),
               last_context: Mutex::new(Context::new()) }
    }

    pub fn workflow(&self) -> &WorkflowConfig {
        &self.workflow
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    pub fn policy(&self) -> &OrchestratorPolicy {
        &self.policy
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    /// Contexto con el que terminó la última corrida.
    pub fn last_context(&self) -> Context {
        lock(&self.last_context).clone()
    }

    pub fn events(&self, run_id: Uuid) -> Vec<RunEvent> {
        lock(&self.events).list(run_id)
    }

    pub fn event_store(&self) -> MutexGuard<'_, E> {
        lock(&self.events)
    }

    pub fn state_store(&self) -> MutexGuard<'_, S> {
        lock(&self.state)
    }

    /// Ejecuta el workflow completo según la política cargada.
    pub fn run(&self) -> Result<RunReport, CoreEngineError> {
        self.run_with(RunOptions::default())
    }

    pub fn run_with(&self, options: RunOptions) -> Result<RunReport, CoreEngineError> {
        let _working = self.session.try_begin()?;
        let run_id = Uuid::new_v4();
        let resume = options.resume.unwrap_or(self.policy.execution.resume_from_state);

        let mut ctx = Context::new();
        let (start_index, resumed_after) = if resume { self.resume_point(&mut ctx)? } else { (0, None) };
        log::info!("run {run_id} of '{}' starting at step {start_index}", self.workflow.workflow_id);
        self.emit(run_id,
                  RunEventKind::RunStarted { workflow_id:     self.workflow.workflow_id.clone(),
                                             definition_hash: self.definition_hash.clone(),
                                             step_count:      self.workflow.steps.len(),
                                             start_index,
                                             resumed:         resumed_after.is_some() });

        let allow_reset = options.allow_shrink
                                 .unwrap_or(self.policy.security.size_shrink_guard.allow_fresh_run_reset);
        // Sólo una corrida nueva con permiso explícito puede achicar el estado previo.
        let permit = if resumed_after.is_none() && allow_reset {
            ShrinkPermit::Granted
        } else {
            ShrinkPermit::Denied
        };
        let mut run = RunProgress { outcomes: Vec::new(),
                                    output_hashes: Vec::new(),
                                    permit };
        let status = match self.drive(run_id, start_index, &mut ctx, &mut run) {
            Ok(status) => status,
            Err(e) => {
                self.emit(run_id, RunEventKind::RunHalted { reason: e.to_string() });
                *lock(&self.last_context) = ctx;
                return Err(e);
            }
        };

        let run_fingerprint = match &status {
            RunStatus::Completed => {
                let fp = hash_value(&json!({ "definition_hash": self.definition_hash,
                                             "engine_version": ENGINE_VERSION,
                                             "outputs": run.output_hashes }));
                self.emit(run_id, RunEventKind::RunCompleted { run_fingerprint: fp.clone() });
                log::info!("run {run_id} completed");
                Some(fp)
            }
            RunStatus::Halted { reason } => {
                self.emit(run_id, RunEventKind::RunHalted { reason: reason.to_string() });
                log::warn!("run {run_id} halted: {reason}");
                None
            }
        };

        let report = RunReport { run_id,
                                 workflow_id: self.workflow.workflow_id.clone(),
                                 status,
                                 outcomes: run.outcomes,
                                 context: ctx.to_value(),
                                 run_fingerprint,
                                 resumed_after };
        *lock(&self.last_context) = ctx;
        Ok(report)
    }

    /// Índice de arranque y contexto sembrado a partir del run-state.
    fn resume_point(&self, ctx: &mut Context) -> Result<(usize, Option<String>), CoreEngineError> {
        let saved = lock(&self.state).load()?;
        let Some(RunState { last_completed_step_id: Some(last), production_data }) = saved else {
            log::info!("no run state to resume from; starting from the first step");
            return Ok((0, None));
        };
        match self.workflow.position(&last) {
            Some(pos) => {
                *ctx = Context::from_value(&production_data);
                log::info!("resuming after step '{last}'");
                Ok((pos + 1, Some(last)))
            }
            None => {
                log::warn!("run state points at unknown step '{last}'; restarting from the first step");
                Ok((0, None))
            }
        }
    }

    fn drive(&self,
             run_id: Uuid,
             start_index: usize,
             ctx: &mut Context,
             run: &mut RunProgress)
             -> Result<RunStatus, CoreEngineError> {
        let steps = &self.workflow.steps;
        let max_jumps = self.policy.execution.max_fallback_jumps;
        let mut jumps: u32 = 0;
        let mut idx = start_index;

        while idx < steps.len() {
            let step = &steps[idx];

            match self.session.check_status() {
                SessionStatus::Ok => {}
                SessionStatus::Timeout => return Ok(halted(HaltReason::Timeout)),
                SessionStatus::MaxUpdates => return Ok(halted(HaltReason::MaxUpdates)),
            }

            if let Some(reason) = self.gate(step, ctx) {
                log::info!("skipping step '{}': {reason:?}", step.id);
                self.emit(run_id,
                          RunEventKind::StepSkipped { step_index: idx,
                                                      step_id:    step.id.clone(),
                                                      reason:     reason.clone() });
                run.outcomes.push(StepOutcome::Skipped { step_id: step.id.clone(),
                                                         reason });
                idx += 1;
                continue;
            }

            self.emit(run_id,
                      RunEventKind::StepStarted { step_index: idx,
                                                  step_id:    step.id.clone() });
            match self.execute_step(step, ctx) {
                Ok(output) => {
                    let output_hash = hash_value(&output);
                    if let Some(key) = &step.outputs.context_key {
                        ctx.insert(key.clone(), output);
                    }
                    self.session.log_update();
                    self.emit(run_id,
                              RunEventKind::StepFinished { step_index:  idx,
                                                           step_id:     step.id.clone(),
                                                           output_hash: output_hash.clone(),
                                                           context_key: step.outputs.context_key.clone() });
                    run.outcomes.push(StepOutcome::Completed { step_id: step.id.clone(),
                                                               output_hash: output_hash.clone() });
                    run.output_hashes.push(output_hash);

                    let state = RunState::new(step.id.clone(), ctx.to_value());
                    match lock(&self.state).save(&state, run.permit)? {
                        StateWriteOutcome::Written { bytes } => {
                            log::debug!("run state written after '{}' ({bytes} bytes)", step.id);
                            run.permit = ShrinkPermit::Denied;
                        }
                        StateWriteOutcome::Rejected(report) => {
                            log::error!("run state write after '{}' rejected by the shrink guard", step.id);
                            return Ok(halted(HaltReason::ShrinkGuard { report }));
                        }
                    }
                    idx += 1;
                }
                Err(err) => {
                    let class = classify_failure(&err);
                    log::error!("step '{}' failed ({class:?}): {err}", step.id);
                    self.emit(run_id,
                              RunEventKind::StepFailed { step_index: idx,
                                                         step_id:    step.id.clone(),
                                                         class,
                                                         error:      err.to_string() });
                    run.outcomes.push(StepOutcome::Failed { step_id: step.id.clone(),
                                                            class,
                                                            error: err.to_string() });
                    match self.error_policy(step, class) {
                        OnError::Stop => {
                            return Ok(halted(HaltReason::StepFailed { step_id: step.id.clone(),
                                                                      class,
                                                                      error: err.to_string() }));
                        }
                        OnError::FailSoft => {
                            log::warn!("step '{}' failed softly; continuing", step.id);
                            idx += 1;
                        }
                        OnError::FallbackNext(target) => {
                            jumps += 1;
                            if jumps > max_jumps {
                                return Ok(halted(HaltReason::FallbackLimit { limit: max_jumps }));
                            }
                            let Some(to) = self.workflow.position(&target) else {
                                return Ok(halted(HaltReason::Config { message: format!("unknown fallback target '{target}'") }));
                            };
                            log::warn!("step '{}' failed; routing to '{target}'", step.id);
                            self.emit(run_id,
                                      RunEventKind::FallbackRouted { from_step: step.id.clone(),
                                                                     to_step:   target });
                            idx = to;
                        }
                    }
                }
            }
        }
        Ok(RunStatus::Completed)
    }

    /// Precondición y ruleset. `Some(reason)` si el step debe saltearse.
    fn gate(&self, step: &StepDefinition, ctx: &Context) -> Option<SkipReason> {
        if let Some(pre) = &step.precondition {
            if !pre.is_met(ctx) {
                return Some(SkipReason::Precondition);
            }
        }
        if let Some(rs) = &step.ruleset {
            if !self.rules.evaluate(rs, ctx) {
                return Some(SkipReason::Ruleset(rs.clone()));
            }
        }
        None
    }

    /// Lookup, resolución de inputs, invocación y contrato.
    fn execute_step(&self, step: &StepDefinition, ctx: &Context) -> Result<Value, CoreEngineError> {
        let handler = self.registry
                          .get(&step.handler)
                          .ok_or_else(|| CoreEngineError::HandlerNotFound(step.handler.clone()))?;
        let inputs = ReferenceResolver::new(&self.profiles).resolve(&step.inputs, ctx);
        let snapshot = ctx.snapshot();
        let result = catch_unwind(AssertUnwindSafe(|| handler.execute(&inputs, &snapshot, &self.services)));
        let output = match result {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => return Err(CoreEngineError::HandlerFault(e.message)),
            Err(payload) => return Err(CoreEngineError::HandlerFault(panic_message(payload))),
        };
        if let Some(contract) = &step.outputs.contract {
            self.contracts.validate(contract, &output)?;
        }
        Ok(output)
    }

    /// `on_error` del step, o la política global según la clase de falla.
    fn error_policy(&self, step: &StepDefinition, class: FailureClass) -> OnError {
        if let Some(on_error) = &step.on_error {
            return on_error.clone();
        }
        let stop = match class {
            FailureClass::ContractViolation => self.policy.execution.stop_on_contract_violation,
            FailureClass::MissingHandler | FailureClass::HandlerFault => self.policy.execution.stop_on_error,
        };
        if stop {
            OnError::Stop
        } else {
            OnError::FailSoft
        }
    }

    fn emit(&self, run_id: Uuid, kind: RunEventKind) {
        lock(&self.events).append_kind(run_id, kind);
    }
}

struct RunProgress {
    outcomes: Vec<StepOutcome>,
    output_hashes: Vec<String>,
    permit: ShrinkPermit,
}

fn halted(reason: HaltReason) -> RunStatus {
    RunStatus::Halted { reason }
}
