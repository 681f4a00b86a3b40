//! Stack lifecycle orchestration
//!
//! Stacks run one at a time in collection order. Every stack runs inside a
//! `stack` span and every engine call inside a `phase` span, so events
//! logged by hooks and engines carry both. Nothing is rolled back: the
//! first failure is logged and returned, leaving earlier stacks as they are.

use crate::engine::{DestroyOptions, ProvisioningEngine, StackHandle, UpOptions};
use crate::error::{EngineError, OrchestratorError, Result, StackError};
use crate::hooks::{HookContext, HookRegistry, HookServices};
use crate::lookup::StackLookup;
use crate::stack::{Order, Stack, StackCollection};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

/// Step of a stack operation, carried in spans and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Lookup,
    Select,
    Refresh,
    PreRun,
    Up,
    Destroy,
    PostRun,
    Remove,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Resolve => "resolve",
            Phase::Lookup => "lookup",
            Phase::Select => "select",
            Phase::Refresh => "refresh",
            Phase::PreRun => "PreRun",
            Phase::Up => "up",
            Phase::Destroy => "destroy",
            Phase::PostRun => "PostRun",
            Phase::Remove => "remove",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    Applied,
    Destroyed,
    /// Destroyed and its remote state record removed
    Purged,
    /// No remote state; nothing was done
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutcome {
    pub stack: String,
    pub status: StackStatus,
}

/// Per-stack results in visit order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<StackOutcome>,
}

impl RunReport {
    pub fn visited(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.stack.as_str()).collect()
    }

    pub fn status_of(&self, stack: &str) -> Option<StackStatus> {
        self.outcomes
            .iter()
            .find(|o| o.stack == stack)
            .map(|o| o.status)
    }
}

/// A selected stack with its resolved name
struct Planned<'s> {
    priority: u32,
    stack: &'s Stack,
    fqsn: &'s str,
}

pub struct Orchestrator {
    engine: Arc<dyn ProvisioningEngine>,
    lookup: Arc<dyn StackLookup>,
    hooks: HookRegistry,
    services: HookServices,
    up_options: UpOptions,
    destroy_options: DestroyOptions,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn ProvisioningEngine>,
        lookup: Arc<dyn StackLookup>,
        hooks: HookRegistry,
        services: HookServices,
    ) -> Self {
        Self {
            engine,
            lookup,
            hooks,
            services,
            up_options: UpOptions::default(),
            destroy_options: DestroyOptions::default(),
        }
    }

    pub fn with_up_options(mut self, options: UpOptions) -> Self {
        self.up_options = options;
        self
    }

    pub fn with_destroy_options(mut self, options: DestroyOptions) -> Self {
        self.destroy_options = options;
        self
    }

    pub fn services(&self) -> &HookServices {
        &self.services
    }

    /// Apply the selected stacks in ascending priority
    pub async fn apply(&self, stacks: &mut StackCollection) -> Result<RunReport> {
        let failures = self.resolve(stacks);
        let stacks: &StackCollection = stacks;
        let plan = plan(stacks, failures, Order::Ascending)?;

        let mut report = RunReport::default();

        for planned in &plan {
            let span = tracing::info_span!("stack", stack = %planned.stack.name);
            let status = self.apply_stack(stacks, planned).instrument(span).await?;
            report.outcomes.push(StackOutcome {
                stack: planned.stack.name.clone(),
                status,
            });
        }
        Ok(report)
    }

    /// Destroy the selected stacks in `order`; with `purge_state` each
    /// destroyed stack's remote state record is removed as well.
    pub async fn destroy(
        &self,
        stacks: &mut StackCollection,
        order: Order,
        purge_state: bool,
    ) -> Result<RunReport> {
        let failures = self.resolve(stacks);
        let stacks: &StackCollection = stacks;
        let plan = plan(stacks, failures, order)?;

        let mut report = RunReport::default();

        for planned in &plan {
            let span = tracing::info_span!("stack", stack = %planned.stack.name);
            let status = self
                .destroy_stack(stacks, planned, purge_state)
                .instrument(span)
                .await?;
            report.outcomes.push(StackOutcome {
                stack: planned.stack.name.clone(),
                status,
            });
        }
        Ok(report)
    }

    /// Remove a stack's remote state record, forced
    pub async fn purge(&self, stack: &Stack, fqsn: &str) -> Result<()> {
        self.step(
            stack,
            Phase::Remove,
            self.engine.remove_stack(fqsn, &stack.path, true),
        )
        .await?;
        tracing::info!("removed {} stack state", fqsn);
        Ok(())
    }

    /// Resolve every stack's name, returning the failures by stack name
    fn resolve(&self, stacks: &mut StackCollection) -> HashMap<String, StackError> {
        let platform = &self.services.platform;
        let failures = stacks.resolve_names(&platform.org, &platform.stage);
        for (name, err) in &failures {
            tracing::error!(stack = %name, phase = %Phase::Resolve, "get fully qualified stack name: {}", err);
        }
        failures
    }

    async fn apply_stack(&self, stacks: &StackCollection, planned: &Planned<'_>) -> Result<StackStatus> {
        let stack = planned.stack;
        tracing::info!("applying {}", planned.fqsn);

        let handle = self
            .step(stack, Phase::Select, self.engine.upsert(planned.fqsn, &stack.path))
            .await?;
        self.step(stack, Phase::Refresh, handle.refresh()).await?;
        self.run_hooks(stacks, planned, handle.as_ref(), Phase::PreRun)
            .await?;

        let outputs = self
            .step(stack, Phase::Up, handle.up(&self.up_options))
            .await?;
        tracing::debug!("{} stack produced {} outputs", stack.name, outputs.len());

        self.run_hooks(stacks, planned, handle.as_ref(), Phase::PostRun)
            .await?;
        tracing::info!("{} stack applied", stack.name);
        Ok(StackStatus::Applied)
    }

    async fn destroy_stack(
        &self,
        stacks: &StackCollection,
        planned: &Planned<'_>,
        purge_state: bool,
    ) -> Result<StackStatus> {
        let stack = planned.stack;

        let present = self
            .step(stack, Phase::Lookup, self.lookup.exists(planned.fqsn))
            .await?;
        if !present {
            tracing::info!("{} stack not found, skipping", planned.fqsn);
            return Ok(StackStatus::Absent);
        }

        let handle = self
            .step(stack, Phase::Select, self.engine.upsert(planned.fqsn, &stack.path))
            .await?;
        self.step(stack, Phase::Refresh, handle.refresh()).await?;
        self.run_hooks(stacks, planned, handle.as_ref(), Phase::PreRun)
            .await?;
        self.step(stack, Phase::Destroy, handle.destroy(&self.destroy_options))
            .await?;
        self.run_hooks(stacks, planned, handle.as_ref(), Phase::PostRun)
            .await?;
        tracing::info!("{} stack destroyed", stack.name);

        if purge_state {
            self.purge(stack, planned.fqsn).await?;
            return Ok(StackStatus::Purged);
        }
        Ok(StackStatus::Destroyed)
    }

    async fn run_hooks(
        &self,
        stacks: &StackCollection,
        planned: &Planned<'_>,
        handle: &dyn StackHandle,
        phase: Phase,
    ) -> Result<()> {
        let stack = planned.stack;
        let names = match phase {
            Phase::PreRun => &stack.pre_run,
            _ => &stack.post_run,
        };
        if names.is_empty() {
            return Ok(());
        }

        let ctx = HookContext {
            stack,
            handle,
            engine: self.engine.as_ref(),
            lookup: self.lookup.as_ref(),
            downstream: stacks.next_after(planned.priority),
            services: &self.services,
        };

        for name in names {
            tracing::info!("{} stack {} func: {}", stack.name, phase, name);
            let span = tracing::info_span!("hook", phase = %phase, hook = %name);
            self.hooks
                .dispatch(name, &ctx)
                .instrument(span)
                .await
                .map_err(|source| {
                    tracing::error!(stack = %stack.name, phase = %phase, "hook {}: {}", name, source);
                    OrchestratorError::Hook {
                        stack: stack.name.clone(),
                        hook: name.clone(),
                        source,
                    }
                })?;
        }
        Ok(())
    }

    /// Run one engine call inside a phase span, logging and wrapping failures
    async fn step<T>(
        &self,
        stack: &Stack,
        phase: Phase,
        call: impl Future<Output = std::result::Result<T, EngineError>>,
    ) -> Result<T> {
        call.instrument(tracing::info_span!("phase", phase = %phase))
            .await
            .map_err(|source| {
                tracing::error!(stack = %stack.name, phase = %phase, "{}", source);
                OrchestratorError::Engine {
                    stack: stack.name.clone(),
                    phase,
                    source,
                }
            })
    }
}

/// Pick the stacks to run. A resolution failure only aborts when the stack
/// is selected.
fn plan(
    stacks: &StackCollection,
    mut failures: HashMap<String, StackError>,
    order: Order,
) -> Result<Vec<Planned<'_>>> {
    let selected = stacks.selected(order).inspect_err(|e| {
        tracing::error!("{}", e);
    })?;

    selected
        .into_iter()
        .map(|(priority, stack)| {
            if let Some(source) = failures.remove(&stack.name) {
                return Err(OrchestratorError::Unresolved {
                    stack: stack.name.clone(),
                    source,
                });
            }
            let fqsn = stack
                .full_name
                .as_deref()
                .ok_or_else(|| OrchestratorError::Unresolved {
                    stack: stack.name.clone(),
                    source: StackError::NotResolved(stack.name.clone()),
                })?;
            Ok(Planned {
                priority,
                stack,
                fqsn,
            })
        })
        .collect()
}
