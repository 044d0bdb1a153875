use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use governance_adapter::{AdapterConfig, ModelAdapter};
use governance_audit::{AttemptRecord, AuditWriter, DecisionRecord, RunSummary};
use governance_context::{ContextBuilder, ContextConfig};
use governance_core::{
    AgentProfile, ApprovedSkill, AttrValue, DecisionOutcome, DecisionReport, DynamicSkillMap,
    GovernanceError, InterventionReport, LifecycleHooks, NoopHooks, RecentDecision, Result,
    SimulationEngine, SkillProposal, ValidationContext, ValidationResult,
};
use governance_llm::LlmInvoker;
use governance_memory::{MemoryEngine, MemorySource, ObservationMeta};
use governance_reflection::ReflectionEngine;
use governance_registry::SkillRegistry;
use governance_validation::ValidatorCouncil;

use crate::config::{BrokerConfig, DEFAULT_PROMPT_TEMPLATE};
use crate::feedback::{format_feedback, select_reports};

type ObservationFilter = Box<dyn Fn(&AgentProfile, &DecisionReport) -> bool + Send + Sync>;

/// One LLM attempt, digested for the retry loop.
struct Attempt {
    proposal: Option<SkillProposal>,
    results: Vec<ValidationResult>,
    error_reports: Vec<InterventionReport>,
    passed: bool,
    blocking: BTreeSet<String>,
    /// True iff every blocking rule is static agent state.
    deterministic: bool,
}

/// The orchestrator. Owns every per-run resource except the simulation
/// itself; agents own their state, the broker owns their memory stores.
pub struct SkillBrokerEngine {
    registry: Arc<SkillRegistry>,
    adapter: ModelAdapter,
    council: ValidatorCouncil,
    context_builder: ContextBuilder,
    memory: MemoryEngine,
    reflection: Option<ReflectionEngine>,
    audit: AuditWriter,
    invoker: Arc<dyn LlmInvoker>,
    simulation: Arc<dyn SimulationEngine>,
    hooks: Box<dyn LifecycleHooks>,
    config: BrokerConfig,
    template: String,
    observation_filter: Option<ObservationFilter>,
    histories: HashMap<String, Vec<RecentDecision>>,
    configured_agents: HashSet<String>,
}

impl SkillBrokerEngine {
    pub fn builder() -> SkillBrokerBuilder {
        SkillBrokerBuilder::new()
    }

    pub fn memory(&self) -> &MemoryEngine {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryEngine {
        &mut self.memory
    }

    /// Process one agent-step end to end. Exactly one execution happens:
    /// either the approved proposal or the agent type's fallback skill.
    pub async fn decide(
        &mut self,
        agent: &mut AgentProfile,
        env: &HashMap<String, AttrValue>,
        year: u32,
    ) -> Result<DecisionReport> {
        let started = Instant::now();
        self.configure_agent_memory(agent);

        let assembled = self.context_builder.build(&mut self.memory, agent, env, year)?;
        let prompt = self.context_builder.render_prompt(&self.template, &assembled)?;

        let history = self.histories.get(&agent.id).cloned().unwrap_or_default();
        let validation_ctx = ValidationContext::new(
            &agent.id,
            &agent.agent_type,
            year,
            agent.state.clone(),
            env.clone(),
        )?
        .with_recent_decisions(history);

        let mut record = DecisionRecord::new(year, &agent.id, &agent.agent_type);
        let mut all_reports: Vec<InterventionReport> = Vec::new();
        let mut llm_calls: u32 = 0;

        let mut attempt = self
            .attempt(&prompt, &assembled.skill_map, &validation_ctx, 0, &mut record)
            .await;
        llm_calls += 1;
        all_reports.extend(attempt.error_reports.iter().cloned());

        let mut approved: Option<ApprovedSkill> = None;
        let mut retries = 0u32;

        if attempt.passed {
            approved = Some(self.approve(agent, year, &mut attempt, 0, DecisionOutcome::Approved));
        } else {
            let mut reports =
                select_reports(&attempt.error_reports, self.config.max_reports_per_retry);
            let mut prev_blocking = attempt.blocking.clone();

            for attempt_no in 1..=self.config.max_retries {
                let retry_prompt = format!("{}{}", format_feedback(&reports), prompt);
                let mut retry = self
                    .attempt(
                        &retry_prompt,
                        &assembled.skill_map,
                        &validation_ctx,
                        attempt_no,
                        &mut record,
                    )
                    .await;
                llm_calls += 1;
                retries = attempt_no;
                all_reports.extend(retry.error_reports.iter().cloned());

                if retry.passed {
                    approved = Some(self.approve(
                        agent,
                        year,
                        &mut retry,
                        attempt_no,
                        DecisionOutcome::Approved,
                    ));
                    attempt = retry;
                    break;
                }

                let current = retry.blocking.clone();
                let early_exit = current == prev_blocking && retry.deterministic;
                prev_blocking = current;
                reports = select_reports(&retry.error_reports, self.config.max_reports_per_retry);
                attempt = retry;

                if early_exit {
                    tracing::debug!(agent_id = %agent.id, "early exit: static blocking set repeated");
                    break;
                }
            }

            if approved.is_none() {
                approved = Some(self.approve_fallback(agent, year, &attempt, retries)?);
            }
        }
        let approved = approved.expect("decision always approves a skill");

        // Exactly one execution per decision.
        let execution = self.simulation.execute(&approved);
        if execution.success() {
            agent.state.apply_delta(execution.state_changes());
            self.histories
                .entry(agent.id.clone())
                .or_default()
                .push(RecentDecision {
                    year,
                    skill_name: approved.skill_name().to_string(),
                });
            // Stateful validators advance their per-agent counters only
            // on landed decisions.
            self.council.record_decision(&agent.id, approved.skill_name());
        } else {
            tracing::warn!(
                agent_id = %agent.id,
                skill = approved.skill_name(),
                error = execution.error().unwrap_or("unknown"),
                "execution failed, no state mutation"
            );
        }

        let report = DecisionReport {
            approved,
            execution,
            reports: all_reports,
            llm_calls,
        };

        self.ingest_observation(agent, env, year, &report, &assembled.boosters);

        record.validation_results = report.approved.results.clone();
        record.approved_skill = report.approved.skill_name().to_string();
        record.outcome = report.approved.outcome;
        record.retry_count = report.approved.retry_count;
        record.execution = report.execution.clone();
        record.duration_ms = started.elapsed().as_millis() as u64;
        self.audit.write(&record)?;

        Ok(report)
    }

    /// One model invocation plus parse and council run. An invoker error
    /// or unparsable reply degrades to a parse-failure report; for retry
    /// accounting it behaves like any other ERROR.
    async fn attempt(
        &self,
        prompt: &str,
        skill_map: &DynamicSkillMap,
        ctx: &ValidationContext,
        attempt_no: u32,
        record: &mut DecisionRecord,
    ) -> Attempt {
        let raw = match self.invoker.invoke(prompt).await {
            Ok(reply) => reply.text,
            Err(error) => {
                tracing::warn!(%error, "llm invocation failed");
                String::new()
            }
        };

        match self.adapter.parse(&raw, skill_map) {
            Ok(parsed) => {
                let outcome = self.council.run_pipeline(&parsed.proposal, ctx);
                let error_reports: Vec<InterventionReport> =
                    outcome.error_reports().into_iter().cloned().collect();
                let mut audit_reports = error_reports.clone();
                audit_reports.extend(outcome.warning_reports().into_iter().cloned());

                record.attempts.push(AttemptRecord {
                    attempt: attempt_no,
                    raw_reply: raw,
                    parse_stage: Some(parsed.outcome.label()),
                    low_confidence_parse: parsed.outcome.low_confidence(),
                    reports: audit_reports,
                });

                Attempt {
                    proposal: Some(parsed.proposal),
                    blocking: outcome.blocking_rule_ids(),
                    deterministic: outcome.all_blocking_deterministic(),
                    passed: outcome.passed,
                    results: outcome.results,
                    error_reports,
                }
            }
            Err(error) => {
                let report = InterventionReport::error(
                    "parse.failure",
                    "unknown",
                    format!("the reply could not be parsed: {}", error),
                );
                record.attempts.push(AttemptRecord {
                    attempt: attempt_no,
                    raw_reply: raw,
                    parse_stage: None,
                    low_confidence_parse: false,
                    reports: vec![report.clone()],
                });

                Attempt {
                    proposal: None,
                    results: Vec::new(),
                    blocking: BTreeSet::from(["parse.failure".to_string()]),
                    // A fresh reply may parse fine; never early-exit on
                    // parse failures.
                    deterministic: false,
                    passed: false,
                    error_reports: vec![report],
                }
            }
        }
    }

    fn approve(
        &self,
        agent: &AgentProfile,
        year: u32,
        attempt: &mut Attempt,
        retry_count: u32,
        outcome: DecisionOutcome,
    ) -> ApprovedSkill {
        ApprovedSkill {
            proposal: attempt.proposal.take().expect("passed attempts carry a proposal"),
            agent_id: agent.id.clone(),
            year,
            outcome,
            retry_count,
            results: std::mem::take(&mut attempt.results),
        }
    }

    /// Retries exhausted (or early-exited): approve the agent type's
    /// declared fallback without re-running construct-conditioned rules.
    fn approve_fallback(
        &self,
        agent: &AgentProfile,
        year: u32,
        attempt: &Attempt,
        retry_count: u32,
    ) -> Result<ApprovedSkill> {
        let fallback = self
            .registry
            .fallback_for(&agent.agent_type)
            .ok_or_else(|| {
                GovernanceError::Config(format!(
                    "agent type '{}' has no fallback skill",
                    agent.agent_type
                ))
            })?;
        let proposal = SkillProposal::new(fallback)
            .map_err(|e| GovernanceError::Config(e.to_string()))?;

        tracing::debug!(agent_id = %agent.id, fallback, "retries exhausted, taking fallback");
        Ok(ApprovedSkill {
            proposal,
            agent_id: agent.id.clone(),
            year,
            outcome: DecisionOutcome::Rejected,
            retry_count,
            results: attempt.results.clone(),
        })
    }

    fn configure_agent_memory(&mut self, agent: &AgentProfile) {
        if self.configured_agents.contains(&agent.id) {
            return;
        }
        if let Some(config) = self
            .registry
            .agent_type(&agent.agent_type)
            .and_then(|c| c.memory.clone())
        {
            self.memory.configure_agent(&agent.id, config);
        }
        self.configured_agents.insert(agent.id.clone());
    }

    fn ingest_observation(
        &mut self,
        agent: &AgentProfile,
        env: &HashMap<String, AttrValue>,
        year: u32,
        report: &DecisionReport,
        boosters: &HashMap<String, f64>,
    ) {
        if !self.config.ingest_observations {
            return;
        }
        if let Some(filter) = &self.observation_filter {
            if !filter(agent, report) {
                return;
            }
        }

        let skill = report.approved.skill_name();
        let mut content = format!("Year {}: chose '{}'", year, skill);
        if report.approved.is_fallback() {
            content.push_str(" after the original choice was rejected");
        }
        if !report.execution.success() {
            content.push_str(", but it could not be carried out");
        }

        let alerted = self
            .config
            .alert_signals
            .iter()
            .any(|signal| env.get(signal).and_then(AttrValue::as_bool).unwrap_or(false));
        let emotion = if alerted { "critical" } else { "routine" };

        let mut tags: Vec<String> = boosters.keys().cloned().collect();
        tags.push(skill.to_string());

        self.memory.add(
            &agent.id,
            content,
            ObservationMeta::new(emotion, MemorySource::Personal, year).with_tags(tags),
        );
    }

    /// One simulation year: `pre_year`, sequential agent steps with
    /// `post_step` after each, a reflection cycle when due, `post_year`.
    pub async fn run_year(&mut self, agents: &mut [AgentProfile], year: u32) -> Result<()> {
        let env = self.simulation.environment(year);
        tracing::info!(year, agents = agents.len(), "year started");
        self.hooks.pre_year(year, &env, agents);

        for agent in agents.iter_mut() {
            let report = self.decide(agent, &env, year).await?;
            self.hooks.post_step(agent, &report);
        }

        if let Some(reflection) = &self.reflection {
            if reflection.due(year) {
                reflection.run_cycle(&mut self.memory, agents, year).await;
            }
        }

        self.hooks.post_year(year, agents);
        Ok(())
    }

    pub async fn run(
        &mut self,
        agents: &mut [AgentProfile],
        start_year: u32,
        years: u32,
    ) -> Result<RunSummary> {
        for year in start_year..start_year + years {
            self.run_year(agents, year).await?;
        }
        self.finish()
    }

    /// Write the aggregated audit summary and seal the trail.
    pub fn finish(&mut self) -> Result<RunSummary> {
        self.audit.finalize()
    }
}

/// Wires a broker together; only the registry, the invoker and the
/// simulation are mandatory.
pub struct SkillBrokerBuilder {
    registry: Option<Arc<SkillRegistry>>,
    invoker: Option<Arc<dyn LlmInvoker>>,
    simulation: Option<Arc<dyn SimulationEngine>>,
    council: Option<ValidatorCouncil>,
    adapter: Option<ModelAdapter>,
    memory: Option<MemoryEngine>,
    context_builder: Option<ContextBuilder>,
    reflection: Option<ReflectionEngine>,
    audit: Option<AuditWriter>,
    hooks: Option<Box<dyn LifecycleHooks>>,
    config: BrokerConfig,
    template: Option<String>,
    observation_filter: Option<ObservationFilter>,
    seed: u64,
}

impl SkillBrokerBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            invoker: None,
            simulation: None,
            council: None,
            adapter: None,
            memory: None,
            context_builder: None,
            reflection: None,
            audit: None,
            hooks: None,
            config: BrokerConfig::default(),
            template: None,
            observation_filter: None,
            seed: 0,
        }
    }

    pub fn registry(mut self, registry: Arc<SkillRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn invoker(mut self, invoker: Arc<dyn LlmInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn simulation(mut self, simulation: Arc<dyn SimulationEngine>) -> Self {
        self.simulation = Some(simulation);
        self
    }

    pub fn council(mut self, council: ValidatorCouncil) -> Self {
        self.council = Some(council);
        self
    }

    pub fn adapter(mut self, adapter: ModelAdapter) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn memory(mut self, memory: MemoryEngine) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn context_builder(mut self, builder: ContextBuilder) -> Self {
        self.context_builder = Some(builder);
        self
    }

    pub fn reflection(mut self, reflection: ReflectionEngine) -> Self {
        self.reflection = Some(reflection);
        self
    }

    pub fn audit(mut self, audit: AuditWriter) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn hooks(mut self, hooks: Box<dyn LifecycleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn config(mut self, config: BrokerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn observation_filter(
        mut self,
        filter: impl Fn(&AgentProfile, &DecisionReport) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.observation_filter = Some(Box::new(filter));
        self
    }

    /// Seed shared by the default memory engine and context builder.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<SkillBrokerEngine> {
        let registry = self
            .registry
            .ok_or_else(|| GovernanceError::Config("broker requires a registry".into()))?;
        let invoker = self
            .invoker
            .ok_or_else(|| GovernanceError::Config("broker requires an LLM invoker".into()))?;
        let simulation = self
            .simulation
            .ok_or_else(|| GovernanceError::Config("broker requires a simulation engine".into()))?;

        let council = self
            .council
            .unwrap_or_else(|| ValidatorCouncil::standard(Arc::clone(&registry)));
        let adapter = self
            .adapter
            .unwrap_or_else(|| ModelAdapter::new(AdapterConfig::default()));
        let memory = self
            .memory
            .unwrap_or_else(|| MemoryEngine::new(Default::default(), self.seed));
        let context_builder = self.context_builder.unwrap_or_else(|| {
            ContextBuilder::new(Arc::clone(&registry), ContextConfig::default(), self.seed)
        });
        let audit = self.audit.unwrap_or_else(|| {
            AuditWriter::new(Box::new(std::io::sink()), Box::new(std::io::sink()))
        });

        Ok(SkillBrokerEngine {
            registry,
            adapter,
            council,
            context_builder,
            memory,
            reflection: self.reflection,
            audit,
            invoker,
            simulation,
            hooks: self.hooks.unwrap_or_else(|| Box::new(NoopHooks)),
            config: self.config,
            template: self
                .template
                .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()),
            observation_filter: self.observation_filter,
            histories: HashMap::new(),
            configured_agents: HashSet::new(),
        })
    }
}

impl Default for SkillBrokerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
