// SPDX-License-Identifier: PMPL-1.0-or-later
//! Validation run orchestration.
//!
//! The [`Auditor`] walks the registry in registration order. For each rule it
//! resolves candidates through the [`DomQuery`], calls `validate`, and turns
//! any error or panic into a [`RuleDiagnostic`] so one broken rule never
//! aborts the pass. Only a failure of the query capability or the audit scope
//! ends a run early.

use crate::config::RunConfig;
use crate::dom::{DocumentSource, DomQuery, ExcludePolicy, ScraperQuery, DOCUMENT_SELECTOR};
use crate::error::{AuditError, QueryError, Result};
use crate::i18n::{Catalog, Translator};
use crate::rules::{Rule, RuleContext, RuleRegistry};
use crate::validator::Validator;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle of an auditor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    /// Every enabled rule was attempted; some may have failed individually
    Completed,
    /// The run was cut short by an orchestrator-level fault
    Failed,
}

/// A rule that could not finish `validate`.
///
/// Kept apart from the Validator's reports; it says nothing about the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDiagnostic {
    pub rule_id: String,
    pub message: String,
    /// The rule panicked rather than returning an error
    pub panicked: bool,
}

/// Summary of one pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub status: RunState,
    /// Rule ids attempted, in registration order
    pub rules_run: Vec<String>,
    /// Rule ids left out by configuration
    pub rules_skipped: Vec<String>,
    pub failures: Vec<RuleDiagnostic>,
}

impl RunOutcome {
    fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            status: RunState::Running,
            rules_run: Vec::new(),
            rules_skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Whether `rule_id` ran and failed
    pub fn failed(&self, rule_id: &str) -> bool {
        self.failures.iter().any(|f| f.rule_id == rule_id)
    }
}

/// A batch of DOM mutation records delivered to a watching auditor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationBatch {
    pub records: usize,
}

impl MutationBatch {
    pub fn new(records: usize) -> Self {
        Self { records }
    }
}

/// Drives validation passes over a registry
pub struct Auditor {
    registry: RuleRegistry,
    query: Box<dyn DomQuery>,
    translator: Box<dyn Translator>,
    state: Cell<RunState>,
}

/// Holds the auditor in `Running` for one pass. A pass dropped before
/// [`Auditor::finish`] (cancelled future, unwinding panic) leaves it `Failed`.
struct RunGuard<'s> {
    state: &'s Cell<RunState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.state.get() == RunState::Running {
            warn!("Validation run abandoned before completion");
            self.state.set(RunState::Failed);
        }
    }
}

struct Pass<'a> {
    scope: ElementRef<'a>,
    policy: ExcludePolicy,
    outcome: RunOutcome,
}

impl Auditor {
    /// Auditor using the scraper query engine and English messages
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            query: Box::new(ScraperQuery),
            translator: Box::new(Catalog::english()),
            state: Cell::new(RunState::Idle),
        }
    }

    pub fn with_query(mut self, query: impl DomQuery + 'static) -> Self {
        self.query = Box::new(query);
        self
    }

    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Apply every enabled rule to `document` once.
    ///
    /// Reports accumulate into `validator`; call [`Validator::reset`] first
    /// for an independent run.
    pub fn run(&self, document: &Html, config: &RunConfig, validator: &mut Validator) -> Result<RunOutcome> {
        let _guard = self.begin()?;
        let result = self.prepare(document, config).and_then(|mut pass| {
            for rule in self.registry.iter() {
                self.step(&mut pass, rule, config, validator)?;
            }
            Ok(pass.outcome)
        });
        self.finish(result)
    }

    /// Same pass as [`Auditor::run`], yielding to the runtime between rules
    /// when `config.async_runner` is set. Report order is unaffected.
    ///
    /// Dropping the future mid-pass leaves the auditor `Failed`, ready for a
    /// new run; reports already recorded stay in `validator`.
    pub async fn run_async(
        &self,
        document: &Html,
        config: &RunConfig,
        validator: &mut Validator,
    ) -> Result<RunOutcome> {
        let _guard = self.begin()?;
        let result = match self.prepare(document, config) {
            Ok(mut pass) => {
                let mut fault = None;
                for (idx, rule) in self.registry.iter().enumerate() {
                    if idx > 0 && config.async_runner {
                        tokio::task::yield_now().await;
                    }
                    if let Err(e) = self.step(&mut pass, rule, config, validator) {
                        fault = Some(e);
                        break;
                    }
                }
                match fault {
                    Some(e) => Err(e),
                    None => Ok(pass.outcome),
                }
            }
            Err(e) => Err(e),
        };
        self.finish(result)
    }

    /// Run once, then re-run after every debounced burst of mutations.
    ///
    /// Each run starts from [`Validator::reset`] and a fresh snapshot from
    /// `source`; `on_run` sees the outcome and the Validator after each one.
    /// Without `config.watch_dom_changes` only the first run happens. A fault
    /// during a mutation-triggered run is logged and watching continues.
    /// Returns the number of completed runs once `mutations` closes.
    pub async fn watch<S, F>(
        &self,
        source: &S,
        config: &RunConfig,
        validator: &mut Validator,
        mut mutations: mpsc::Receiver<MutationBatch>,
        mut on_run: F,
    ) -> Result<usize>
    where
        S: DocumentSource + ?Sized,
        F: FnMut(&RunOutcome, &Validator),
    {
        info!("Auditing {}", source.describe());
        validator.reset();
        let document = source.snapshot()?;
        let outcome = self.run_async(&document, config, validator).await?;
        on_run(&outcome, validator);
        let mut runs = 1;

        if !config.watch_dom_changes {
            debug!("DOM watching disabled, single run only");
            return Ok(runs);
        }

        let debounce = Duration::from_millis(config.debounce_ms);
        while let Some(first) = mutations.recv().await {
            let mut records = first.records;
            let mut batches = 1;
            while let Ok(Some(next)) = tokio::time::timeout(debounce, mutations.recv()).await {
                records += next.records;
                batches += 1;
            }
            debug!(batches, records, "DOM mutated, re-running");

            validator.reset();
            let result = match source.snapshot() {
                Ok(document) => self.run_async(&document, config, validator).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(outcome) => {
                    on_run(&outcome, validator);
                    runs += 1;
                }
                Err(e) => error!("Watch-triggered run failed: {}", e),
            }
        }

        info!(runs, "Mutation source closed, watch finished");
        Ok(runs)
    }

    fn begin(&self) -> Result<RunGuard<'_>> {
        if self.state.get() == RunState::Running {
            return Err(AuditError::Reentrant);
        }
        self.state.set(RunState::Running);
        Ok(RunGuard { state: &self.state })
    }

    fn finish(&self, result: Result<RunOutcome>) -> Result<RunOutcome> {
        match result {
            Ok(mut outcome) => {
                outcome.status = RunState::Completed;
                self.state.set(RunState::Completed);
                info!(
                    run = %outcome.run_id,
                    rules = outcome.rules_run.len(),
                    skipped = outcome.rules_skipped.len(),
                    failures = outcome.failures.len(),
                    "Validation run completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.state.set(RunState::Failed);
                error!("Validation run failed: {}", e);
                Err(e)
            }
        }
    }

    fn prepare<'a>(&self, document: &'a Html, config: &RunConfig) -> Result<Pass<'a>> {
        let policy = ExcludePolicy::from_config(config)?;
        let scope = match &config.context {
            Some(raw) => {
                let selector = Selector::parse(raw)
                    .map_err(|e| AuditError::Config(format!("invalid context selector '{}': {}", raw, e)))?;
                document
                    .select(&selector)
                    .next()
                    .ok_or_else(|| AuditError::ContextNotFound(raw.clone()))?
            }
            None => document.root_element(),
        };

        Ok(Pass {
            scope,
            policy,
            outcome: RunOutcome::start(),
        })
    }

    fn step(&self, pass: &mut Pass<'_>, rule: &dyn Rule, config: &RunConfig, validator: &mut Validator) -> Result<()> {
        let descriptor = rule.descriptor();
        if !config.rules.is_enabled(&descriptor.id, &descriptor.category) {
            debug!(rule = %descriptor.id, "Skipped by configuration");
            pass.outcome.rules_skipped.push(descriptor.id.clone());
            return Ok(());
        }

        pass.outcome.rules_run.push(descriptor.id.clone());
        if let Some(diagnostic) = self.apply(rule, pass.scope, &pass.policy, validator)? {
            warn!(rule = %diagnostic.rule_id, "Rule failed: {}", diagnostic.message);
            pass.outcome.failures.push(diagnostic);
        }
        Ok(())
    }

    /// Resolve candidates and validate one rule. `Ok(Some(_))` is a rule
    /// defect; `Err(_)` is fatal to the run.
    fn apply(
        &self,
        rule: &dyn Rule,
        scope: ElementRef<'_>,
        policy: &ExcludePolicy,
        validator: &mut Validator,
    ) -> Result<Option<RuleDiagnostic>> {
        let rule_id = rule.descriptor().id.as_str();

        let elements = if rule.selector() == DOCUMENT_SELECTOR {
            vec![scope]
        } else {
            let resolved = panic::catch_unwind(AssertUnwindSafe(|| self.query.resolve(rule.selector(), scope, policy)));
            match resolved {
                Ok(Ok(elements)) => elements,
                Ok(Err(QueryError::Unavailable(reason))) => return Err(AuditError::DomUnavailable(reason)),
                Ok(Err(e)) => return Ok(Some(diagnostic(rule_id, e.to_string(), false))),
                Err(payload) => {
                    return Err(AuditError::DomUnavailable(format!(
                        "query panicked on '{}': {}",
                        rule.selector(),
                        panic_message(&*payload)
                    )))
                }
            }
        };
        debug!(rule = %rule_id, candidates = elements.len(), "Validating");

        let mut cx = RuleContext::new(rule_id, validator, self.translator.as_ref());
        let result = panic::catch_unwind(AssertUnwindSafe(|| rule.validate(&elements, &mut cx)));

        Ok(match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(diagnostic(rule_id, format!("{:#}", e), false)),
            Err(payload) => Some(diagnostic(rule_id, panic_message(&*payload), true)),
        })
    }
}

fn diagnostic(rule_id: &str, message: String, panicked: bool) -> RuleDiagnostic {
    RuleDiagnostic {
        rule_id: rule_id.to_string(),
        message,
        panicked,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MarkupSource;
    use crate::rules::{default_registry, RuleDescriptor, Severity};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const PAGE: &str = r#"<html><body>
        <h2>Intro</h2>
        <div id="dup"></div><p id="dup"></p>
        <img src="a.png">
    </body></html>"#;

    struct Failing {
        descriptor: RuleDescriptor,
        panics: bool,
    }

    impl Failing {
        fn boxed(name: &str, panics: bool) -> Box<dyn Rule> {
            Box::new(Self {
                descriptor: RuleDescriptor::from_name(name, "p", Severity::High, "test"),
                panics,
            })
        }
    }

    impl Rule for Failing {
        fn descriptor(&self) -> &RuleDescriptor {
            &self.descriptor
        }

        fn validate(&self, _elements: &[ElementRef<'_>], _cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
            if self.panics {
                panic!("validate exploded");
            }
            anyhow::bail!("cannot inspect element")
        }
    }

    struct BadSelector(RuleDescriptor);

    impl Rule for BadSelector {
        fn descriptor(&self) -> &RuleDescriptor {
            &self.0
        }

        fn validate(&self, _elements: &[ElementRef<'_>], _cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Unavailable;

    impl DomQuery for Unavailable {
        fn resolve<'a>(
            &self,
            _selector: &str,
            _scope: ElementRef<'a>,
            _policy: &ExcludePolicy,
        ) -> std::result::Result<Vec<ElementRef<'a>>, QueryError> {
            Err(QueryError::Unavailable("document detached".to_string()))
        }
    }

    struct Exploding;

    impl DomQuery for Exploding {
        fn resolve<'a>(
            &self,
            _selector: &str,
            _scope: ElementRef<'a>,
            _policy: &ExcludePolicy,
        ) -> std::result::Result<Vec<ElementRef<'a>>, QueryError> {
            panic!("query engine crashed")
        }
    }

    /// Records the value of a shared counter each time it validates
    struct Sampler {
        descriptor: RuleDescriptor,
        counter: Arc<AtomicUsize>,
        samples: Arc<Mutex<Vec<usize>>>,
    }

    impl Rule for Sampler {
        fn descriptor(&self) -> &RuleDescriptor {
            &self.descriptor
        }

        fn validate(&self, _elements: &[ElementRef<'_>], _cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
            let seen = self.counter.load(Ordering::SeqCst);
            self.samples.lock().unwrap().push(seen);
            Ok(())
        }
    }

    fn sampling_auditor(counter: &Arc<AtomicUsize>, samples: &Arc<Mutex<Vec<usize>>>) -> Auditor {
        let mut registry = RuleRegistry::new();
        for name in ["FirstSample", "SecondSample", "ThirdSample"] {
            registry
                .register(Box::new(Sampler {
                    descriptor: RuleDescriptor::from_name(name, "p", Severity::Low, "test"),
                    counter: Arc::clone(counter),
                    samples: Arc::clone(samples),
                }))
                .unwrap();
        }
        Auditor::new(registry)
    }

    fn rule_ids(validator: &Validator) -> Vec<&str> {
        validator.reports().iter().map(|r| r.rule_id.as_str()).collect()
    }

    #[test]
    fn test_run_collects_in_registration_order() {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();

        let outcome = auditor.run(&doc, &RunConfig::default(), &mut validator).unwrap();

        assert_eq!(outcome.status, RunState::Completed);
        assert_eq!(auditor.state(), RunState::Completed);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.rules_run.len(), auditor.registry().len());
        assert_eq!(
            rule_ids(&validator),
            vec!["page-has-heading-one", "duplicate-id", "duplicate-id", "html-has-lang", "image-alt"]
        );
        assert_eq!(validator.reports()[0].id, "report_0");
        assert_eq!(validator.reports()[4].id, "report_4");
    }

    #[test]
    fn test_failing_rules_are_isolated() {
        let mut registry = RuleRegistry::new();
        registry.register(Failing::boxed("BrokenRule", false)).unwrap();
        registry.register(Box::new(crate::rules::images::ImageAlt::new())).unwrap();
        registry.register(Failing::boxed("PanickyRule", true)).unwrap();
        registry.register(Box::new(crate::rules::headings::PageHasHeadingOne::new())).unwrap();
        let auditor = Auditor::new(registry);
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();

        let outcome = auditor.run(&doc, &RunConfig::default(), &mut validator).unwrap();

        assert_eq!(outcome.status, RunState::Completed);
        assert_eq!(rule_ids(&validator), vec!["image-alt", "page-has-heading-one"]);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].rule_id, "broken-rule");
        assert!(!outcome.failures[0].panicked);
        assert!(outcome.failures[0].message.contains("cannot inspect element"));
        assert_eq!(outcome.failures[1].rule_id, "panicky-rule");
        assert!(outcome.failures[1].panicked);
        assert!(outcome.failures[1].message.contains("validate exploded"));
    }

    #[test]
    fn test_invalid_selector_is_rule_defect() {
        let mut registry = RuleRegistry::new();
        registry
            .register(Box::new(BadSelector(RuleDescriptor::from_name("BadSelector", "div[", Severity::Low, "test"))))
            .unwrap();
        registry.register(Box::new(crate::rules::images::ImageAlt::new())).unwrap();
        let auditor = Auditor::new(registry);
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();

        let outcome = auditor.run(&doc, &RunConfig::default(), &mut validator).unwrap();
        assert!(outcome.failed("bad-selector"));
        assert_eq!(rule_ids(&validator), vec!["image-alt"]);
    }

    #[test]
    fn test_unavailable_query_is_fatal() {
        let auditor = Auditor::new(default_registry()).with_query(Unavailable);
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();

        let err = auditor.run(&doc, &RunConfig::default(), &mut validator).unwrap_err();
        assert!(matches!(err, AuditError::DomUnavailable(_)));
        assert_eq!(auditor.state(), RunState::Failed);
    }

    #[test]
    fn test_panicking_query_is_fatal_and_releases_auditor() {
        let auditor = Auditor::new(default_registry()).with_query(Exploding);
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();

        let err = auditor.run(&doc, &RunConfig::default(), &mut validator).unwrap_err();
        assert!(matches!(&err, AuditError::DomUnavailable(msg) if msg.contains("query engine crashed")));
        assert_eq!(auditor.state(), RunState::Failed);

        // A later run is refused for the same cause, not as reentrant
        let again = auditor.run(&doc, &RunConfig::default(), &mut validator).unwrap_err();
        assert!(matches!(again, AuditError::DomUnavailable(_)));
    }

    #[test]
    fn test_missing_context_is_fatal() {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();
        let config = RunConfig {
            context: Some("#nope".to_string()),
            ..RunConfig::default()
        };
        let err = auditor.run(&doc, &config, &mut validator).unwrap_err();
        assert!(matches!(err, AuditError::ContextNotFound(_)));
        assert!(validator.is_empty());
    }

    #[test]
    fn test_context_limits_scope() {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(
            r#"<html lang="en"><body><main><h1>Title</h1><img src="in.png" alt="Inside"></main><img src="out.png"></body></html>"#,
        );
        let mut validator = Validator::new();
        let config = RunConfig {
            context: Some("main".to_string()),
            ..RunConfig::default()
        };
        auditor.run(&doc, &config, &mut validator).unwrap();
        assert!(validator.is_empty(), "unexpected reports: {:?}", validator.reports());
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();
        let mut config = RunConfig::default();
        config.rules.disabled = vec!["duplicate-id".to_string(), "image-alt".to_string()];

        let outcome = auditor.run(&doc, &config, &mut validator).unwrap();
        assert_eq!(outcome.rules_skipped, vec!["duplicate-id", "image-alt"]);
        assert_eq!(rule_ids(&validator), vec!["page-has-heading-one", "html-has-lang"]);
    }

    #[test]
    fn test_reset_then_rerun_is_idempotent() {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();
        let config = RunConfig::default();

        auditor.run(&doc, &config, &mut validator).unwrap();
        let first = validator.reports().to_vec();
        validator.reset();
        auditor.run(&doc, &config, &mut validator).unwrap();

        assert_eq!(validator.reports(), first.as_slice());
    }

    #[test]
    fn test_runs_accumulate_without_reset() {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(PAGE);
        let mut validator = Validator::new();
        let config = RunConfig::default();

        auditor.run(&doc, &config, &mut validator).unwrap();
        let once = validator.len();
        auditor.run(&doc, &config, &mut validator).unwrap();
        assert_eq!(validator.len(), once * 2);
    }

    #[tokio::test]
    async fn test_async_runner_matches_sync_order() {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(PAGE);
        let config = RunConfig {
            async_runner: true,
            ..RunConfig::default()
        };

        let mut sync_validator = Validator::new();
        auditor.run(&doc, &config, &mut sync_validator).unwrap();

        let mut async_validator = Validator::new();
        let outcome = auditor.run_async(&doc, &config, &mut async_validator).await.unwrap();

        assert_eq!(outcome.status, RunState::Completed);
        assert_eq!(async_validator.reports(), sync_validator.reports());
    }

    #[tokio::test]
    async fn test_async_runner_yields_between_rules() {
        let counter = Arc::new(AtomicUsize::new(0));
        let samples = Arc::new(Mutex::new(Vec::new()));
        let auditor = sampling_auditor(&counter, &samples);
        let doc = Html::parse_document(PAGE);

        let ticker = {
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                loop {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        let yielding = RunConfig {
            async_runner: true,
            ..RunConfig::default()
        };
        auditor.run_async(&doc, &yielding, &mut Validator::new()).await.unwrap();
        let seen = std::mem::take(&mut *samples.lock().unwrap());
        assert_eq!(seen.len(), 3);
        assert!(seen[1] > seen[0], "no yield before second rule: {:?}", seen);
        assert!(seen[2] > seen[1], "no yield before third rule: {:?}", seen);

        auditor.run_async(&doc, &RunConfig::default(), &mut Validator::new()).await.unwrap();
        let seen = std::mem::take(&mut *samples.lock().unwrap());
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|&v| v == seen[0]), "yielded without async_runner: {:?}", seen);

        ticker.abort();
    }

    #[tokio::test]
    async fn test_dropped_async_run_releases_auditor() {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(PAGE);
        let config = RunConfig {
            async_runner: true,
            ..RunConfig::default()
        };
        let mut abandoned = Validator::new();

        tokio::select! {
            biased;
            _ = auditor.run_async(&doc, &config, &mut abandoned) => panic!("run finished before cancellation"),
            _ = tokio::task::yield_now() => {}
        }
        assert_eq!(auditor.state(), RunState::Failed);
        assert!(abandoned.len() < 5);

        let mut validator = Validator::new();
        let outcome = auditor.run(&doc, &RunConfig::default(), &mut validator).unwrap();
        assert_eq!(outcome.status, RunState::Completed);
        assert_eq!(validator.len(), 5);
    }

    #[tokio::test]
    async fn test_watch_disabled_runs_once() {
        let auditor = Auditor::new(default_registry());
        let source = MarkupSource::new(PAGE);
        let mut validator = Validator::new();
        let (_tx, rx) = mpsc::channel(4);

        let mut seen = Vec::new();
        let runs = auditor
            .watch(&source, &RunConfig::default(), &mut validator, rx, |_, v| seen.push(v.len()))
            .await
            .unwrap();

        assert_eq!(runs, 1);
        assert_eq!(seen, vec![5]);
    }

    #[tokio::test]
    async fn test_watch_coalesces_mutations_and_resets() {
        let auditor = Auditor::new(default_registry());
        let source = MarkupSource::new(PAGE);
        let mut validator = Validator::new();
        let config = RunConfig {
            watch_dom_changes: true,
            debounce_ms: 0,
            ..RunConfig::default()
        };
        let (tx, rx) = mpsc::channel(8);
        for _ in 0..3 {
            tx.send(MutationBatch::new(2)).await.unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        let runs = auditor
            .watch(&source, &config, &mut validator, rx, |_, v| {
                seen.push((v.len(), v.reports().first().map(|r| r.id.clone())));
                source.set_markup(r#"<html lang="en"><body><h1>Fixed</h1></body></html>"#);
            })
            .await
            .unwrap();

        assert_eq!(runs, 2);
        assert_eq!(seen[0], (5, Some("report_0".to_string())));
        assert_eq!(seen[1], (0, None));
    }

    #[tokio::test]
    async fn test_watch_separate_bursts_rerun_each_time() {
        let auditor = Auditor::new(default_registry());
        let source = MarkupSource::new(PAGE);
        let mut validator = Validator::new();
        let config = RunConfig {
            watch_dom_changes: true,
            debounce_ms: 0,
            ..RunConfig::default()
        };
        let (tx, rx) = mpsc::channel(8);
        let mut tx = Some(tx);
        if let Some(tx) = &tx {
            tx.try_send(MutationBatch::new(1)).unwrap();
        }

        let mut runs_seen = 0;
        let runs = auditor
            .watch(&source, &config, &mut validator, rx, |outcome, _| {
                assert_eq!(outcome.status, RunState::Completed);
                runs_seen += 1;
                if runs_seen == 3 {
                    tx.take();
                } else if runs_seen > 1 {
                    if let Some(tx) = &tx {
                        tx.try_send(MutationBatch::new(1)).unwrap();
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(runs, 3);
    }
}
