// SPDX-License-Identifier: PMPL-1.0-or-later
//! Rule contract, registry and built-in rules.
//!
//! Every check implements [`Rule`]: a descriptor (id, selector, severity,
//! category, documentation links) plus `validate` over the elements the
//! orchestrator resolved for it. Rules report through [`RuleContext`] and
//! never query the document themselves.

pub mod aria;
pub mod duplicate_attribute;
pub mod headings;
pub mod images;
pub mod language;

use crate::dom::{NodeRef, DOCUMENT_SELECTOR};
use crate::error::RegistrationError;
use crate::i18n::Translator;
use crate::validator::{IssueReport, Validator};
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Rule-level severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub id: String,
    pub selector: String,
    pub severity: Severity,
    pub category: String,
    pub links: Vec<String>,
    pub recommendations: Vec<String>,
}

impl RuleDescriptor {
    /// Descriptor whose id is the kebab-case form of `name`
    pub fn from_name(name: &str, selector: &str, severity: Severity, category: &str) -> Self {
        Self {
            id: kebab_case(name),
            selector: selector.to_string(),
            severity,
            category: category.to_string(),
            links: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.links.push(link.to_string());
        self
    }

    pub fn with_recommendation(mut self, recommendation: &str) -> Self {
        self.recommendations.push(recommendation.to_string());
        self
    }

    /// Whether the rule runs once against the scope root
    pub fn targets_document(&self) -> bool {
        self.selector == DOCUMENT_SELECTOR
    }
}

/// `PageHasHeadingOne` → `page-has-heading-one`
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;

    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() {
            if prev_lower_or_digit && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }

    out.trim_end_matches('-').to_string()
}

/// Whether `id` is non-empty lowercase kebab-case
pub fn is_kebab_case(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('-')
        && !id.ends_with('-')
        && !id.contains("--")
        && id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// What a rule can touch while validating
pub struct RuleContext<'r> {
    rule_id: &'r str,
    validator: &'r mut Validator,
    translator: &'r dyn Translator,
}

impl<'r> RuleContext<'r> {
    pub fn new(rule_id: &'r str, validator: &'r mut Validator, translator: &'r dyn Translator) -> Self {
        Self {
            rule_id,
            validator,
            translator,
        }
    }

    /// Translate `key` and record a report against `node` (or the document)
    pub fn report(&mut self, node: Option<ElementRef<'_>>, key: &str, args: &[(&str, &str)]) -> String {
        let message = self.translator.instant(key, args);
        let node = node.map(NodeRef::from_element);
        self.validator.report(IssueReport::new(self.rule_id, message, node))
    }

    pub fn rule_id(&self) -> &str {
        self.rule_id
    }
}

/// An accessibility check
pub trait Rule: Send + Sync {
    fn descriptor(&self) -> &RuleDescriptor;

    fn selector(&self) -> &str {
        &self.descriptor().selector
    }

    /// Inspect the candidates and report every violation through `cx`
    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()>;

    /// Register this rule instance
    fn register(self, registry: &mut RuleRegistry) -> Result<(), RegistrationError>
    where
        Self: Sized + 'static,
    {
        registry.register(Box::new(self))
    }
}

/// Registered rules in registration order
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    index: HashMap<String, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule keyed by its descriptor id.
    ///
    /// Re-registering an id replaces the earlier rule in place. A malformed
    /// id is logged and skipped, leaving any prior registration untouched.
    pub fn register(&mut self, rule: Box<dyn Rule>) -> Result<(), RegistrationError> {
        let id = rule.descriptor().id.clone();

        if id.is_empty() {
            warn!("Skipping rule registration: empty id");
            return Err(RegistrationError::EmptyId);
        }
        if !is_kebab_case(&id) {
            warn!("Skipping rule registration: malformed id '{}'", id);
            return Err(RegistrationError::MalformedId(id));
        }

        match self.index.get(&id) {
            Some(&pos) => {
                debug!("Replacing rule '{}'", id);
                self.rules[pos] = rule;
            }
            None => {
                debug!("Registered rule '{}'", id);
                self.index.insert(id, self.rules.len());
                self.rules.push(rule);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.index.get(id).map(|&pos| self.rules[pos].as_ref())
    }

    /// Rules in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.descriptor().id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Registry holding every built-in rule
pub fn default_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    let builtins: Vec<Box<dyn Rule>> = vec![
        Box::new(headings::PageHasHeadingOne::new()),
        Box::new(duplicate_attribute::DuplicateAttribute::id()),
        Box::new(duplicate_attribute::DuplicateAttribute::accesskey()),
        Box::new(language::HtmlHasLang::new()),
        Box::new(images::ImageAlt::new()),
        Box::new(images::ImageGenericAlt::new()),
        Box::new(aria::ButtonName::new()),
        Box::new(aria::RedundantRole::new()),
        Box::new(headings::HeadingOrder::new()),
    ];
    for rule in builtins {
        if let Err(e) = registry.register(rule) {
            warn!("Built-in rule rejected: {}", e);
        }
    }
    registry
}

/// Run one rule over markup the way the orchestrator does: candidates come
/// from [`ScraperQuery`](crate::dom::ScraperQuery) under the default policy.
#[cfg(test)]
pub(crate) fn run_rule(rule: &dyn Rule, html: &str) -> Validator {
    use crate::dom::{DomQuery, ExcludePolicy, ScraperQuery};
    use crate::i18n::Catalog;

    let doc = scraper::Html::parse_document(html);
    let elements = ScraperQuery
        .resolve(rule.selector(), doc.root_element(), &ExcludePolicy::default())
        .expect("valid selector");
    let catalog = Catalog::english();
    let mut validator = Validator::new();
    let mut cx = RuleContext::new(&rule.descriptor().id, &mut validator, &catalog);
    rule.validate(&elements, &mut cx).expect("rule succeeds");
    validator
}
