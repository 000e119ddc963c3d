// SPDX-License-Identifier: PMPL-1.0-or-later
//! DOM access for the orchestrator.
//!
//! Rules never walk the document themselves. The orchestrator asks a
//! [`DomQuery`] for the elements matching a rule's selector inside the audit
//! scope, with hidden and excluded subtrees filtered out, and hands the
//! result to the rule. [`ScraperQuery`] is the default implementation over a
//! `scraper` document.

use crate::config::RunConfig;
use crate::error::{AuditError, QueryError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

/// Sentinel selector for rules that run once against the scope root
pub const DOCUMENT_SELECTOR: &str = ":document";

/// Longest opening-tag snippet kept on a [`NodeRef`]
const SNIPPET_LIMIT: usize = 120;

static HIDDEN_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*(?:display\s*:\s*none|visibility\s*:\s*hidden)\b").expect("valid regex")
});

/// Stable reference to an element of a fixed DOM snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Structural selector, e.g. `html > body:nth-child(2) > img:nth-child(1)`
    pub path: String,
    /// Lowercase tag name
    pub tag: String,
    /// Opening tag with attributes, truncated
    pub snippet: String,
}

impl NodeRef {
    /// Capture a reference to `element`
    pub fn from_element(element: ElementRef<'_>) -> Self {
        let mut segments = Vec::new();
        let mut current = Some(element);

        while let Some(el) = current {
            let parent = el.parent().and_then(ElementRef::wrap);
            let name = el.value().name();
            match parent {
                Some(_) => {
                    let position = el
                        .prev_siblings()
                        .filter(|n| n.value().is_element())
                        .count()
                        + 1;
                    segments.push(format!("{}:nth-child({})", name, position));
                }
                None => segments.push(name.to_string()),
            }
            current = parent;
        }
        segments.reverse();

        Self {
            path: segments.join(" > "),
            tag: element.value().name().to_string(),
            snippet: opening_tag(element),
        }
    }

    /// Find the referenced element in `document`
    pub fn resolve<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        let selector = Selector::parse(&self.path).ok()?;
        document.select(&selector).next()
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

fn opening_tag(element: ElementRef<'_>) -> String {
    let attrs = element
        .value()
        .attrs()
        .map(|(k, v)| format!(" {}=\"{}\"", k, v))
        .collect::<String>();
    let tag = format!("<{}{}>", element.value().name(), attrs);

    if tag.chars().count() > SNIPPET_LIMIT {
        let cut: String = tag.chars().take(SNIPPET_LIMIT).collect();
        format!("{}...", cut)
    } else {
        tag
    }
}

/// Which elements are never candidates for a rule
#[derive(Debug, Clone, Default)]
pub struct ExcludePolicy {
    /// Keep hidden elements as candidates
    pub include_hidden: bool,
    /// Subtrees matching any of these are skipped
    pub exclude: Vec<Selector>,
}

impl ExcludePolicy {
    /// Build the policy from run configuration
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let mut exclude = Vec::with_capacity(config.exclude.len());
        for raw in &config.exclude {
            let selector = Selector::parse(raw).map_err(|e| {
                AuditError::Config(format!("invalid exclude selector '{}': {}", raw, e))
            })?;
            exclude.push(selector);
        }
        Ok(Self {
            include_hidden: config.include_hidden,
            exclude,
        })
    }

    /// Whether `element` must be dropped from a candidate set
    pub fn excludes(&self, element: ElementRef<'_>) -> bool {
        if !self.include_hidden && is_hidden(element) {
            return true;
        }
        if self.exclude.is_empty() {
            return false;
        }
        self_and_ancestors(element).any(|el| self.exclude.iter().any(|sel| sel.matches(&el)))
    }
}

fn self_and_ancestors(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::once(element).chain(element.ancestors().filter_map(ElementRef::wrap))
}

/// Whether the element or one of its ancestors is hidden from assistive technology
pub fn is_hidden(element: ElementRef<'_>) -> bool {
    self_and_ancestors(element).any(hides_itself)
}

fn hides_itself(element: ElementRef<'_>) -> bool {
    let el = element.value();
    if el.attr("hidden").is_some() {
        return true;
    }
    if el.attr("aria-hidden").map(|v| v.trim().eq_ignore_ascii_case("true")).unwrap_or(false) {
        return true;
    }
    if el.name() == "input"
        && el.attr("type").map(|t| t.eq_ignore_ascii_case("hidden")).unwrap_or(false)
    {
        return true;
    }
    el.attr("style").map(|s| HIDDEN_STYLE.is_match(s)).unwrap_or(false)
}

/// Resolves rule selectors against a scope
pub trait DomQuery {
    /// Elements under `scope` (inclusive) matching `selector`, in document
    /// order, minus everything `policy` excludes. Deterministic for a fixed
    /// snapshot.
    fn resolve<'a>(
        &self,
        selector: &str,
        scope: ElementRef<'a>,
        policy: &ExcludePolicy,
    ) -> std::result::Result<Vec<ElementRef<'a>>, QueryError>;
}

/// [`DomQuery`] backed by `scraper` selectors
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperQuery;

impl DomQuery for ScraperQuery {
    fn resolve<'a>(
        &self,
        selector: &str,
        scope: ElementRef<'a>,
        policy: &ExcludePolicy,
    ) -> std::result::Result<Vec<ElementRef<'a>>, QueryError> {
        let parsed = Selector::parse(selector).map_err(|e| QueryError::InvalidSelector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;

        Ok(scope
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| parsed.matches(el))
            .filter(|el| !policy.excludes(*el))
            .collect())
    }
}

/// Supplies fresh DOM snapshots to a watching auditor
pub trait DocumentSource {
    /// Parse the current state of the document
    fn snapshot(&self) -> Result<Html>;

    /// Short label for logs
    fn describe(&self) -> String;
}

/// Document read from an HTML file on every snapshot
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSource for FileSource {
    fn snapshot(&self) -> Result<Html> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            AuditError::Document(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        Ok(Html::parse_document(&content))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory markup that can be swapped between snapshots
#[derive(Debug, Default)]
pub struct MarkupSource {
    markup: RwLock<String>,
}

impl MarkupSource {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: RwLock::new(markup.into()),
        }
    }

    /// Replace the markup returned by subsequent snapshots
    pub fn set_markup(&self, markup: impl Into<String>) {
        match self.markup.write() {
            Ok(mut guard) => *guard = markup.into(),
            Err(poisoned) => *poisoned.into_inner() = markup.into(),
        }
    }
}

impl DocumentSource for MarkupSource {
    fn snapshot(&self) -> Result<Html> {
        let markup = self
            .markup
            .read()
            .map_err(|_| AuditError::Document("markup lock poisoned".to_string()))?;
        Ok(Html::parse_document(&markup))
    }

    fn describe(&self) -> String {
        "<inline markup>".to_string()
    }
}
