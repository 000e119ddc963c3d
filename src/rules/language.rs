// SPDX-License-Identifier: PMPL-1.0-or-later
//! Language of page - WCAG 3.1.1 (Level A)
//!
//! Whole-document rule: it is handed the scope root once. When the scope is
//! the full document that root is `<html>`, which must carry a non-empty
//! `lang` attribute. Subtree audits have no `<html>` root and skip the check.

use crate::dom::DOCUMENT_SELECTOR;
use crate::rules::{Rule, RuleContext, RuleDescriptor, Severity};
use scraper::ElementRef;

/// `<html>` must declare its language
pub struct HtmlHasLang {
    descriptor: RuleDescriptor,
}

impl HtmlHasLang {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::from_name("HtmlHasLang", DOCUMENT_SELECTOR, Severity::Critical, "language")
                .with_link("https://www.w3.org/WAI/WCAG22/Understanding/language-of-page")
                .with_recommendation("Add lang=\"en\" (or the page's BCP 47 language tag) to <html>"),
        }
    }
}

impl Default for HtmlHasLang {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for HtmlHasLang {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
        for root in elements.iter().filter(|el| el.value().name() == "html") {
            match root.value().attr("lang") {
                None => {
                    cx.report(Some(*root), "html-has-lang", &[]);
                }
                Some(lang) if lang.trim().is_empty() => {
                    cx.report(Some(*root), "html-lang-empty", &[]);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
