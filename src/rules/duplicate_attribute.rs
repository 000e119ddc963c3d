// SPDX-License-Identifier: PMPL-1.0-or-later
//! Uniqueness-constrained attributes - WCAG 4.1.1 Parsing, 2.1.1 Keyboard
//!
//! Flags every element whose value for a unique attribute (`id`,
//! `accesskey`) is shared with another candidate. Values compare exactly as
//! written; only empty values are ignored. Each offending element gets
//! its own report, so two elements sharing `id="main"` yield two reports.

use crate::rules::{Rule, RuleContext, RuleDescriptor, Severity};
use scraper::ElementRef;
use std::collections::HashMap;

/// Duplicate values of one attribute
pub struct DuplicateAttribute {
    attribute: &'static str,
    descriptor: RuleDescriptor,
}

impl DuplicateAttribute {
    /// `duplicate-id`
    pub fn id() -> Self {
        Self {
            attribute: "id",
            descriptor: RuleDescriptor::from_name("DuplicateId", "[id]", Severity::Critical, "parsing")
                .with_link("https://www.w3.org/WAI/WCAG21/Understanding/parsing")
                .with_recommendation("Give every element a distinct id value"),
        }
    }

    /// `duplicate-accesskey`
    pub fn accesskey() -> Self {
        Self {
            attribute: "accesskey",
            descriptor: RuleDescriptor::from_name("DuplicateAccesskey", "[accesskey]", Severity::Low, "keyboard")
                .with_link("https://www.w3.org/WAI/WCAG22/Understanding/keyboard")
                .with_recommendation("Assign each accesskey to a single element"),
        }
    }

    pub fn attribute(&self) -> &str {
        self.attribute
    }
}

impl Rule for DuplicateAttribute {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
        let values: Vec<Option<&str>> = elements
            .iter()
            .map(|el| el.value().attr(self.attribute).filter(|v| !v.is_empty()))
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in values.iter().flatten() {
            *counts.entry(*value).or_insert(0) += 1;
        }

        for (element, value) in elements.iter().zip(&values) {
            let Some(value) = *value else { continue };
            if counts.get(value).copied().unwrap_or(0) > 1 {
                cx.report(
                    Some(*element),
                    "duplicate-attribute",
                    &[("attribute", self.attribute), ("value", value)],
                );
            }
        }
        Ok(())
    }
}
