// SPDX-License-Identifier: PMPL-1.0-or-later
//! Heading structure rules - WCAG 1.3.1 Info and Relationships, 2.4.6 Headings and Labels
//!
//! - `page-has-heading-one`: the audited scope contains at least one `<h1>`
//! - `heading-order`: heading levels never skip (h2 followed by h4)

use crate::rules::{Rule, RuleContext, RuleDescriptor, Severity};
use scraper::ElementRef;

/// At least one level-one heading must exist
pub struct PageHasHeadingOne {
    descriptor: RuleDescriptor,
}

impl PageHasHeadingOne {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::from_name("PageHasHeadingOne", "h1", Severity::High, "best-practice")
                .with_link("https://www.w3.org/WAI/WCAG22/Understanding/info-and-relationships")
                .with_recommendation("Add an <h1> that names the main content of the page"),
        }
    }
}

impl Default for PageHasHeadingOne {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for PageHasHeadingOne {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
        if elements.is_empty() {
            cx.report(None, "page-has-heading-one", &[]);
        }
        Ok(())
    }
}

/// Heading levels must increase one step at a time
pub struct HeadingOrder {
    descriptor: RuleDescriptor,
}

impl HeadingOrder {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::from_name(
                "HeadingOrder",
                "h1, h2, h3, h4, h5, h6",
                Severity::Info,
                "best-practice",
            )
            .with_link("https://www.w3.org/WAI/tutorials/page-structure/headings/")
            .with_recommendation("Use the next heading level, or add the intermediate levels"),
        }
    }
}

impl Default for HeadingOrder {
    fn default() -> Self {
        Self::new()
    }
}

/// `h3` → 3
fn heading_level(element: &ElementRef<'_>) -> Option<u8> {
    element
        .value()
        .name()
        .strip_prefix('h')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=6).contains(n))
}

impl Rule for HeadingOrder {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
        let headings: Vec<(ElementRef<'_>, u8)> = elements
            .iter()
            .filter_map(|el| heading_level(el).map(|level| (*el, level)))
            .collect();

        for pair in headings.windows(2) {
            let (_, previous) = pair[0];
            let (element, current) = pair[1];
            if current > previous + 1 {
                let previous = previous.to_string();
                let current = current.to_string();
                cx.report(
                    Some(element),
                    "heading-order",
                    &[("previous", previous.as_str()), ("current", current.as_str())],
                );
            }
        }
        Ok(())
    }
}
