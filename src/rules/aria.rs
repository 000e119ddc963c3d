// SPDX-License-Identifier: PMPL-1.0-or-later
//! Name, Role, Value - WCAG 4.1.2 (Level A)
//!
//! - `button-name`: buttons expose an accessible name
//! - `redundant-role`: no explicit role that repeats the implicit one

use crate::rules::{Rule, RuleContext, RuleDescriptor, Severity};
use scraper::ElementRef;

/// Elements whose implicit ARIA role makes an explicit one redundant
const REDUNDANT_ROLES: &[(&str, &str)] = &[
    ("nav", "navigation"),
    ("main", "main"),
    ("header", "banner"),
    ("footer", "contentinfo"),
    ("aside", "complementary"),
    ("form", "form"),
    ("button", "button"),
    ("a", "link"),
    ("select", "listbox"),
    ("textarea", "textbox"),
    ("table", "table"),
    ("ul", "list"),
    ("ol", "list"),
    ("article", "article"),
];

/// Button without an accessible name
pub struct ButtonName {
    descriptor: RuleDescriptor,
}

impl ButtonName {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::from_name("ButtonName", "button", Severity::Critical, "name-role-value")
                .with_link("https://www.w3.org/WAI/WCAG22/Understanding/name-role-value")
                .with_recommendation("Add visible text or aria-label to the button"),
        }
    }
}

impl Default for ButtonName {
    fn default() -> Self {
        Self::new()
    }
}

fn has_accessible_name(button: &ElementRef<'_>) -> bool {
    let el = button.value();
    let labelled = ["aria-label", "aria-labelledby", "title"]
        .iter()
        .any(|attr| el.attr(attr).map(|v| !v.trim().is_empty()).unwrap_or(false));
    labelled || !button.text().collect::<String>().trim().is_empty()
}

impl Rule for ButtonName {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
        for button in elements.iter().filter(|b| !has_accessible_name(b)) {
            cx.report(Some(*button), "button-name", &[]);
        }
        Ok(())
    }
}

/// Explicit role equal to the element's implicit role
pub struct RedundantRole {
    descriptor: RuleDescriptor,
}

impl RedundantRole {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::from_name("RedundantRole", "[role]", Severity::Low, "best-practice")
                .with_link("https://www.w3.org/TR/html-aria/#docconformance")
                .with_recommendation("Remove the role attribute; the element already exposes it"),
        }
    }
}

impl Default for RedundantRole {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for RedundantRole {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
        for el in elements {
            let tag = el.value().name();
            let Some(role) = el.value().attr("role").map(str::trim) else { continue };
            let redundant = REDUNDANT_ROLES
                .iter()
                .any(|(name, implicit)| *name == tag && implicit.eq_ignore_ascii_case(role));
            if redundant {
                cx.report(Some(*el), "redundant-role", &[("role", role), ("tag", tag)]);
            }
        }
        Ok(())
    }
}
