// SPDX-License-Identifier: PMPL-1.0-or-later
//! Message translation contract.
//!
//! Rules never format user-facing text themselves; they ask a [`Translator`]
//! for the message behind a key. Loading real locale files is the host's job;
//! [`Catalog::english`] ships the built-in rule messages.

use std::collections::HashMap;

/// Turns a message key plus named arguments into display text
pub trait Translator: Send + Sync {
    fn instant(&self, key: &str, args: &[(&str, &str)]) -> String;
}

/// Key → template map with `{{name}}` placeholders
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

const ENGLISH: &[(&str, &str)] = &[
    (
        "page-has-heading-one",
        "Page must contain a level-one heading. No <h1> element was found.",
    ),
    (
        "duplicate-attribute",
        "The {{attribute}} value \"{{value}}\" is used by more than one element; {{attribute}} values must be unique.",
    ),
    (
        "html-has-lang",
        "The <html> element must have a lang attribute so screen readers pick the right pronunciation.",
    ),
    ("html-lang-empty", "The <html> element has an empty lang attribute."),
    (
        "image-alt",
        "Image is missing an alt attribute. Use alt=\"description\" for informative images or alt=\"\" for decorative ones.",
    ),
    (
        "image-generic-alt",
        "Alt text \"{{alt}}\" does not describe the image.",
    ),
    (
        "button-name",
        "Button has no accessible name. It has no text content, aria-label, aria-labelledby or title.",
    ),
    (
        "redundant-role",
        "Redundant role=\"{{role}}\" on <{{tag}}>; the element already has this implicit role.",
    ),
    (
        "heading-order",
        "Heading level skipped from <h{{previous}}> to <h{{current}}>.",
    ),
];

impl Catalog {
    /// Empty catalog; every key renders as itself
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in English messages
    pub fn english() -> Self {
        let mut catalog = Self::new();
        for (key, template) in ENGLISH {
            catalog.insert(key, template);
        }
        catalog
    }

    /// Add or replace one template
    pub fn insert(&mut self, key: &str, template: &str) {
        self.entries.insert(key.to_string(), template.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translator for Catalog {
    fn instant(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.entries.get(key) else {
            return key.to_string();
        };
        args.iter().fold(template.clone(), |text, (name, value)| {
            text.replace(&format!("{{{{{}}}}}", name), value)
        })
    }
}
