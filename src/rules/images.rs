// SPDX-License-Identifier: PMPL-1.0-or-later
//! Image alternative text - WCAG 1.1.1 Non-text Content (Level A)
//!
//! - `image-alt`: every `<img>` carries an `alt` attribute (`alt=""` marks
//!   a decorative image and passes)
//! - `image-generic-alt`: alt text is more than a placeholder word

use crate::rules::{Rule, RuleContext, RuleDescriptor, Severity};
use scraper::ElementRef;

/// Alt values that describe nothing
const GENERIC_ALT_VALUES: &[&str] = &[
    "image",
    "photo",
    "picture",
    "icon",
    "graphic",
    "img",
    "banner",
    "logo",
    "untitled",
    "screenshot",
    "thumbnail",
    "placeholder",
];

/// `<img>` without an alt attribute
pub struct ImageAlt {
    descriptor: RuleDescriptor,
}

impl ImageAlt {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::from_name("ImageAlt", "img", Severity::Critical, "text-alternatives")
                .with_link("https://www.w3.org/WAI/WCAG22/Understanding/non-text-content")
                .with_recommendation("Describe informative images; use alt=\"\" for decorative ones"),
        }
    }
}

impl Default for ImageAlt {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImageAlt {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
        for img in elements {
            if img.value().attr("alt").is_none() {
                cx.report(Some(*img), "image-alt", &[]);
            }
        }
        Ok(())
    }
}

/// Alt text that is a placeholder word
pub struct ImageGenericAlt {
    descriptor: RuleDescriptor,
}

impl ImageGenericAlt {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::from_name("ImageGenericAlt", "img[alt]", Severity::Low, "text-alternatives")
                .with_link("https://www.w3.org/WAI/tutorials/images/informative/")
                .with_recommendation("Say what the image shows or why it is there"),
        }
    }
}

impl Default for ImageGenericAlt {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImageGenericAlt {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn validate(&self, elements: &[ElementRef<'_>], cx: &mut RuleContext<'_>) -> anyhow::Result<()> {
        for img in elements {
            let Some(alt) = img.value().attr("alt") else { continue };
            let normalized = alt.trim().to_lowercase();
            if GENERIC_ALT_VALUES.contains(&normalized.as_str()) {
                cx.report(Some(*img), "image-generic-alt", &[("alt", alt.trim())]);
            }
        }
        Ok(())
    }
}
