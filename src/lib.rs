// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessguard - rule-based DOM accessibility validation engine
//!
//! Accessguard applies a registry of independent accessibility rules to an
//! already-rendered DOM tree, collects every violation into an injectable
//! report store and reduces the collected findings to a single 0-100
//! health score.
//!
//! ## Pipeline
//!
//! - **Rules** ([`rules`]): each rule carries a selector, a descriptor and a
//!   `validate` operation over the elements it is handed
//! - **DOM query** ([`dom`]): resolves selectors against a scope, skipping
//!   hidden and excluded subtrees
//! - **Orchestrator** ([`runner`]): drives one pass, isolates failing rules,
//!   optionally yields between rules and re-runs on DOM mutation
//! - **Validator** ([`validator`]): ordered report store with explicit reset
//! - **Scoring** ([`scoring`]): severity buckets and the health score
//! - **Output** ([`report`]): text, JSON and SARIF rendering

pub mod config;
pub mod dom;
pub mod error;
pub mod i18n;
pub mod report;
pub mod rules;
pub mod runner;
pub mod scoring;
pub mod validator;

pub use error::{AuditError, Result};
