//! Tag transformation engine.
//!
//! Walks one document in pre-order and applies the compiled action for each
//! matching element. Rename counters live in a table scoped to the single
//! `apply` call, so numbering always restarts per document and output never
//! depends on the order files are processed in.
//!
//! `apply` is not idempotent for rename rules: running it again renumbers
//! the `name` attributes (counters restart, values are overwritten). Delete
//! rules are idempotent; a second run only records missing-attribute
//! warnings.

use crate::config::Settings;
use crate::document::{Document, Element, Node};
use crate::rules::{RuleEngine, TagAction};
use std::collections::{BTreeMap, HashMap};

/// The attribute all rules operate on.
const NAME_ATTR: &str = "name";

/// Non-fatal condition found while transforming a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An element matched a rule but carries no `name` attribute
    MissingNameAttribute { tag: String },
}

/// Outcome of transforming one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingReport {
    /// Elements transformed, keyed by tag name
    pub transformed: BTreeMap<String, u64>,
    /// Warnings, in document order
    pub warnings: Vec<Warning>,
}

impl ProcessingReport {
    /// Total number of transformed elements.
    pub fn total_transformed(&self) -> u64 {
        self.transformed.values().sum()
    }
}

/// Per-tag rename counters for one document.
struct CounterTable {
    counts: HashMap<String, u64>,
    start: u64,
}

impl CounterTable {
    /// One entry per configured tag, starting just below the first value
    /// that will be assigned.
    fn new(engine: &RuleEngine, start_counter: u64) -> Self {
        let start = start_counter.saturating_sub(1);
        Self {
            counts: engine.tags().map(|t| (t.to_string(), start)).collect(),
            start,
        }
    }

    /// Increment the counter for a tag and return the new value.
    fn next(&mut self, tag: &str) -> u64 {
        let count = self.counts.entry(tag.to_string()).or_insert(self.start);
        *count += 1;
        *count
    }
}

/// Transform a document in place, returning the per-document report.
pub fn apply(doc: &mut Document, engine: &RuleEngine, settings: &Settings) -> ProcessingReport {
    let mut counters = CounterTable::new(engine, settings.start_counter);
    let mut report = ProcessingReport::default();
    visit(&mut doc.nodes, engine, settings, &mut counters, &mut report);
    report
}

/// Pre-order depth-first walk; numbering follows document order.
fn visit(
    nodes: &mut [Node],
    engine: &RuleEngine,
    settings: &Settings,
    counters: &mut CounterTable,
    report: &mut ProcessingReport,
) {
    for node in nodes {
        if let Node::Element(el) = node {
            apply_to_element(el, engine, settings, counters, report);
            visit(&mut el.children, engine, settings, counters, report);
        }
    }
}

fn apply_to_element(
    el: &mut Element,
    engine: &RuleEngine,
    settings: &Settings,
    counters: &mut CounterTable,
    report: &mut ProcessingReport,
) {
    let Some(action) = engine.action_for(&el.name) else {
        return;
    };

    match action {
        TagAction::Delete => {
            if el.remove_attr(NAME_ATTR) {
                *report.transformed.entry(el.name.clone()).or_default() += 1;
            } else {
                report.warnings.push(Warning::MissingNameAttribute {
                    tag: el.name.clone(),
                });
            }
        }
        TagAction::Rename { prefix } => {
            if el.has_attr(NAME_ATTR) || settings.add_missing_name {
                let count = counters.next(&el.name);
                el.set_attr(NAME_ATTR, &format!("{prefix}{count}"));
                *report.transformed.entry(el.name.clone()).or_default() += 1;
            } else {
                report.warnings.push(Warning::MissingNameAttribute {
                    tag: el.name.clone(),
                });
            }
        }
    }
}
