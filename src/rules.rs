//! Tag action table compiled from configuration.

use crate::config::TransformConfig;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Action applied to elements of a configured tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagAction {
    /// Replace the `name` attribute with `prefix` + per-document counter
    Rename { prefix: String },
    /// Remove the `name` attribute
    Delete,
}

/// Compiled tag-to-action table.
///
/// Built once per run; read-only afterwards. Every configured tag maps to
/// exactly one action, so an element can never be both renamed and stripped.
#[derive(Debug)]
pub struct RuleEngine {
    actions: HashMap<String, TagAction>,
}

impl RuleEngine {
    /// Compile the rule table from configuration.
    ///
    /// Rename rules are claimed first, then delete rules, each in declared
    /// order; the first invalid or conflicting rule aborts compilation.
    pub fn compile(config: &TransformConfig) -> Result<Self, RuleError> {
        let mut actions = HashMap::new();

        for rule in &config.rename {
            if rule.tag.is_empty() {
                return Err(RuleError::EmptyTag);
            }
            if rule.prefix.is_empty() {
                return Err(RuleError::EmptyPrefix {
                    tag: rule.tag.clone(),
                });
            }
            claim(
                &mut actions,
                &rule.tag,
                TagAction::Rename {
                    prefix: rule.prefix.clone(),
                },
            )?;
        }

        for tag in &config.delete {
            if tag.is_empty() {
                return Err(RuleError::EmptyTag);
            }
            claim(&mut actions, tag, TagAction::Delete)?;
        }

        Ok(Self { actions })
    }

    /// Look up the action for a tag, if any.
    pub fn action_for(&self, tag: &str) -> Option<&TagAction> {
        self.actions.get(tag)
    }

    /// Iterate over all configured tag names.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Number of configured tags.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no tags are configured.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn claim(
    actions: &mut HashMap<String, TagAction>,
    tag: &str,
    action: TagAction,
) -> Result<(), RuleError> {
    match actions.entry(tag.to_string()) {
        Entry::Occupied(_) => Err(RuleError::DuplicateTag(tag.to_string())),
        Entry::Vacant(slot) => {
            slot.insert(action);
            Ok(())
        }
    }
}

/// Errors that can occur during rule compilation.
///
/// These are fatal: a run aborts before any file is touched.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule has an empty tag name")]
    EmptyTag,

    #[error("rename rule for tag `{tag}` has an empty prefix")]
    EmptyPrefix { tag: String },

    #[error("tag `{0}` is claimed by more than one rule")]
    DuplicateTag(String),
}
