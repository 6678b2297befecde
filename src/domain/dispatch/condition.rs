//! Named conditions and their registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::domain::classification::{ClassificationResult, Intent};
use crate::domain::conversation::Context;
use crate::domain::foundation::ConversationId;

/// Everything a condition may look at.
#[derive(Debug, Clone, Copy)]
pub struct ConditionInput<'a> {
    pub conversation_id: ConversationId,
    pub context: &'a Context,
    pub user_input: &'a str,
    /// Cascade result, present only for conditions that declare expected intents.
    pub classification: Option<&'a ClassificationResult>,
}

/// A boolean decision over the context and the latest user input.
///
/// Conditions that interpret free text return their candidate intents from
/// [`Condition::expected_intents`]; the engine then runs the classifier
/// cascade and hands the result over in [`ConditionInput::classification`].
/// When the cascade produces nothing, [`Condition::default_outcome`] is used
/// instead of calling `evaluate`.
pub trait Condition: Send + Sync {
    fn name(&self) -> &str;

    fn expected_intents(&self) -> Option<&[Intent]> {
        None
    }

    fn evaluate(&self, input: &ConditionInput<'_>) -> bool;

    fn default_outcome(&self) -> bool {
        false
    }
}

/// Reads a boolean flag from the context.
///
/// An absent or non-boolean flag evaluates to `false`.
#[derive(Debug, Clone)]
pub struct ContextFlagCondition {
    name: String,
    flag: String,
}

impl ContextFlagCondition {
    pub fn new(name: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flag: flag.into(),
        }
    }

    /// A condition named after the flag it reads.
    pub fn for_flag(flag: impl Into<String>) -> Self {
        let flag = flag.into();
        Self::new(flag.clone(), flag)
    }
}

impl Condition for ContextFlagCondition {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, input: &ConditionInput<'_>) -> bool {
        match input.context.flag(&self.flag) {
            Some(value) => value,
            None => {
                warn!(
                    conversation_id = %input.conversation_id,
                    condition = %self.name,
                    flag = %self.flag,
                    "Flag missing from context, taking the false branch"
                );
                false
            }
        }
    }
}

/// Name to implementation map for conditions.
#[derive(Clone, Default)]
pub struct ConditionRegistry {
    conditions: HashMap<String, Arc<dyn Condition>>,
}

impl ConditionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a condition under its own name, replacing any previous one.
    pub fn register(&mut self, condition: impl Condition + 'static) {
        self.conditions
            .insert(condition.name().to_string(), Arc::new(condition));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Condition>> {
        self.conditions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.conditions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("conditions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(context: &'a Context) -> ConditionInput<'a> {
        ConditionInput {
            conversation_id: ConversationId::new(),
            context,
            user_input: "",
            classification: None,
        }
    }

    #[test]
    fn flag_condition_reads_flag() {
        let mut context = Context::new();
        context.set_flag("x", true);
        assert!(ContextFlagCondition::for_flag("x").evaluate(&input(&context)));

        context.set_flag("x", false);
        assert!(!ContextFlagCondition::for_flag("x").evaluate(&input(&context)));
    }

    #[test]
    fn absent_flag_is_false() {
        let context = Context::new();
        assert!(!ContextFlagCondition::new("ready", "offers_ready").evaluate(&input(&context)));
    }

    #[test]
    fn string_flag_is_accepted() {
        let mut context = Context::new();
        context.insert("x", "true");
        assert!(ContextFlagCondition::for_flag("x").evaluate(&input(&context)));
    }

    #[test]
    fn registry_replaces_by_name() {
        let mut registry = ConditionRegistry::new();
        registry.register(ContextFlagCondition::new("a", "one"));
        registry.register(ContextFlagCondition::new("a", "two"));

        assert!(registry.contains("a"));
        assert_eq!(registry.names(), vec!["a"]);

        let mut context = Context::new();
        context.set_flag("two", true);
        let condition = registry.get("a").unwrap();
        assert!(condition.evaluate(&input(&context)));
    }
}
