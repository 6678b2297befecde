//! One dialogue turn over the compiled flow graph.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::classification::{normalize_text, ClassificationResult, Intent, IntentCascade};
use crate::domain::conversation::Context;
use crate::domain::dispatch::{ActionInput, ActionOutcome, ConditionInput, Registries};
use crate::domain::flow::{FlowDefinition, MenuOption, NodeKind, RenderFrom, StateNode};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode};
use crate::domain::rendering::VariableRenderer;

/// Everything one turn produced. Nothing is persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub previous_state: String,
    pub next_state: String,
    /// Rendered outbound text. Empty when the rendered node has no message.
    pub message: String,
    pub quick_replies: Vec<String>,
    /// Context after actions ran.
    pub context: Context,
    /// One entry per action run during the turn.
    pub side_effects: Vec<String>,
    /// Cascade result, when a condition or menu needed one.
    pub classification: Option<ClassificationResult>,
}

/// Rendered text for a node, with its quick replies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedNode {
    pub text: String,
    pub quick_replies: Vec<String>,
}

/// Executes turns against one flow.
///
/// The engine holds no per-conversation state. Each call receives the
/// context by reference and returns a new one in the outcome; action and
/// classifier failures are folded into the outcome rather than returned
/// as errors.
#[derive(Clone)]
pub struct StateMachineEngine {
    flow: Arc<FlowDefinition>,
    registries: Arc<Registries>,
    cascade: IntentCascade,
    renderer: VariableRenderer,
}

impl StateMachineEngine {
    pub fn new(flow: Arc<FlowDefinition>, registries: Arc<Registries>, cascade: IntentCascade) -> Self {
        let renderer = VariableRenderer::from_settings(flow.settings());
        Self {
            flow,
            registries,
            cascade,
            renderer,
        }
    }

    pub fn flow(&self) -> &FlowDefinition {
        &self.flow
    }

    pub fn renderer(&self) -> &VariableRenderer {
        &self.renderer
    }

    /// Context for a brand new conversation: the flow's declared variables.
    pub fn initial_context(&self) -> Context {
        let mut context = Context::new();
        context.seed(self.flow.variables());
        context
    }

    /// Runs one turn from the node named `state`.
    ///
    /// # Errors
    ///
    /// - `StateNotFound` if `state` is not part of the flow, which happens
    ///   only when a stored conversation predates a flow change
    pub async fn transition_from(
        &self,
        conversation_id: ConversationId,
        state: &str,
        user_input: &str,
        context: &Context,
    ) -> Result<TransitionOutcome, DomainError> {
        let node = self.flow.node(state).ok_or_else(|| {
            DomainError::new(ErrorCode::StateNotFound, format!("State '{state}' is not in the flow"))
                .with_detail("conversation_id", conversation_id.to_string())
        })?;
        Ok(self.transition(conversation_id, node, user_input, context).await)
    }

    /// Runs one turn from `node`.
    ///
    /// The node's action runs first; its result feeds the edge choice. The
    /// outbound message comes from the next node or from `node`, as the
    /// flow's `render_from` setting says.
    pub async fn transition(
        &self,
        conversation_id: ConversationId,
        node: &StateNode,
        user_input: &str,
        context: &Context,
    ) -> TransitionOutcome {
        let mut working = context.clone();
        let mut side_effects = Vec::new();

        if let Some(action) = node.action.as_ref().filter(|_| !node.is_terminal()) {
            let outcome = self
                .run_action(action, &working, conversation_id, user_input)
                .await;
            side_effects.push(outcome.summary());
            working = outcome.context;
        }

        let mut classification = None;
        let next_state = match &node.kind {
            NodeKind::Direct { next } => next.clone(),
            NodeKind::Conditional {
                condition,
                true_next,
                false_next,
            } => {
                let (result, verdict) = self
                    .evaluate_condition(conversation_id, condition, user_input, &working)
                    .await;
                classification = verdict;
                if result {
                    true_next.clone()
                } else {
                    false_next.clone()
                }
            }
            NodeKind::Menu {
                options,
                on_unmatched,
            } => {
                let (selected, verdict) = self.select_option(options, user_input, &working).await;
                classification = verdict;
                match selected {
                    Some(option) => {
                        working.insert("selected_option", option.key.clone());
                        option.next.clone()
                    }
                    None => {
                        debug!(
                            conversation_id = %conversation_id,
                            state = %node.id,
                            "Menu input unmatched"
                        );
                        on_unmatched.clone().unwrap_or_else(|| node.id.clone())
                    }
                }
            }
            NodeKind::Terminal => node.id.clone(),
        };

        let render_id = match self.flow.settings().render_from {
            RenderFrom::Next => next_state.as_str(),
            RenderFrom::Current => node.id.as_str(),
        };
        let rendered = self.render_node(render_id, &working);

        debug!(
            conversation_id = %conversation_id,
            from = %node.id,
            to = %next_state,
            "Transition computed"
        );

        TransitionOutcome {
            previous_state: node.id.clone(),
            next_state,
            message: rendered.text,
            quick_replies: rendered.quick_replies,
            context: working,
            side_effects,
            classification,
        }
    }

    /// Renders a node's message with its own variables layered over `context`.
    pub fn render_node(&self, node_id: &str, context: &Context) -> RenderedNode {
        let Some(node) = self.flow.node(node_id) else {
            warn!(state = node_id, "Render requested for unknown state");
            return RenderedNode::default();
        };
        let text = match &node.message {
            Some(template) if node.variables.is_empty() => self.renderer.render(template, context),
            Some(template) => {
                let mut layered = context.clone();
                for (name, value) in &node.variables {
                    layered.insert(name.clone(), value.clone());
                }
                self.renderer.render(template, &layered)
            }
            None => String::new(),
        };
        RenderedNode {
            text,
            quick_replies: node.quick_replies(),
        }
    }

    pub fn render(&self, template: &str, context: &Context) -> String {
        self.renderer.render(template, context)
    }

    /// Runs a registered action. Failures come back inside the outcome.
    pub async fn run_action(
        &self,
        name: &str,
        context: &Context,
        conversation_id: ConversationId,
        user_input: &str,
    ) -> ActionOutcome {
        let input = ActionInput {
            conversation_id,
            user_input,
        };
        self.registries.actions.run(name, context, &input).await
    }

    async fn evaluate_condition(
        &self,
        conversation_id: ConversationId,
        name: &str,
        user_input: &str,
        context: &Context,
    ) -> (bool, Option<ClassificationResult>) {
        let Some(condition) = self.registries.conditions.get(name) else {
            warn!(
                conversation_id = %conversation_id,
                condition = name,
                "Condition not registered, taking the false branch"
            );
            return (false, None);
        };

        let classification = match condition.expected_intents() {
            Some(expected) => {
                let verdict = self.cascade.classify(user_input, context, expected).await;
                match verdict.result {
                    Some(result) => Some(result),
                    None => {
                        debug!(
                            conversation_id = %conversation_id,
                            condition = name,
                            "No tier classified the input, using the condition default"
                        );
                        return (condition.default_outcome(), None);
                    }
                }
            }
            None => None,
        };

        let input = ConditionInput {
            conversation_id,
            context,
            user_input,
            classification: classification.as_ref(),
        };
        (condition.evaluate(&input), classification)
    }

    async fn select_option<'n>(
        &self,
        options: &'n [MenuOption],
        user_input: &str,
        context: &Context,
    ) -> (Option<&'n MenuOption>, Option<ClassificationResult>) {
        let normalized = normalize_text(user_input);
        if normalized.is_empty() {
            return (None, None);
        }
        if let Some(option) = options.iter().find(|o| o.matches_text(&normalized)) {
            return (Some(option), None);
        }

        let mut expected: Vec<Intent> = Vec::new();
        for option in options {
            for intent in option.intents.iter().cloned().chain([Intent::new(&option.key)]) {
                if !expected.contains(&intent) {
                    expected.push(intent);
                }
            }
        }

        let verdict = self.cascade.classify(user_input, context, &expected).await;
        let selected = verdict
            .result
            .as_ref()
            .and_then(|result| options.iter().find(|o| o.matches_intent(&result.intent)));
        (selected, verdict.result)
    }
}
