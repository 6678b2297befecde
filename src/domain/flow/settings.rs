//! Flow-wide settings: rendering behaviour and lifecycle texts.

use serde::Deserialize;

use crate::domain::conversation::CloseReason;
use crate::domain::rendering::CurrencyFormat;

/// Which node's template is rendered after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFrom {
    /// The node the conversation moves to (its prompt).
    #[default]
    Next,
    /// The node that handled the input.
    Current,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowSettings {
    #[serde(default)]
    pub render_from: RenderFrom,

    #[serde(default)]
    pub currency: CurrencyFormat,

    /// Rendered in place of a variable missing from the context.
    #[serde(default)]
    pub missing_placeholder: String,

    /// Variables always formatted as money, with or without `|currency`.
    #[serde(default)]
    pub currency_variables: Vec<String>,
}

/// Lifecycle hooks declared by the flow.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleSettings {
    /// Reaching any of these states closes the conversation as completed.
    #[serde(default)]
    pub completed_states: Vec<String>,

    /// Action run against the context right before a farewell is rendered.
    #[serde(default)]
    pub close_action: Option<String>,

    #[serde(default)]
    pub messages: LifecycleMessages,
}

/// Templates for system messages produced outside a normal turn.
///
/// Besides the conversation context these templates can use `greeting`,
/// `hours_remaining`, `idle_hours`, `message_count`, `extension_hours` and
/// `extension_reason`. `greeting` is `greeting` rendered when `client_name`
/// is known and `anonymous_greeting` otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleMessages {
    pub greeting: String,
    pub anonymous_greeting: String,
    pub warning: String,
    pub extension: String,
    pub expired: String,
    pub message_limit: String,
    pub negotiation_completed: String,
    pub generic: String,
}

impl LifecycleMessages {
    pub fn farewell(&self, reason: CloseReason) -> &str {
        match reason {
            CloseReason::Expired => &self.expired,
            CloseReason::MessageLimit => &self.message_limit,
            CloseReason::NegotiationCompleted => &self.negotiation_completed,
            CloseReason::Generic => &self.generic,
        }
    }
}

impl Default for LifecycleMessages {
    fn default() -> Self {
        Self {
            greeting: "Hello {{client_name}}, ".to_string(),
            anonymous_greeting: "Hello, ".to_string(),
            warning: "Heads up: this conversation will close automatically in \
                      {{hours_remaining}} hours due to inactivity. Reply to any message \
                      to keep it open."
                .to_string(),
            extension: "Good news: we added {{extension_hours}} extra hours to this \
                        conversation. Reason: {{extension_reason}}."
                .to_string(),
            expired: "{{greeting}}your negotiation session expired after {{idle_hours}} \
                      hours without activity. You can start a new conversation at any time."
                .to_string(),
            message_limit: "{{greeting}}we reached the limit of {{message_count}} messages \
                            for this conversation. An advisor will follow up with you."
                .to_string(),
            negotiation_completed: "{{greeting}}your negotiation is complete. You will \
                                    receive the agreement details shortly. Thank you!"
                .to_string(),
            generic: "{{greeting}}this conversation has been closed. Write to us again \
                      whenever you need help."
                .to_string(),
        }
    }
}
