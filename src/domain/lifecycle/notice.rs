//! Variables available to lifecycle message templates.

use super::TimeoutPolicy;
use crate::domain::conversation::{Context, Conversation};
use crate::domain::flow::LifecycleMessages;
use crate::domain::foundation::Timestamp;
use crate::domain::rendering::VariableRenderer;

/// Builds the context lifecycle templates are rendered against.
///
/// Starts from `context` (normally the conversation's own) and adds
/// `greeting`, `idle_hours`, `hours_remaining`, `message_count` and
/// `extension_hours` taken from `conversation`. Hours are whole numbers:
/// idle time rounds down, time remaining rounds up.
pub fn notice_context(
    conversation: &Conversation,
    mut context: Context,
    policy: &TimeoutPolicy,
    messages: &LifecycleMessages,
    renderer: &VariableRenderer,
    now: Timestamp,
) -> Context {
    let greeting = if context.get_str("client_name").is_some_and(|n| !n.trim().is_empty()) {
        renderer.render(&messages.greeting, &context)
    } else {
        renderer.render(&messages.anonymous_greeting, &context)
    };

    let idle = conversation.idle_hours(now).max(0.0);
    let extension = conversation.extension_hours();
    let remaining = (policy.effective_timeout(extension) - idle).max(0.0);

    context.insert("greeting", greeting);
    context.insert("idle_hours", idle.floor() as u64);
    context.insert("hours_remaining", remaining.ceil() as u64);
    context.insert("message_count", conversation.message_count());
    context.insert("extension_hours", extension);
    context
}
