//! System messages produced by the lifecycle rather than by a turn.

use super::StateMachineEngine;
use crate::domain::conversation::{CloseReason, Context, Conversation};
use crate::domain::foundation::Timestamp;
use crate::domain::lifecycle::{notice_context, TimeoutPolicy};

/// A rendered farewell plus the context it was rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Farewell {
    pub text: String,
    /// Conversation context after the flow's close action, if any.
    pub context: Context,
    pub side_effects: Vec<String>,
}

impl StateMachineEngine {
    fn notice_vars(
        &self,
        conversation: &Conversation,
        base: Context,
        policy: &TimeoutPolicy,
        now: Timestamp,
    ) -> Context {
        notice_context(
            conversation,
            base,
            policy,
            &self.flow().lifecycle().messages,
            self.renderer(),
            now,
        )
    }

    /// The inactivity warning for `conversation`.
    pub fn warning_notice(
        &self,
        conversation: &Conversation,
        policy: &TimeoutPolicy,
        now: Timestamp,
    ) -> String {
        let vars = self.notice_vars(conversation, conversation.context().clone(), policy, now);
        self.render(&self.flow().lifecycle().messages.warning, &vars)
    }

    /// Announces an extension of `hours` for `reason`.
    ///
    /// `extension_hours` is the amount just granted; the running total is in
    /// `total_extension_hours`.
    pub fn extension_notice(
        &self,
        conversation: &Conversation,
        policy: &TimeoutPolicy,
        hours: u32,
        reason: &str,
        now: Timestamp,
    ) -> String {
        let mut vars = self.notice_vars(conversation, conversation.context().clone(), policy, now);
        vars.insert("total_extension_hours", conversation.extension_hours());
        vars.insert("extension_hours", hours);
        vars.insert("extension_reason", reason);
        self.render(&self.flow().lifecycle().messages.extension, &vars)
    }

    /// Runs the flow's close action, then renders the farewell for `reason`.
    pub async fn farewell(
        &self,
        conversation: &Conversation,
        reason: CloseReason,
        policy: &TimeoutPolicy,
        now: Timestamp,
    ) -> Farewell {
        let mut context = conversation.context().clone();
        let mut side_effects = Vec::new();

        if let Some(action) = &self.flow().lifecycle().close_action {
            let outcome = self
                .run_action(action, &context, conversation.id(), reason.as_str())
                .await;
            side_effects.push(outcome.summary());
            context = outcome.context;
        }

        let vars = self.notice_vars(conversation, context.clone(), policy, now);
        let text = self.render(self.flow().lifecycle().messages.farewell(reason), &vars);

        Farewell {
            text,
            context,
            side_effects,
        }
    }
}
