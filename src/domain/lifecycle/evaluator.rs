//! Decides what the lifecycle sweep should do with one conversation.

use super::{TierPolicies, TimeoutPolicy};
use crate::domain::conversation::{CloseReason, Conversation};
use crate::domain::flow::FlowDefinition;
use crate::domain::foundation::Timestamp;

/// The single lifecycle step due for a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleDecision {
    /// Nothing is due.
    Keep,
    /// Send the one inactivity warning.
    Warn { hours_remaining: f64 },
    Close(CloseReason),
    /// Move the conversation off a node it has idled on for too long.
    NodeTimeout { target: String },
}

/// Pure time and size rules over a conversation snapshot.
#[derive(Debug, Clone, Default)]
pub struct LifecycleEvaluator {
    policies: TierPolicies,
}

impl LifecycleEvaluator {
    pub fn new(policies: TierPolicies) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &TierPolicies {
        &self.policies
    }

    pub fn policy_for(&self, conversation: &Conversation) -> &TimeoutPolicy {
        self.policies.for_tier(conversation.tier())
    }

    /// Why the conversation must close now, if it must.
    ///
    /// Reasons are checked in precedence order: a completed negotiation
    /// beats the message limit, which beats inactivity expiry.
    pub fn close_reason(
        &self,
        conversation: &Conversation,
        flow: &FlowDefinition,
        now: Timestamp,
    ) -> Option<CloseReason> {
        if !conversation.is_active() {
            return None;
        }
        let policy = self.policy_for(conversation);

        if flow.is_completed_state(conversation.current_state()) {
            return Some(CloseReason::NegotiationCompleted);
        }
        if policy.message_limit_reached(conversation.message_count()) {
            return Some(CloseReason::MessageLimit);
        }
        if policy.auto_close_enabled
            && conversation.idle_hours(now) >= policy.effective_timeout(conversation.extension_hours())
        {
            return Some(CloseReason::Expired);
        }
        None
    }

    /// The next lifecycle step for the sweep.
    ///
    /// Closing wins over a node timeout, which wins over the warning.
    pub fn evaluate(
        &self,
        conversation: &Conversation,
        flow: &FlowDefinition,
        now: Timestamp,
    ) -> LifecycleDecision {
        if !conversation.is_active() {
            return LifecycleDecision::Keep;
        }
        if let Some(reason) = self.close_reason(conversation, flow, now) {
            return LifecycleDecision::Close(reason);
        }

        let node_timeout = flow
            .node(conversation.current_state())
            .and_then(|node| node.timeout.as_ref());
        if let Some(timeout) = node_timeout {
            let on_node = now.duration_since(&conversation.state_entered_at());
            if on_node.num_seconds() >= 0 && on_node.num_seconds() as u64 >= timeout.after.as_secs() {
                return LifecycleDecision::NodeTimeout {
                    target: timeout.target.clone(),
                };
            }
        }

        let policy = self.policy_for(conversation);
        let idle = conversation.idle_hours(now);
        let extension = conversation.extension_hours();
        if policy.auto_close_enabled
            && conversation.warning_sent_at().is_none()
            && idle >= policy.effective_warning(extension)
        {
            let hours_remaining = (policy.effective_timeout(extension) - idle).max(0.0);
            return LifecycleDecision::Warn { hours_remaining };
        }

        LifecycleDecision::Keep
    }
}
