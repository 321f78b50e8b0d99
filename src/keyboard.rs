//! Keyboard lifecycle: removing a stale reply keyboard across transitions.
//!
//! The transport cannot remove a reply keyboard and attach inline buttons in
//! the same call. The engine marks a pending cleanup on the session when a
//! transition leaves a reply-keyboard state for one that renders inline
//! buttons or nothing; the next send for that chat consumes the marker and
//! is decorated here, so state authors never hand-roll the workaround.

use crate::transport::{Affordance, MessageRef, OutboundMessage, Transport};
use crate::types::{ChatId, KeyboardType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupAction {
    None,
    MarkPending,
}

/// Decides whether a transition leaves a stale reply keyboard behind.
///
/// Only `reply → inline` and `reply → none` need cleanup. Nothing persistent
/// exists to remove after inline/none states, and a new reply keyboard
/// replaces the old one by itself.
pub fn decide(from: KeyboardType, to: KeyboardType) -> CleanupAction {
    match (from, to) {
        (KeyboardType::Reply, KeyboardType::Inline | KeyboardType::None) => CleanupAction::MarkPending,
        _ => CleanupAction::None,
    }
}

/// How one outbound message reaches the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendPlan {
    /// No cleanup involved, send as is.
    Plain(OutboundMessage),
    /// Single send carrying the removal instruction.
    AttachRemoval { text: String },
    /// Send with the removal instruction and no markup, then edit the same
    /// message to attach the inline buttons.
    RemoveThenEdit { text: String, inline: Affordance },
}

/// Plans one send given the marker taken from the session with
/// `Session::take_pending_cleanup`.
///
/// The marker is taken before delivery, so a failed send can never leave a
/// chat stuck with cleanup pending.
pub fn plan(pending: bool, message: OutboundMessage) -> SendPlan {
    if !pending {
        return SendPlan::Plain(message);
    }
    match message.affordance {
        None => SendPlan::AttachRemoval { text: message.text },
        Some(inline @ Affordance::Inline(_)) => SendPlan::RemoveThenEdit {
            text: message.text,
            inline,
        },
        // A new reply keyboard replaces the old one; an explicit removal
        // already does the job.
        Some(Affordance::Reply(_)) | Some(Affordance::RemoveReply) => SendPlan::Plain(message),
    }
}

/// Executes a plan against the transport.
///
/// If the follow-up edit fails the message stays without inline buttons but
/// the reply keyboard is gone; the send itself still counts as delivered.
/// There is no retry through a text edit: `Transport` exposes only `send`
/// and `edit_affordance`, so a transport that needs that fallback has to
/// apply it inside its own `edit_affordance`.
pub async fn deliver(
    transport: &dyn Transport,
    chat_id:   ChatId,
    plan:      SendPlan,
) -> Result<MessageRef, String> {
    match plan {
        SendPlan::Plain(message) => {
            transport.send(chat_id, &message.text, message.affordance.as_ref()).await
        }
        SendPlan::AttachRemoval { text } => {
            transport.send(chat_id, &text, Some(&Affordance::RemoveReply)).await
        }
        SendPlan::RemoveThenEdit { text, inline } => {
            let sent = transport.send(chat_id, &text, Some(&Affordance::RemoveReply)).await?;
            match transport.edit_affordance(&sent, &inline).await {
                Ok(()) => tracing::debug!(chat_id, message_id = sent.message_id, "keyboard send+edit ok"),
                Err(e) => tracing::warn!(
                    chat_id,
                    message_id = sent.message_id,
                    error = %e,
                    "inline keyboard edit failed after reply keyboard removal"
                ),
            }
            Ok(sent)
        }
    }
}
