//! Chat-scoped rules and the engine that evaluates them.
//!
//! Rules are attached to a chat when it is created and never change
//! afterwards. A [`RuleSet`] keeps them in priority order so that the first
//! failing rule is always the same one for the same inputs.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{Chat, DeliveryStatus, Message, Participant};
use crate::types::DeleteMode;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreateRule {
    /// New members must wait this long before writing.
    CanNotWriteAfterJoining(Duration),
    /// Minimum gap between two messages from the same sender.
    Debounce(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditRule {
    EditWindow(Duration),
    SenderIdCanNotChange,
    RecipientCanNotChange,
    CreationTimeCanNotChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteRule {
    DeleteWindow(Duration),
    SenderCanDeleteOwn,
    AdminCanDeleteAny,
    ModeratorCanDeleteAny,
    NoDeleteAfterDelivered,
    DeleteForEveryoneWindow(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatDeleteRule {
    OnlyAdminCanDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Create(CreateRule),
    Edit(EditRule),
    Delete(DeleteRule),
    ChatDelete(ChatDeleteRule),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Create,
    Edit,
    Delete,
    ChatDelete,
}

impl Rule {
    pub fn category(&self) -> RuleCategory {
        match self {
            Self::Create(_) => RuleCategory::Create,
            Self::Edit(_) => RuleCategory::Edit,
            Self::Delete(_) => RuleCategory::Delete,
            Self::ChatDelete(_) => RuleCategory::ChatDelete,
        }
    }
}

impl From<CreateRule> for Rule {
    fn from(rule: CreateRule) -> Self {
        Self::Create(rule)
    }
}

impl From<EditRule> for Rule {
    fn from(rule: EditRule) -> Self {
        Self::Edit(rule)
    }
}

impl From<DeleteRule> for Rule {
    fn from(rule: DeleteRule) -> Self {
        Self::Delete(rule)
    }
}

impl From<ChatDeleteRule> for Rule {
    fn from(rule: ChatDeleteRule) -> Self {
        Self::ChatDelete(rule)
    }
}

/// Ordered, duplicate-free list of rules. Earlier rules win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    /// Build from any sequence; later duplicates are dropped.
    pub fn new<I, R>(rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        let mut out: Vec<Rule> = Vec::new();
        for rule in rules {
            let rule = rule.into();
            if !out.contains(&rule) {
                out.push(rule);
            }
        }
        Self(out)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, rule: impl Into<Rule>) -> bool {
        self.0.contains(&rule.into())
    }

    fn create(&self) -> impl Iterator<Item = CreateRule> + '_ {
        self.0.iter().filter_map(|r| match r {
            Rule::Create(r) => Some(*r),
            _ => None,
        })
    }

    fn edit(&self) -> impl Iterator<Item = EditRule> + '_ {
        self.0.iter().filter_map(|r| match r {
            Rule::Edit(r) => Some(*r),
            _ => None,
        })
    }

    fn delete(&self) -> impl Iterator<Item = DeleteRule> + '_ {
        self.0.iter().filter_map(|r| match r {
            Rule::Delete(r) => Some(*r),
            _ => None,
        })
    }

    fn chat_delete(&self) -> impl Iterator<Item = ChatDeleteRule> + '_ {
        self.0.iter().filter_map(|r| match r {
            Rule::ChatDelete(r) => Some(*r),
            _ => None,
        })
    }
}

impl<R: Into<Rule>> FromIterator<R> for RuleSet {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// The action being gated, with the state the rules need to see.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    Create {
        chat: &'a Chat,
        actor: &'a Participant,
    },
    Edit {
        original: &'a Message,
        edited: &'a Message,
    },
    Delete {
        message: &'a Message,
        actor: &'a Participant,
        mode: DeleteMode,
    },
    DeleteChat {
        actor: &'a Participant,
    },
}

impl Action<'_> {
    pub fn category(&self) -> RuleCategory {
        match self {
            Self::Create { .. } => RuleCategory::Create,
            Self::Edit { .. } => RuleCategory::Edit,
            Self::Delete { .. } => RuleCategory::Delete,
            Self::DeleteChat { .. } => RuleCategory::ChatDelete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("new participants must wait {0} before writing")]
    WaitAfterJoining(Duration),
    #[error("must wait {0} before sending another message")]
    WaitDebounce(Duration),
    #[error("edit window of {0} has expired")]
    EditWindowExpired(Duration),
    #[error("sender id can not change")]
    SenderIdChanged,
    #[error("recipient can not change")]
    RecipientChanged,
    #[error("creation time can not change")]
    CreationTimeChanged,
    #[error("delete window of {0} has expired")]
    DeleteWindowExpired(Duration),
    #[error("delete-for-everyone window of {0} has expired")]
    DeleteForEveryoneWindowExpired(Duration),
    #[error("message was already delivered")]
    MessageAlreadyDelivered,
    #[error("not authorized")]
    NotAuthorized,
}

/// Stateless evaluator. The caller supplies the clock reading.
pub struct RuleEngine;

impl RuleEngine {
    /// Check every rule of the action's category, in order, and return the
    /// first failure.
    pub fn evaluate(
        rules: &RuleSet,
        action: &Action<'_>,
        now: DateTime<Utc>,
    ) -> Result<(), RuleViolation> {
        match *action {
            Action::Create { chat, actor } => {
                rules.create().try_for_each(|r| check_create(r, chat, actor, now))
            }
            Action::Edit { original, edited } => rules
                .edit()
                .try_for_each(|r| check_edit(r, original, edited, now)),
            Action::Delete {
                message,
                actor,
                mode,
            } => {
                let privileged = actor.is_privileged();
                rules
                    .delete()
                    .try_for_each(|r| check_delete(r, message, actor, privileged, mode, now))
            }
            Action::DeleteChat { actor } => rules.chat_delete().try_for_each(|r| match r {
                ChatDeleteRule::OnlyAdminCanDelete if !actor.is_admin => {
                    Err(RuleViolation::NotAuthorized)
                }
                ChatDeleteRule::OnlyAdminCanDelete => Ok(()),
            }),
        }
    }
}

fn check_create(
    rule: CreateRule,
    chat: &Chat,
    actor: &Participant,
    now: DateTime<Utc>,
) -> Result<(), RuleViolation> {
    match rule {
        CreateRule::CanNotWriteAfterJoining(d) => {
            if let Some(wait) = remaining(d, now - actor.joined_at) {
                return Err(RuleViolation::WaitAfterJoining(wait));
            }
        }
        CreateRule::Debounce(d) => {
            if let Some(last) = chat.last_message_by(actor.id) {
                if let Some(wait) = remaining(d, now - last.created_at) {
                    return Err(RuleViolation::WaitDebounce(wait));
                }
            }
        }
    }
    Ok(())
}

/// Time left in a window of length `window` after `elapsed` has passed.
///
/// A reference point in the future counts as no time elapsed, so the wait
/// never exceeds the window itself.
fn remaining(window: Duration, elapsed: Duration) -> Option<Duration> {
    let elapsed = elapsed.max(Duration::zero());
    if elapsed >= window {
        return None;
    }
    Some(window.checked_sub(&elapsed).unwrap_or(window))
}

fn check_edit(
    rule: EditRule,
    original: &Message,
    edited: &Message,
    now: DateTime<Utc>,
) -> Result<(), RuleViolation> {
    match rule {
        EditRule::EditWindow(d) if now - original.created_at > d => {
            Err(RuleViolation::EditWindowExpired(d))
        }
        EditRule::SenderIdCanNotChange if original.sender.id != edited.sender.id => {
            Err(RuleViolation::SenderIdChanged)
        }
        EditRule::RecipientCanNotChange if original.recipient != edited.recipient => {
            Err(RuleViolation::RecipientChanged)
        }
        EditRule::CreationTimeCanNotChange if original.created_at != edited.created_at => {
            Err(RuleViolation::CreationTimeChanged)
        }
        _ => Ok(()),
    }
}

fn check_delete(
    rule: DeleteRule,
    message: &Message,
    actor: &Participant,
    privileged: bool,
    mode: DeleteMode,
    now: DateTime<Utc>,
) -> Result<(), RuleViolation> {
    let age = now - message.created_at;
    match rule {
        DeleteRule::DeleteWindow(d) if age > d => Err(RuleViolation::DeleteWindowExpired(d)),
        DeleteRule::NoDeleteAfterDelivered
            if message.delivery_status == Some(DeliveryStatus::Delivered) =>
        {
            Err(RuleViolation::MessageAlreadyDelivered)
        }
        DeleteRule::DeleteForEveryoneWindow(d) if mode == DeleteMode::ForEveryone && age > d => {
            Err(RuleViolation::DeleteForEveryoneWindowExpired(d))
        }
        // ownership rules are satisfied for admins and moderators
        DeleteRule::SenderCanDeleteOwn if !privileged && message.sender.id != actor.id => {
            Err(RuleViolation::NotAuthorized)
        }
        _ => Ok(()),
    }
}
