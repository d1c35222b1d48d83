//! Per-session conversation log.
//!
//! A [`Conversation`] is created when a chat session starts and dropped
//! when it ends; it is never persisted. The log grows without bound. An
//! optional window limits how many trailing turns are sent to the model,
//! so request size stays bounded even though the log does not.

use crate::generation::{Message, Role};

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Message>,
    window: Option<usize>,
}

impl Conversation {
    /// A session that sends its full history on every plain-chat turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that sends only the last `window` turns to the model.
    pub fn with_window(window: Option<usize>) -> Self {
        Self {
            turns: Vec::new(),
            window: window.filter(|w| *w > 0),
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Message::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(Message::assistant(text));
    }

    /// Drop the last turn if it is an unanswered user turn.
    pub(crate) fn retract_user(&mut self) {
        if matches!(self.turns.last(), Some(m) if m.role == Role::User) {
            self.turns.pop();
        }
    }

    /// Every turn so far, oldest first.
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// The turns to send to the model: all of them, or the trailing window.
    ///
    /// A windowed context never starts with an assistant turn.
    pub fn context(&self) -> &[Message] {
        match self.window {
            Some(w) if self.turns.len() > w => {
                let tail = &self.turns[self.turns.len() - w..];
                let skip = tail
                    .iter()
                    .take_while(|m| m.role == Role::Assistant)
                    .count();
                &tail[skip..]
            }
            _ => &self.turns,
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty_and_grows_in_order() {
        let mut c = Conversation::new();
        assert!(c.is_empty());
        c.push_user("q1");
        c.push_assistant("a1");
        c.push_user("q2");
        let roles: Vec<Role> = c.turns().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(c.context().len(), 3);
    }

    #[test]
    fn test_window_limits_context_not_log() {
        let mut c = Conversation::with_window(Some(2));
        for i in 0..5 {
            c.push_user(format!("q{}", i));
            c.push_assistant(format!("a{}", i));
        }
        assert_eq!(c.len(), 10);
        let ctx = c.context();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx[0].content, "q4");
        assert_eq!(ctx[1].content, "a4");
    }

    #[test]
    fn test_window_skips_leading_assistant_turn() {
        let mut c = Conversation::with_window(Some(2));
        c.push_user("q0");
        c.push_assistant("a0");
        c.push_user("q1");
        let ctx = c.context();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0].content, "q1");
    }

    #[test]
    fn test_zero_window_means_unbounded() {
        let mut c = Conversation::with_window(Some(0));
        c.push_user("q");
        c.push_assistant("a");
        assert_eq!(c.context().len(), 2);
    }

    #[test]
    fn test_retract_only_removes_user_turn() {
        let mut c = Conversation::new();
        c.push_user("q");
        c.push_assistant("a");
        c.retract_user();
        assert_eq!(c.len(), 2);
        c.push_user("q2");
        c.retract_user();
        assert_eq!(c.len(), 2);
    }
}
