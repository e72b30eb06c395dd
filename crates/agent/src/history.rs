//! History window: renders the tail of a conversation as a plain-text
//! transcript for the prompt.

use asika_core::message::{Message, Role};

/// Keeps the last `max_turns` messages of a conversation.
#[derive(Debug, Clone, Copy)]
pub struct HistoryWindow {
    max_turns: usize,
}

impl HistoryWindow {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Render the last `max_turns` messages as `"<Label>: <content>"` lines.
    ///
    /// Messages whose content is blank are skipped after the window is taken.
    pub fn render(&self, messages: &[Message]) -> String {
        let start = messages.len().saturating_sub(self.max_turns);
        messages[start..]
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(|m| format!("{}: {}", role_label(&m.role), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The transcript label for a role.
pub fn role_label(role: &Role) -> String {
    match role {
        Role::System => "System".into(),
        Role::User => "User".into(),
        Role::Assistant => "Assistant".into(),
        Role::Other(name) => capitalize(name),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conversation_renders_empty() {
        assert_eq!(HistoryWindow::new(12).render(&[]), "");
    }

    #[test]
    fn renders_labels_in_order() {
        let messages = vec![
            Message::system("Be brief"),
            Message::user("Hi"),
            Message::assistant("Hello! How can I help?"),
        ];
        assert_eq!(
            HistoryWindow::new(12).render(&messages),
            "System: Be brief\nUser: Hi\nAssistant: Hello! How can I help?"
        );
    }

    #[test]
    fn keeps_only_last_k_messages() {
        let messages: Vec<_> = (1..=5).map(|i| Message::user(format!("m{i}"))).collect();
        assert_eq!(HistoryWindow::new(2).render(&messages), "User: m4\nUser: m5");
    }

    #[test]
    fn blank_messages_are_skipped() {
        let messages = vec![
            Message::user("first"),
            Message::assistant("   \n"),
            Message::user("second"),
        ];
        assert_eq!(
            HistoryWindow::new(12).render(&messages),
            "User: first\nUser: second"
        );
    }

    #[test]
    fn unknown_role_is_capitalized() {
        let messages = vec![Message::new(Role::Other("tool".into()), "42")];
        assert_eq!(HistoryWindow::new(12).render(&messages), "Tool: 42");
    }

    #[test]
    fn zero_window_renders_nothing() {
        assert_eq!(HistoryWindow::new(0).render(&[Message::user("x")]), "");
    }
}
