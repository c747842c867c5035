//! Conversation state for one chat session.

use super::events::{AgentEvent, Message};

#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
}

/// What the caller should do after an event has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl ChatSession {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_user(&mut self, prompt: &str) {
        self.messages.push(Message::user(prompt));
    }

    /// Removes the most recent user message.
    pub fn discard_last_question(&mut self) {
        if let Some(pos) = self.messages.iter().rposition(|m| m.role == "user") {
            self.messages.remove(pos);
        }
    }

    /// Records the final response. An error drops the last user message so
    /// the question can be asked again.
    pub fn apply(&mut self, event: &AgentEvent) -> Flow {
        match event {
            AgentEvent::Response(message) => {
                self.messages.push(message.clone());
                Flow::Continue
            }
            AgentEvent::Error(_) => {
                self.discard_last_question();
                Flow::Stop
            }
            _ => Flow::Continue,
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::agent::events::ErrorEventData;
    use serde_json::Value;

    #[test]
    fn should_append_response() {
        let mut session = ChatSession::default();
        session.push_user("How many?");

        let flow = session.apply(&AgentEvent::Response(Message::assistant("Three.")));

        assert_eq!(flow, Flow::Continue);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].text(), "Three.");
    }

    #[test]
    fn should_drop_last_question_on_error() {
        let mut session = ChatSession::default();
        session.push_user("first");
        session.apply(&AgentEvent::Response(Message::assistant("ok")));
        session.push_user("second");

        let flow = session.apply(&AgentEvent::Error(ErrorEventData {
            code: Value::Null,
            message: "boom".to_string(),
        }));

        assert_eq!(flow, Flow::Stop);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].text(), "first");
    }
}
