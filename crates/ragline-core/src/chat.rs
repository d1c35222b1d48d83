//! Plain chat: answer from the model alone, with conversation history.

use anyhow::Result;

use crate::conversation::Conversation;
use crate::generation::Generator;
use crate::rag::{Answer, AnswerOrigin};

/// Append `question`, send the conversation context to the model, and
/// append its reply.
///
/// Request size grows with the session unless the conversation has a
/// window. If the model call fails the question is taken back out of the
/// log so the next turn does not see an unanswered question.
pub async fn chat(
    generator: &dyn Generator,
    conversation: &mut Conversation,
    question: &str,
) -> Result<Answer> {
    conversation.push_user(question);

    let text = match generator.generate(conversation.context()).await {
        Ok(text) => text,
        Err(e) => {
            conversation.retract_user();
            return Err(e);
        }
    };
    conversation.push_assistant(text.clone());

    Ok(Answer {
        origin: AnswerOrigin::Chat,
        text,
        question: question.to_string(),
        rewritten_question: None,
        sources: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::generation::{Message, Role};

    /// Records how many messages it was sent and replies with that count.
    struct Counting {
        sizes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Generator for Counting {
        fn model_name(&self) -> &str {
            "counting"
        }
        async fn generate(&self, messages: &[Message]) -> Result<String> {
            self.sizes.lock().unwrap().push(messages.len());
            Ok(format!("seen {}", messages.len()))
        }
    }

    struct Down;

    #[async_trait]
    impl Generator for Down {
        fn model_name(&self) -> &str {
            "down"
        }
        async fn generate(&self, _messages: &[Message]) -> Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_full_history_sent_each_turn() {
        let model = Counting {
            sizes: Mutex::new(Vec::new()),
        };
        let mut convo = Conversation::new();
        chat(&model, &mut convo, "one").await.unwrap();
        chat(&model, &mut convo, "two").await.unwrap();
        let last = chat(&model, &mut convo, "three").await.unwrap();

        assert_eq!(*model.sizes.lock().unwrap(), vec![1, 3, 5]);
        assert_eq!(last.text, "seen 5");
        assert_eq!(convo.len(), 6);
        assert_eq!(convo.turns()[5].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_window_caps_request_size() {
        let model = Counting {
            sizes: Mutex::new(Vec::new()),
        };
        let mut convo = Conversation::with_window(Some(3));
        for q in ["a", "b", "c", "d"] {
            chat(&model, &mut convo, q).await.unwrap();
        }
        assert_eq!(*model.sizes.lock().unwrap(), vec![1, 3, 3, 3]);
        assert_eq!(convo.len(), 8);
    }

    #[tokio::test]
    async fn test_chat_answer_is_tagged_differently_from_rag() {
        let model = Counting {
            sizes: Mutex::new(Vec::new()),
        };
        let answer = chat(&model, &mut Conversation::new(), "hello").await.unwrap();
        assert_eq!(answer.origin, AnswerOrigin::Chat);
        assert_eq!(answer.to_string(), "Answer (LLM only): seen 1");
        assert_ne!(AnswerOrigin::Chat.tag(), AnswerOrigin::Rag.tag());
    }

    #[tokio::test]
    async fn test_failure_rolls_back_question() {
        let mut convo = Conversation::new();
        let err = chat(&Down, &mut convo, "hello").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(convo.is_empty());
    }
}
