//! The `ask` and `chat` commands.
//!
//! `ask` answers one question; `chat` runs a read-eval-print loop over
//! stdin. Both use retrieval-augmented answering unless `--no-rag` is
//! given, in which case the model answers from the conversation alone.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use ragline_core::chat::chat;
use ragline_core::conversation::Conversation;
use ragline_core::generation::Generator;
use ragline_core::rag::{Answer, AnswerOrigin, RagEngine};
use ragline_core::rewrite::QueryRewriter;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::llm::create_generator;
use crate::sqlite_store::SqliteStore;

/// Words that end a chat session, compared case-insensitively.
pub const EXIT_COMMANDS: &[&str] = &["/bye", "bye", "exit", "quit"];

pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim().to_lowercase();
    EXIT_COMMANDS.contains(&line.as_str())
}

/// How a session answers questions.
pub enum Answerer {
    Rag(RagEngine),
    Chat(Arc<dyn Generator>),
}

impl Answerer {
    /// Build the answerer for `config`. The store is opened only for RAG.
    pub async fn from_config(config: &Config, use_rag: bool) -> Result<Self> {
        let generator = create_generator(config)?;
        if !use_rag {
            return Ok(Answerer::Chat(generator));
        }

        let embedder = create_embedder(config)?;
        let store = SqliteStore::open(&config.store.persist_dir, embedder).await?;
        let rewriter = QueryRewriter::new(generator.clone())
            .fallback_on_empty(config.rag.fallback_on_empty_rewrite);
        let engine = RagEngine::new(Arc::new(store), generator)
            .with_top_k(config.retrieval.top_k)
            .with_rewriter(rewriter);
        Ok(Answerer::Rag(engine))
    }

    pub async fn answer(&self, conversation: &mut Conversation, question: &str) -> Result<Answer> {
        match self {
            Answerer::Rag(engine) => engine.answer(conversation, question).await,
            Answerer::Chat(generator) => chat(generator.as_ref(), conversation, question).await,
        }
    }
}

/// Render an answer the way the CLI prints it.
pub fn format_answer(answer: &Answer) -> String {
    let mut out = String::new();
    if let Some(rewritten) = &answer.rewritten_question {
        out.push_str(&format!("Original question: {}\n", answer.question));
        out.push_str(&format!("Improved question: {}\n", rewritten));
    }
    let icon = match answer.origin {
        AnswerOrigin::Rag => "🔎",
        AnswerOrigin::Chat => "💬",
    };
    out.push_str(&format!("{} {}", icon, answer));

    if !answer.sources.is_empty() {
        let mut labels: Vec<&str> = Vec::new();
        for hit in &answer.sources {
            if !labels.contains(&hit.metadata.source.as_str()) {
                labels.push(&hit.metadata.source);
            }
        }
        out.push_str(&format!("\nSources: {}", labels.join(", ")));
    }
    out
}

/// The `ask` command.
pub async fn run_ask(config: &Config, question: &str, use_rag: bool) -> Result<()> {
    let answerer = Answerer::from_config(config, use_rag).await?;
    let mut conversation = Conversation::with_window(config.conversation.history_window);
    let answer = answerer.answer(&mut conversation, question).await?;
    println!("{}", format_answer(&answer));
    Ok(())
}

/// The `chat` command: a REPL on stdin.
pub async fn run_chat(config: &Config, use_rag: bool) -> Result<()> {
    let answerer = Answerer::from_config(config, use_rag).await?;
    let mode = if use_rag { "RAG" } else { "LLM only" };
    println!("ragline chat ({}). Type /bye to exit.", mode);

    let stdin = BufReader::new(tokio::io::stdin());
    let turns = chat_loop(&answerer, config.conversation.history_window, stdin).await?;
    println!("Goodbye ({} turn(s)).", turns);
    Ok(())
}

/// Read questions line by line until an exit word or EOF. A failed turn is
/// reported and the session continues. Returns the number of answered turns.
pub async fn chat_loop<R>(answerer: &Answerer, window: Option<usize>, input: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut conversation = Conversation::with_window(window);
    let mut lines = input.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            break;
        }

        match answerer.answer(&mut conversation, question).await {
            Ok(answer) => {
                println!("{}\n", format_answer(&answer));
                answered += 1;
            }
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    Ok(answered)
}
