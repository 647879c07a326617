// Answer composer
// Grounds a generative model on retrieved knowledge and scores the result


use std::sync::Arc;

use itertools::Itertools;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::database::sqlite::KnowledgeEntry;
use crate::generation::GenerativeModel;

/// Confidence reported when nothing was retrieved
pub const UNGROUNDED_CONFIDENCE: f32 = 0.75;
/// Upper bound for grounded confidence
pub const MAX_CONFIDENCE: f32 = 0.98;
pub const GENERAL_KNOWLEDGE_SOURCE: &str = "General Knowledge";
pub const ERROR_SOURCE: &str = "Error";

const APOLOGY_REPLY: &str = "I'm sorry, I wasn't able to answer that right now. Please try again in a moment.";
const APOLOGY_SPEECH: &str = "Sorry, I couldn't answer that right now. Please try again.";
const SPEECH_SENTENCES: usize = 2;

const SYSTEM_PROMPT: &str = "You are a patient, encouraging professor helping a student \
with their course. Explain clearly, use Markdown for structure and code, and keep answers focused \
on the question. Respond with a JSON object containing exactly two string fields: \"reply\", the \
full Markdown answer, and \"speak\", a short plain-text paraphrase of at most two sentences \
suitable for reading aloud.";

/// A composed answer for one chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub reply: String,
    pub speak: String,
    /// Retrieval-grounding indicator: how much knowledge-base material backed
    /// the answer. Not a calibrated estimate of the model's correctness.
    pub confidence: f32,
    pub source: String,
}

impl Answer {
    /// The fixed reply used when generation fails
    #[inline]
    pub fn apology() -> Self {
        Self {
            reply: APOLOGY_REPLY.to_string(),
            speak: APOLOGY_SPEECH.to_string(),
            confidence: 0.0,
            source: ERROR_SOURCE.to_string(),
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.source == ERROR_SOURCE
    }
}

pub struct AnswerComposer {
    model: Arc<dyn GenerativeModel>,
}

impl AnswerComposer {
    #[inline]
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Build the grounded prompt, make one model call and score the result.
    ///
    /// Never fails; a model error produces [`Answer::apology`].
    #[inline]
    pub async fn compose(
        &self,
        question: &str,
        retrieved: &[KnowledgeEntry],
        recent_context: &str,
    ) -> Answer {
        let user_prompt = build_user_prompt(question, retrieved, recent_context);
        debug!(
            "Composing answer with {} grounding entries ({} prompt bytes)",
            retrieved.len(),
            user_prompt.len()
        );

        let generated = match self.model.generate(SYSTEM_PROMPT, &user_prompt).await {
            Ok(generated) => generated,
            Err(e) => {
                error!("Answer generation failed: {}", e);
                return Answer::apology();
            }
        };

        let speak = if generated.speak.trim().is_empty() {
            speech_from_markdown(&generated.reply)
        } else {
            generated.speak.trim().to_string()
        };

        Answer {
            reply: generated.reply,
            speak,
            confidence: confidence_for(retrieved.len()),
            source: source_for(retrieved),
        }
    }
}

/// `min(0.98, 0.7 + 0.1 * n)` for grounded answers, 0.75 otherwise
#[inline]
pub fn confidence_for(retrieved: usize) -> f32 {
    if retrieved == 0 {
        return UNGROUNDED_CONFIDENCE;
    }
    let count = u16::try_from(retrieved).unwrap_or(u16::MAX);
    (0.1_f32.mul_add(f32::from(count), 0.7)).min(MAX_CONFIDENCE)
}

/// Label naming where the answer came from
#[inline]
pub fn source_for(retrieved: &[KnowledgeEntry]) -> String {
    retrieved.first().map_or_else(
        || GENERAL_KNOWLEDGE_SOURCE.to_string(),
        |top| format!("{} (Knowledge Base)", top.title),
    )
}

/// Retrieved entries in ranked order as Markdown sections
#[inline]
pub fn grounding_block(retrieved: &[KnowledgeEntry]) -> String {
    retrieved
        .iter()
        .map(|entry| format!("### {}\n{}", entry.title, entry.content.trim()))
        .join("\n\n")
}

fn build_user_prompt(question: &str, retrieved: &[KnowledgeEntry], recent_context: &str) -> String {
    let mut sections = Vec::with_capacity(3);

    if retrieved.is_empty() {
        sections.push(
            "No course material matched this question. Answer from your general knowledge of \
             the subject and say so if you are unsure."
                .to_string(),
        );
    } else {
        sections.push(format!(
            "Use the following course material as the primary basis of your answer:\n\n{}",
            grounding_block(retrieved)
        ));
    }

    let recent_context = recent_context.trim();
    if !recent_context.is_empty() {
        sections.push(format!("Recent conversation:\n{recent_context}"));
    }

    sections.push(format!("Student question: {}", question.trim()));
    sections.join("\n\n")
}

/// Plain text for speech synthesis: Markdown stripped, code blocks dropped,
/// first two sentences kept.
#[inline]
pub fn speech_from_markdown(markdown: &str) -> String {
    let mut text = String::new();
    let mut in_code_block = false;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(fragment) | Event::Code(fragment) if !in_code_block => {
                text.push_str(&fragment);
            }
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
                if !text.ends_with(' ') {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }

    let normalized = text.split_whitespace().join(" ");
    first_sentences(&normalized, SPEECH_SENTENCES)
}

fn first_sentences(text: &str, count: usize) -> String {
    let mut sentences = 0;
    let mut result = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        result.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|next| next.is_whitespace()) {
            sentences += 1;
            if sentences == count {
                break;
            }
        }
    }

    result.trim().to_string()
}
