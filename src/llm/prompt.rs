//! Prompt builders for the drafting stages.
//!
//! Each builder returns a ready `ChatRequest`; the stages never assemble
//! prompt text themselves.

use super::types::{ChatMessage, ChatRequest};
use crate::rag::RetrievedDocument;

const STYLE_ANALYSIS: &str = "\
You are an AI assistant that helps me to write emails.
Based on my past emails provided as context, analyze the following:
 - writing style
 - message tone
 - sentence structure
 - length of the text
 - formality, and commonly used phrases
Considering the above analysis, generate an email reply to the user input. \
The response should feel as if I personally wrote it. \
Only show the email body, not any other details.";

const EMPTY_CONTEXT_NOTE: &str = "\
NOTE: No past emails are available. Ignore the context and write a professional email.";

const GROUNDED_REPLY: &str = "\
You are an AI assistant that drafts email replies.
Use the knowledge base below (question and answer pairs) as the only source of facts. \
Take the conversation so far into account and do not repeat what was already said. \
If the knowledge base does not cover the request, write a short professional reply \
without inventing facts. Only show the email body, not any other details.";

const REFINE_STYLE: &str = "\
You are an AI assistant that polishes email drafts.
Adjust only the tone, style and grammar of the draft so that it reads like my past emails. \
Do not change its meaning or its structure. \
Remove any subject line and return only the email body.";

/// Separator between retrieved documents in a context blob.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub fn join_documents<'a, I>(contents: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    contents.into_iter().collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Style-mimicking reply grounded on past emails.
pub fn style_reply(context: &str, question: &str) -> ChatRequest {
    let mut system = STYLE_ANALYSIS.to_string();
    if context.trim().is_empty() {
        system.push('\n');
        system.push_str(EMPTY_CONTEXT_NOTE);
    }

    ChatRequest::new(vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("Context: {}\nUser Input: {}", context, question)),
    ])
}

/// Fact-grounded raw reply from the Q&A dataset and the conversation history.
///
/// Turns are numbered by their position in the original conversation.
pub fn grounded_reply(dataset: &str, history: &[RetrievedDocument], question: &str) -> ChatRequest {
    let history_block = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .map(|turn| format!("{}. {}", turn.metadata.sequence_index + 1, turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let dataset_block = if dataset.trim().is_empty() { "(empty)" } else { dataset };

    ChatRequest::new(vec![
        ChatMessage::system(GROUNDED_REPLY),
        ChatMessage::user(format!(
            "Knowledge base:\n{}\n\nConversation so far:\n{}\n\nUser Input: {}",
            dataset_block, history_block, question
        )),
    ])
}

/// Tone/style/grammar pass over an existing draft.
pub fn refine_style(reference_emails: &str, draft: &str) -> ChatRequest {
    let references = if reference_emails.trim().is_empty() {
        "(no past emails available, keep a professional tone)"
    } else {
        reference_emails
    };

    ChatRequest::new(vec![
        ChatMessage::system(REFINE_STYLE),
        ChatMessage::user(format!("Past emails:\n{}\n\nDraft:\n{}", references, draft)),
    ])
}

/// Drop a leading `Subject:` line the model may still emit.
pub fn strip_subject_line(text: &str) -> String {
    let trimmed = text.trim_start();
    let Some(first_line) = trimmed.lines().next() else {
        return String::new();
    };
    if !first_line.trim_start().to_lowercase().starts_with("subject:") {
        return text.trim().to_string();
    }
    trimmed[first_line.len()..].trim().to_string()
}
