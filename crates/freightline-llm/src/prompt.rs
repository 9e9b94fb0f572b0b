//! Prompt composition (§4.3 "Prompt composition").

/// Static system prompt. Content is a summary of the extraction task; the
/// closed-schema contract itself is enforced by the forced tool call, not
/// by prose in this prompt.
pub const SYSTEM_PROMPT: &str = "You are a freight-forwarding operations analyst. \
Read the email below and extract every shipment fact it contains using the \
analyze_freight_communication tool. Only report what the message actually \
states; leave a field null rather than guessing. Dates must be expressed as \
YYYY-MM-DD. Container numbers must match the ISO 6346 shape \
[A-Z]{4}[0-9]{7}. Summaries must be 150 characters or fewer.";

/// Body truncation length (§4.3).
pub const BODY_MAX_CHARS: usize = 4_000;

/// Per-attachment truncation length (§4.3).
pub const ATTACHMENT_MAX_CHARS: usize = 8_000;

/// Maximum number of prior in-thread chronicles summarized into the
/// prompt (§4.3, §4.7 step 4).
pub const THREAD_SUMMARY_MAX_CHRONICLES: usize = 10;

/// One line of thread context: just enough for the model to avoid
/// re-deriving facts already established earlier in the thread.
#[derive(Debug, Clone)]
pub struct ThreadChronicleSummary {
    pub document_type: String,
    pub summary: String,
    pub from_party: String,
    pub key_identifiers: Vec<String>,
}

/// Everything the composer needs to build one prompt.
#[derive(Debug, Clone)]
pub struct PromptInput<'a> {
    pub subject: &'a str,
    pub body: &'a str,
    pub attachment_texts: &'a [String],
    pub thread_position: u32,
    pub thread_context: &'a [ThreadChronicleSummary],
    pub aux_context_text: Option<&'a str>,
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Builds the user-turn prompt text (§4.3). Subject is included verbatim
/// only for the first message in a thread; replies get a thread summary
/// instead, since a forwarded subject line is stale and not to be
/// trusted (§4.7 step 5 "emit a note that the subject is untrusted").
#[must_use]
pub fn compose(input: &PromptInput<'_>) -> String {
    let mut sections = Vec::new();

    if input.thread_position <= 1 {
        sections.push(format!("Subject: {}", input.subject));
    } else {
        sections.push(
            "Subject omitted: this is a reply/forward and the subject line is unreliable."
                .to_string(),
        );
        if !input.thread_context.is_empty() {
            let lines: Vec<String> = input
                .thread_context
                .iter()
                .take(THREAD_SUMMARY_MAX_CHRONICLES)
                .map(|c| {
                    let ids = if c.key_identifiers.is_empty() {
                        "none".to_string()
                    } else {
                        c.key_identifiers.join(", ")
                    };
                    format!(
                        "- [{}] from {}: {} (identifiers: {})",
                        c.document_type, c.from_party, c.summary, ids
                    )
                })
                .collect();
            sections.push(format!("Prior messages in this thread:\n{}", lines.join("\n")));
        }
    }

    sections.push(format!("Body:\n{}", truncate(input.body, BODY_MAX_CHARS)));

    if !input.attachment_texts.is_empty() {
        let attachments: Vec<String> = input
            .attachment_texts
            .iter()
            .enumerate()
            .map(|(i, text)| format!("Attachment {}:\n{}", i + 1, truncate(text, ATTACHMENT_MAX_CHARS)))
            .collect();
        sections.push(attachments.join("\n\n"));
    }

    if let Some(aux) = input.aux_context_text {
        if !aux.is_empty() {
            sections.push(format!("Additional context:\n{aux}"));
        }
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_includes_subject() {
        let input = PromptInput {
            subject: "Booking Confirmed 12345",
            body: "see attached",
            attachment_texts: &[],
            thread_position: 1,
            thread_context: &[],
            aux_context_text: None,
        };
        let prompt = compose(&input);
        assert!(prompt.contains("Booking Confirmed 12345"));
    }

    #[test]
    fn reply_omits_subject_and_includes_thread_summary() {
        let context = vec![ThreadChronicleSummary {
            document_type: "booking_confirmation".to_string(),
            summary: "Booking confirmed".to_string(),
            from_party: "ocean_carrier".to_string(),
            key_identifiers: vec!["BKG2038256270".to_string()],
        }];
        let input = PromptInput {
            subject: "RE: Booking Confirmed 12345",
            body: "any update?",
            attachment_texts: &[],
            thread_position: 2,
            thread_context: &context,
            aux_context_text: None,
        };
        let prompt = compose(&input);
        assert!(!prompt.contains("RE: Booking Confirmed 12345"));
        assert!(prompt.contains("booking_confirmation"));
        assert!(prompt.contains("BKG2038256270"));
    }

    #[test]
    fn body_is_truncated() {
        let long_body = "x".repeat(5_000);
        let input = PromptInput {
            subject: "s",
            body: &long_body,
            attachment_texts: &[],
            thread_position: 1,
            thread_context: &[],
            aux_context_text: None,
        };
        let prompt = compose(&input);
        let body_section = prompt.split("Body:\n").nth(1).unwrap();
        assert_eq!(body_section.chars().count(), BODY_MAX_CHARS);
    }

    #[test]
    fn thread_summary_caps_at_ten_entries() {
        let context: Vec<_> = (0..15)
            .map(|i| ThreadChronicleSummary {
                document_type: "notification".to_string(),
                summary: format!("entry {i}"),
                from_party: "system".to_string(),
                key_identifiers: vec![],
            })
            .collect();
        let input = PromptInput {
            subject: "ignored",
            body: "body",
            attachment_texts: &[],
            thread_position: 3,
            thread_context: &context,
            aux_context_text: None,
        };
        let prompt = compose(&input);
        assert!(prompt.contains("entry 9"));
        assert!(!prompt.contains("entry 10"));
    }
}
