//! Built-in response patterns and tool-call detection.
//!
//! Patterns are evaluated in declaration order against the lower-cased
//! message and the first match wins. The list ends with a catch-all so
//! every message gets a reply.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::tools::{ToolArgs, CREATE_DIRECTORY_TOOL, DATABASE_STATS_TOOL};

/// A named regex with the template used when it matches.
pub struct ResponsePattern {
    pub name: &'static str,
    pub regex: Regex,
    pub template: &'static str,
}

/// Reply used if no pattern matches at all.
pub const FALLBACK_RESPONSE: &str =
    "I'm not sure how to help with that. Try asking about your contacts, tags, or notes.";

pub static BUILTIN_PATTERNS: LazyLock<Vec<ResponsePattern>> = LazyLock::new(|| {
    let table: &[(&'static str, &str, &'static str)] = &[
        (
            "greeting",
            r"^(?:hi|hello|hey|good (?:morning|afternoon|evening))\b",
            "Hello! I can answer questions about your {contact_count} contacts, \
             {tag_count} tags, and {note_count} notes.",
        ),
        (
            "contact_count",
            r"\b(?:how many|number of|count(?: of)?)\s+(?:my\s+)?(?:contacts|people)\b",
            "You have {contact_count} contacts in your database.",
        ),
        (
            "tag_count",
            r"\b(?:how many|number of|count(?: of)?)\s+(?:my\s+)?tags\b",
            "You have {tag_count} tags.",
        ),
        (
            "note_count",
            r"\b(?:how many|number of|count(?: of)?)\s+(?:my\s+)?notes\b",
            "You have {note_count} notes.",
        ),
        (
            "list_tables",
            r"\b(?:list|show)(?:\s+me)?(?:\s+(?:the|my|all))?\s+tables\b",
            "Your database has {table_count} tables: {tables}.",
        ),
        (
            "database_summary",
            r"\b(?:summary|summarize|overview|stats|statistics)\b",
            "Your database holds {table_count} tables with {total_rows} rows in total, \
             including {contact_count} contacts, {tag_count} tags, and {note_count} notes.",
        ),
        (
            "find_contact",
            r"\b(?:find|look up|search for)\s+(?:contact\s+|person\s+)?(?P<name>[a-z][a-z .'-]*[a-z])",
            "Searching your {contact_count} contacts for \"{name}\".",
        ),
        (
            "help",
            r"\b(?:help|what can you do)\b",
            "I can count your contacts, tags, and notes, list your tables, \
             and build a contact directory. Try \"how many contacts do I have?\"",
        ),
        (
            "thanks",
            r"\b(?:thanks|thank you)\b",
            "You're welcome!",
        ),
        (
            "fallback",
            r".*",
            "I received your message: \"{message}\". Ask me about your contacts, tags, or notes.",
        ),
    ];

    table
        .iter()
        .map(|&(name, pattern, template)| ResponsePattern {
            name,
            regex: Regex::new(pattern).expect("Invalid response pattern regex"),
            template,
        })
        .collect()
});

// =============================================================================
// Tool-call detection
// =============================================================================

/// A tool call inferred from a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub tool: &'static str,
    pub arguments: ToolArgs,
}

/// Default name for a generated directory when none is given.
pub const DEFAULT_DIRECTORY_NAME: &str = "contact_directory";

const STAT_SUBJECTS: &[(&str, &str)] = &[
    ("contacts", "contacts"),
    ("people", "contacts"),
    ("tags", "tags"),
    ("notes", "notes"),
];

const CREATE_VERBS: &[&str] = &["create", "generate", "make", "build"];

const IMAGE_WORDS: &[&str] = &["photo", "image", "picture", "avatar", "headshot"];

static OUTPUT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:called|named)\s+["']?([A-Za-z0-9][A-Za-z0-9_.-]*)"#)
        .expect("Invalid output name regex")
});

/// Inspect a message for keyword combinations that call for a tool.
///
/// "how many" together with contacts/people/tags/notes asks for database
/// statistics about whichever of those is mentioned first. A create verb with "directory" and an image word asks for
/// a photo directory, named from "called X" or "named X" when present.
pub fn detect_tool_call(message: &str) -> Option<ToolCallRequest> {
    let lower = message.to_lowercase();

    if lower.contains("how many") {
        let subject = STAT_SUBJECTS
            .iter()
            .filter_map(|(word, subject)| lower.find(word).map(|pos| (pos, *subject)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, subject)| subject);
        if let Some(subject) = subject {
            let mut arguments = ToolArgs::new();
            arguments.insert("subject".to_string(), json!(subject));
            return Some(ToolCallRequest {
                tool: DATABASE_STATS_TOOL,
                arguments,
            });
        }
    }

    let wants_create = CREATE_VERBS.iter().any(|verb| lower.contains(verb));
    let mentions_images = IMAGE_WORDS.iter().any(|word| lower.contains(word));
    if wants_create && lower.contains("directory") && mentions_images {
        let output_name = OUTPUT_NAME_RE
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches('.').to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DIRECTORY_NAME.to_string());

        let mut arguments = ToolArgs::new();
        arguments.insert("output_name".to_string(), json!(output_name));
        arguments.insert("include_photos".to_string(), json!(true));
        return Some(ToolCallRequest {
            tool: CREATE_DIRECTORY_TOOL,
            arguments,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match(message: &str) -> &'static str {
        let lower = message.to_lowercase();
        BUILTIN_PATTERNS
            .iter()
            .find(|p| p.regex.is_match(&lower))
            .map(|p| p.name)
            .unwrap()
    }

    // ---- Built-in patterns ----

    #[test]
    fn test_patterns_end_with_catch_all() {
        let last = BUILTIN_PATTERNS.last().unwrap();
        assert_eq!(last.name, "fallback");
        assert!(last.regex.is_match(""));
    }

    #[test]
    fn test_pattern_order() {
        assert_eq!(first_match("Hello there"), "greeting");
        assert_eq!(first_match("how many contacts"), "contact_count");
        assert_eq!(first_match("What is the number of tags?"), "tag_count");
        assert_eq!(first_match("how many notes do I have"), "note_count");
        assert_eq!(first_match("show me the tables"), "list_tables");
        assert_eq!(first_match("give me an overview"), "database_summary");
        assert_eq!(first_match("find Ada Lovelace"), "find_contact");
        assert_eq!(first_match("help"), "help");
        assert_eq!(first_match("thanks!"), "thanks");
        assert_eq!(first_match("the weather is nice"), "fallback");
    }

    #[test]
    fn test_find_contact_captures_name() {
        let pattern = BUILTIN_PATTERNS
            .iter()
            .find(|p| p.name == "find_contact")
            .unwrap();
        let caps = pattern.regex.captures("please find ada lovelace").unwrap();
        assert_eq!(&caps["name"], "ada lovelace");
    }

    // ---- Tool detection ----

    #[test]
    fn test_detect_stats_call() {
        let call = detect_tool_call("How many contacts do I have?").unwrap();
        assert_eq!(call.tool, DATABASE_STATS_TOOL);
        assert_eq!(call.arguments["subject"], json!("contacts"));

        let call = detect_tool_call("how many people are in there").unwrap();
        assert_eq!(call.arguments["subject"], json!("contacts"));

        let call = detect_tool_call("how many tags exist").unwrap();
        assert_eq!(call.arguments["subject"], json!("tags"));
    }

    #[test]
    fn test_detect_stats_subject_mentioned_first() {
        let call = detect_tool_call("how many notes do my contacts have").unwrap();
        assert_eq!(call.arguments["subject"], json!("notes"));

        let call = detect_tool_call("How many people have tags?").unwrap();
        assert_eq!(call.arguments["subject"], json!("contacts"));
    }

    #[test]
    fn test_how_many_without_subject_is_not_a_call() {
        assert!(detect_tool_call("how many days until friday").is_none());
    }

    #[test]
    fn test_detect_directory_call_with_name() {
        let call =
            detect_tool_call("Create a directory with photos called Team-2024.").unwrap();
        assert_eq!(call.tool, CREATE_DIRECTORY_TOOL);
        assert_eq!(call.arguments["output_name"], json!("Team-2024"));
        assert_eq!(call.arguments["include_photos"], json!(true));
    }

    #[test]
    fn test_detect_directory_call_named_quoted() {
        let call = detect_tool_call("generate a headshot directory named \"friends\"").unwrap();
        assert_eq!(call.arguments["output_name"], json!("friends"));
    }

    #[test]
    fn test_detect_directory_call_default_name() {
        let call = detect_tool_call("make me a picture directory").unwrap();
        assert_eq!(call.arguments["output_name"], json!(DEFAULT_DIRECTORY_NAME));
    }

    #[test]
    fn test_directory_without_images_is_not_a_call() {
        assert!(detect_tool_call("create a directory called x").is_none());
    }

    #[test]
    fn test_plain_message_is_not_a_call() {
        assert!(detect_tool_call("hello").is_none());
    }
}
