//! Wake-word detection and command classification.
//!
//! Pure, synchronous text functions. The wake word is matched against an
//! explicit allow-list of phonetic variants of "Hey Sri" (speech engines
//! routinely hear "siri", "shree" or "three"), never by fuzzy matching.
//!
//! ## Classification order (first match wins)
//!
//! ```text
//! "lock" + ("phone" | "device" | "screen")  → Lock
//! "call"                                    → Call     target = rest after "call"
//! "send" + "message"                        → Message  target = rest after "message to"
//! "open"                                    → OpenApp  target = rest after "open"
//! otherwise                                 → Unknown
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Accepted spellings of the second word of the wake phrase.
pub const WAKE_WORD_VARIANTS: [&str; 6] = ["sri", "siri", "shri", "shree", "three", "serie"];

const LOCK_OBJECTS: [&str; 3] = ["phone", "device", "screen"];

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Lock,
    Call,
    Message,
    #[serde(rename = "open")]
    OpenApp,
    Unknown,
}

impl CommandKind {
    /// Human-readable feature name used in result messages.
    pub fn feature_name(self) -> &'static str {
        match self {
            CommandKind::Lock => "Lock",
            CommandKind::Call => "Call",
            CommandKind::Message => "Message",
            CommandKind::OpenApp => "Open app",
            CommandKind::Unknown => "Unknown",
        }
    }
}

/// A classified voice command. Immutable once built by [`parse_command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCommand {
    pub kind: CommandKind,
    /// Lower-cased, trimmed target (contact, app name). `None` when empty.
    pub target: Option<String>,
    /// The transcript exactly as it was handed to the classifier.
    pub raw_text: String,
}

fn wake_word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternatives = WAKE_WORD_VARIANTS.join("|");
        Regex::new(&format!(r"(?i)hey\s*(?:{alternatives})")).expect("wake word pattern compiles")
    })
}

fn call_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"call\s*").expect("call pattern compiles"))
}

fn open_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"open\s*").expect("open pattern compiles"))
}

fn message_recipient() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"message\s*to\s*(.+)").expect("message pattern compiles"))
}

/// `true` if `text` contains any accepted variant of "Hey Sri" in any casing.
pub fn contains_wake_word(text: &str) -> bool {
    wake_word_pattern().is_match(text)
}

/// Lower-case `text`, remove every wake-word occurrence and trim the
/// leftover whitespace and punctuation.
pub fn strip_wake_word(text: &str) -> String {
    let lower = text.to_lowercase();
    let cleaned = wake_word_pattern().replace_all(&lower, "");
    tidy(&cleaned).to_string()
}

fn tidy(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
}

fn non_empty(text: &str) -> Option<String> {
    let text = tidy(text);
    (!text.is_empty()).then(|| text.to_string())
}

/// Classify a transcript into a [`VoiceCommand`].
pub fn parse_command(text: &str) -> VoiceCommand {
    let cleaned = strip_wake_word(text);
    let raw_text = text.to_string();

    if cleaned.contains("lock") && LOCK_OBJECTS.iter().any(|o| cleaned.contains(o)) {
        return VoiceCommand {
            kind: CommandKind::Lock,
            target: None,
            raw_text,
        };
    }

    if cleaned.contains("call") {
        let target = non_empty(&call_prefix().replace(&cleaned, ""));
        return VoiceCommand {
            kind: CommandKind::Call,
            target,
            raw_text,
        };
    }

    if cleaned.contains("send") && cleaned.contains("message") {
        let target = message_recipient()
            .captures(&cleaned)
            .and_then(|c| c.get(1))
            .and_then(|m| non_empty(m.as_str()));
        return VoiceCommand {
            kind: CommandKind::Message,
            target,
            raw_text,
        };
    }

    if cleaned.contains("open") {
        let target = non_empty(&open_prefix().replace(&cleaned, ""));
        return VoiceCommand {
            kind: CommandKind::OpenApp,
            target,
            raw_text,
        };
    }

    VoiceCommand {
        kind: CommandKind::Unknown,
        target: None,
        raw_text,
    }
}

/// Decide whether `text` already holds a command worth executing.
///
/// Shared by the auto-trigger detector and the dispatcher so "heard a
/// complete command" and "classified it" can never disagree. Requires the
/// wake word; `Lock` is complete on its own, the other kinds need a target.
pub fn complete_command(text: &str) -> Option<VoiceCommand> {
    if !contains_wake_word(text) {
        return None;
    }
    let command = parse_command(text);
    match command.kind {
        CommandKind::Lock => Some(command),
        CommandKind::Call | CommandKind::Message | CommandKind::OpenApp
            if command.target.is_some() =>
        {
            Some(command)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_matches_in_any_casing() {
        for variant in WAKE_WORD_VARIANTS {
            let lower = format!("hey {variant} lock my phone");
            let upper = lower.to_uppercase();
            assert!(contains_wake_word(&lower), "{lower}");
            assert!(contains_wake_word(&upper), "{upper}");
        }
        assert!(contains_wake_word("Hey Sri"));
        assert!(contains_wake_word("okay HeY   sHrEe open camera"));
    }

    #[test]
    fn wake_word_tolerates_missing_space() {
        assert!(contains_wake_word("heysri lock my phone"));
    }

    #[test]
    fn near_misses_are_rejected() {
        for text in ["hey sir", "hey", "sri lock my phone", "hello siri", "hey there", ""] {
            assert!(!contains_wake_word(text), "{text:?} should not wake");
        }
    }

    #[test]
    fn strip_removes_all_occurrences_and_punctuation() {
        assert_eq!(strip_wake_word("Hey Sri, lock my phone."), "lock my phone");
        assert_eq!(strip_wake_word("hey siri hey sri call mom"), "call mom");
        assert_eq!(strip_wake_word("Hey Sri"), "");
    }

    #[test]
    fn parses_lock() {
        let cmd = parse_command("hey sri lock my phone");
        assert_eq!(cmd.kind, CommandKind::Lock);
        assert_eq!(cmd.target, None);
        assert_eq!(cmd.raw_text, "hey sri lock my phone");

        assert_eq!(parse_command("Hey Shree lock the SCREEN").kind, CommandKind::Lock);
        assert_eq!(parse_command("hey sri lock device").kind, CommandKind::Lock);
    }

    #[test]
    fn lock_without_object_is_not_lock() {
        assert_eq!(parse_command("hey sri lock").kind, CommandKind::Unknown);
    }

    #[test]
    fn parses_call_with_case_folded_target() {
        let cmd = parse_command("hey sri call Mom");
        assert_eq!(cmd.kind, CommandKind::Call);
        assert_eq!(cmd.target.as_deref(), Some("mom"));
        assert_eq!(cmd.raw_text, "hey sri call Mom");
    }

    #[test]
    fn parses_message_recipient() {
        let cmd = parse_command("hey sri send message to John");
        assert_eq!(cmd.kind, CommandKind::Message);
        assert_eq!(cmd.target.as_deref(), Some("john"));

        let no_recipient = parse_command("hey sri send a message");
        assert_eq!(no_recipient.kind, CommandKind::Message);
        assert_eq!(no_recipient.target, None);
    }

    #[test]
    fn send_alone_is_unknown() {
        assert_eq!(parse_command("hey sri send it").kind, CommandKind::Unknown);
    }

    #[test]
    fn parses_open_app() {
        let cmd = parse_command("hey sri open Camera");
        assert_eq!(cmd.kind, CommandKind::OpenApp);
        assert_eq!(cmd.target.as_deref(), Some("camera"));
    }

    #[test]
    fn unknown_has_no_target() {
        let cmd = parse_command("hey sri blah");
        assert_eq!(cmd.kind, CommandKind::Unknown);
        assert_eq!(cmd.target, None);
    }

    #[test]
    fn call_outranks_open() {
        let cmd = parse_command("hey sri open and call Mom");
        assert_eq!(cmd.kind, CommandKind::Call);
    }

    #[test]
    fn lock_outranks_call() {
        assert_eq!(parse_command("hey sri call lock screen").kind, CommandKind::Lock);
    }

    #[test]
    fn stripping_first_gives_the_same_classification() {
        for text in [
            "hey sri lock my phone",
            "Hey Siri call Mom",
            "hey shri send message to John",
            "hey three open Camera",
            "hey serie blah",
        ] {
            let with = parse_command(text);
            let without = parse_command(&strip_wake_word(text));
            assert_eq!(with.kind, without.kind, "{text}");
            assert_eq!(with.target, without.target, "{text}");
        }
    }

    #[test]
    fn complete_requires_wake_word() {
        assert!(complete_command("lock my phone").is_none());
        assert!(complete_command("call mom").is_none());
    }

    #[test]
    fn complete_requires_target_for_targeted_kinds() {
        assert!(complete_command("hey sri call").is_none());
        assert!(complete_command("hey sri open").is_none());
        assert!(complete_command("hey sri send message").is_none());
        assert!(complete_command("hey sri send").is_none());

        assert_eq!(
            complete_command("hey sri call mom").map(|c| c.kind),
            Some(CommandKind::Call)
        );
        assert_eq!(
            complete_command("hey sri send message to john").map(|c| c.kind),
            Some(CommandKind::Message)
        );
        assert_eq!(
            complete_command("hey sri open maps").map(|c| c.kind),
            Some(CommandKind::OpenApp)
        );
    }

    #[test]
    fn complete_lock_needs_object() {
        assert!(complete_command("hey sri lock").is_none());
        assert_eq!(
            complete_command("hey sri lock my phone").map(|c| c.kind),
            Some(CommandKind::Lock)
        );
    }

    #[test]
    fn command_serializes_with_original_kind_names() {
        let cmd = parse_command("hey sri open camera");
        let json = serde_json::to_value(&cmd).expect("serialize command");
        assert_eq!(json["kind"], "open");
        assert_eq!(json["target"], "camera");
        assert_eq!(json["rawText"], "hey sri open camera");
    }
}
