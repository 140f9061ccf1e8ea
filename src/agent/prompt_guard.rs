use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_PROMPT_CHARS: usize = 2000;
/// Number of distinct heuristics that must match before input is refused.
pub const BLOCK_THRESHOLD: usize = 3;

static INJECTION_HEURISTICS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            "instruction_override",
            r"(?i)ignore\s+(all\s+)?(the\s+)?(previous|prior|above|earlier)\s+(instructions|prompts|rules|messages)",
        ),
        (
            "disregard",
            r"(?i)(disregard|forget)\s+(all\s+|your\s+|the\s+)*(previous\s+|prior\s+)?(instructions|rules|guidelines|training)",
        ),
        (
            "role_reassignment",
            r"(?i)(you\s+are\s+now|act\s+as\s+(a|an|if)|pretend\s+(to\s+be|you\s+are))",
        ),
        ("system_prompt", r"(?i)(system\s+prompt|^\s*system\s*:)"),
        (
            "prompt_exfiltration",
            r"(?i)(reveal|show|print|repeat|leak)\s+(me\s+)?(your|the)\s+(system\s+)?(prompt|instructions)",
        ),
        (
            "jailbreak",
            r"(?i:jailbreak|developer\s+mode|do\s+anything\s+now)|\bDAN\b",
        ),
        ("markup_tags", r"(?i)<\s*/?\s*(script|system|instructions?)\b"),
        ("inst_markers", r"(?i)\[\s*/?\s*(INST|SYSTEM)\s*\]"),
        (
            "safety_override",
            r"(?i)(override|bypass|disable)\s+(the\s+|your\s+|all\s+)?(safety|security|content|filters?|rules|restrictions)",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        (
            name,
            Regex::new(pattern).expect("Injection heuristics are valid regexes"),
        )
    })
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptVerdict {
    Accepted(String),
    Blocked { matched: Vec<&'static str> },
}

/// Names of the heuristics `input` trips.
pub fn injection_signals(input: &str) -> Vec<&'static str> {
    INJECTION_HEURISTICS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(input))
        .map(|(name, _)| *name)
        .collect()
}

/// Refuses input that trips `BLOCK_THRESHOLD` heuristics; otherwise strips control
/// characters (newlines and tabs survive), trims and truncates to `MAX_PROMPT_CHARS`.
pub fn sanitize_prompt(input: &str) -> PromptVerdict {
    let matched = injection_signals(input);
    if matched.len() >= BLOCK_THRESHOLD {
        return PromptVerdict::Blocked { matched };
    }
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let truncated: String = cleaned.trim().chars().take(MAX_PROMPT_CHARS).collect();
    PromptVerdict::Accepted(truncated.trim_end().to_string())
}
