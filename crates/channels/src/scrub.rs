//! Content scrubbing for the enhanced email path.
//!
//! Bulk filters score on a handful of cheap signals: trigger phrases,
//! exclamation runs, and emoji walls. The scrubber rewrites those while
//! leaving the rest of the text untouched.

/// Trigger phrases and their neutral rewrites, matched case-insensitively.
const PHRASE_REWRITES: &[(&str, &str)] = &[
    ("100% free", "complimentary"),
    ("free entry", "open entry"),
    ("act now", "register soon"),
    ("limited time offer", "available for a short period"),
    ("click here", "visit the link"),
    ("don't miss out", "we hope to see you"),
    ("urgent", "important"),
];

/// Rewrite text for better inbox placement.
pub fn scrub_for_deliverability(text: &str) -> String {
    let mut out = text.to_string();
    for (phrase, replacement) in PHRASE_REWRITES {
        out = replace_ignore_case(&out, phrase, replacement);
    }
    out = collapse_exclamations(&out);
    collapse_emoji_runs(&out)
}

fn replace_ignore_case(text: &str, needle: &str, replacement: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut search = 0;
    while let Some(pos) = lower[search..].find(&needle) {
        let start = search + pos;
        out.push_str(&text[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
        search = last;
    }
    out.push_str(&text[last..]);
    out
}

/// Any run of two or more '!' becomes a single '!'.
fn collapse_exclamations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_bang = false;
    for c in text.chars() {
        if c == '!' {
            if !prev_bang {
                out.push(c);
            }
            prev_bang = true;
        } else {
            prev_bang = false;
            out.push(c);
        }
    }
    out
}

/// Consecutive emoji collapse to the first one in the run.
fn collapse_emoji_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_emoji = false;
    for c in text.chars() {
        if is_emoji(c) {
            if !prev_emoji {
                out.push(c);
            }
            prev_emoji = true;
        } else {
            prev_emoji = false;
            out.push(c);
        }
    }
    out
}

fn is_emoji(c: char) -> bool {
    matches!(c,
        '\u{1F300}'..='\u{1FAFF}'
        | '\u{2600}'..='\u{27BF}'
        | '\u{2B00}'..='\u{2BFF}'
        | '\u{FE0F}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrases_rewritten_case_insensitive() {
        let out = scrub_for_deliverability("This event is 100% FREE. Act Now to join.");
        assert_eq!(out, "This event is complimentary. register soon to join.");
    }

    #[test]
    fn test_exclamation_runs_collapsed() {
        let out = scrub_for_deliverability("Welcome!!! See you there!!");
        assert_eq!(out, "Welcome! See you there!");
    }

    #[test]
    fn test_single_exclamation_kept() {
        let out = scrub_for_deliverability("Welcome! See you there.");
        assert_eq!(out, "Welcome! See you there.");
    }

    #[test]
    fn test_emoji_runs_collapsed() {
        let out = scrub_for_deliverability("Party \u{1F389}\u{1F389}\u{1F389} tonight");
        assert_eq!(out, "Party \u{1F389} tonight");
    }

    #[test]
    fn test_separated_emoji_survive() {
        let out = scrub_for_deliverability("\u{1F389} party \u{1F393} grads");
        assert_eq!(out, "\u{1F389} party \u{1F393} grads");
    }

    #[test]
    fn test_clean_text_unchanged() {
        let text = "Dear Ana, the CS Department invites you to TechFest 2026.";
        assert_eq!(scrub_for_deliverability(text), text);
    }
}
