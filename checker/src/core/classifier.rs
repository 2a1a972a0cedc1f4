//! Deterministic classification of free-text game output.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{Outcome, OutcomeLabel};

/// Maps one run's combined output to an outcome label.
pub trait OutcomeClassifier {
    fn classify(&self, text: &str) -> OutcomeLabel;
}

/// Keyword patterns in priority order. Draw words come first so a message
/// mentioning both a tie and a win is still a draw.
static OUTCOME_PATTERNS: LazyLock<[(Outcome, Regex); 3]> = LazyLock::new(|| {
    [
        (Outcome::Draw, Regex::new(r"(?i)\b(draw|tie|tied)\b").unwrap()),
        (Outcome::Win, Regex::new(r"(?i)\b(win|won)\b").unwrap()),
        (Outcome::Lose, Regex::new(r"(?i)\b(lose|lost)\b").unwrap()),
    ]
});

const INVALID_MARKERS: [&str; 5] = ["invalid", "not valid", "warning", "error", "try again"];

/// Word-boundary keyword matcher for `win`/`lose`/`draw` phrasing.
///
/// - `draw`, `tie`, `tied` -> draw
/// - `win`, `won` -> win
/// - `lose`, `lost` -> lose
///
/// Matching is case-insensitive and never fires inside a longer word, so
/// `"window"` is unparseable.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl OutcomeClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> OutcomeLabel {
        OUTCOME_PATTERNS
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map_or(OutcomeLabel::Unparseable, |(outcome, _)| {
                OutcomeLabel::Parsed(*outcome)
            })
    }
}

/// True if the text carries any rejection marker (case-insensitive substring).
pub fn looks_invalid(text: &str) -> bool {
    let lowered = text.to_lowercase();
    INVALID_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> OutcomeLabel {
        KeywordClassifier.classify(text)
    }

    #[test]
    fn classify_win_phrasing() {
        assert_eq!(classify("You Win!!"), OutcomeLabel::Parsed(Outcome::Win));
        assert_eq!(classify("you WON this round"), OutcomeLabel::Parsed(Outcome::Win));
    }

    #[test]
    fn classify_draw_phrasing() {
        assert_eq!(classify("It's a draw"), OutcomeLabel::Parsed(Outcome::Draw));
        assert_eq!(classify("We tied."), OutcomeLabel::Parsed(Outcome::Draw));
    }

    #[test]
    fn classify_lose_phrasing() {
        assert_eq!(classify("You lose:("), OutcomeLabel::Parsed(Outcome::Lose));
        assert_eq!(classify("lost again"), OutcomeLabel::Parsed(Outcome::Lose));
    }

    #[test]
    fn classify_respects_word_boundaries() {
        assert_eq!(classify("the window opened"), OutcomeLabel::Unparseable);
        assert_eq!(classify("a tidy drawer"), OutcomeLabel::Unparseable);
        assert_eq!(classify("losers and winners"), OutcomeLabel::Unparseable);
        assert_eq!(classify(""), OutcomeLabel::Unparseable);
    }

    #[test]
    fn classify_prefers_draw_then_win() {
        assert_eq!(
            classify("nobody won, it's a tie"),
            OutcomeLabel::Parsed(Outcome::Draw)
        );
        assert_eq!(
            classify("you win, computer lost"),
            OutcomeLabel::Parsed(Outcome::Win)
        );
    }

    #[test]
    fn classify_sees_stderr_half_of_combined_text() {
        assert_eq!(
            classify("Computer picked rock\nYou win!!"),
            OutcomeLabel::Parsed(Outcome::Win)
        );
    }

    #[test]
    fn looks_invalid_matches_markers_case_insensitively() {
        assert!(looks_invalid("Invalid choice"));
        assert!(looks_invalid("That is NOT VALID"));
        assert!(looks_invalid("Traceback ... ValueError"));
        assert!(looks_invalid("please try again"));
        assert!(!looks_invalid("Computer picked paper\nYou lose:("));
    }
}
