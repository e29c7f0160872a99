//! Aspect-ratio extraction from image prompts.
//!
//! Recognizes ratio literals (`16:9`) and orientation words in English and
//! Spanish (`landscape`, `retrato`) anywhere in a prompt. The first match
//! decides the ratio; every match is stripped from the prompt so the refiner
//! never sees ratio chatter.

use regex::Regex;
use std::sync::LazyLock;

use palaver_core::types::AspectRatio;

// Token table in priority-irrelevant insertion order; the regex alternation
// is built from it so literal ratios win word-boundary matching over the
// generic digit:digit fallback.
static RATIO_TOKENS: &[(&str, AspectRatio)] = &[
    ("16:9", AspectRatio::Wide),
    ("9:16", AspectRatio::Tall),
    ("1:1", AspectRatio::Square),
    ("4:3", AspectRatio::Standard),
    ("3:4", AspectRatio::Classic),
    ("landscape", AspectRatio::Wide),
    ("horizontal", AspectRatio::Wide),
    ("panoramica", AspectRatio::Wide),
    ("paisaje", AspectRatio::Wide),
    ("portrait", AspectRatio::Tall),
    ("vertical", AspectRatio::Tall),
    ("retrato", AspectRatio::Tall),
    ("square", AspectRatio::Square),
    ("cuadrado", AspectRatio::Square),
];

static RATIO_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alts: Vec<String> = RATIO_TOKENS
        .iter()
        .map(|(tok, _)| regex::escape(tok))
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b|\d+:\d+", alts.join("|")))
        .expect("Invalid ratio regex")
});

static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+").expect("Invalid whitespace regex"));

fn ratio_for_token(token: &str) -> Option<AspectRatio> {
    let lower = token.to_lowercase();
    RATIO_TOKENS
        .iter()
        .find(|(tok, _)| *tok == lower)
        .map(|(_, ratio)| *ratio)
        .or_else(|| AspectRatio::from_token(&lower))
}

/// Extract an aspect ratio from an image prompt.
///
/// The first recognized token decides the ratio. When one is found, ALL
/// ratio-shaped tokens are stripped (so repeating a token is harmless and a
/// second pass over the output is a no-op), whitespace is collapsed, and the
/// result is trimmed. A prompt left empty by stripping falls back to the
/// original text. Unrecognized `digit:digit` tokens (say `5:7`) yield no
/// ratio and leave the prompt untouched.
pub fn extract_aspect_ratio(prompt: &str) -> (String, Option<AspectRatio>) {
    let first = match RATIO_RE.find(prompt) {
        Some(m) => m.as_str(),
        None => return (prompt.to_string(), None),
    };

    let ratio = match ratio_for_token(first) {
        Some(r) => r,
        None => return (prompt.to_string(), None),
    };

    let stripped = RATIO_RE.replace_all(prompt, "");
    let collapsed = MULTI_SPACE_RE.replace_all(&stripped, " ");
    let cleaned = collapsed.trim();
    if cleaned.is_empty() {
        (prompt.to_string(), Some(ratio))
    } else {
        (cleaned.to_string(), Some(ratio))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_ratio() {
        let (prompt, ratio) = extract_aspect_ratio("a cat in 16:9");
        assert_eq!(prompt, "a cat in");
        assert_eq!(ratio, Some(AspectRatio::Wide));
    }

    #[test]
    fn test_english_orientation_word() {
        let (prompt, ratio) = extract_aspect_ratio("portrait of a king");
        assert_eq!(prompt, "of a king");
        assert_eq!(ratio, Some(AspectRatio::Tall));
    }

    #[test]
    fn test_spanish_orientation_word() {
        let (prompt, ratio) = extract_aspect_ratio("un bosque en paisaje");
        assert_eq!(prompt, "un bosque en");
        assert_eq!(ratio, Some(AspectRatio::Wide));
    }

    #[test]
    fn test_first_match_wins() {
        // "square" comes first, so the trailing 16:9 only gets stripped.
        let (prompt, ratio) = extract_aspect_ratio("square 16:9 image");
        assert_eq!(ratio, Some(AspectRatio::Square));
        assert_eq!(prompt, "image");
    }

    #[test]
    fn test_all_matches_stripped() {
        let (prompt, ratio) = extract_aspect_ratio("landscape mountains landscape lake");
        assert_eq!(ratio, Some(AspectRatio::Wide));
        assert_eq!(prompt, "mountains lake");
    }

    #[test]
    fn test_second_pass_is_noop() {
        let (once, ratio) = extract_aspect_ratio("landscape 16:9 cat");
        assert_eq!(ratio, Some(AspectRatio::Wide));
        let (twice, again) = extract_aspect_ratio(&once);
        assert_eq!(twice, once);
        assert_eq!(again, None);
    }

    #[test]
    fn test_case_insensitive() {
        let (_, ratio) = extract_aspect_ratio("LANDSCAPE photo");
        assert_eq!(ratio, Some(AspectRatio::Wide));
    }

    #[test]
    fn test_unknown_literal_ratio_ignored() {
        let (prompt, ratio) = extract_aspect_ratio("a 5:7 poster");
        assert_eq!(prompt, "a 5:7 poster");
        assert_eq!(ratio, None);
    }

    #[test]
    fn test_unknown_first_blocks_later_known() {
        // The first match decides; an unmapped literal first means no ratio.
        let (prompt, ratio) = extract_aspect_ratio("5:7 then 16:9");
        assert_eq!(prompt, "5:7 then 16:9");
        assert_eq!(ratio, None);
    }

    #[test]
    fn test_known_first_strips_unknown_too() {
        let (prompt, ratio) = extract_aspect_ratio("16:9 cat 5:7");
        assert_eq!(ratio, Some(AspectRatio::Wide));
        assert_eq!(prompt, "cat");
    }

    #[test]
    fn test_ratio_only_prompt_falls_back_to_original() {
        let (prompt, ratio) = extract_aspect_ratio("16:9");
        assert_eq!(prompt, "16:9");
        assert_eq!(ratio, Some(AspectRatio::Wide));
    }

    #[test]
    fn test_no_ratio_present() {
        let (prompt, ratio) = extract_aspect_ratio("a quiet harbor at dawn");
        assert_eq!(prompt, "a quiet harbor at dawn");
        assert_eq!(ratio, None);
    }

    #[test]
    fn test_embedded_token_not_matched() {
        // Word boundaries keep "verticality" from matching "vertical"...
        let (prompt, ratio) = extract_aspect_ratio("study of verticality");
        assert_eq!(prompt, "study of verticality");
        assert_eq!(ratio, None);
    }

    #[test]
    fn test_whitespace_collapsed() {
        let (prompt, _) = extract_aspect_ratio("a 16:9 shot of a 4:3 frame");
        assert_eq!(prompt, "a shot of a frame");
    }

    #[test]
    fn test_empty_prompt() {
        let (prompt, ratio) = extract_aspect_ratio("");
        assert_eq!(prompt, "");
        assert_eq!(ratio, None);
    }
}
