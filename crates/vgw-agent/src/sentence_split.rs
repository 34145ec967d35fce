//! Sentence-boundary splitting for streaming TTS dispatch (spec §4.4 Step B
//! "Sentence boundary rule", §9c).
//!
//! Adapted from the sentence-chunking idiom in the teacher's voice pipeline
//! text utilities: a completed sentence ends at the first run of one or
//! more of `.`, `!`, `?` followed by whitespace or end-of-string.

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Try to pull one complete sentence off the front of `pending`, leaving the
/// remainder in place. Returns `None` if no boundary has appeared yet.
///
/// The returned sentence has trailing whitespace trimmed (spec §4.4: "strip
/// whitespace, and — if non-empty — emit").
pub fn extract_complete_sentence(pending: &mut String) -> Option<String> {
    let chars: Vec<char> = pending.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if is_terminator(chars[i]) {
            let mut j = i;
            while j < chars.len() && is_terminator(chars[j]) {
                j += 1;
            }
            if j >= chars.len() {
                // Terminator run touches end-of-string: ambiguous mid-stream, wait for more input.
                break;
            }
            if chars[j].is_whitespace() {
                let sentence: String = chars[..j].iter().collect();
                let mut k = j;
                while k < chars.len() && chars[k].is_whitespace() {
                    k += 1;
                }
                *pending = chars[k..].iter().collect();
                return Some(sentence);
            }
            i = j;
        } else {
            i += 1;
        }
    }
    None
}

/// Split complete text into sentences per the same boundary rule, for
/// non-streaming use (custom chunkers, tests). Concatenating the result
/// reproduces `text` exactly, except a trailing empty segment — produced
/// when `text` ends exactly on a boundary — is filtered out (spec §9c).
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        if is_terminator(chars[i]) {
            let mut j = i;
            while j < chars.len() && is_terminator(chars[j]) {
                j += 1;
            }
            if j < chars.len() && chars[j].is_whitespace() {
                let mut k = j;
                while k < chars.len() && chars[k].is_whitespace() {
                    k += 1;
                }
                out.push(chars[start..k].iter().collect::<String>());
                start = k;
                i = k;
                continue;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    if start < chars.len() {
        out.push(chars[start..].iter().collect());
    }
    out.retain(|s| !s.is_empty());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_one_sentence_at_a_time() {
        let mut pending = "Hello there! How can I help you?".to_string();
        let first = extract_complete_sentence(&mut pending).unwrap();
        assert_eq!(first, "Hello there!");
        assert_eq!(pending, "How can I help you?");
        // No trailing whitespace/EOS boundary yet for the second sentence.
        assert!(extract_complete_sentence(&mut pending).is_none());
    }

    #[test]
    fn consecutive_terminators_are_one_boundary_not_one_per_character() {
        let mut pending = "Wait.... really? Yes.".to_string();
        let first = extract_complete_sentence(&mut pending).unwrap();
        assert_eq!(first, "Wait....");
        assert_eq!(pending, "really? Yes.");
    }

    #[test]
    fn split_sentences_round_trips_by_concatenation() {
        let text = "One. Two! Three? Four";
        let parts = split_sentences(text);
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn split_sentences_filters_trailing_empty_segment() {
        let text = "Only one sentence.";
        let parts = split_sentences(text);
        assert_eq!(parts, vec!["Only one sentence."]);
    }
}
