//! Phrase matching between recognized transcripts and command triggers.
//!
//! Both inputs are expected to be normalized already (lower-case, trimmed); the
//! matcher compares them verbatim. Two modes exist:
//!
//! - exact: the whole transcript must equal the phrase, or one of its
//!   `/`-separated alternatives;
//! - in-sentence: every whitespace-separated command word (a `/` word is a set
//!   of alternatives) must appear somewhere in the transcript. Word order does
//!   not matter and one transcript word may cover several command words.

const ALTERNATIVE_SEPARATOR: char = '/';

/// Decide whether `transcript` fires a command whose trigger is `command_phrase`.
#[must_use = "match result decides whether the command dispatches"]
pub fn matches(transcript: &str, command_phrase: &str, in_sentence: bool) -> bool {
    if in_sentence {
        matches_in_sentence(transcript, command_phrase)
    } else {
        matches_exact(transcript, command_phrase)
    }
}

fn matches_exact(transcript: &str, command_phrase: &str) -> bool {
    if command_phrase.is_empty() {
        return false;
    }
    if !command_phrase.contains(ALTERNATIVE_SEPARATOR) {
        return transcript == command_phrase;
    }
    alternatives(command_phrase).any(|alternative| alternative == transcript)
}

fn matches_in_sentence(transcript: &str, command_phrase: &str) -> bool {
    let command_words: Vec<&str> = command_phrase.split_whitespace().collect();
    // An empty phrase would otherwise satisfy `0 >= 0` for every transcript.
    if command_words.is_empty() {
        return false;
    }
    let transcript_words: Vec<&str> = transcript.split_whitespace().collect();
    let covered = command_words
        .iter()
        .filter(|command_word| word_is_covered(command_word, &transcript_words))
        .count();
    covered >= command_words.len()
}

fn word_is_covered(command_word: &str, transcript_words: &[&str]) -> bool {
    if command_word.contains(ALTERNATIVE_SEPARATOR) {
        alternatives(command_word).any(|alternative| transcript_words.contains(&alternative))
    } else {
        transcript_words.contains(&command_word)
    }
}

fn alternatives(phrase: &str) -> impl Iterator<Item = &str> {
    phrase
        .split(ALTERNATIVE_SEPARATOR)
        .filter(|alternative| !alternative.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("lights on", "lights on", true)]
    #[case("lights on please", "lights on", false)]
    #[case("lights", "lights on", false)]
    #[case("hello", "hi/hello", true)]
    #[case("hi", "hi/hello", true)]
    #[case("hi there", "hi/hello", false)]
    #[case("hi/hello", "hi/hello", false)]
    #[case("", "hi/", false)]
    #[case("", "", false)]
    #[case("anything", "", false)]
    fn exact_mode_cases(#[case] transcript: &str, #[case] phrase: &str, #[case] expected: bool) {
        assert_eq!(matches(transcript, phrase, false), expected);
    }

    #[rstest]
    #[case("please turn the lights on now", "lights on", true)]
    #[case("on the lights", "lights on", true)]
    #[case("please turn the lights off", "lights on", false)]
    #[case("say hello to everyone", "hi/hello everyone", true)]
    #[case("say hey to everyone", "hi/hello everyone", false)]
    #[case("go", "go go", true)]
    #[case("lights lights", "lights on", false)]
    #[case("anything at all", "", false)]
    #[case("", "   ", false)]
    #[case("", "lights", false)]
    fn in_sentence_mode_cases(
        #[case] transcript: &str,
        #[case] phrase: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches(transcript, phrase, true), expected);
    }

    #[test]
    fn matching_is_case_sensitive_on_normalized_input() {
        assert!(!matches("Lights On", "lights on", false));
        assert!(!matches("LIGHTS ON", "lights on", true));
    }

    fn word() -> impl Strategy<Value = String> {
        "[a-z]{1,6}"
    }

    fn phrase_words() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(word(), 1..5)
    }

    proptest! {
        #[test]
        fn exact_without_alternatives_is_string_equality(
            transcript in "[a-z ]{0,12}",
            phrase in "[a-z][a-z ]{0,11}",
        ) {
            prop_assert_eq!(matches(&transcript, &phrase, false), transcript == phrase);
        }

        #[test]
        fn exact_with_alternatives_is_membership(
            options in prop::collection::vec(word(), 2..5),
            transcript in word(),
        ) {
            let phrase = options.join("/");
            let expected = options.iter().any(|option| *option == transcript);
            prop_assert_eq!(matches(&transcript, &phrase, false), expected);
        }

        #[test]
        fn in_sentence_matches_when_every_word_is_present(
            command in phrase_words(),
            filler in prop::collection::vec(word(), 0..4),
            seed in any::<u64>(),
        ) {
            let mut transcript_words: Vec<String> = command.clone();
            transcript_words.extend(filler);
            let len = transcript_words.len();
            transcript_words.rotate_left((seed as usize) % len);
            let transcript = transcript_words.join(" ");
            prop_assert!(matches(&transcript, &command.join(" "), true));
        }

        #[test]
        fn in_sentence_fails_when_one_required_word_is_removed(
            command in phrase_words(),
            pick in any::<prop::sample::Index>(),
        ) {
            let missing = command[pick.index(command.len())].clone();
            let transcript: Vec<&str> = command
                .iter()
                .map(String::as_str)
                .filter(|word| *word != missing)
                .collect();
            prop_assert!(!matches(&transcript.join(" "), &command.join(" "), true));
        }
    }
}
