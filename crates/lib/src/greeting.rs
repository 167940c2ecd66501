//! Greeting fast-path: answer plain greetings locally without touching the backend.
//!
//! The vocabulary is an immutable value built at startup and passed to whoever needs it.
//! Phrases are matched against the word tokens of the input: single words match any token,
//! multi-word phrases ("good morning") only match as a contiguous run of tokens.

/// Reply sent when the input is a greeting.
pub const GREETING_REPLY: &str = "👋 Hello! I'm your Engineering Trainer. Ask me anything about Mechatronics, Avionics, or Electrical Engineering.";

/// Built-in greeting phrases.
pub const DEFAULT_GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "salaam",
    "bonjour",
    "howdy",
    "good morning",
    "good evening",
];

/// Immutable set of greeting phrases, each stored as its lower-cased token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingVocabulary {
    phrases: Vec<Vec<String>>,
}

impl Default for GreetingVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_GREETINGS.iter().copied())
    }
}

impl GreetingVocabulary {
    /// Build a vocabulary from phrases. Phrases without any word characters are dropped.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<Vec<String>> = Vec::new();
        for p in phrases {
            let tokens = tokenize(p.as_ref());
            if !tokens.is_empty() && !out.contains(&tokens) {
                out.push(tokens);
            }
        }
        Self { phrases: out }
    }

    /// Number of distinct phrases.
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// True iff any phrase of the vocabulary occurs in `text`.
    pub fn matches(&self, text: &str) -> bool {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return false;
        }
        self.phrases.iter().any(|phrase| {
            if phrase.len() == 1 {
                tokens.iter().any(|t| *t == phrase[0])
            } else {
                tokens.windows(phrase.len()).any(|w| w == phrase.as_slice())
            }
        })
    }
}

/// Check `text` against the built-in vocabulary.
pub fn is_greeting(text: &str) -> bool {
    GreetingVocabulary::default().matches(text)
}

/// Lower-case and split into runs of alphanumeric characters (underscore counts as a word char).
fn tokenize(text: &str) -> Vec<String> {
    text.trim()
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_phrase_matches_with_noise() {
        let vocab = GreetingVocabulary::default();
        for phrase in DEFAULT_GREETINGS {
            let upper = phrase.to_uppercase();
            for text in [
                phrase.to_string(),
                format!("  {}!!  ", upper),
                format!("...{}, there", phrase),
                format!("\t{}?\n", phrase),
            ] {
                assert!(vocab.matches(&text), "expected greeting: {:?}", text);
            }
        }
    }

    #[test]
    fn non_greetings_do_not_match() {
        let vocab = GreetingVocabulary::default();
        for text in [
            "Explain Ohm's law",
            "What's the capital of France?",
            "this is good",
            "morning star navigation",
            "evening out the load across phases",
            "highway",
            "they said",
            "chief engineer",
        ] {
            assert!(!vocab.matches(text), "unexpected greeting: {:?}", text);
        }
    }

    #[test]
    fn empty_input_is_not_a_greeting() {
        assert!(!is_greeting(""));
        assert!(!is_greeting("   \n\t"));
        assert!(!is_greeting("?!..."));
    }

    #[test]
    fn multi_word_phrase_needs_contiguous_words() {
        let vocab = GreetingVocabulary::default();
        assert!(vocab.matches("Good morning, team"));
        assert!(vocab.matches("good   evening!"));
        assert!(!vocab.matches("good day, what a morning"));
        assert!(!vocab.matches("good"));
    }

    #[test]
    fn greeting_inside_a_question_still_matches() {
        assert!(is_greeting("Hey, how does a servo loop work?"));
        assert!(is_greeting("bonjour, expliquez la loi d'Ohm"));
    }

    #[test]
    fn custom_vocabulary_replaces_default() {
        let vocab = GreetingVocabulary::new(["Ahoy", "good afternoon", "", "ahoy"]);
        assert_eq!(vocab.len(), 2);
        assert!(vocab.matches("AHOY!"));
        assert!(vocab.matches("Good afternoon."));
        assert!(!vocab.matches("hello"));
    }

    #[test]
    fn matching_is_idempotent() {
        let vocab = GreetingVocabulary::default();
        for text in ["hello", "Explain Ohm's law", "", "good evening"] {
            assert_eq!(vocab.matches(text), vocab.matches(text));
        }
    }
}
