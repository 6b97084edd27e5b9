#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptWord {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f32,
}

impl TranscriptWord {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    fn ends_sentence(&self) -> bool {
        self.word
            .trim_end_matches(['"', '\'', ')', '»'])
            .ends_with(['.', '?', '!', '…', '。', '？', '！'])
    }
}

/// Recognizer output: the full text plus word timings when the backend
/// provides them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub words: Vec<TranscriptWord>,
}

impl Transcript {
    pub fn from_words(words: Vec<TranscriptWord>) -> Self {
        let text = join_words(&words);
        Self { text, words }
    }

    /// Group timed words into sentences on terminal punctuation.
    pub fn sentences(&self) -> Vec<TranscriptSentence> {
        let mut sentences = Vec::new();
        let mut current: Vec<&TranscriptWord> = Vec::new();
        for word in &self.words {
            current.push(word);
            if word.ends_sentence() {
                sentences.push(TranscriptSentence::from_words(&current));
                current.clear();
            }
        }
        if !current.is_empty() {
            sentences.push(TranscriptSentence::from_words(&current));
        }
        sentences
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptSentence {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl TranscriptSentence {
    fn from_words(words: &[&TranscriptWord]) -> Self {
        let text = words
            .iter()
            .map(|w| w.word.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            text,
            start_time: words.first().map_or(0.0, |w| w.start_time),
            end_time: words.last().map_or(0.0, |w| w.end_time),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

fn join_words(words: &[TranscriptWord]) -> String {
    words
        .iter()
        .map(|w| w.word.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn word(text: &str, start: f64, end: f64) -> TranscriptWord {
        TranscriptWord {
            word: text.to_string(),
            start_time: start,
            end_time: end,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_transcript_word_duration() {
        assert_relative_eq!(word("test", 2.0, 2.8).duration(), 0.8, epsilon = 0.001);
    }

    #[test]
    fn test_from_words_joins_text() {
        let t = Transcript::from_words(vec![word("Hello", 0.0, 0.4), word("there.", 0.5, 0.9)]);
        assert_eq!(t.text, "Hello there.");
    }

    #[test]
    fn test_sentences_split_on_punctuation() {
        let t = Transcript::from_words(vec![
            word("Hello", 0.0, 0.4),
            word("there.", 0.5, 0.9),
            word("How", 1.5, 1.7),
            word("are", 1.7, 1.9),
            word("you?", 1.9, 2.4),
            word("Fine", 3.0, 3.5),
        ]);
        let sentences = t.sentences();
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].text, "Hello there.");
        assert_relative_eq!(sentences[1].start_time, 1.5);
        assert_relative_eq!(sentences[1].end_time, 2.4);
        assert_eq!(sentences[2].text, "Fine");
    }

    #[test]
    fn test_quoted_terminal_punctuation_ends_sentence() {
        let t = Transcript::from_words(vec![word("\"Stop!\"", 0.0, 0.5), word("he", 0.6, 0.7)]);
        assert_eq!(t.sentences().len(), 2);
    }

    #[test]
    fn test_no_words_no_sentences() {
        assert!(Transcript::default().sentences().is_empty());
    }
}
