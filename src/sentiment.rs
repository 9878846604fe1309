use serde::Serialize;

/// Danish keyword with its English counterpart. Either form counts as one hit.
type Term = (&'static str, &'static str);

const POSITIVE_TERMS: &[Term] = &[
    ("stiger", "rising"),
    ("vækst", "growth"),
    ("positiv", "positive"),
    ("forbedring", "improvement"),
    ("succes", "success"),
    ("opgang", "upturn"),
];

const NEGATIVE_TERMS: &[Term] = &[
    ("falder", "falling"),
    ("nedgang", "decline"),
    ("negativ", "negative"),
    ("tab", "loss"),
    ("konkurs", "bankruptcy"),
    ("risiko", "risk"),
];

fn count_hits(text: &str, terms: &[Term]) -> usize {
    terms
        .iter()
        .filter(|&&(danish, english)| text.contains(danish) || text.contains(english))
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// `|pos - neg| / (pos + neg + 1)`, always in `[0, 1)`.
    pub confidence: f64,
}

/// Keyword sentiment of a news text.
///
/// Counts how many terms of each list occur in the lowercased text.
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let positive = count_hits(&text, POSITIVE_TERMS);
    let negative = count_hits(&text, NEGATIVE_TERMS);

    let label = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => SentimentLabel::Positive,
        std::cmp::Ordering::Less => SentimentLabel::Negative,
        std::cmp::Ordering::Equal => SentimentLabel::Neutral,
    };
    let confidence = positive.abs_diff(negative) as f64 / (positive + negative + 1) as f64;

    Sentiment { label, confidence }
}

/// Reason line for a non-neutral sentiment.
pub fn sentiment_reason(sentiment: &Sentiment) -> Option<String> {
    let pct = sentiment.confidence * 100.0;
    match sentiment.label {
        SentimentLabel::Positive => Some(format!(
            "Positive news sentiment with {pct:.1}% confidence"
        )),
        SentimentLabel::Negative => Some(format!(
            "Negative news sentiment with {pct:.1}% confidence"
        )),
        SentimentLabel::Neutral => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_positive_words_give_two_thirds_confidence() {
        let s = analyze_sentiment("Strong GROWTH and steady improvement this quarter");
        assert_eq!(s.label, SentimentLabel::Positive);
        assert!((s.confidence - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn negative_words_dominate() {
        let s = analyze_sentiment("Decline continues, bankruptcy risk mounts despite growth");
        assert_eq!(s.label, SentimentLabel::Negative);
        // 3 negative, 1 positive -> 2 / 5
        assert!((s.confidence - 0.4).abs() < 1e-12);
    }

    #[test]
    fn no_keywords_is_neutral_with_zero_confidence() {
        let s = analyze_sentiment("The board met on Tuesday.");
        assert_eq!(s.label, SentimentLabel::Neutral);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn tie_is_neutral() {
        let s = analyze_sentiment("growth offset by decline");
        assert_eq!(s.label, SentimentLabel::Neutral);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn repeated_word_counts_once() {
        let s = analyze_sentiment("growth growth growth");
        assert!((s.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn neutral_has_no_reason() {
        let s = analyze_sentiment("");
        assert!(sentiment_reason(&s).is_none());
    }

    #[test]
    fn positive_reason_mentions_confidence() {
        let s = analyze_sentiment("growth and success");
        let reason = sentiment_reason(&s).unwrap();
        assert_eq!(reason, "Positive news sentiment with 66.7% confidence");
    }

    #[test]
    fn danish_news_is_scored() {
        let s = analyze_sentiment("Aktien stiger efter vækst og succes");
        assert_eq!(s.label, SentimentLabel::Positive);
        assert!((s.confidence - 0.75).abs() < 1e-12);

        let s = analyze_sentiment("KONKURS truer, og aktien FALDER");
        assert_eq!(s.label, SentimentLabel::Negative);
        assert!((s.confidence - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn both_languages_of_a_term_count_once() {
        // "succes" is a prefix of "success"; "positiv" of "positive"
        let s = analyze_sentiment("A positive success");
        assert_eq!(s.label, SentimentLabel::Positive);
        assert!((s.confidence - 2.0 / 3.0).abs() < 1e-12);
    }
}
