//! Lexicon-based sentiment toward a brand.
//!
//! Only sentences naming the brand are scored. Within a sentence, a negator
//! flips and an intensifier scales the next sentiment term.

use serde::{Deserialize, Serialize};

const POSITIVE_TERMS: [&str; 41] = [
    "best", "top", "leading", "excellent", "outstanding", "exceptional",
    "highly rated", "highly recommended", "trusted", "reliable", "reputable",
    "quality", "professional", "experienced", "award-winning", "certified",
    "innovative", "efficient", "responsive", "friendly", "helpful",
    "affordable", "competitive", "value", "satisfaction", "guaranteed",
    "positive", "praised", "acclaimed", "recognized", "renowned",
    "comprehensive", "thorough", "dedicated", "committed", "established",
    "premier", "superior", "first-class", "world-class", "industry-leading",
];

const NEGATIVE_TERMS: [&str; 41] = [
    "avoid", "bad", "poor", "worst", "terrible", "awful",
    "complaints", "issues", "problems", "concerns", "risks",
    "unreliable", "untrustworthy", "unprofessional", "inexperienced",
    "overpriced", "expensive", "costly", "hidden fees",
    "slow", "delayed", "unresponsive", "rude", "unhelpful",
    "scam", "fraud", "lawsuit", "legal issues", "violations",
    "negative", "criticized", "controversial", "questionable",
    "failing", "struggling", "declining", "outdated",
    "disappointed", "frustrating", "unsatisfied", "regret",
];

const INTENSIFIERS: [&str; 13] = [
    "very", "highly", "extremely", "incredibly", "remarkably",
    "absolutely", "definitely", "certainly", "truly", "really",
    "particularly", "especially", "exceptionally",
];

const NEGATORS: [&str; 20] = [
    "not", "no", "never", "neither", "nor", "none",
    "doesn't", "don't", "didn't", "won't", "wouldn't",
    "isn't", "aren't", "wasn't", "weren't",
    "lack", "lacking", "without", "fail", "fails",
];

/// Sentences shorter than this are ignored.
const MIN_SENTENCE_CHARS: usize = 10;

/// Chars of each scored sentence kept in the details.
const DETAIL_SENTENCE_CHARS: usize = 150;

const INTENSIFIER_FACTOR: f64 = 1.5;

/// Overall sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    fn from_score(score: f64) -> Self {
        if score >= 0.65 {
            Self::Positive
        } else if score <= 0.35 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

/// Scoring of one brand-bearing sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceSentiment {
    pub sentence: String,
    /// Score in `[-1, 1]`
    pub score: f64,
    pub positive_terms: Vec<String>,
    pub negative_terms: Vec<String>,
}

/// Result of sentiment analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    /// Score in `[0, 1]`, two decimals; 0 when the brand is never named
    pub score: f64,
    pub label: SentimentLabel,
    pub details: Vec<SentenceSentiment>,
}

impl SentimentAnalysis {
    fn absent() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
            details: Vec::new(),
        }
    }
}

/// Score sentiment toward `brand_name` in `text`.
#[must_use]
pub fn analyze_sentiment(text: &str, brand_name: &str) -> SentimentAnalysis {
    let brand_lower = brand_name.trim().to_lowercase();
    if text.is_empty() || brand_lower.is_empty() {
        return SentimentAnalysis::absent();
    }

    let details: Vec<SentenceSentiment> = split_sentences(text)
        .into_iter()
        .filter(|sentence| sentence.to_lowercase().contains(&brand_lower))
        .map(score_sentence)
        .collect();

    if details.is_empty() {
        return SentimentAnalysis::absent();
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = details.iter().map(|d| d.score).sum::<f64>() / details.len() as f64;
    let normalized = (mean + 1.0) / 2.0;

    SentimentAnalysis {
        score: (normalized * 100.0).round() / 100.0,
        label: SentimentLabel::from_score(normalized),
        details,
    }
}

/// Split after `.`, `!` or `?` followed by whitespace; drop short fragments.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(end, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }

        sentences.push(&text[start..end]);
        start = end;
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            start = j + w.len_utf8();
            chars.next();
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
        .into_iter()
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

fn normalize_token(raw: &str) -> String {
    raw.replace('\u{2019}', "'")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Longest lexicon term (in tokens) starting at `tokens[0]`.
fn match_term<'a>(tokens: &[String], lexicon: &[&'a str]) -> Option<(&'a str, usize)> {
    lexicon
        .iter()
        .filter_map(|term| {
            let parts: Vec<&str> = term.split(' ').collect();
            let matches = parts.len() <= tokens.len()
                && parts.iter().zip(tokens).all(|(part, token)| part == token);
            matches.then_some((*term, parts.len()))
        })
        .max_by_key(|(_, len)| *len)
}

fn score_sentence(sentence: &str) -> SentenceSentiment {
    let tokens: Vec<String> = sentence
        .to_lowercase()
        .split_whitespace()
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect();

    let mut total = 0.0;
    let mut positive: Vec<String> = Vec::new();
    let mut negative: Vec<String> = Vec::new();
    let mut negated = false;
    let mut intensified = false;

    let mut i = 0;
    while i < tokens.len() {
        let rest = &tokens[i..];
        let hit = match_term(rest, &POSITIVE_TERMS)
            .map(|(term, len)| (term, len, 1.0))
            .or_else(|| match_term(rest, &NEGATIVE_TERMS).map(|(term, len)| (term, len, -1.0)));

        if let Some((term, len, polarity)) = hit {
            let mut contribution = polarity;
            if intensified {
                contribution *= INTENSIFIER_FACTOR;
            }
            if negated {
                contribution = -contribution;
            }
            total += contribution;
            if contribution > 0.0 {
                positive.push(term.to_string());
            } else {
                negative.push(term.to_string());
            }
            negated = false;
            intensified = false;
            i += len;
            continue;
        }

        let token = rest[0].as_str();
        if NEGATORS.contains(&token) {
            negated = true;
        } else if INTENSIFIERS.contains(&token) {
            intensified = true;
        }
        i += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let counted = (positive.len() + negative.len()).max(1) as f64;
    let score = (total / counted).clamp(-1.0, 1.0);

    SentenceSentiment {
        sentence: sentence.chars().take(DETAIL_SENTENCE_CHARS).collect(),
        score,
        positive_terms: dedup(positive),
        negative_terms: dedup(negative),
    }
}

fn dedup(terms: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(terms.len());
    for term in terms {
        if !unique.contains(&term) {
            unique.push(term);
        }
    }
    unique
}
