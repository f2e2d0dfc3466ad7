//! Brand mention detection.
//!
//! Classifies how a brand appears in a response: featured as a primary
//! recommendation, merely mentioned, or absent.

use crate::text::{byte_offset, char_index, char_slice, list_position, literal_regex, prefix_chars};
use aivis_core::MentionType;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Phrases that mark a primary recommendation.
const FEATURED_INDICATORS: [&str; 15] = [
    "top choice",
    "top pick",
    "highly recommend",
    "strongly recommend",
    "best option",
    "leading",
    "stands out",
    "our recommendation",
    "first choice",
    "#1",
    "number one",
    "excellent choice",
    "top-rated",
    "highest rated",
    "most recommended",
];

/// Business suffixes stripped from brand names.
const BRAND_SUFFIXES: [&str; 8] = [
    " inc", " llc", " corp", " co", " ltd", " group", " services", " company",
];

/// TLDs stripped from the brand domain.
const DOMAIN_TLDS: [&str; 5] = [".com", ".net", ".org", ".io", ".co"];

/// Maximum char distance between an indicator and a mention.
const FEATURED_PROXIMITY: usize = 200;

/// Chars after a rank-1 marker searched for the brand.
const RANK_ONE_WINDOW: usize = 300;

/// Leading chars searched for a bolded brand.
const LEAD_SECTION: usize = 500;

/// Chars of context kept on each side of a mention.
const CONTEXT_RADIUS: usize = 100;

static FEATURED_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    FEATURED_INDICATORS
        .iter()
        .map(|phrase| literal_regex(phrase).expect("Featured indicator regex is hardcoded and valid"))
        .collect()
});

/// Markers of the first ranked item.
static RANK_ONE_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^1[.)]",
        r"(?m)^\*\*1[.)]",
        r"(?i)first\s+(?:choice|option|recommendation)",
        r"(?i)top\s+(?:of|on)\s+(?:the|our)\s+list",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Rank marker regex is hardcoded and valid"))
    .collect()
});

/// Result of mention detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionAnalysis {
    pub mention_type: MentionType,
    /// Numbered-list position; featured brands outside a list report 1
    pub position: Option<u32>,
    /// Total matches across all brand variations
    pub mentions: usize,
    /// Text surrounding each match
    pub contexts: Vec<String>,
}

impl MentionAnalysis {
    fn not_found() -> Self {
        Self {
            mention_type: MentionType::NotFound,
            position: None,
            mentions: 0,
            contexts: Vec::new(),
        }
    }
}

/// Lowercase spellings under which a brand may appear.
///
/// Name, name without a business suffix, domain, domain without its TLD, and
/// the first word of a multi-word name when it is longer than four chars.
#[must_use]
pub fn brand_variations(brand_name: &str, domain: Option<&str>) -> Vec<String> {
    let mut variations: Vec<String> = Vec::new();
    let mut add = |variation: String| {
        if !variation.is_empty() && !variations.contains(&variation) {
            variations.push(variation);
        }
    };

    let name = brand_name.trim().to_lowercase();
    add(name.clone());

    for suffix in BRAND_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            add(stripped.trim().to_string());
        }
    }

    if let Some(domain) = domain.map(str::trim).filter(|d| !d.is_empty()) {
        let domain = domain.to_lowercase();
        add(domain.clone());
        for tld in DOMAIN_TLDS {
            if let Some(stripped) = domain.strip_suffix(tld) {
                add(stripped.to_string());
            }
        }
    }

    let words: Vec<&str> = brand_name.split_whitespace().collect();
    if words.len() > 1 && words[0].chars().count() > 4 {
        add(words[0].to_lowercase());
    }

    variations
}

/// Detect how `brand_name` is mentioned in `text`.
#[must_use]
pub fn detect_mention(text: &str, brand_name: &str, domain: Option<&str>) -> MentionAnalysis {
    let brand_name = brand_name.trim();
    if text.is_empty() || brand_name.is_empty() {
        return MentionAnalysis::not_found();
    }

    // Char index of every match of every variation
    let mut mentions: Vec<usize> = Vec::new();
    for variation in brand_variations(brand_name, domain) {
        let Some(regex) = literal_regex(&variation) else {
            continue;
        };
        mentions.extend(regex.find_iter(text).map(|m| char_index(text, m.start())));
    }

    if mentions.is_empty() {
        return MentionAnalysis::not_found();
    }

    let contexts = mentions
        .iter()
        .map(|&at| {
            let start = at.saturating_sub(CONTEXT_RADIUS);
            char_slice(text, start, at + CONTEXT_RADIUS).trim().to_string()
        })
        .collect();

    let position = list_position(text, brand_name);

    if is_featured(text, brand_name, &mentions) {
        MentionAnalysis {
            mention_type: MentionType::Featured,
            position: Some(position.unwrap_or(1)),
            mentions: mentions.len(),
            contexts,
        }
    } else {
        MentionAnalysis {
            mention_type: MentionType::Mentioned,
            position,
            mentions: mentions.len(),
            contexts,
        }
    }
}

fn is_featured(text: &str, brand_name: &str, mentions: &[usize]) -> bool {
    // Indicator phrase close to a mention
    for regex in FEATURED_REGEXES.iter() {
        if let Some(found) = regex.find(text) {
            let indicator_at = char_index(text, found.start());
            if mentions
                .iter()
                .any(|&at| at.abs_diff(indicator_at) < FEATURED_PROXIMITY)
            {
                return true;
            }
        }
    }

    // Brand shortly after the first rank-1 marker
    let brand_lower = brand_name.to_lowercase();
    for regex in RANK_ONE_REGEXES.iter() {
        if let Some(found) = regex.find(text) {
            let section_end = found.start() + byte_offset(&text[found.start()..], RANK_ONE_WINDOW);
            if text[found.start()..section_end]
                .to_lowercase()
                .contains(&brand_lower)
            {
                return true;
            }
        }
    }

    // Brand bolded in the lead section
    let lead = prefix_chars(text, LEAD_SECTION);
    RegexBuilder::new(&format!(r"\*\*[^*]*{}[^*]*\*\*", regex::escape(&brand_lower)))
        .case_insensitive(true)
        .build()
        .is_ok_and(|bold| bold.is_match(lead))
}
