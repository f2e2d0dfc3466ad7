//! Competitor tracking.
//!
//! Finds known competitors in a response and proposes plausible new ones
//! from bold phrases, suffixed business names and rated listings.

use crate::text::list_position;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of new competitor names reported per response.
pub const MAX_NEW_COMPETITORS: usize = 5;

/// Words that usually end a company name.
const BUSINESS_SUFFIXES: [&str; 14] = [
    "inc",
    "llc",
    "corp",
    "co",
    "ltd",
    "group",
    "services",
    "company",
    "solutions",
    "enterprises",
    "partners",
    "agency",
    "associates",
    "consulting",
];

/// Bold text that is almost never a company.
const GENERIC_HEADINGS: [&str; 14] = [
    "key factors",
    "top recommendations",
    "important considerations",
    "what to look for",
    "recommended steps",
    "sources",
    "overview",
    "summary",
    "conclusion",
    "introduction",
    "note",
    "warning",
    "tip",
    "example",
];

static BOLD_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*([A-Z][A-Za-z0-9\s&'-]+(?:Inc|LLC|Corp|Co|Ltd|Group|Services)?)\*\*")
        .expect("Bold name regex is hardcoded and valid")
});

static SUFFIXED_NAME_REGEXES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    BUSINESS_SUFFIXES
        .iter()
        .map(|suffix| {
            let regex = RegexBuilder::new(&format!(r"([A-Z][A-Za-z0-9\s&'-]+)\s+{suffix}\b"))
                .case_insensitive(true)
                .build()
                .expect("Suffixed name regex is hardcoded and valid");
            (*suffix, regex)
        })
        .collect()
});

static RATED_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][A-Za-z0-9\s&'-]+)\s*[⭐★]\s*[\d.]+")
        .expect("Rated name regex is hardcoded and valid")
});

static TRAILING_SUFFIX_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    BUSINESS_SUFFIXES
        .iter()
        .map(|suffix| {
            RegexBuilder::new(&format!(r"\s+{suffix}\.?$"))
                .case_insensitive(true)
                .build()
                .expect("Trailing suffix regex is hardcoded and valid")
        })
        .collect()
});

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Whitespace regex is hardcoded and valid"));

/// Result of competitor tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    /// Known competitors found, in the order they were supplied
    pub mentioned: Vec<String>,
    /// Plausible unlisted competitors, first-seen order, at most five
    pub new_competitors: Vec<String>,
    /// Numbered-list position of each mentioned competitor, where listed
    pub positions: BTreeMap<String, u32>,
}

/// Track known and new competitors in `text`.
#[must_use]
pub fn track_competitors(text: &str, known: &[String]) -> CompetitorAnalysis {
    if text.is_empty() {
        return CompetitorAnalysis::default();
    }

    let text_lower = text.to_lowercase();
    let mut mentioned = Vec::new();
    let mut positions = BTreeMap::new();

    for competitor in known.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        let matched = competitor_variations(competitor)
            .into_iter()
            .find(|variation| text_lower.contains(&variation.to_lowercase()));

        if let Some(variation) = matched {
            if !mentioned.iter().any(|m: &String| m == competitor) {
                mentioned.push(competitor.to_string());
                if let Some(position) = list_position(text, &variation) {
                    positions.insert(competitor.to_string(), position);
                }
            }
        }
    }

    CompetitorAnalysis {
        mentioned,
        new_competitors: detect_new_competitors(text, known),
        positions,
    }
}

/// Spellings under which a known competitor may appear.
#[must_use]
pub fn competitor_variations(name: &str) -> Vec<String> {
    let mut variations = vec![name.to_string()];
    let mut add = |variation: String| {
        if !variation.is_empty() && !variations.contains(&variation) {
            variations.push(variation);
        }
    };

    for regex in TRAILING_SUFFIX_REGEXES.iter() {
        if regex.is_match(name) {
            add(regex.replace(name, "").trim().to_string());
        }
    }

    add(WHITESPACE_REGEX.replace_all(name, "-").into_owned());
    add(WHITESPACE_REGEX.replace_all(name, "").into_owned());

    variations
}

fn detect_new_competitors(text: &str, known: &[String]) -> Vec<String> {
    let known_lower: Vec<String> = known
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let mut found: Vec<String> = Vec::new();
    let mut consider = |candidate: String| {
        if is_likely_company_name(&candidate)
            && !is_known_competitor(&candidate, &known_lower)
            && !found.iter().any(|f| f.eq_ignore_ascii_case(&candidate))
        {
            found.push(candidate);
        }
    };

    for caps in BOLD_NAME_REGEX.captures_iter(text) {
        consider(caps[1].trim().to_string());
    }

    for (suffix, regex) in SUFFIXED_NAME_REGEXES.iter() {
        for caps in regex.captures_iter(text) {
            consider(format!("{} {suffix}", caps[1].trim()));
        }
    }

    for caps in RATED_NAME_REGEX.captures_iter(text) {
        consider(caps[1].trim().to_string());
    }

    found.truncate(MAX_NEW_COMPETITORS);
    found
}

/// Plausibility filter for a candidate company name.
fn is_likely_company_name(name: &str) -> bool {
    let length = name.chars().count();
    if !(3..=50).contains(&length) {
        return false;
    }

    let lower = name.to_lowercase();
    if GENERIC_HEADINGS.iter().any(|heading| lower.contains(heading)) {
        return false;
    }

    if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return false;
    }

    // All caps reads as a heading
    !(length > 5 && name == name.to_uppercase())
}

/// Exact or substring match (either direction) against known names.
fn is_known_competitor(name: &str, known_lower: &[String]) -> bool {
    let lower = name.to_lowercase();
    known_lower
        .iter()
        .any(|known| lower == *known || lower.contains(known.as_str()) || known.contains(&lower))
}
