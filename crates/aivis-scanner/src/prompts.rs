//! Prompt list tooling: CSV bulk import, merging and template generation.

use crate::error::{Result, ScanError};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Accepted prompt length in chars.
const MIN_PROMPT_CHARS: usize = 5;
const MAX_PROMPT_CHARS: usize = 500;

/// Generated prompts shorter than this are dropped by [`validate_prompts`].
const MIN_GENERATED_CHARS: usize = 10;

/// Templates used for keyword-driven prompt generation.
///
/// `{keyword}`, `{location}` (" in <place>" or empty) and `{industry}` are
/// substituted.
const TEMPLATES: [&str; 22] = [
    "Best {keyword} services{location}",
    "Top rated {keyword} companies{location}",
    "Best {keyword} providers{location}",
    "Who should I hire for {keyword}{location}",
    "Recommended {keyword} services{location}",
    "Most trusted {keyword} companies{location}",
    "How to find a good {keyword} service{location}",
    "How to choose the best {keyword} company{location}",
    "What to look for in a {keyword} provider{location}",
    "Best {keyword} vs alternatives{location}",
    "{keyword} services comparison{location}",
    "Top {keyword} companies ranked{location}",
    "How much does {keyword} cost{location}",
    "Affordable {keyword} services{location}",
    "{keyword} pricing guide{location}",
    "{keyword} reviews{location}",
    "Best reviewed {keyword} services{location}",
    "{industry} {keyword} specialists{location}",
    "Professional {keyword} for {industry}{location}",
    "{keyword} near me",
    "Local {keyword} services{location}",
    "{keyword} in my area",
];

/// Sample file offered to users preparing a bulk upload.
pub const CSV_TEMPLATE: &str = "prompt,category\n\
\"Best digital marketing agencies?\",discovery\n\
\"Top SEO companies\",comparison";

/// One prompt read from a CSV upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvPrompt {
    pub text: String,
    /// 1-based line among the non-blank lines of the file
    pub line_number: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPrompts {
    pub prompts: Vec<CsvPrompt>,
    pub errors: Vec<String>,
}

/// Parse a bulk prompt upload.
///
/// Only the first column is read. A first line containing "prompt" is
/// treated as a header. Blank lines are ignored and prompts outside
/// 5..=500 chars are skipped with an error entry.
#[must_use]
pub fn parse_prompt_csv(content: &str) -> ParsedPrompts {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some(first) = lines.first() else {
        return ParsedPrompts {
            prompts: Vec::new(),
            errors: vec!["CSV file is empty".to_string()],
        };
    };
    let start = usize::from(first.to_lowercase().contains("prompt"));

    let mut parsed = ParsedPrompts::default();
    for (i, line) in lines.iter().enumerate().skip(start) {
        let line_number = i + 1;
        let text = first_field(line);
        let chars = text.chars().count();

        if chars == 0 {
            continue;
        }
        if !(MIN_PROMPT_CHARS..=MAX_PROMPT_CHARS).contains(&chars) {
            parsed.errors.push(format!(
                "Line {line_number}: prompt must be {MIN_PROMPT_CHARS}-{MAX_PROMPT_CHARS} characters"
            ));
            continue;
        }
        parsed.prompts.push(CsvPrompt { text, line_number });
    }

    tracing::debug!(
        prompts = parsed.prompts.len(),
        errors = parsed.errors.len(),
        "Parsed prompt CSV"
    );
    parsed
}

/// First CSV field of `line`, unquoted and trimmed.
///
/// A quoted field may contain commas and `""` escapes.
fn first_field(line: &str) -> String {
    let Some(rest) = line.strip_prefix('"') else {
        return line.split(',').next().unwrap_or_default().trim().to_string();
    };

    let mut field = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                field.push('"');
                chars.next();
            } else {
                break;
            }
        } else {
            field.push(c);
        }
    }
    field.trim().to_string()
}

/// Outcome of merging new prompts into an existing list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMerge {
    /// Existing prompts followed by the added ones
    pub merged: Vec<String>,
    pub added: Vec<String>,
    /// New prompts already present (case-insensitively)
    pub duplicates: Vec<String>,
}

/// Append `incoming` to `existing`, skipping case-insensitive duplicates.
#[must_use]
pub fn merge_prompts<I>(existing: &[String], incoming: I) -> PromptMerge
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut seen: HashSet<String> = existing.iter().map(|p| p.to_lowercase()).collect();
    let mut merge = PromptMerge {
        merged: existing.to_vec(),
        ..PromptMerge::default()
    };

    for prompt in incoming {
        let prompt = prompt.into();
        if seen.insert(prompt.to_lowercase()) {
            merge.merged.push(prompt.clone());
            merge.added.push(prompt);
        } else {
            merge.duplicates.push(prompt);
        }
    }
    merge
}

/// Generate up to `count` discovery prompts from `keywords`.
///
/// Templates are filled keyword by keyword, deduplicated, shuffled and
/// truncated.
pub fn generate_from_templates(
    keywords: &[String],
    industry: Option<&str>,
    location: Option<&str>,
    count: usize,
) -> Result<Vec<String>> {
    let mut prompts = fill_templates(keywords, industry, location, count)?;
    prompts.shuffle(&mut rand::thread_rng());
    Ok(prompts)
}

fn fill_templates(
    keywords: &[String],
    industry: Option<&str>,
    location: Option<&str>,
    count: usize,
) -> Result<Vec<String>> {
    let keywords: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return Err(ScanError::InvalidRequest(
            "At least one keyword is required".to_string(),
        ));
    }

    let location_suffix = location
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!(" in {l}"))
        .unwrap_or_default();
    let industry = industry
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or("business");

    let mut prompts: Vec<String> = Vec::with_capacity(count);
    'outer: for keyword in keywords {
        for template in TEMPLATES {
            if prompts.len() >= count {
                break 'outer;
            }
            let filled = template
                .replace("{keyword}", keyword)
                .replace("{location}", &location_suffix)
                .replace("{industry}", industry);
            let prompt = filled.split_whitespace().collect::<Vec<_>>().join(" ");

            if !prompt.is_empty() && !prompts.contains(&prompt) {
                prompts.push(prompt);
            }
        }
    }

    tracing::info!(generated = prompts.len(), "Generated prompts from templates");
    Ok(prompts)
}

/// Drop generated prompts that are too short or name the brand.
#[must_use]
pub fn validate_prompts(prompts: &[String], brand_name: Option<&str>) -> Vec<String> {
    let brand = brand_name
        .map(|b| b.trim().to_lowercase())
        .filter(|b| !b.is_empty());

    prompts
        .iter()
        .map(|p| p.trim())
        .filter(|p| p.chars().count() >= MIN_GENERATED_CHARS)
        .filter(|p| {
            brand
                .as_ref()
                .map_or(true, |brand| !p.to_lowercase().contains(brand.as_str()))
        })
        .map(ToString::to_string)
        .collect()
}
