//! Reduce a scraped answer page to the answer text.
//!
//! The render service returns the whole page as markdown: navigation, map
//! widgets, citation chips and sign-in prompts surround the answer. Cleanup
//! runs in a fixed order:
//!
//! 0. trim everything before the first answer-like line
//! 1. remove page chrome by pattern
//! 2. normalize markdown to plain text
//! 3. drop short, numeric and navigation lines
//!
//! Removal runs before normalization so that patterns can still see the
//! markdown structure they key on. The pipeline is repeated until the text
//! stops changing, so cleaning already-clean text is a no-op.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Upper bound on pipeline repetitions.
const MAX_PASSES: usize = 5;

/// Lines shorter than this (in chars) are dropped.
const MIN_LINE_CHARS: usize = 3;

static ANSWER_START_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:^|\n)(?:Here are several|Here are some|Based on|According to|The following|I found|There are several)",
        r"(?:^|\n)[A-Z][^#\n]{20,}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Answer start regex is hardcoded and valid"))
    .collect()
});

static CHROME_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Navigation labels, bare or linked
        r"(?im)^\[?(?:History|Library|More|Share)\]?(?:\([^)\n]*\))?[ \t]*$",
        r"(?im)^(?:Answer|Links|Images|Places)[ \t]*$",
        r"(?im)^\[Mapbox.*?\].*$",
        r"(?im)^Mapbox homepage.*$",
        // Map listing blocks: name, rating, detail line
        r"(?im)^[A-Za-z \t]+(?:Studios?|Media|Marketing|Productions?|HQ)\n[\d.]+\n.*$",
        r"(?im)^\d+\.\d+\n\(\d+\)\n(?:Open|Closed)$",
        r"(?im)^!\[.*?\]\(https://st\.perplexity\.ai.*?\)$",
        // Street addresses
        r"(?m)^\d{3,5}[ \t]+[A-Za-z]+.*?,[ \t]*[A-Z]{2}[ \t]+\d{5}$",
        // Footer and sign-in prompts
        r"(?im)^Follow-ups?$",
        r"(?im)^Ask a follow-up$",
        r"(?im)^Model$",
        r"(?im)^Sign in or create an account$",
        r"(?im)^Save and sync your searches$",
        r"(?im)^Continue with (?:Google|Apple|email)$",
        r"(?im)^Single sign-on.*$",
        // Standalone ratings, review counts and hours
        r"(?m)^[\d.]+$",
        r"(?m)^\(\d+\)$",
        r"(?im)^(?:Open|Closed)$",
        r"(?im)^See more.*$",
        // Empty links
        r"\[\]\([^)]+\)",
        // Branding
        r"(?im)^perplexity(?:\.ai)?(?:[ \t]+pro)?[ \t]*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Chrome regex is hardcoded and valid"))
    .collect()
});

/// Citation chips like `[thinkbrandedmedia+1]`; group 1 marks a real link.
static CITATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[\w+.-]+\](\()?").expect("Citation regex is hardcoded and valid")
});

static IMAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[[^\]\n]*\]\([^)\n]+\)").expect("Image regex is hardcoded and valid")
});

static LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\([^)\n]+\)").expect("Link regex is hardcoded and valid")
});

static BULLET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*][ \t]+").expect("Bullet regex is hardcoded and valid"));

static EMPHASIS_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\*\*([^*\n]+)\*\*",
        r"\*([^*\n]+)\*",
        r"__([^_\n]+)__",
        r"_([^_\n]+)_",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Emphasis regex is hardcoded and valid"))
    .collect()
});

static HEADING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+(.+)$").expect("Heading regex is hardcoded and valid")
});

static BLANK_RUN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Blank run regex is hardcoded and valid"));

static NUMERIC_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d.()]+$").expect("Numeric line regex is hardcoded and valid"));

static NAV_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:Home|Library|History|Settings|Profile|Menu|Search)$")
        .expect("Nav line regex is hardcoded and valid")
});

/// Extract the answer text from a scraped answer page.
#[must_use]
pub fn extract_answer(markdown: &str) -> String {
    let mut text = markdown.replace("\r\n", "\n");
    for _ in 0..MAX_PASSES {
        let next = clean_once(&text);
        if next == text {
            break;
        }
        text = next;
    }
    text
}

fn clean_once(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let text = trim_to_answer_start(text);
    let text = remove_chrome(text);
    let text = normalize_markdown(&text);
    filter_lines(&text)
}

/// The first start pattern that matches decides; a match in the first half
/// of the text drops everything before it.
fn trim_to_answer_start(text: &str) -> &str {
    for regex in ANSWER_START_REGEXES.iter() {
        if let Some(found) = regex.find(text) {
            let start = found.start();
            if start > 0 && start < text.len() / 2 {
                return text[start..].trim();
            }
            return text;
        }
    }
    text
}

fn remove_chrome(text: &str) -> String {
    let mut text = text.to_string();
    for regex in CHROME_REGEXES.iter() {
        text = regex.replace_all(&text, "").into_owned();
    }
    CITATION_REGEX
        .replace_all(&text, |caps: &Captures| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn normalize_markdown(text: &str) -> String {
    let mut text = IMAGE_REGEX.replace_all(text, "").into_owned();
    text = LINK_REGEX.replace_all(&text, "$1").into_owned();
    text = BULLET_REGEX.replace_all(&text, "• ").into_owned();
    for regex in EMPHASIS_REGEXES.iter() {
        text = regex.replace_all(&text, "$1").into_owned();
    }
    text = HEADING_REGEX.replace_all(&text, "$1").into_owned();
    BLANK_RUN_REGEX.replace_all(&text, "\n\n").into_owned()
}

fn filter_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| line.chars().count() >= MIN_LINE_CHARS)
        .filter(|line| !NUMERIC_LINE_REGEX.is_match(line))
        .filter(|line| !NAV_LINE_REGEX.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "\
[History](/history)
Library
Share

# best video production agencies in austin

Answer
Links
Images

Here are some of the top video production agencies in Austin:

## Top picks

- **Acme Media** is known for brand films [acmemedia+1]
- **Bolt Studios** handles commercial shoots [boltstudios]
- [Delta Productions](https://delta.example.com) covers live events

Acme Media
4.9
Downtown Austin

4.8
(120)
Open

1200 Congress Ave, Austin, TX 78701

See more places
[](https://www.perplexity.ai/x)
Follow-ups
Ask a follow-up
Sign in or create an account
Continue with Google
perplexity
";

    #[test]
    fn test_extracts_answer() {
        let answer = extract_answer(PAGE);
        assert_eq!(
            answer,
            "Here are some of the top video production agencies in Austin:\n\
             Top picks\n\
             • Acme Media is known for brand films\n\
             • Bolt Studios handles commercial shoots\n\
             • Delta Productions covers live events"
        );
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let once = extract_answer(PAGE);
        assert_eq!(extract_answer(&once), once);

        let plain = "Based on reviews, Acme Co is a solid pick.\n• Fast service";
        assert_eq!(extract_answer(plain), extract_answer(&extract_answer(plain)));
    }

    #[test]
    fn test_citations_removed_but_links_kept() {
        let text = "Acme Co is popular [yelp+2] and [Acme](https://acme.example) is listed [1].";
        assert_eq!(extract_answer(text), "Acme Co is popular  and Acme is listed .");
    }

    #[test]
    fn test_nav_label_only_removed_as_whole_line() {
        let text = "More than 40 agencies operate in Austin today.\nMore";
        assert_eq!(
            extract_answer(text),
            "More than 40 agencies operate in Austin today."
        );
    }

    #[test]
    fn test_short_and_numeric_lines_dropped() {
        let text = "A full sentence about plumbers in town.\nok\n(12)\n3.5\nSearch\nHome";
        assert_eq!(extract_answer(text), "A full sentence about plumbers in town.");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_answer(""), "");
        assert_eq!(extract_answer("   \n\n"), "");
        assert_eq!(extract_answer("Share\nLibrary\nperplexity"), "");
    }

    #[test]
    fn test_late_answer_start_not_trimmed() {
        let text = "Agencies in Austin are varied and plentiful these days.\nBased on reviews, Acme leads.";
        let answer = extract_answer(text);
        assert!(answer.starts_with("Agencies in Austin"));
    }
}
