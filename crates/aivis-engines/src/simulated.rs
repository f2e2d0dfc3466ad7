//! Canned answers used when no credential is configured.
//!
//! Selection is keyword-based and deterministic so development scans and
//! tests produce stable reports.

/// Which canned answer a prompt maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// Prompt asks for the best or top options
    Ranked,
    /// Prompt asks for a recommendation or suggestion
    Guidance,
    /// Anything else
    General,
}

impl PromptStyle {
    /// Classify a prompt by keyword.
    #[must_use]
    pub fn of(prompt: &str) -> Self {
        let lower = prompt.to_lowercase();
        if lower.contains("best") || lower.contains("top") {
            Self::Ranked
        } else if lower.contains("recommend") || lower.contains("suggest") {
            Self::Guidance
        } else {
            Self::General
        }
    }
}

const CHAT_RANKED: &str = "Based on my research, there are several highly-regarded options in this category. Here are some top recommendations:

1. **Industry Leader Co.** - Consistently rated highly for quality and service. They have excellent reviews and a strong track record.

2. **Premier Solutions** - Known for competitive pricing and reliable service. Many customers praise their responsiveness.

3. **Quality First Inc.** - Offers comprehensive services with good customer support. They specialize in custom solutions.

When choosing a provider, consider:
- Reviews and testimonials from past customers
- Years of experience in the industry
- Range of services offered
- Pricing transparency
- Certifications and qualifications

I'd recommend getting quotes from multiple providers and checking recent reviews before making a decision.";

const CHAT_GUIDANCE: &str = "I can offer some guidance on finding the right provider for your needs.

**Key Factors to Consider:**
- **Reputation**: Look for providers with consistently positive reviews
- **Experience**: Companies with 5+ years in the industry tend to be more reliable
- **Transparency**: Good providers offer clear pricing and detailed proposals
- **Communication**: Responsive customer service is essential

**Recommended Steps:**
1. Research local options and read reviews
2. Check credentials and certifications
3. Request quotes from at least 3 providers
4. Ask for references from recent projects
5. Compare not just price, but value and service quality

Would you like more specific recommendations based on your location or particular requirements?";

const CHAT_GENERAL: &str = "This is an area where careful research is important. Here are some general guidelines:

**What to Look For:**
- Strong online reviews across multiple platforms
- Proper licensing and insurance
- Transparent pricing with no hidden fees
- Good communication and responsiveness
- Portfolio of past work or client testimonials

**Red Flags to Avoid:**
- No verifiable reviews or references
- Prices significantly below market rate
- Reluctance to provide written quotes
- Poor communication during the inquiry phase

I'd suggest starting with a Google search for providers in your area, reading recent reviews, and reaching out to several options for consultations. This will give you a good sense of the market and help you make an informed decision.";

const OVERVIEW_RANKED: &str = "**AI Overview**

When looking for the best options in this category, consider these highly-rated providers:

📍 **Top Choice Services**
⭐ 4.8/5 (245 reviews)
Known for excellent customer service and quality work.

📍 **Premier Solutions Inc**
⭐ 4.7/5 (189 reviews)
Competitive pricing with comprehensive offerings.

📍 **Quality First Co**
⭐ 4.6/5 (156 reviews)
Established provider with strong local reputation.

**Key factors to consider:**
✅ Check reviews on Google and Yelp
✅ Verify licensing and insurance
✅ Get multiple quotes
✅ Ask for references

_Sources: Google Business Profiles, Local Reviews_

**Top Search Results:**

1. **Best Providers in Your Area - Complete Guide**
   https://example-guide.com/best-providers
   Comprehensive comparison of top-rated providers with reviews and pricing information.

2. **How to Choose the Right Provider**
   https://consumer-advice.com/choosing-guide
   Expert tips on selecting quality services for your needs.

3. **Top 10 Providers Ranked**
   https://ranking-site.com/top-10
   Annual ranking based on customer satisfaction and quality metrics.";

const OVERVIEW_GENERAL: &str = "**AI Overview**

This topic requires careful consideration of several factors. Here's what you should know:

**Important Considerations:**
✅ Research providers thoroughly before deciding
✅ Read recent reviews from multiple sources
✅ Compare pricing and services offered
✅ Verify credentials and experience

**Recommended Steps:**
1. Identify your specific needs
2. Search for providers in your area
3. Check ratings and reviews
4. Request quotes from multiple options
5. Make an informed decision

_Sources: Consumer Guides, Review Platforms_

**Top Search Results:**

1. **Complete Guide to This Topic**
   https://comprehensive-guide.com/topic
   Everything you need to know about making the right choice.

2. **Expert Recommendations**
   https://expert-site.com/recommendations
   Industry experts share their top picks and advice.

3. **Consumer Reviews and Ratings**
   https://review-aggregator.com/category
   Real customer experiences and ratings.";

/// Canned conversational answer for `prompt`.
#[must_use]
pub fn chat_response(prompt: &str) -> &'static str {
    match PromptStyle::of(prompt) {
        PromptStyle::Ranked => CHAT_RANKED,
        PromptStyle::Guidance => CHAT_GUIDANCE,
        PromptStyle::General => CHAT_GENERAL,
    }
}

/// Canned search-overview answer for `prompt`.
#[must_use]
pub fn overview_response(prompt: &str) -> &'static str {
    match PromptStyle::of(prompt) {
        PromptStyle::Ranked => OVERVIEW_RANKED,
        PromptStyle::Guidance | PromptStyle::General => OVERVIEW_GENERAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_style() {
        assert_eq!(PromptStyle::of("Best plumber in Austin"), PromptStyle::Ranked);
        assert_eq!(PromptStyle::of("TOP rated roofers"), PromptStyle::Ranked);
        assert_eq!(PromptStyle::of("Can you suggest a dentist?"), PromptStyle::Guidance);
        assert_eq!(PromptStyle::of("Who should I recommend?"), PromptStyle::Guidance);
        assert_eq!(PromptStyle::of("How do I fix a leak?"), PromptStyle::General);
    }

    #[test]
    fn test_ranked_chat_response_is_a_list() {
        let text = chat_response("best agencies");
        assert!(text.contains("1. **Industry Leader Co.**"));
        assert!(text.contains("3. **Quality First Inc.**"));
    }

    #[test]
    fn test_overview_responses_are_headed() {
        assert!(overview_response("best agencies").starts_with("**AI Overview**"));
        assert!(overview_response("suggest an agency").starts_with("**AI Overview**"));
        assert!(overview_response("suggest an agency").contains("Complete Guide to This Topic"));
    }

    #[test]
    fn test_selection_is_deterministic() {
        assert_eq!(chat_response("what is seo"), chat_response("what is seo"));
    }
}
