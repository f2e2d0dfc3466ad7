//! Gap analysis of client visibility against competitors.

use aivis_core::{Engine, MentionType, PromptResult};
use serde::{Deserialize, Serialize};

/// Chars of the prompt repeated in each gap.
const PROMPT_EXCERPT_CHARS: usize = 100;

/// Points per visible competitor when the client is missing.
const RED_POINTS_PER_COMPETITOR: usize = 3;

/// Points when the client ranks below first alongside competitors.
const YELLOW_POINTS: usize = 1;

/// Severity of a visibility gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GapType {
    /// Competitors visible, client absent
    Red,
    /// Client mentioned below first place while competitors appear
    Yellow,
    /// Client featured
    Green,
}

/// One (prompt, engine) observation worth reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub gap_type: GapType,
    pub prompt: String,
    pub engine: Engine,
    pub client_status: MentionType,
    pub client_position: Option<u32>,
    pub competitors: Vec<String>,
    pub message: String,
}

/// Gaps found for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptGaps {
    pub prompt: String,
    pub gaps: Vec<Gap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    CompetitorOutranking,
    EngineSpecific,
    RankingImprovement,
    MaintainPosition,
}

/// Suggested follow-up derived from the gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub kind: RecommendationKind,
    pub message: String,
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapSummary {
    pub total_prompts: usize,
    pub red_alerts: usize,
    pub yellow_alerts: usize,
    pub green_count: usize,
    /// Weighted gap points as a percentage of the maximum; 0 is best
    pub overall_gap_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub gaps: Vec<PromptGaps>,
    pub recommendations: Vec<Recommendation>,
    pub summary: GapSummary,
}

/// Compare client visibility against competitors across all prompt results.
#[must_use]
pub fn analyze_gaps(
    results: &[PromptResult],
    client_name: &str,
    competitors: &[String],
) -> GapAnalysis {
    let mut gaps = Vec::with_capacity(results.len());
    let mut points: usize = 0;

    for result in results {
        let excerpt: String = result.prompt.chars().take(PROMPT_EXCERPT_CHARS).collect();
        let mut prompt_gaps = Vec::new();

        for engine_result in &result.engine_results {
            let visible = &engine_result.competitors_mentioned;
            let gap = |gap_type, client_position, message| Gap {
                gap_type,
                prompt: excerpt.clone(),
                engine: engine_result.engine,
                client_status: engine_result.mention_type,
                client_position,
                competitors: visible.clone(),
                message,
            };

            match engine_result.mention_type {
                status if !status.is_visible() && !visible.is_empty() => {
                    let verb = if visible.len() == 1 { "appears" } else { "appear" };
                    prompt_gaps.push(gap(
                        GapType::Red,
                        engine_result.ranking_position,
                        format!("{} {verb} but {client_name} does not", visible.join(", ")),
                    ));
                    points += RED_POINTS_PER_COMPETITOR * visible.len();
                }
                MentionType::Mentioned if !visible.is_empty() => {
                    if let Some(position) = engine_result.ranking_position.filter(|p| *p > 1) {
                        prompt_gaps.push(gap(
                            GapType::Yellow,
                            Some(position),
                            format!("{client_name} ranks #{position} while competitors also appear"),
                        ));
                        points += YELLOW_POINTS;
                    }
                }
                MentionType::Featured => {
                    prompt_gaps.push(gap(
                        GapType::Green,
                        Some(engine_result.ranking_position.unwrap_or(1)),
                        format!("{client_name} is featured as top recommendation"),
                    ));
                }
                _ => {}
            }
        }

        gaps.push(PromptGaps {
            prompt: result.prompt.clone(),
            gaps: prompt_gaps,
        });
    }

    let red = gaps_of_type(&gaps, GapType::Red);
    let yellow = gaps_of_type(&gaps, GapType::Yellow);
    let green = gaps_of_type(&gaps, GapType::Green);

    let recommendations = recommend(&red, yellow.len(), green.len(), client_name);

    let max_points = results.len() * 3 * competitors.len();
    let overall_gap_score = if max_points == 0 {
        0
    } else {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let score = (points as f64 * 100.0 / max_points as f64).round() as u32;
        score
    };

    let summary = GapSummary {
        total_prompts: results.len(),
        red_alerts: red.len(),
        yellow_alerts: yellow.len(),
        green_count: green.len(),
        overall_gap_score,
    };

    GapAnalysis {
        gaps,
        recommendations,
        summary,
    }
}

fn gaps_of_type(gaps: &[PromptGaps], gap_type: GapType) -> Vec<&Gap> {
    gaps.iter()
        .flat_map(|p| &p.gaps)
        .filter(|g| g.gap_type == gap_type)
        .collect()
}

/// Tally `items` preserving first-seen order, then sort by descending count.
fn rank_by_frequency<T: PartialEq + Clone>(items: impl IntoIterator<Item = T>) -> Vec<(T, usize)> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    // Stable sort keeps first-seen order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn recommend(red: &[&Gap], yellow: usize, green: usize, client_name: &str) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !red.is_empty() {
        let top_competitors: Vec<String> =
            rank_by_frequency(red.iter().flat_map(|g| g.competitors.iter().cloned()))
                .into_iter()
                .take(3)
                .map(|(name, _)| name)
                .collect();

        if !top_competitors.is_empty() {
            recommendations.push(Recommendation {
                priority: Priority::High,
                kind: RecommendationKind::CompetitorOutranking,
                message: format!(
                    "Focus on content optimization: {} frequently appear in AI responses where {client_name} is missing",
                    top_competitors.join(", ")
                ),
                action_items: vec![
                    "Analyze competitor content that AI systems are referencing".to_string(),
                    "Create comprehensive, authoritative content for missing topics".to_string(),
                    "Ensure brand name appears naturally in relevant content".to_string(),
                    "Build citations and references from authoritative sources".to_string(),
                ],
            });
        }

        if let Some((engine, _)) = rank_by_frequency(red.iter().map(|g| g.engine)).first() {
            let name = engine.display_name();
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                kind: RecommendationKind::EngineSpecific,
                message: format!("{name} shows lowest visibility, prioritize optimization for this platform"),
                action_items: vec![
                    format!("Research how {name} sources information"),
                    "Ensure content is accessible and well-structured".to_string(),
                    "Build presence on platforms that the engine references".to_string(),
                ],
            });
        }
    }

    if yellow > 0 {
        recommendations.push(Recommendation {
            priority: Priority::Medium,
            kind: RecommendationKind::RankingImprovement,
            message: format!(
                "Improve ranking position: {client_name} is mentioned but not as the top recommendation in {yellow} instance(s)"
            ),
            action_items: vec![
                "Strengthen unique value proposition in content".to_string(),
                "Gather more positive reviews and testimonials".to_string(),
                "Create comparison content highlighting advantages".to_string(),
            ],
        });
    }

    if green > 0 {
        recommendations.push(Recommendation {
            priority: Priority::Low,
            kind: RecommendationKind::MaintainPosition,
            message: format!("Strong visibility on {green} prompt(s), maintain current strategy"),
            action_items: vec![
                "Continue creating quality content".to_string(),
                "Monitor for changes in AI response patterns".to_string(),
                "Keep information up-to-date".to_string(),
            ],
        });
    }

    recommendations
}
