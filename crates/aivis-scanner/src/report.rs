//! Visibility report aggregation.

use aivis_analysis::{analyze_gaps, GapAnalysis};
use aivis_core::{ClientId, ClientProfile, Engine, MentionType, PromptResult, ScanId, Timestamp};
use serde::{Deserialize, Serialize};

/// Maximum weight of a single engine response (a featured mention).
const MAX_RESPONSE_WEIGHT: u64 = 3;

/// Outcome of one completed scan. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub scan_id: ScanId,
    pub client_id: ClientId,
    pub client_name: String,
    /// Weighted visibility in `[0, 100]`
    pub overall_score: u32,
    pub prompt_count: usize,
    pub featured_count: usize,
    pub mentioned_count: usize,
    pub competitor_only_count: usize,
    pub not_found_count: usize,
    pub best_engine: Engine,
    pub worst_engine: Engine,
    /// Unlisted competitors across all responses, first-seen order
    pub new_competitors_detected: Vec<String>,
    pub prompt_results: Vec<PromptResult>,
    pub gap_analysis: GapAnalysis,
    pub created_at: Timestamp,
}

#[derive(Debug, Default, Clone, Copy)]
struct EngineTally {
    visible: usize,
    total: usize,
}

impl EngineTally {
    #[allow(clippy::cast_precision_loss)]
    fn rate(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.visible as f64 / self.total as f64
        }
    }
}

impl Report {
    /// Aggregate per-prompt results into a report.
    ///
    /// Scoring assumes one result per engine per prompt.
    #[must_use]
    pub fn aggregate(
        scan_id: ScanId,
        client: &ClientProfile,
        prompt_results: Vec<PromptResult>,
    ) -> Self {
        let mut featured_count = 0;
        let mut mentioned_count = 0;
        let mut competitor_only_count = 0;
        let mut not_found_count = 0;
        let mut tallies = [EngineTally::default(); Engine::ALL.len()];
        let mut new_competitors_detected: Vec<String> = Vec::new();

        for result in prompt_results.iter().flat_map(|pr| &pr.engine_results) {
            let tally = &mut tallies[engine_index(result.engine)];
            tally.total += 1;
            if result.mention_type.is_visible() {
                tally.visible += 1;
            }

            match result.mention_type {
                MentionType::Featured => featured_count += 1,
                MentionType::Mentioned => mentioned_count += 1,
                MentionType::CompetitorOnly => competitor_only_count += 1,
                MentionType::NotFound => not_found_count += 1,
            }

            for name in &result.new_competitors_found {
                if !new_competitors_detected.contains(name) {
                    new_competitors_detected.push(name.clone());
                }
            }
        }

        let prompt_count = prompt_results.len();
        let gap_analysis = analyze_gaps(&prompt_results, &client.name, &client.competitors);

        Self {
            scan_id,
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            overall_score: overall_score(prompt_count, featured_count, mentioned_count),
            prompt_count,
            featured_count,
            mentioned_count,
            competitor_only_count,
            not_found_count,
            best_engine: pick_engine(&tallies, |rate, best| rate > best),
            worst_engine: pick_engine(&tallies, |rate, worst| rate < worst),
            new_competitors_detected,
            prompt_results,
            gap_analysis,
            created_at: Timestamp::now(),
        }
    }
}

/// `round(100 * (3 * featured + 2 * mentioned) / (3 * 3 * prompt_count))`
#[must_use]
pub fn overall_score(prompt_count: usize, featured: usize, mentioned: usize) -> u32 {
    let max_points = MAX_RESPONSE_WEIGHT * Engine::ALL.len() as u64 * prompt_count as u64;
    if max_points == 0 {
        return 0;
    }
    let points = u64::from(MentionType::Featured.score_weight()) * featured as u64
        + u64::from(MentionType::Mentioned.score_weight()) * mentioned as u64;

    // Integer round-half-up of 100 * points / max_points
    let score = (200 * points + max_points) / (2 * max_points);
    u32::try_from(score.min(100)).unwrap_or(100)
}

fn engine_index(engine: Engine) -> usize {
    Engine::ALL
        .iter()
        .position(|e| *e == engine)
        .unwrap_or_default()
}

/// First engine in enumeration order whose rate beats all earlier ones.
fn pick_engine(tallies: &[EngineTally], better: impl Fn(f64, f64) -> bool) -> Engine {
    let mut chosen = 0;
    for (i, tally) in tallies.iter().enumerate().skip(1) {
        if better(tally.rate(), tallies[chosen].rate()) {
            chosen = i;
        }
    }
    Engine::ALL[chosen]
}

#[cfg(test)]
mod tests {
    use super::*;
    use aivis_core::EngineResult;

    fn result(engine: Engine, mention_type: MentionType) -> EngineResult {
        EngineResult {
            mention_type,
            error: None,
            response_text: "text".to_string(),
            ..EngineResult::failed(engine, "unused")
        }
    }

    fn prompt(types: [MentionType; 3]) -> PromptResult {
        PromptResult {
            prompt: "best plumbers".to_string(),
            engine_results: Engine::ALL
                .iter()
                .zip(types)
                .map(|(engine, t)| result(*engine, t))
                .collect(),
        }
    }

    fn client() -> ClientProfile {
        ClientProfile {
            id: ClientId::new("client-1").unwrap(),
            name: "Acme Co".to_string(),
            domain: None,
            competitors: vec![],
        }
    }

    #[test]
    fn test_overall_score_formula() {
        assert_eq!(overall_score(2, 1, 1), 28);
        assert_eq!(overall_score(3, 6, 0), 67);
        assert_eq!(overall_score(1, 3, 0), 100);
        assert_eq!(overall_score(4, 0, 0), 0);
        assert_eq!(overall_score(0, 0, 0), 0);
    }

    #[test]
    fn test_counts_and_engines() {
        use MentionType::{CompetitorOnly, Featured, Mentioned, NotFound};

        let report = Report::aggregate(
            ScanId::new("scan-1").unwrap(),
            &client(),
            vec![
                prompt([NotFound, Featured, Mentioned]),
                prompt([CompetitorOnly, Featured, NotFound]),
            ],
        );

        assert_eq!(report.prompt_count, 2);
        assert_eq!(report.featured_count, 2);
        assert_eq!(report.mentioned_count, 1);
        assert_eq!(report.competitor_only_count, 1);
        assert_eq!(report.not_found_count, 2);
        assert_eq!(report.best_engine, Engine::Perplexity);
        assert_eq!(report.worst_engine, Engine::ChatGpt);
        // (3*2 + 2*1) / 18 = 44.4%
        assert_eq!(report.overall_score, 44);
    }

    #[test]
    fn test_engine_ties_resolve_to_enumeration_order() {
        use MentionType::{Featured, NotFound};

        let report = Report::aggregate(
            ScanId::new("scan-1").unwrap(),
            &client(),
            vec![prompt([Featured, Featured, Featured])],
        );
        assert_eq!(report.best_engine, Engine::ChatGpt);
        assert_eq!(report.worst_engine, Engine::ChatGpt);

        let report = Report::aggregate(
            ScanId::new("scan-1").unwrap(),
            &client(),
            vec![prompt([NotFound, Featured, NotFound])],
        );
        assert_eq!(report.best_engine, Engine::Perplexity);
        assert_eq!(report.worst_engine, Engine::ChatGpt);
    }

    #[test]
    fn test_new_competitors_deduplicated_first_seen() {
        let mut first = prompt([MentionType::NotFound; 3]);
        first.engine_results[0].new_competitors_found =
            vec!["Bolt Plumbing".to_string(), "Delta Drains".to_string()];
        first.engine_results[2].new_competitors_found = vec!["Bolt Plumbing".to_string()];
        let mut second = prompt([MentionType::NotFound; 3]);
        second.engine_results[1].new_competitors_found =
            vec!["Riverside Pipe".to_string(), "Delta Drains".to_string()];

        let report = Report::aggregate(ScanId::new("scan-1").unwrap(), &client(), vec![first, second]);
        assert_eq!(
            report.new_competitors_detected,
            vec!["Bolt Plumbing", "Delta Drains", "Riverside Pipe"]
        );
    }

    #[test]
    fn test_report_serializes() {
        let report = Report::aggregate(
            ScanId::new("scan-1").unwrap(),
            &client(),
            vec![prompt([MentionType::Featured; 3])],
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overall_score"], 100);
        assert_eq!(json["best_engine"], "CHATGPT");
        assert_eq!(json["prompt_results"][0]["engine_results"][0]["mention_type"], "FEATURED");
    }
}
