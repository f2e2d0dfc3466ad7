use rand::Rng;

/// Desktop Chrome user agents rotated across pages.
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

/// Common desktop viewport sizes.
const VIEWPORTS: [(u32, u32); 4] = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

/// Script injected before any page script runs to hide automation markers.
pub(crate) const STEALTH_SCRIPT: &str = r"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
window.chrome = window.chrome || { runtime: {} };
";

/// Per-page fingerprint applied before navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// Pick a random user agent and viewport.
    #[must_use]
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        let user_agent = USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())];
        let (width, height) = VIEWPORTS[rng.gen_range(0..VIEWPORTS.len())];

        Self {
            user_agent: user_agent.to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Random user agent with a fixed viewport (used where the window size is configured).
    #[must_use]
    pub fn with_viewport(width: u32, height: u32) -> Self {
        Self {
            viewport_width: width,
            viewport_height: height,
            ..Self::randomized()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_randomized_fingerprint() {
        let config = FingerprintConfig::randomized();
        assert!(USER_AGENTS.contains(&config.user_agent.as_str()));
        assert!(VIEWPORTS.contains(&(config.viewport_width, config.viewport_height)));
    }

    #[test]
    fn test_fingerprint_variation() {
        // Probabilistic, but 20 draws from 4 agents are all equal with p = 4^-19
        let configs: Vec<_> = (0..20).map(|_| FingerprintConfig::randomized()).collect();

        let first_ua = &configs[0].user_agent;
        let all_same = configs.iter().all(|c| &c.user_agent == first_ua);
        assert!(!all_same, "Expected variation in user agents");
    }

    #[test]
    fn test_fixed_viewport() {
        let config = FingerprintConfig::with_viewport(1200, 800);
        assert_eq!((config.viewport_width, config.viewport_height), (1200, 800));
        assert!(!config.user_agent.is_empty());
    }
}
