//! Robots.txt parsing
//!
//! Disallow matching is delegated to the `robotstxt` crate (a port of
//! Google's matcher). `Crawl-delay` and `Sitemap` are not exposed by that
//! crate, so they are extracted here with a small line parser.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data for one host
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty means allow all)
    content: String,
    /// True when the file could not be fetched: treat the host as unrestricted
    unrestricted: bool,
}

impl ParsedRobots {
    /// Creates a ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            unrestricted: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt cannot be fetched: a missing or broken file
    /// never blocks the audit.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            unrestricted: true,
        }
    }

    /// Checks if a URL (or URL path) is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.unrestricted || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the Crawl-delay for a user agent, in seconds
    ///
    /// A delay declared for the specific agent wins over a wildcard delay.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.unrestricted || self.content.is_empty() {
            return None;
        }

        let agent = user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => group_agents.push(value.to_lowercase()),
                "crawl-delay" => {
                    if let Ok(delay) = value.parse::<f64>() {
                        if group_agents.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                            agent_delay = Some(delay);
                        } else if group_agents.iter().any(|ua| ua == "*") {
                            wildcard_delay = Some(delay);
                        }
                    }
                    // A crawl-delay closes the group; the next User-agent
                    // line starts a fresh one.
                    group_agents.clear();
                }
                _ => {}
            }
        }

        agent_delay.or(wildcard_delay)
    }

    /// Extracts Sitemap directives declared in the robots.txt file
    pub fn sitemaps(&self) -> Vec<String> {
        self.content
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                let (key, value) = line.split_once(':')?;
                if key.trim().eq_ignore_ascii_case("sitemap") {
                    let value = value.trim();
                    (!value.is_empty()).then(|| value.to_string())
                } else {
                    None
                }
            })
            .collect()
    }
}
