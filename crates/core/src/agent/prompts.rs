//! Stage prompt templates bundled at compile time.

/// Signal Analyst - root-cause analysis over the telemetry brief
pub const SIGNAL_ANALYST: &str = include_str!("defaults/signal_analyst.md");

/// Strategist - turns an analysis into an actionable recommendation
pub const STRATEGIST: &str = include_str!("defaults/strategist.md");

/// Critic - reviews a recommendation and gates regeneration
pub const CRITIC: &str = include_str!("defaults/critic.md");

/// All stage prompts with their slugs
pub fn all() -> Vec<(&'static str, &'static str)> {
    vec![
        ("signal_analyst", SIGNAL_ANALYST),
        ("strategist", STRATEGIST),
        ("critic", CRITIC),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_prompts_non_empty() {
        for (slug, content) in all() {
            assert!(content.len() > 50, "Prompt '{}' seems too short", slug);
        }
    }

    #[test]
    fn test_prompts_are_distinct() {
        assert_ne!(SIGNAL_ANALYST, STRATEGIST);
        assert_ne!(STRATEGIST, CRITIC);
    }
}
