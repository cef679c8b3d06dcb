use serde::{Deserialize, Serialize};

/// Cutoffs and output bounds for the retrieval tiers.
///
/// Every cutoff is exclusive: a candidate must score strictly above it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    pub dataset_cutoff: f64,
    pub guide_title_cutoff: f64,
    pub guide_content_cutoff: f64,
    pub pdf_cutoff: f64,
    pub summary_max_chars: usize,
    pub pdf_snippet_chars: usize,
    pub guide_collection: String,
    pub pdf_collection: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            dataset_cutoff: 0.7,
            guide_title_cutoff: 0.8,
            guide_content_cutoff: 0.6,
            pdf_cutoff: 0.6,
            summary_max_chars: 1000,
            pdf_snippet_chars: 500,
            guide_collection: "knowledge_guides".to_string(),
            pdf_collection: "pdfs".to_string(),
        }
    }
}

/// What happens to a message with no land-related keyword.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OffTopicPolicy {
    /// Answer 403 with the fixed rejection text.
    #[default]
    Reject,
    /// Answer 200 with one of the redirect strings.
    Redirect,
}

impl std::str::FromStr for OffTopicPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "redirect" => Ok(Self::Redirect),
            other => Err(format!("unknown off-topic policy: {other} (allowed: reject, redirect)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_tuned_values() {
        let c = MatchConfig::default();
        assert_eq!(c.dataset_cutoff, 0.7);
        assert_eq!(c.guide_title_cutoff, 0.8);
        assert!(c.guide_title_cutoff > c.guide_content_cutoff);
        assert_eq!(c.summary_max_chars, 1000);
    }

    #[test]
    fn off_topic_policy_parses() {
        assert_eq!("Redirect".parse::<OffTopicPolicy>(), Ok(OffTopicPolicy::Redirect));
        assert_eq!(" reject ".parse::<OffTopicPolicy>(), Ok(OffTopicPolicy::Reject));
        assert!("maybe".parse::<OffTopicPolicy>().is_err());
    }
}
