//! Deterministic, template-driven synthesis.

use std::fmt::Write;

use blogsmith_shared::{
    GenerationMethod, ReferenceDocument, Result, SourceDocument, truncate_chars, word_count,
};
use chrono::{DateTime, Utc};

use super::{Synthesis, SynthesisStrategy, domain_of};

/// Sentences per Overview paragraph.
const SENTENCES_PER_PARAGRAPH: usize = 3;

/// Key points taken from each reference.
const KEY_POINTS_PER_REFERENCE: usize = 3;

/// A reference sentence must be longer than this to count as a key point.
const MIN_KEY_POINT_CHARS: usize = 30;

/// Used when a reference has no sentence long enough to quote.
const KEY_POINT_FALLBACK_CHARS: usize = 200;

const TAKEAWAYS: [&str; 3] = [
    "Understanding the fundamentals is crucial for success",
    "Industry best practices emphasize quality and consistency",
    "Continuous learning and adaptation are key factors",
];

/// Composes a sectioned Markdown document without any external service.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedStrategy;

impl RuleBasedStrategy {
    /// Compose a document stamped with the current time.
    pub fn compose(&self, original: &SourceDocument, references: &[ReferenceDocument]) -> Synthesis {
        self.compose_at(original, references, Utc::now())
    }

    /// Compose a document stamped with `now`.
    pub fn compose_at(
        &self,
        original: &SourceDocument,
        references: &[ReferenceDocument],
        now: DateTime<Utc>,
    ) -> Synthesis {
        let mut out = String::new();

        // `write!` into a String cannot fail.
        let _ = writeln!(out, "# {}\n", original.title);
        let _ = writeln!(out, "## Overview\n\n{}\n", regroup_sentences(&original.body));

        if !references.is_empty() {
            out.push_str("## Industry Insights\n\n");
            out.push_str("Based on analysis of top-performing content in this domain:\n\n");
            for (i, reference) in references.iter().enumerate() {
                let _ = writeln!(out, "### {}. {}\n", i + 1, reference.title);
                let _ = writeln!(out, "{}\n", key_points(&reference.excerpt_body));
                let _ = writeln!(
                    out,
                    "**Source:** [{}]({})\n",
                    domain_of(&reference.source_url),
                    reference.source_url
                );
            }
        }

        out.push_str("## Key Takeaways\n\n");
        for takeaway in TAKEAWAYS {
            let _ = writeln!(out, "- {takeaway}");
        }

        let _ = writeln!(
            out,
            "\n## Conclusion\n\nThis comprehensive guide covers essential aspects of the topic \
             with {} words of in-depth analysis. By following these insights and staying updated \
             with industry trends, you can achieve better results.\n",
            word_count(&original.body)
        );

        out.push_str("---\n\n### References\n\n");
        for (i, reference) in references.iter().enumerate() {
            let _ = writeln!(out, "{}. [{}]({})", i + 1, reference.title, reference.source_url);
        }
        if !references.is_empty() {
            out.push('\n');
        }

        let _ = writeln!(out, "*Last updated: {}*  ", now.format("%Y-%m-%d"));
        let _ = writeln!(
            out,
            "*Enhanced with insights from {} industry sources*",
            references.len()
        );

        Synthesis {
            body: out,
            method: GenerationMethod::RuleBased,
            model: None,
        }
    }
}

impl SynthesisStrategy for RuleBasedStrategy {
    async fn synthesize(
        &self,
        original: &SourceDocument,
        references: &[ReferenceDocument],
    ) -> Result<Synthesis> {
        Ok(self.compose(original, references))
    }

    fn name(&self) -> &str {
        "rule-based"
    }
}

/// Split on `.` into trimmed, non-empty sentences.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split('.').map(str::trim).filter(|s| !s.is_empty())
}

/// Re-paragraph `text` into groups of three sentences.
fn regroup_sentences(text: &str) -> String {
    let all: Vec<&str> = sentences(text).collect();
    all.chunks(SENTENCES_PER_PARAGRAPH)
        .map(|group| format!("{}.", group.join(". ")))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First few substantial sentences of a reference excerpt.
fn key_points(text: &str) -> String {
    let points: Vec<&str> = sentences(text)
        .filter(|s| s.chars().count() > MIN_KEY_POINT_CHARS)
        .take(KEY_POINTS_PER_REFERENCE)
        .collect();

    if points.is_empty() {
        return truncate_chars(text.trim(), KEY_POINT_FALLBACK_CHARS);
    }
    format!("{}.", points.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    fn reference(title: &str, url: &str) -> ReferenceDocument {
        ReferenceDocument {
            title: title.into(),
            source_url: url.into(),
            excerpt_body: "Short. Chatbots reduce first response time for most support teams. \
                They also deflect repetitive tickets away from human agents. \
                Teams report higher satisfaction scores after rollout. Extra sentence here that is long."
                .into(),
            fetched_at: fixed_now(),
        }
    }

    fn section<'a>(body: &'a str, heading: &str) -> &'a str {
        let start = body.find(heading).expect("heading present") + heading.len();
        let rest = &body[start..];
        let end = rest.find("\n## ").or_else(|| rest.find("\n---")).unwrap_or(rest.len());
        rest[..end].trim()
    }

    fn reference_entries(body: &str) -> usize {
        let start = body.find("### References").expect("references heading");
        body[start..]
            .lines()
            .filter(|line| {
                line.split_once(". [")
                    .is_some_and(|(n, _)| n.chars().all(|c| c.is_ascii_digit()))
            })
            .count()
    }

    #[test]
    fn overview_regroups_into_threes() {
        let original =
            SourceDocument::new("X", "A. B. C. D.", "https://example.com/blog/x", "me", fixed_now());
        let out = RuleBasedStrategy.compose_at(&original, &[], fixed_now());

        assert_eq!(out.method, GenerationMethod::RuleBased);
        assert!(out.body.starts_with("# X\n\n## Overview\n\n"));
        assert_eq!(section(&out.body, "## Overview"), "A. B. C.\n\nD.");
        assert!(!out.body.contains("## Industry Insights"));
        assert_eq!(reference_entries(&out.body), 0);
        assert!(out.body.contains("*Enhanced with insights from 0 industry sources*"));
    }

    #[test]
    fn references_are_listed_and_cited() {
        let original = SourceDocument::new(
            "Support Automation",
            "Automation helps. It scales.",
            "https://example.com/blog/auto",
            "me",
            fixed_now(),
        );
        let refs = vec![
            reference("Chatbot Guide", "https://www.guide.example.com/chatbots"),
            reference("Helpdesk Trends", "https://trends.example.org/2026"),
        ];
        let out = RuleBasedStrategy.compose_at(&original, &refs, fixed_now());

        assert_eq!(reference_entries(&out.body), 2);
        assert!(out.body.contains("### 1. Chatbot Guide"));
        assert!(out.body.contains("### 2. Helpdesk Trends"));
        assert!(out
            .body
            .contains("**Source:** [guide.example.com](https://www.guide.example.com/chatbots)"));
        assert!(out.body.contains("1. [Chatbot Guide](https://www.guide.example.com/chatbots)"));
        assert!(out.body.contains("*Last updated: 2026-03-14*"));
        assert!(out.body.contains("insights from 2 industry sources"));
    }

    #[test]
    fn key_points_skip_short_sentences() {
        let points = key_points(&reference("t", "https://a.example").excerpt_body);
        assert!(points.starts_with("Chatbots reduce first response time"));
        assert!(!points.contains("Short"));
        assert!(!points.contains("Extra sentence"));
        assert!(points.ends_with("after rollout."));
    }

    #[test]
    fn key_points_fall_back_to_leading_text() {
        assert_eq!(key_points("  Tiny. Bits.  "), "Tiny. Bits.");
    }

    #[test]
    fn takeaways_and_conclusion_are_fixed_form() {
        let original = SourceDocument::new(
            "Count",
            "one two three four five",
            "https://example.com/blog/c",
            "me",
            fixed_now(),
        );
        let out = RuleBasedStrategy.compose_at(&original, &[], fixed_now());

        let takeaways = section(&out.body, "## Key Takeaways");
        assert_eq!(takeaways.lines().count(), 3);
        assert!(takeaways.lines().all(|l| l.starts_with("- ")));
        assert!(section(&out.body, "## Conclusion").contains("with 5 words of in-depth analysis"));
    }
}
