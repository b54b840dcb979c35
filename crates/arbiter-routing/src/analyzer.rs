//! Deterministic query complexity scoring.
//!
//! The analyzer is pure: same text in, same report out, no IO and no
//! clock. Each rule contributes points from `AnalyzerConfig` and pushes a
//! named indicator, so any routing decision can be explained afterwards.

use regex::{Regex, escape};

use arbiter_core::{AnalyzerConfig, ComplexityLevel, ComplexityReport};

/// Phrases that mark a short lookup-style question.
const SIMPLE_INTENT_PHRASES: &[&str] = &[
    "what is",
    "what are",
    "who is",
    "when was",
    "where is",
    "define",
    "meaning of",
];

/// Keywords that mark analysis or design work.
const COMPLEX_INTENT_KEYWORDS: &[&str] = &[
    "analyze",
    "architect",
    "benchmark",
    "compare",
    "debug",
    "design",
    "evaluate",
    "implement",
    "integrate",
    "migrate",
    "optimize",
    "refactor",
    "trade-off",
    "tradeoff",
];

/// Vocabulary that suggests a technical answer is expected.
const TECHNICAL_TERMS: &[&str] = &[
    "algorithm",
    "api",
    "async",
    "cache",
    "compiler",
    "concurrency",
    "database",
    "encryption",
    "kubernetes",
    "latency",
    "protocol",
    "regex",
    "runtime",
    "schema",
    "thread",
];

/// Words that refer back to earlier conversation turns.
const CONTEXT_REFERENCES: &[&str] = &[
    "above",
    "aforementioned",
    "earlier",
    "mentioned",
    "previous",
    "previously",
];

/// Sequencing words that mark a multi-step request.
const MULTI_STEP_WORDS: &[&str] = &["first", "then", "next", "finally", "afterwards", "lastly"];

/// Substrings that betray source code outside backticks.
const CODE_TOKENS: &[&str] = &[
    "fn ", "def ", "class ", "impl ", "#include", "=>", "->", "();", "&&", "||",
];

/// Scores query text into a complexity level with named indicators.
pub struct QueryAnalyzer {
    config: AnalyzerConfig,
    simple_intent: Option<Regex>,
    complex_intent: Option<Regex>,
    technical_terms: Option<Regex>,
    context_references: Option<Regex>,
    multi_step: Option<Regex>,
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl QueryAnalyzer {
    /// Creates an analyzer with the given weights and thresholds.
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            simple_intent: boundary_regex(SIMPLE_INTENT_PHRASES),
            complex_intent: boundary_regex(COMPLEX_INTENT_KEYWORDS),
            technical_terms: boundary_regex(TECHNICAL_TERMS),
            context_references: boundary_regex(CONTEXT_REFERENCES),
            multi_step: boundary_regex(MULTI_STEP_WORDS),
        }
    }

    /// Scores one query into a full report.
    ///
    /// Empty or whitespace-only text scores zero and classifies as
    /// `Simple` with no indicators.
    #[must_use]
    pub fn analyze(&self, text: &str) -> ComplexityReport {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ComplexityReport {
                level: ComplexityLevel::Simple,
                score: 0,
                confidence: 0.0,
                indicators: Vec::new(),
            };
        }

        let lowered = trimmed.to_lowercase();
        let mut indicators = Vec::new();
        let mut score: u32 = 0;

        score += self.score_length(trimmed, &mut indicators);
        self.note_simple_intent(&lowered, &mut indicators);
        score += self.score_complex_intent(&lowered, &mut indicators);
        score += self.score_compound_question(trimmed, &mut indicators);
        score += self.score_technical_terms(&lowered, &mut indicators);
        score += self.score_code(trimmed, &mut indicators);
        score += self.score_context_reference(&lowered, &mut indicators);
        score += self.score_multi_step(&lowered, &mut indicators);

        let level = if score <= self.config.simple_max_score {
            ComplexityLevel::Simple
        } else if score <= self.config.medium_max_score {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Complex
        };
        let confidence = (f64::from(score) / self.config.confidence_divisor).min(1.0);

        ComplexityReport {
            level,
            score,
            confidence,
            indicators,
        }
    }

    /// Points for overall query length, banded by character count.
    fn score_length(&self, text: &str, indicators: &mut Vec<String>) -> u32 {
        let config = &self.config;
        let length = text.chars().count();

        if length >= config.length_very_long_chars {
            indicators.push(format!("length:{}+", config.length_very_long_chars));
            config.length_very_long_points
        } else if length >= config.length_long_chars {
            indicators.push(format!(
                "length:{}-{}",
                config.length_long_chars,
                config.length_very_long_chars - 1
            ));
            config.length_long_points
        } else if length >= config.length_medium_chars {
            indicators.push(format!(
                "length:{}-{}",
                config.length_medium_chars,
                config.length_long_chars - 1
            ));
            config.length_medium_points
        } else {
            0
        }
    }

    /// Lookup-style phrasing is indicator-only; it never adds points.
    fn note_simple_intent(&self, lowered: &str, indicators: &mut Vec<String>) {
        for phrase in distinct_matches(self.simple_intent.as_ref(), lowered) {
            indicators.push(format!("simple-intent:{phrase}"));
        }
    }

    /// Flat points when any complex keyword fires, plus a bonus for two
    /// or more distinct keywords.
    fn score_complex_intent(&self, lowered: &str, indicators: &mut Vec<String>) -> u32 {
        let matched = distinct_matches(self.complex_intent.as_ref(), lowered);
        if matched.is_empty() {
            return 0;
        }

        let distinct = matched.len();
        for keyword in matched {
            indicators.push(format!("complex-intent:{keyword}"));
        }

        let mut points = self.config.complex_keyword_points;
        if distinct >= 2 {
            points += self.config.multiple_keyword_bonus;
        }
        points
    }

    /// Points when the text asks more than one question.
    fn score_compound_question(&self, text: &str, indicators: &mut Vec<String>) -> u32 {
        if text.matches('?').count() > 1 {
            indicators.push("compound-question".to_owned());
            self.config.compound_question_points
        } else {
            0
        }
    }

    /// Points when technical vocabulary is present.
    fn score_technical_terms(&self, lowered: &str, indicators: &mut Vec<String>) -> u32 {
        let hit = self
            .technical_terms
            .as_ref()
            .is_some_and(|regex| regex.is_match(lowered));
        if hit {
            indicators.push("technical-terms".to_owned());
            self.config.technical_term_points
        } else {
            0
        }
    }

    /// Points when the text carries code, with the strongest signal named.
    fn score_code(&self, text: &str, indicators: &mut Vec<String>) -> u32 {
        let indicator = if text.contains("```") {
            "code:fenced"
        } else if text.matches('`').count() >= 2 {
            "code:inline"
        } else if CODE_TOKENS.iter().any(|token| text.contains(token)) {
            "code:tokens"
        } else {
            return 0;
        };

        indicators.push(indicator.to_owned());
        self.config.code_points
    }

    /// Points when the text refers back to earlier conversation.
    fn score_context_reference(&self, lowered: &str, indicators: &mut Vec<String>) -> u32 {
        let hit = self
            .context_references
            .as_ref()
            .is_some_and(|regex| regex.is_match(lowered));
        if hit {
            indicators.push("context-reference".to_owned());
            self.config.context_reference_points
        } else {
            0
        }
    }

    /// Points when sequencing words lay out multiple steps.
    fn score_multi_step(&self, lowered: &str, indicators: &mut Vec<String>) -> u32 {
        let hit = self
            .multi_step
            .as_ref()
            .is_some_and(|regex| regex.is_match(lowered));
        if hit {
            indicators.push("multi-step".to_owned());
            self.config.multi_step_points
        } else {
            0
        }
    }
}

/// Distinct matched strings in sorted order.
fn distinct_matches(regex: Option<&Regex>, text: &str) -> Vec<String> {
    let Some(regex) = regex else {
        return Vec::new();
    };

    let mut found: Vec<String> = regex
        .find_iter(text)
        .map(|matched| matched.as_str().to_owned())
        .collect();
    found.sort_unstable();
    found.dedup();
    found
}

/// Word-boundary alternation over a fixed lowercase word list.
///
/// Boundaries keep "then" from firing inside "authentication". The lists
/// are static, so compilation cannot realistically fail; a failed compile
/// simply disables that rule.
fn boundary_regex(words: &[&str]) -> Option<Regex> {
    let escaped: Vec<String> = words.iter().map(|word| escape(word)).collect();
    Regex::new(&format!(r"\b(?:{})\b", escaped.join("|"))).ok()
}
