//! The three-layer skill extraction engine
//!
//! Layer 1 consumes known multi-word phrases, layer 2 consumes trigger
//! templates ("experience with X"), layer 3 consumes direct reference
//! matches. A span consumed by an earlier layer blocks every later layer,
//! which is what gives phrases priority over their fragments.

use crate::skills::reference::{ReferenceError, SkillReference};
use regex::Regex;
use std::collections::HashSet;

/// Trigger templates for the context layer
///
/// Group 1 captures the candidate text following the trigger phrase.
const CONTEXT_TEMPLATES: &[&str] = &[
    r"(?i)\bexperience (?:with|in|using)\s+([A-Za-z0-9+#][A-Za-z0-9+#./,\- ]{0,60})",
    r"(?i)\bproficien(?:t|cy) (?:with|in)\s+([A-Za-z0-9+#][A-Za-z0-9+#./,\- ]{0,60})",
    r"(?i)\bknowledge of\s+([A-Za-z0-9+#][A-Za-z0-9+#./,\- ]{0,60})",
    r"(?i)\bfamiliar(?:ity)? with\s+([A-Za-z0-9+#][A-Za-z0-9+#./,\- ]{0,60})",
    r"(?i)\bexpertise in\s+([A-Za-z0-9+#][A-Za-z0-9+#./,\- ]{0,60})",
    r"(?i)\bskilled in\s+([A-Za-z0-9+#][A-Za-z0-9+#./,\- ]{0,60})",
    r"(?i)\bbackground in\s+([A-Za-z0-9+#][A-Za-z0-9+#./,\- ]{0,60})",
    r"(?i)\bworking with\s+([A-Za-z0-9+#][A-Za-z0-9+#./,\- ]{0,60})",
];

/// High-precision single-token patterns, matched case-sensitively
///
/// The regex crate has no lookaround; a case-sensitive match plus the
/// word-boundary check below rejects the common-English collisions
/// (e.g. "Go" inside "going") a negative lookaround would.
const PRECISE_TOKENS: &[(&str, &str)] = &[("Go", "Go"), ("R", "R"), ("C", "C")];

struct CompiledPattern {
    canonical: String,
    regex: Regex,
    /// Pattern length, used to order longest-first within a layer
    len: usize,
}

/// A candidate produced by one match layer; transient, never persisted
struct SkillCandidate {
    canonical: String,
    start: usize,
    layer: u8,
}

/// Deterministic description-to-skills extractor
///
/// All patterns are compiled once at construction from the loaded skill
/// reference; `extract` is a pure function of its input afterwards.
pub struct SkillExtractor {
    reference: SkillReference,
    phrases: Vec<CompiledPattern>,
    singles: Vec<CompiledPattern>,
    precise: Vec<CompiledPattern>,
    contexts: Vec<Regex>,
}

impl SkillExtractor {
    /// Compiles an extractor from a loaded skill reference
    pub fn new(reference: SkillReference) -> Result<Self, ReferenceError> {
        let mut phrases = Vec::new();
        let mut singles = Vec::new();

        for entry in reference.entries() {
            // The canonical name always matches itself, whether or not it
            // is repeated in the pattern list
            let mut patterns: Vec<String> =
                entry.patterns.iter().map(|p| p.to_lowercase()).collect();
            let name_lower = entry.name.to_lowercase();
            if !patterns.contains(&name_lower) {
                patterns.push(name_lower);
            }

            for pattern in patterns {
                let compiled = compile_pattern(&entry.name, &pattern, false)?;
                if pattern.contains(' ') {
                    phrases.push(compiled);
                } else {
                    singles.push(compiled);
                }
            }
        }

        // Longest patterns first so a fragment can never shadow its phrase
        phrases.sort_by(|a, b| b.len.cmp(&a.len));
        singles.sort_by(|a, b| b.len.cmp(&a.len));

        let precise = PRECISE_TOKENS
            .iter()
            .map(|(name, token)| compile_pattern(name, token, true))
            .collect::<Result<Vec<_>, _>>()?;

        let contexts = CONTEXT_TEMPLATES
            .iter()
            .map(|template| {
                Regex::new(template).map_err(|e| ReferenceError::Pattern {
                    name: "context-template".to_string(),
                    pattern: template.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            reference,
            phrases,
            singles,
            precise,
            contexts,
        })
    }

    /// Extracts the deduplicated canonical skill list from a description
    ///
    /// Output is ordered by first occurrence in the text. Empty or
    /// whitespace-only input yields an empty list; unmatched text simply
    /// contributes nothing.
    pub fn extract(&self, description: &str) -> Vec<String> {
        if description.trim().is_empty() {
            return Vec::new();
        }

        let mut consumed: Vec<(usize, usize)> = Vec::new();
        let mut candidates: Vec<SkillCandidate> = Vec::new();

        // Layer 1: multi-word phrases
        self.scan_patterns(description, &self.phrases, 1, &mut consumed, &mut candidates);

        // Layer 2: trigger templates
        for template in &self.contexts {
            for caps in template.captures_iter(description) {
                let group = match caps.get(1) {
                    Some(g) => g,
                    None => continue,
                };
                if overlaps_any(&consumed, group.start(), group.end()) {
                    continue;
                }

                let resolved = self.resolve_capture(group.as_str());
                if resolved.is_empty() {
                    continue;
                }

                consumed.push((group.start(), group.end()));
                for canonical in resolved {
                    candidates.push(SkillCandidate {
                        canonical,
                        start: group.start(),
                        layer: 2,
                    });
                }
            }
        }

        // Layer 3: direct reference matches, then the precision set
        self.scan_patterns(description, &self.singles, 3, &mut consumed, &mut candidates);
        self.scan_patterns(description, &self.precise, 3, &mut consumed, &mut candidates);

        // Normalization: first-occurrence order, deduplicated
        candidates.sort_by(|a, b| a.start.cmp(&b.start).then(a.layer.cmp(&b.layer)));

        let mut seen = HashSet::new();
        let mut skills: Vec<String> = Vec::new();
        for candidate in candidates {
            if seen.insert(candidate.canonical.clone()) {
                skills.push(candidate.canonical);
            }
        }

        // Suppression: a present superset removes its subsumed abbreviations
        for rule in self.reference.suppressions() {
            if skills.iter().any(|s| s == &rule.canonical) {
                skills.retain(|s| s == &rule.canonical || !rule.subsumes.contains(s));
            }
        }

        skills
    }

    fn scan_patterns(
        &self,
        text: &str,
        patterns: &[CompiledPattern],
        layer: u8,
        consumed: &mut Vec<(usize, usize)>,
        candidates: &mut Vec<SkillCandidate>,
    ) {
        for pattern in patterns {
            for m in pattern.regex.find_iter(text) {
                if overlaps_any(consumed, m.start(), m.end())
                    || !word_bounded(text, m.start(), m.end())
                {
                    continue;
                }

                consumed.push((m.start(), m.end()));
                candidates.push(SkillCandidate {
                    canonical: pattern.canonical.clone(),
                    start: m.start(),
                    layer,
                });
            }
        }
    }

    /// Resolves a context capture through the canonical map
    ///
    /// The capture is split on list separators; segments that do not
    /// resolve are retried word by word. Anything that never resolves is
    /// dropped rather than leaking free text into the skill list.
    fn resolve_capture(&self, raw: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        for segment in split_capture(raw) {
            if let Some(canonical) = self.resolve_token(&segment) {
                push_unique(&mut out, &canonical);
                continue;
            }
            for word in segment.split_whitespace() {
                if let Some(canonical) = self.resolve_token(word) {
                    push_unique(&mut out, &canonical);
                }
            }
        }

        out
    }

    /// Canonical-map lookup that also recognizes the case-sensitive
    /// precision tokens, so "experience with Go" resolves even though
    /// "go" is deliberately absent from the reference
    fn resolve_token(&self, raw: &str) -> Option<String> {
        if let Some(canonical) = self.reference.resolve(raw) {
            return Some(canonical.to_string());
        }

        let trimmed = raw.trim();
        self.precise
            .iter()
            .find(|p| p.canonical == trimmed)
            .map(|p| p.canonical.clone())
    }
}

fn push_unique(out: &mut Vec<String>, canonical: &str) {
    if !out.iter().any(|s| s == canonical) {
        out.push(canonical.to_string());
    }
}

fn compile_pattern(
    canonical: &str,
    pattern: &str,
    case_sensitive: bool,
) -> Result<CompiledPattern, ReferenceError> {
    let source = if case_sensitive {
        regex::escape(pattern)
    } else {
        format!("(?i){}", regex::escape(pattern))
    };

    let regex = Regex::new(&source).map_err(|e| ReferenceError::Pattern {
        name: canonical.to_string(),
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    Ok(CompiledPattern {
        canonical: canonical.to_string(),
        regex,
        len: pattern.len(),
    })
}

fn split_capture(raw: &str) -> Vec<String> {
    raw.split(',')
        .flat_map(|part| part.split(" and "))
        .flat_map(|part| part.split(" or "))
        .map(|s| s.trim().trim_end_matches('.').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn overlaps_any(consumed: &[(usize, usize)], start: usize, end: usize) -> bool {
    consumed.iter().any(|&(s, e)| start < e && s < end)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Word-boundary check equivalent to `\b` at both match edges
///
/// A boundary is only required where the matched edge itself is a word
/// character, so patterns like "c++" terminate cleanly at punctuation.
fn word_bounded(text: &str, start: usize, end: usize) -> bool {
    let matched = &text[start..end];

    let first_is_word = matched.chars().next().map(is_word_char).unwrap_or(false);
    let last_is_word = matched
        .chars()
        .next_back()
        .map(is_word_char)
        .unwrap_or(false);

    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();

    let before_ok = !first_is_word || !before.map(is_word_char).unwrap_or(false);
    let after_ok = !last_is_word || !after.map(is_word_char).unwrap_or(false);

    before_ok && after_ok
}
