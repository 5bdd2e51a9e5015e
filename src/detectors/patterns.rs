//! Naming-pattern detection.
//!
//! Scans a flat list of entity names and infers the recurring name templates
//! CAD exporters stamp onto parts ("Wall_01", "Wall_02", ... -> "Wall").
//! One representative pattern is derived per input name by a greedy
//! character-classification scan; the deduplicated set is returned sorted
//! ascending by length so broad patterns run before narrow ones refine the
//! remaining selection.
//!
//! The scan's thresholds (11-name minimum, 4-word cutoff, 3-character noise
//! lookahead) are fixed behavior, not tunables.

use indexmap::IndexSet;
use tracing::debug;

use crate::rules::engine::{PatternRule, RuleAction};

/// Minimum number of names before the heuristic is considered reliable.
/// Below this the detector returns an empty result.
pub const MIN_RELIABLE_NAMES: usize = 11;

/// Accumulation stops once this many separator characters have been seen.
const MAX_WORDS: usize = 4;

/// Accumulation stops when this many consecutive noise characters follow
/// the current position.
const NOISE_LOOKAHEAD: usize = 3;

/// Punctuation characters classified as noise, alongside digits and
/// whitespace.
const NOISE_PUNCTUATION: &str = "-_,.()[]{}<>|/\\:;!@#$%^&*+=`~\"'?";

/// Name-template detector over a list of entity name strings.
#[derive(Debug, Default)]
pub struct PatternDetector;

impl PatternDetector {
    /// Infer the deduplicated pattern set from a list of names, sorted
    /// ascending by length (ties broken lexicographically for determinism).
    ///
    /// Fewer than 11 names yields an empty result; the heuristic needs a
    /// population to be meaningful.
    pub fn detect<S: AsRef<str>>(names: &[S]) -> Vec<String> {
        if names.len() < MIN_RELIABLE_NAMES {
            debug!(
                names = names.len(),
                "too few names for reliable pattern detection"
            );
            return Vec::new();
        }

        let mut patterns: IndexSet<String> = IndexSet::new();
        for name in names {
            let pattern = scan_name(name.as_ref());
            if !pattern.is_empty() {
                patterns.insert(pattern);
            }
        }

        let mut patterns: Vec<String> = patterns.into_iter().collect();
        patterns.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        debug!(
            names = names.len(),
            patterns = patterns.len(),
            "pattern detection complete"
        );
        patterns
    }

    /// Seed a default rule list from detected patterns: one ORGANIZE rule per
    /// pattern with an empty output name (which falls back to the sample at
    /// execution time).
    pub fn to_rules(patterns: &[String]) -> Vec<PatternRule> {
        patterns
            .iter()
            .map(|sample| PatternRule::new(sample.clone(), RuleAction::Organize))
            .collect()
    }
}

/// Derive one pattern from one name via the greedy classification scan.
fn scan_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut buffer = String::new();
    let mut words = 0;

    // Leading noise never starts accumulation.
    let mut index = 0;
    while index < chars.len() && is_noise(chars[index]) {
        index += 1;
    }

    while index < chars.len() {
        let c = chars[index];
        buffer.push(c);
        if is_separator(c) {
            words += 1;
            if words >= MAX_WORDS {
                break;
            }
        }
        if upcoming_noise_run(&chars, index + 1) {
            break;
        }
        index += 1;
    }

    buffer
}

/// Whether `NOISE_LOOKAHEAD` consecutive noise characters start at `from`.
fn upcoming_noise_run(chars: &[char], from: usize) -> bool {
    chars.len() >= from + NOISE_LOOKAHEAD
        && chars[from..from + NOISE_LOOKAHEAD].iter().all(|&c| is_noise(c))
}

fn is_noise(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || NOISE_PUNCTUATION.contains(c)
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pads a name list up to the reliability threshold with distinct filler.
    fn padded(names: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let mut filler = 0;
        while out.len() < MIN_RELIABLE_NAMES {
            out.push(format!("Filler{filler:02}x"));
            filler += 1;
        }
        out
    }

    #[test]
    fn test_below_threshold_returns_empty() {
        let names: Vec<String> = (0..10).map(|i| format!("Wall_{i:02}")).collect();
        assert!(PatternDetector::detect(&names).is_empty());

        let names: Vec<String> = (0..11).map(|i| format!("Wall_{i:02}")).collect();
        assert!(!PatternDetector::detect(&names).is_empty());
    }

    #[test]
    fn test_numeric_suffix_is_trimmed_by_lookahead() {
        // "_01" is a run of 3 noise characters after "Wall".
        let names: Vec<String> = (0..12).map(|i| format!("Wall_{i:02}")).collect();
        let patterns = PatternDetector::detect(&names);
        assert_eq!(patterns, vec!["Wall".to_string()]);
    }

    #[test]
    fn test_leading_noise_skipped() {
        assert_eq!(scan_name("  12-Door"), "Door");
        assert_eq!(scan_name("(03) Beam"), "Beam");
    }

    #[test]
    fn test_all_noise_name_yields_no_pattern() {
        assert_eq!(scan_name("12-34_56"), "");
    }

    #[test]
    fn test_word_counter_cutoff() {
        // The fourth separator ends accumulation; the buffer keeps it.
        assert_eq!(
            scan_name("Alpha Beta Gamma Delta Epsilon"),
            "Alpha Beta Gamma Delta "
        );
    }

    #[test]
    fn test_short_noise_tail_is_kept() {
        // Only two noise characters follow "Wall", below the lookahead run.
        assert_eq!(scan_name("Wall_1"), "Wall_1");
    }

    #[test]
    fn test_output_sorted_shortest_first() {
        let names = padded(&[
            "Wall-INT_01",
            "Wall-INT_02",
            "Wall_01",
            "Wall_02",
            "Door_01",
        ]);
        let patterns = PatternDetector::detect(&names);

        let lengths: Vec<usize> = patterns.iter().map(String::len).collect();
        let mut sorted = lengths.clone();
        sorted.sort_unstable();
        assert_eq!(lengths, sorted);

        assert!(patterns.contains(&"Wall".to_string()));
        assert!(patterns.contains(&"Door".to_string()));
        assert!(patterns.contains(&"Wall-INT".to_string()));
        let wall = patterns.iter().position(|p| p == "Wall").unwrap();
        let wall_int = patterns.iter().position(|p| p == "Wall-INT").unwrap();
        assert!(wall < wall_int);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let names: Vec<String> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    format!("Window_{i:03}")
                } else {
                    format!("Railing_{i:03}")
                }
            })
            .collect();

        let first = PatternDetector::detect(&names);
        let second = PatternDetector::detect(&names);
        assert_eq!(first, second);
        assert_eq!(first, vec!["Window".to_string(), "Railing".to_string()]);
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let names: Vec<String> = (0..15).map(|_| "Wall_01".to_string()).collect();
        let patterns = PatternDetector::detect(&names);
        assert_eq!(patterns, vec!["Wall".to_string()]);
    }

    #[test]
    fn test_to_rules_seeds_organize_defaults() {
        let patterns = vec!["Wall".to_string(), "Door".to_string()];
        let rules = PatternDetector::to_rules(&patterns);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].sample, "Wall");
        assert_eq!(rules[0].action, RuleAction::Organize);
        assert!(rules[0].output.is_empty());
    }
}
