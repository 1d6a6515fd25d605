//! Config validation: unknown-key detection with Levenshtein suggestions
//! and plausibility warnings.
//!
//! The raw TOML is first parsed into a `toml::Value` and its key tree is
//! compared against the known field names. Unknown keys produce warnings
//! with a "did you mean?" suggestion; they never fail a load.

use std::collections::HashSet;

use super::EngineConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `EngineConfig`.
///
/// Must be kept in step with the structs in engine_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [forecast]
        "forecast",
        "forecast.minimum_thickness_mm",
        "forecast.safety_factor",
        "forecast.min_inspection_interval_months",
        "forecast.max_inspection_interval_months",
        "forecast.no_corrosion_life_years",
        "forecast.critical_life_years",
        "forecast.high_life_years",
        "forecast.medium_life_years",
        "forecast.due_soon_months",
        // [decision]
        "decision",
        "decision.decision_threshold",
        "decision.high_confidence",
        "decision.medium_confidence",
        // [report]
        "report",
        "report.top_candidates",
        // [storage]
        "storage",
        "storage.backend",
        "storage.path",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smaller key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| {
            let suggestion = suggest_correction(&key, &known);
            ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            }
        })
        .collect()
}

// ============================================================================
// Plausibility Warnings
// ============================================================================

/// Flag values that are legal but unusual for piping integrity programmes.
pub fn plausibility_warnings(config: &EngineConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let f = &config.forecast;

    if f.minimum_thickness_mm > 25.0 {
        warnings.push(ValidationWarning {
            field: "forecast.minimum_thickness_mm".to_string(),
            message: format!(
                "minimum_thickness_mm = {:.1} is above typical retirement thickness (0-25 mm)",
                f.minimum_thickness_mm
            ),
            suggestion: None,
        });
    }

    if f.safety_factor > 4.0 {
        warnings.push(ValidationWarning {
            field: "forecast.safety_factor".to_string(),
            message: format!(
                "safety_factor = {:.2} is unusually conservative (typical 1-4)",
                f.safety_factor
            ),
            suggestion: None,
        });
    }

    if f.max_inspection_interval_months > 120 {
        warnings.push(ValidationWarning {
            field: "forecast.max_inspection_interval_months".to_string(),
            message: format!(
                "max_inspection_interval_months = {} exceeds 10 years",
                f.max_inspection_interval_months
            ),
            suggestion: None,
        });
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("safety_factor", "safety_factor"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("safty_factor", "safety_factor"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [forecast]
            safety_factor = 2.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"forecast".to_string()));
        assert!(keys.contains(&"forecast.safety_factor".to_string()));
    }

    #[test]
    fn test_typo_gets_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
[decision]
decision_treshold = 0.6
"#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("decision.decision_threshold")
        );
    }

    #[test]
    fn test_unrelated_key_has_no_suggestion() {
        let warnings = validate_unknown_keys("completely_unrelated_section_name = 1");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].suggestion.is_none());
    }

    #[test]
    fn test_defaults_raise_no_plausibility_warnings() {
        assert!(plausibility_warnings(&EngineConfig::default()).is_empty());
    }
}
