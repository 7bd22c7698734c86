//! Decides which analysed emails may receive an auto-drafted reply

use std::fmt;

use super::prefs::AutopilotPreferences;
use crate::mail::{Analysis, EmailSummary};

/// Why an email was not eligible, checked in this order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disqualification {
    TooUrgent { urgency: u8, max: u8 },
    NoResponseNeeded,
    RiskFlagged(Vec<String>),
    ExcludedCategory(String),
}

impl fmt::Display for Disqualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disqualification::TooUrgent { urgency, max } => {
                write!(f, "urgency {} above limit {}", urgency, max)
            }
            Disqualification::NoResponseNeeded => write!(f, "no response needed"),
            Disqualification::RiskFlagged(flags) => write!(f, "risk flags: {}", flags.join(", ")),
            Disqualification::ExcludedCategory(category) => {
                write!(f, "category '{}' is excluded", category)
            }
        }
    }
}

/// Check every eligibility rule against the analysis.
pub fn qualify(analysis: &Analysis, prefs: &AutopilotPreferences) -> Result<(), Disqualification> {
    let max = prefs.max_urgency.value();
    if analysis.urgency > max {
        return Err(Disqualification::TooUrgent {
            urgency: analysis.urgency,
            max,
        });
    }
    if !analysis.requires_response {
        return Err(Disqualification::NoResponseNeeded);
    }
    if !analysis.risk_flags.is_empty() {
        return Err(Disqualification::RiskFlagged(analysis.risk_flags.clone()));
    }
    if prefs.excludes(&analysis.category) {
        return Err(Disqualification::ExcludedCategory(analysis.category.clone()));
    }
    Ok(())
}

/// Pure predicate: may autopilot draft a reply to `email`?
///
/// Eligibility depends only on the analysis and preferences; the email is part of the
/// signature so callers can pass the candidate as a unit.
pub fn is_auto_draftable(
    _email: &EmailSummary,
    analysis: &Analysis,
    prefs: &AutopilotPreferences,
) -> bool {
    qualify(analysis, prefs).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autopilot::types::MaxUrgency;
    use crate::mail::Sentiment;
    use chrono::Utc;

    fn email() -> EmailSummary {
        EmailSummary {
            id: "e1".to_string(),
            thread_id: None,
            from_name: Some("Pat".to_string()),
            from_address: "pat@example.com".to_string(),
            subject: "Question".to_string(),
            snippet: "Quick question about Thursday".to_string(),
            received_at: Utc::now(),
        }
    }

    fn analysis(urgency: u8, requires_response: bool, flags: &[&str], category: &str) -> Analysis {
        Analysis {
            category: category.to_string(),
            urgency,
            sentiment: Sentiment::Neutral,
            requires_response,
            risk_flags: flags.iter().map(|f| f.to_string()).collect(),
            summary: None,
        }
    }

    #[test]
    fn test_eligible_email() {
        let prefs = AutopilotPreferences::default();
        assert!(is_auto_draftable(
            &email(),
            &analysis(1, true, &[], "client"),
            &prefs
        ));
    }

    #[test]
    fn test_urgency_boundary_is_inclusive() {
        let prefs = AutopilotPreferences {
            max_urgency: MaxUrgency::Two,
            ..Default::default()
        };
        assert!(is_auto_draftable(&email(), &analysis(2, true, &[], "client"), &prefs));
        assert_eq!(
            qualify(&analysis(3, true, &[], "client"), &prefs),
            Err(Disqualification::TooUrgent { urgency: 3, max: 2 })
        );
    }

    #[test]
    fn test_risk_flag_always_disqualifies() {
        let prefs = AutopilotPreferences {
            max_urgency: MaxUrgency::Three,
            ..Default::default()
        };
        let flagged = analysis(1, true, &["deadline"], "general");
        assert!(!is_auto_draftable(&email(), &flagged, &prefs));
        assert_eq!(
            qualify(&flagged, &prefs),
            Err(Disqualification::RiskFlagged(vec!["deadline".to_string()]))
        );
    }

    #[test]
    fn test_no_response_needed() {
        let prefs = AutopilotPreferences::default();
        assert_eq!(
            qualify(&analysis(1, false, &[], "client"), &prefs),
            Err(Disqualification::NoResponseNeeded)
        );
    }

    #[test]
    fn test_excluded_categories() {
        let prefs = AutopilotPreferences::default();
        for category in ["legal", "billing", "personal"] {
            assert!(!is_auto_draftable(
                &email(),
                &analysis(1, true, &[], category),
                &prefs
            ));
        }
    }

    #[test]
    fn test_excluded_category_ignores_case() {
        let mut prefs = AutopilotPreferences::default();
        prefs.exclude_categories.insert("Newsletters".to_string());

        assert_eq!(
            qualify(&analysis(1, true, &[], "Legal"), &prefs),
            Err(Disqualification::ExcludedCategory("Legal".to_string()))
        );
        assert!(!is_auto_draftable(
            &email(),
            &analysis(1, true, &[], "newsletters"),
            &prefs
        ));
    }

    #[test]
    fn test_repeated_calls_agree() {
        let prefs = AutopilotPreferences::default();
        let cases = [
            analysis(1, true, &[], "client"),
            analysis(3, true, &[], "client"),
            analysis(1, true, &["security"], "client"),
            analysis(2, false, &[], "scheduling"),
        ];
        for case in &cases {
            let first = is_auto_draftable(&email(), case, &prefs);
            let second = is_auto_draftable(&email(), case, &prefs);
            assert_eq!(first, second);
        }
    }
}
