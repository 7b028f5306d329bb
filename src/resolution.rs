//! Resolution path advisory
//!
//! Maps a classified category and the reporter's priority onto the suggested
//! first step for resolving the issue. Advisory only: routing never consults
//! it, the gateway merely surfaces it alongside the classification.

use serde::Serialize;

use crate::issue::Priority;

/// Suggested first step for resolving an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    /// Start with mediation or a direct conversation between residents
    CommunityFirst,
    /// Start by filing the relevant paperwork
    DocumentsFirst,
    /// Go straight to formal enforcement
    LegalEscalation,
}

impl ResolutionPath {
    /// Wire name of the path
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CommunityFirst => "community_first",
            Self::DocumentsFirst => "documents_first",
            Self::LegalEscalation => "legal_escalation",
        }
    }
}

/// Compute the advisory path for a category/priority pair.
///
/// Urgent reports always escalate; interpersonal categories favor community
/// mediation; permits favor paperwork; everything else goes the formal route.
#[must_use]
pub fn resolution_path(category: &str, priority: Priority) -> ResolutionPath {
    if priority == Priority::Urgent {
        return ResolutionPath::LegalEscalation;
    }

    match category {
        "neighbor_dispute" | "noise" | "parking" => ResolutionPath::CommunityFirst,
        "permits" => ResolutionPath::DocumentsFirst,
        _ => ResolutionPath::LegalEscalation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interpersonal_categories_go_community_first() {
        for category in ["neighbor_dispute", "noise", "parking"] {
            assert_eq!(
                resolution_path(category, Priority::Medium),
                ResolutionPath::CommunityFirst,
                "category {category}"
            );
        }
    }

    #[test]
    fn test_permits_go_documents_first() {
        assert_eq!(
            resolution_path("permits", Priority::Low),
            ResolutionPath::DocumentsFirst
        );
    }

    #[test]
    fn test_other_categories_escalate() {
        for category in ["infrastructure", "environmental", "business", "religious_events"] {
            assert_eq!(
                resolution_path(category, Priority::Medium),
                ResolutionPath::LegalEscalation,
                "category {category}"
            );
        }
    }

    #[test]
    fn test_urgent_overrides_category() {
        assert_eq!(
            resolution_path("noise", Priority::Urgent),
            ResolutionPath::LegalEscalation
        );
        assert_eq!(
            resolution_path("permits", Priority::Urgent),
            ResolutionPath::LegalEscalation
        );
    }

    #[test]
    fn test_serialized_form() {
        assert_eq!(ResolutionPath::CommunityFirst.as_str(), "community_first");
        assert_eq!(
            serde_json::to_string(&ResolutionPath::DocumentsFirst).unwrap(),
            "\"documents_first\""
        );
    }
}
