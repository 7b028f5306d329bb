//! Keyword-based issue classification
//!
//! Classification is a fixed, priority-ordered table scan: the first category
//! with any keyword contained in the lowercased description wins. Matching is
//! substring containment, not whole words, so "care" matches the keyword
//! "car". Several keywords appear under more than one category ("permit",
//! "construction", "water"); table order decides those ties, so changing the
//! order changes behavior.

use serde::Serialize;

/// Category assigned when no keyword matches
pub const FALLBACK_CATEGORY: &str = "infrastructure";

/// Priority-ordered category/keyword table. Order is significant.
const KEYWORD_TABLE: &[(&str, &[&str])] = &[
    (
        "parking",
        &["park", "driveway", "block", "car", "vehicle", "permit", "meter"],
    ),
    (
        "noise",
        &["noise", "loud", "music", "bark", "construction", "sound"],
    ),
    (
        "permits",
        &["permit", "license", "build", "construction", "renovation", "addition"],
    ),
    (
        "infrastructure",
        &["road", "street", "pothole", "light", "water", "sewer", "utility"],
    ),
    (
        "business",
        &["business", "commercial", "shop", "store", "restaurant"],
    ),
    (
        "religious_events",
        &["religious", "temple", "church", "mosque", "festival", "ceremony", "cultural"],
    ),
    (
        "neighbor_dispute",
        &["neighbor", "dispute", "fence", "property", "boundary", "conflict"],
    ),
    (
        "environmental",
        &["environment", "pollution", "air", "water", "waste", "dumping", "recycle"],
    ),
];

/// Outcome of classifying a description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Chosen category name
    pub category: &'static str,
    /// Keyword that decided the category, absent for the fallback
    pub matched_keyword: Option<&'static str>,
}

impl Classification {
    /// Whether the fallback category was used because nothing matched
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.matched_keyword.is_none()
    }
}

/// Classify a description into a civic category.
///
/// Pure and deterministic: the same input always yields the same category.
/// Expects a validated (non-blank) description; a blank input simply falls
/// through to the fallback.
#[must_use]
pub fn classify(description: &str) -> Classification {
    let lowered = description.to_lowercase();

    for (category, keywords) in KEYWORD_TABLE {
        for keyword in *keywords {
            if lowered.contains(keyword) {
                return Classification {
                    category,
                    matched_keyword: Some(keyword),
                };
            }
        }
    }

    Classification {
        category: FALLBACK_CATEGORY,
        matched_keyword: None,
    }
}

/// All categories the classifier can produce, in table order.
///
/// The fallback category is part of the table, so this list is exactly the
/// set of categories a registry must cover for every classification to be
/// routable.
#[must_use]
pub fn known_categories() -> Vec<&'static str> {
    KEYWORD_TABLE.iter().map(|(category, _)| *category).collect()
}
