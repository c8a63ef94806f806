// 🏷️ Categories - closed set of listing categories, search catalog, and the
// rule-based classifier that maps source type tags onto them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Mechanics,
    Dealerships,
    AutoParts,
    Detailing,
    PerformanceShops,
    TireCenters,
    EvChargers,
    BodyShops,
    OilChange,
    CarWash,
    Towing,
    Inspections,
    GlassRepair,
    RustProofing,
}

/// Category assigned when no rule matches
pub const DEFAULT_CATEGORY: Category = Category::Mechanics;

impl Category {
    pub const ALL: [Category; 14] = [
        Category::Mechanics,
        Category::Dealerships,
        Category::AutoParts,
        Category::Detailing,
        Category::PerformanceShops,
        Category::TireCenters,
        Category::EvChargers,
        Category::BodyShops,
        Category::OilChange,
        Category::CarWash,
        Category::Towing,
        Category::Inspections,
        Category::GlassRepair,
        Category::RustProofing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Mechanics => "mechanics",
            Category::Dealerships => "dealerships",
            Category::AutoParts => "auto-parts",
            Category::Detailing => "detailing",
            Category::PerformanceShops => "performance-shops",
            Category::TireCenters => "tire-centers",
            Category::EvChargers => "ev-chargers",
            Category::BodyShops => "body-shops",
            Category::OilChange => "oil-change",
            Category::CarWash => "car-wash",
            Category::Towing => "towing",
            Category::Inspections => "inspections",
            Category::GlassRepair => "glass-repair",
            Category::RustProofing => "rust-proofing",
        }
    }

    /// Search phrases sent to the sources for this category.
    /// Empty for categories that are assigned by hand only.
    pub fn search_terms(&self) -> &'static [&'static str] {
        match self {
            Category::Mechanics => &["auto repair", "car mechanic", "auto service"],
            Category::Dealerships => &["car dealer", "auto dealership", "used car dealer"],
            Category::AutoParts => &["auto parts store", "car parts"],
            Category::Detailing => &["car detailing", "auto detailing", "car wash"],
            Category::PerformanceShops => &["performance auto shop", "auto tuning"],
            Category::TireCenters => &["tire shop", "tire dealer"],
            Category::EvChargers => &["ev charging station", "electric vehicle charging"],
            Category::BodyShops => &["auto body shop", "collision repair"],
            Category::OilChange => &["oil change", "quick lube"],
            Category::GlassRepair => &["auto glass repair", "windshield repair"],
            Category::RustProofing => &["rust proofing", "undercoating"],
            Category::CarWash | Category::Towing | Category::Inspections => &[],
        }
    }

    /// Categories the scraper searches for, in catalog order
    pub fn searchable() -> impl Iterator<Item = Category> {
        Self::ALL
            .into_iter()
            .filter(|c| !c.search_terms().is_empty())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown category: {}", s))
    }
}

// ============================================================================
// CLASSIFICATION RULES
// ============================================================================

/// One substring rule: any needle found in the joined tag string selects the category
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: Category,
    pub needles: &'static [&'static str],
}

impl CategoryRule {
    pub fn matches(&self, text: &str) -> bool {
        self.needles.iter().any(|needle| text.contains(needle))
    }
}

/// Ordered priority list. Earlier rules win when several match.
const DEFAULT_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Dealerships,
        needles: &["car_dealer", "dealer"],
    },
    CategoryRule {
        category: Category::Mechanics,
        needles: &["car_repair", "auto_repair", "repair", "mechanic"],
    },
    CategoryRule {
        category: Category::AutoParts,
        needles: &["auto_parts", "autoparts", "parts"],
    },
    CategoryRule {
        category: Category::Detailing,
        needles: &["car_wash", "wash", "detailing"],
    },
    CategoryRule {
        category: Category::TireCenters,
        needles: &["tire"],
    },
    CategoryRule {
        category: Category::EvChargers,
        needles: &["charging", "ev"],
    },
    CategoryRule {
        category: Category::BodyShops,
        needles: &["body_shop", "body", "collision"],
    },
    CategoryRule {
        category: Category::OilChange,
        needles: &["oil_change", "oil", "lube"],
    },
];

// ============================================================================
// CLASSIFIER
// ============================================================================

#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<CategoryRule>,
    fallback: Category,
}

impl CategoryClassifier {
    pub fn new() -> Self {
        CategoryClassifier {
            rules: DEFAULT_RULES.to_vec(),
            fallback: DEFAULT_CATEGORY,
        }
    }

    /// Classify a source's type tags. Total: always returns a category.
    pub fn classify<S: AsRef<str>>(&self, tags: &[S]) -> Category {
        let joined = tags
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matches(&joined))
            .map(|rule| rule.category)
            .unwrap_or(self.fallback)
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
