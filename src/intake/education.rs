//! Education tiers and free-text normalization
//!
//! Worklife tables are split into four education tiers. Intake forms carry
//! free text ("Bachelor's Degree", "GED", "Ph.D."), so every value passes
//! through [`normalize_education`] before a table lookup:
//!
//! 1. exact tier key (`some_college`, `some college`)
//! 2. explicit alias table
//! 3. whole-word keyword pass (last resort)
//! 4. default to [`DEFAULT_TIER`], reported as [`MatchMethod::Defaulted`]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Education tier used to select a worklife sub-table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationTier {
    LessThanHighSchool,
    HighSchool,
    SomeCollege,
    BachelorsOrHigher,
}

/// Tier used when free text matches nothing
pub const DEFAULT_TIER: EducationTier = EducationTier::HighSchool;

impl EducationTier {
    pub const ALL: [EducationTier; 4] = [
        EducationTier::LessThanHighSchool,
        EducationTier::HighSchool,
        EducationTier::SomeCollege,
        EducationTier::BachelorsOrHigher,
    ];

    /// Canonical key, as used in table files
    pub fn key(&self) -> &'static str {
        match self {
            EducationTier::LessThanHighSchool => "less_than_high_school",
            EducationTier::HighSchool => "high_school",
            EducationTier::SomeCollege => "some_college",
            EducationTier::BachelorsOrHigher => "bachelors_or_higher",
        }
    }

    /// Strict parse of a canonical key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.key() == key.trim())
    }

    /// Position in [`EducationTier::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EducationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a free-text value was mapped to its tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Alias,
    Keyword,
    Defaulted,
}

/// Result of normalizing an education string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationMatch {
    pub input: String,
    pub tier: EducationTier,
    pub method: MatchMethod,
}

impl EducationMatch {
    /// True when the tier came from the default rather than the input
    pub fn is_defaulted(&self) -> bool {
        self.method == MatchMethod::Defaulted
    }
}

use EducationTier::*;

/// Cleaned alias -> tier
const ALIASES: &[(&str, EducationTier)] = &[
    ("less than hs", LessThanHighSchool),
    ("no high school", LessThanHighSchool),
    ("some high school", LessThanHighSchool),
    ("high school dropout", LessThanHighSchool),
    ("no diploma", LessThanHighSchool),
    ("0 12 years of education", LessThanHighSchool),
    ("hs", HighSchool),
    ("hs graduate", HighSchool),
    ("hs diploma", HighSchool),
    ("high school graduate", HighSchool),
    ("high school diploma", HighSchool),
    ("ged", HighSchool),
    ("associate", SomeCollege),
    ("associates", SomeCollege),
    ("associate degree", SomeCollege),
    ("associates degree", SomeCollege),
    ("community college", SomeCollege),
    ("vocational", SomeCollege),
    ("trade school", SomeCollege),
    ("bachelor", BachelorsOrHigher),
    ("bachelors", BachelorsOrHigher),
    ("bachelor degree", BachelorsOrHigher),
    ("bachelors degree", BachelorsOrHigher),
    ("ba", BachelorsOrHigher),
    ("bs", BachelorsOrHigher),
    ("ba degree", BachelorsOrHigher),
    ("college graduate", BachelorsOrHigher),
    ("master", BachelorsOrHigher),
    ("masters", BachelorsOrHigher),
    ("master degree", BachelorsOrHigher),
    ("masters degree", BachelorsOrHigher),
    ("mba", BachelorsOrHigher),
    ("doctorate", BachelorsOrHigher),
    ("phd", BachelorsOrHigher),
    ("professional degree", BachelorsOrHigher),
    ("graduate degree", BachelorsOrHigher),
    ("postgraduate", BachelorsOrHigher),
    ("jd", BachelorsOrHigher),
    ("md", BachelorsOrHigher),
];

/// Whole-word phrases tried in order when no alias matches.
/// Order matters: "less than high school" must win over "high school".
const KEYWORDS: &[(&str, EducationTier)] = &[
    ("less than", LessThanHighSchool),
    ("dropout", LessThanHighSchool),
    ("no diploma", LessThanHighSchool),
    ("some high school", LessThanHighSchool),
    ("doctorate", BachelorsOrHigher),
    ("doctoral", BachelorsOrHigher),
    ("phd", BachelorsOrHigher),
    ("masters", BachelorsOrHigher),
    ("master", BachelorsOrHigher),
    ("bachelors", BachelorsOrHigher),
    ("bachelor", BachelorsOrHigher),
    ("professional", BachelorsOrHigher),
    ("postgraduate", BachelorsOrHigher),
    ("college graduate", BachelorsOrHigher),
    ("university degree", BachelorsOrHigher),
    ("associate", SomeCollege),
    ("associates", SomeCollege),
    ("college", SomeCollege),
    ("vocational", SomeCollege),
    ("technical", SomeCollege),
    ("high school", HighSchool),
    ("ged", HighSchool),
    ("diploma", HighSchool),
];

/// Lower-case, drop apostrophes and periods, turn separators into spaces,
/// collapse whitespace.
fn clean(raw: &str) -> String {
    let mapped: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}' | '`' | '.'))
        .map(|c| if matches!(c, '_' | '-' | '/' | ',' | '(' | ')') { ' ' } else { c })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    format!(" {haystack} ").contains(&format!(" {phrase} "))
}

/// Map free-text education onto one of the four tiers.
pub fn normalize_education(raw: &str) -> EducationMatch {
    let cleaned = clean(raw);
    let found = |tier, method| EducationMatch {
        input: raw.to_string(),
        tier,
        method,
    };

    if let Some(tier) = EducationTier::ALL
        .into_iter()
        .find(|t| t.key().replace('_', " ") == cleaned)
    {
        return found(tier, MatchMethod::Exact);
    }

    if let Some((_, tier)) = ALIASES.iter().find(|(alias, _)| *alias == cleaned) {
        return found(*tier, MatchMethod::Alias);
    }

    if let Some((_, tier)) = KEYWORDS.iter().find(|(kw, _)| contains_phrase(&cleaned, kw)) {
        return found(*tier, MatchMethod::Keyword);
    }

    found(DEFAULT_TIER, MatchMethod::Defaulted)
}
