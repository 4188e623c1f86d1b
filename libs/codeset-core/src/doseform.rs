//! Dose-form and strength extraction from drug display names.
//!
//! Drug names in the normalized drug vocabulary carry their dose form and
//! strength inline, e.g. `duloxetine 20 MG Delayed Release Oral Capsule`.
//! The dose-form table collapses the vocabulary's many specific forms into
//! eight consolidated categories; matching is longest-substring-first so
//! "Delayed Release Oral Capsule" wins over "Oral Capsule".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ORAL_SOLID: &str = "Oral Solid";
pub const ORAL_LIQUID: &str = "Oral Liquid";
pub const INJECTABLE: &str = "Injectable";
pub const TOPICAL: &str = "Topical";
pub const INHALATION: &str = "Inhalation";
pub const OPHTHALMIC: &str = "Ophthalmic";
pub const OTIC: &str = "Otic";
pub const OTHER: &str = "Other";

/// Specific dose-form phrase → consolidated category. Matched
/// case-insensitively; the longest matching phrase wins.
static DOSE_FORM_PHRASES: &[(&str, &str)] = &[
    ("delayed release oral capsule", ORAL_SOLID),
    ("extended release oral capsule", ORAL_SOLID),
    ("delayed release oral tablet", ORAL_SOLID),
    ("extended release oral tablet", ORAL_SOLID),
    ("disintegrating oral tablet", ORAL_SOLID),
    ("effervescent oral tablet", ORAL_SOLID),
    ("chewable tablet", ORAL_SOLID),
    ("sublingual tablet", ORAL_SOLID),
    ("buccal tablet", ORAL_SOLID),
    ("oral capsule", ORAL_SOLID),
    ("oral tablet", ORAL_SOLID),
    ("oral lozenge", ORAL_SOLID),
    ("buccal film", ORAL_SOLID),
    ("oral film", ORAL_SOLID),
    ("oral wafer", ORAL_SOLID),
    ("oral granules", ORAL_SOLID),
    ("oral powder", ORAL_SOLID),
    ("extended release oral suspension", ORAL_LIQUID),
    ("oral solution", ORAL_LIQUID),
    ("oral suspension", ORAL_LIQUID),
    ("oral syrup", ORAL_LIQUID),
    ("oral elixir", ORAL_LIQUID),
    ("oral emulsion", ORAL_LIQUID),
    ("oral drops", ORAL_LIQUID),
    ("tincture", ORAL_LIQUID),
    ("prefilled syringe", INJECTABLE),
    ("injectable solution", INJECTABLE),
    ("injectable suspension", INJECTABLE),
    ("auto-injector", INJECTABLE),
    ("pen injector", INJECTABLE),
    ("intravenous solution", INJECTABLE),
    ("injection", INJECTABLE),
    ("cartridge", INJECTABLE),
    ("topical cream", TOPICAL),
    ("topical ointment", TOPICAL),
    ("topical gel", TOPICAL),
    ("topical lotion", TOPICAL),
    ("topical solution", TOPICAL),
    ("topical foam", TOPICAL),
    ("topical oil", TOPICAL),
    ("topical spray", TOPICAL),
    ("topical powder", TOPICAL),
    ("medicated patch", TOPICAL),
    ("transdermal system", TOPICAL),
    ("shampoo", TOPICAL),
    ("metered dose inhaler", INHALATION),
    ("dry powder inhaler", INHALATION),
    ("inhalation solution", INHALATION),
    ("inhalation suspension", INHALATION),
    ("inhalation powder", INHALATION),
    ("nasal spray", INHALATION),
    ("nasal inhaler", INHALATION),
    ("inhalant", INHALATION),
    ("ophthalmic solution", OPHTHALMIC),
    ("ophthalmic suspension", OPHTHALMIC),
    ("ophthalmic ointment", OPHTHALMIC),
    ("ophthalmic gel", OPHTHALMIC),
    ("eye drops", OPHTHALMIC),
    ("otic solution", OTIC),
    ("otic suspension", OTIC),
    ("otic drops", OTIC),
    ("ear drops", OTIC),
    ("rectal suppository", OTHER),
    ("vaginal cream", OTHER),
    ("vaginal suppository", OTHER),
    ("vaginal ring", OTHER),
    ("mucous membrane topical solution", OTHER),
    ("irrigation solution", OTHER),
    ("mouthwash", OTHER),
    ("enema", OTHER),
];

// Leading numeric strength followed by a known unit token. Compound units
// (MG/ML etc.) must come before their prefixes in the alternation, and the
// terminator must not accept `/`: an unrecognized compound such as MG/DAY
// must yield no strength at all, never a truncated prefix.
static STRENGTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s(])(\d+(?:\.\d+)?)\s*(MG/ML|MCG/ML|MG/MG|MG/HR|MCG/HR|MG/ACTUAT|MCG/ACTUAT|UNT/ML|UNT/ACTUAT|MEQ/ML|MMOL/ML|MG|MCG|MEQ|MMOL|UNITS|UNIT|UNT|ML|G|L|%)(?:$|[\s,;)])",
    )
    .expect("strength regex is valid")
});

/// Dose form and strength extracted from a drug display name. Either or both
/// fields may be absent; extraction never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDrugName {
    pub dose_form: Option<String>,
    pub strength: Option<String>,
}

/// Extract the consolidated dose-form category and the strength from a drug
/// display name.
pub fn parse_dose_form_and_strength(name: &str) -> ParsedDrugName {
    let lowered = name.to_lowercase();

    let dose_form = DOSE_FORM_PHRASES
        .iter()
        .filter(|(phrase, _)| lowered.contains(phrase))
        .max_by_key(|(phrase, _)| phrase.len())
        .map(|(_, category)| (*category).to_string());

    let strength = STRENGTH_RE.captures(name).map(|caps| {
        let value = &caps[1];
        let unit = caps[2].to_uppercase();
        if unit == "%" {
            format!("{value}%")
        } else {
            format!("{value} {unit}")
        }
    });

    ParsedDrugName { dose_form, strength }
}
