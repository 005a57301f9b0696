//! Detection of income kinds typed as free text ("Sonstige Einkünfte").

use crate::documents::registry::{AUSBILDUNGSFOERDERUNG_NACHWEIS, KRANKENGELD_NACHWEIS};

/// Spelling variants that identify one income kind, mapped to the document it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomeVariant {
    pub document_type_id: &'static str,
    pub spellings: &'static [&'static str],
}

pub const DEFAULT_INCOME_VARIANTS: &[IncomeVariant] = &[
    IncomeVariant {
        document_type_id: KRANKENGELD_NACHWEIS,
        spellings: &[
            "krankengeld",
            "krankentagegeld",
            "kinderkrankengeld",
            "krankengeldzahlung",
            "verletztengeld",
            "sick pay",
        ],
    },
    IncomeVariant {
        document_type_id: AUSBILDUNGSFOERDERUNG_NACHWEIS,
        spellings: &[
            "bafög",
            "bafoeg",
            "ausbildungsförderung",
            "berufsausbildungsbeihilfe",
        ],
    },
];

/// Lowercase, transliterate umlauts and drop everything that is not a letter or digit.
pub fn normalize(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    for ch in raw.chars().flat_map(char::to_lowercase) {
        match ch {
            'ä' => normalized.push_str("ae"),
            'ö' => normalized.push_str("oe"),
            'ü' => normalized.push_str("ue"),
            'ß' => normalized.push_str("ss"),
            other if other.is_alphanumeric() => normalized.push(other),
            _ => {}
        }
    }
    normalized
}

/// Whether any entry contains one of the spellings once both sides are normalised.
pub fn mentions(entries: &[String], spellings: &[&str]) -> bool {
    let needles: Vec<String> = spellings
        .iter()
        .map(|spelling| normalize(spelling))
        .filter(|needle| !needle.is_empty())
        .collect();
    entries.iter().map(|entry| normalize(entry)).any(|entry| {
        needles
            .iter()
            .any(|needle| entry.contains(needle.as_str()))
    })
}

/// Documents triggered by the free-text income entries.
pub fn detect<'a>(
    entries: &'a [String],
    variants: &'a [IncomeVariant],
) -> impl Iterator<Item = &'static str> + 'a {
    variants
        .iter()
        .filter(move |variant| mentions(entries, variant.spellings))
        .map(|variant| variant.document_type_id)
}
