//! Text normalization shared by the rule tier, the local model and menu matching.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-cases, folds accents and compatibility forms, strips punctuation
/// and collapses whitespace.
///
/// `"¡Sí, ACEPTO!"` becomes `"si acepto"` and fullwidth `"ＳＩ"` becomes `"si"`.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// NFKC fold without any other change; fullwidth digits become ASCII.
pub fn fold_compatibility(text: &str) -> String {
    text.nfkc().collect()
}

/// Splits normalized text into model tokens.
///
/// Runs of 7 to 12 digits collapse into a single `__document__` token so the
/// model learns "someone sent an id number" rather than specific numbers.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| {
            if (7..=12).contains(&t.len()) && t.chars().all(|c| c.is_ascii_digit()) {
                "__document__".to_string()
            } else {
                t.to_string()
            }
        })
        .collect()
}
