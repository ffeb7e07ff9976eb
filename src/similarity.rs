//! Similarity between a bank description and a document's vendor name.

/// Scores how alike a transaction description and a vendor name are, in
/// `[0, 100]`.
///
/// Containment of one string in the other (case-insensitive) scores 100
/// outright: vendor names are very often embedded verbatim in bank
/// descriptions, so this is deliberately generous. Otherwise both strings
/// are tokenized on whitespace, tokens of length <= 3 are discarded as
/// non-discriminative, and the score is the share of cross-contained
/// tokens over the larger token set.
pub fn description_similarity(description: &str, vendor: &str) -> f64 {
    if description.is_empty() || vendor.is_empty() {
        return 0.0;
    }

    let desc = description.to_lowercase();
    let vend = vendor.to_lowercase();
    if desc.contains(&vend) || vend.contains(&desc) {
        return 100.0;
    }

    let desc_tokens: Vec<&str> = desc.split_whitespace().filter(|t| t.len() > 3).collect();
    let vend_tokens: Vec<&str> = vend.split_whitespace().filter(|t| t.len() > 3).collect();
    let larger = desc_tokens.len().max(vend_tokens.len());
    if larger == 0 {
        return 0.0;
    }

    let matches = desc_tokens
        .iter()
        .filter(|d| vend_tokens.iter().any(|v| d.contains(v) || v.contains(*d)))
        .count();
    (matches as f64 / larger as f64) * 100.0
}
