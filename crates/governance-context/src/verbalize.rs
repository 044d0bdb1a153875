use governance_core::AttrValue;

use crate::config::VerbalBin;

/// Map a numeric attribute to its qualitative phrase. Values above the
/// last bin keep the last phrase; non-numeric values render verbatim.
pub fn verbalize(value: &AttrValue, bins: &[VerbalBin]) -> String {
    let Some(number) = value.as_f64() else {
        return value.to_string();
    };
    for bin in bins {
        if number <= bin.upper {
            return bin.phrase.clone();
        }
    }
    bins.last()
        .map(|bin| bin.phrase.clone())
        .unwrap_or_else(|| value.to_string())
}
