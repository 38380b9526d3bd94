//! Searching pins by tag.

use crate::models::pin::Pin;

/// Keeps the pins whose serialized tag list contains `query`, ignoring case.
///
/// The match runs against the JSON form of the tags (e.g. `["Nature","Pin"]`),
/// so an empty query keeps everything. Order is preserved and `pins` itself
/// is never touched.
pub fn filter_pins(pins: &[Pin], query: &str) -> Vec<Pin> {
    let query = query.to_lowercase();

    pins.iter()
        .filter(|pin| pin.tags_json().to_lowercase().contains(&query))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::pin::{Pin, PinDraft};

    use super::filter_pins;

    fn pin(tags: &[&str]) -> Pin {
        PinDraft {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
        .into_pin(Uuid::new_v4(), Utc::now())
    }

    fn board() -> Vec<Pin> {
        vec![
            pin(&["Nature", "Lake"]),
            pin(&["travel"]),
            pin(&[]),
            pin(&["NATURE", "travel"]),
        ]
    }

    #[test]
    fn empty_query_keeps_everything() {
        let pins = board();
        assert_eq!(filter_pins(&pins, ""), pins);
    }

    #[test]
    fn matches_ignore_case() {
        let pins = board();
        let found = filter_pins(&pins, "nAtUrE");

        assert_eq!(found, vec![pins[0].clone(), pins[3].clone()]);
    }

    #[test]
    fn every_pin_is_either_kept_or_excluded_correctly() {
        let pins = board();

        for query in ["travel", "lake", "z", "\"", "[]", "e"] {
            let found = filter_pins(&pins, query);
            for p in &pins {
                let matches = p.tags_json().to_lowercase().contains(&query.to_lowercase());
                assert_eq!(found.contains(p), matches, "query `{query}`, pin {:?}", p.tags);
            }
        }
    }

    #[test]
    fn json_punctuation_is_searchable() {
        // the empty tag list serializes to `[]`
        let pins = board();
        assert_eq!(filter_pins(&pins, "[]"), vec![pins[2].clone()]);
    }
}
