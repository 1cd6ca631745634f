use crate::decoder::Document;
use crate::protocol::{Category, UPDATES_TAG};
use serde_json::Value;

/// What the session should do for one recognized part of a message
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Store the value for the category, emit it and resolve waiters
    Apply(Category, Value),
    /// The category changed but no value was inlined; ask for it
    Refetch(Category),
}

impl Dispatch {
    pub fn category(&self) -> Category {
        match self {
            Dispatch::Apply(category, _) | Dispatch::Refetch(category) => *category,
        }
    }
}

/// Classify a decoded document into the actions it calls for
///
/// Direct category documents come first, then update notifications, each
/// group in category order. Unknown tags are ignored.
pub fn classify(document: &Document) -> Vec<Dispatch> {
    let mut direct = Vec::new();
    let mut updates = Vec::new();

    for (tag, body) in document {
        match tag.as_str() {
            UPDATES_TAG => updates.extend(classify_updates(body)),
            other => match Category::from_tag(other) {
                Some(category) => direct.push(Dispatch::Apply(category, body.clone())),
                None => tracing::trace!("Ignoring unknown tag {}", other),
            },
        }
    }

    direct.sort_by_key(Dispatch::category);
    updates.sort_by_key(Dispatch::category);
    direct.extend(updates);
    direct
}

fn classify_updates(envelope: &Value) -> Vec<Dispatch> {
    let children = match envelope.as_object() {
        Some(children) => children,
        None => return Vec::new(),
    };

    let mut dispatches = Vec::new();
    for (tag, child) in children {
        let category = match Category::from_update_tag(tag) {
            Some(category) => category,
            None => {
                tracing::trace!("Ignoring unknown update {}", tag);
                continue;
            }
        };

        // The fresh value, when present, is nested under the category tag
        match child.get(category.tag()) {
            Some(value) => dispatches.push(Dispatch::Apply(category, value.clone())),
            None => dispatches.push(Dispatch::Refetch(category)),
        }
    }
    dispatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_direct_category_document() {
        let dispatches = classify(&doc(json!({ "info": { "name": "Kitchen" } })));
        assert_eq!(
            dispatches,
            vec![Dispatch::Apply(Category::Info, json!({ "name": "Kitchen" }))]
        );
    }

    #[test]
    fn test_inline_update_applies_value() {
        let dispatches = classify(&doc(json!({
            "updates": { "volumeUpdated": { "volume": { "actual": 30 } } }
        })));
        assert_eq!(
            dispatches,
            vec![Dispatch::Apply(Category::Volume, json!({ "actual": 30 }))]
        );
    }

    #[test]
    fn test_empty_update_requests_refetch() {
        let dispatches = classify(&doc(json!({ "updates": { "presetsUpdated": {} } })));
        assert_eq!(dispatches, vec![Dispatch::Refetch(Category::Presets)]);

        let dispatches = classify(&doc(json!({ "updates": { "zoneUpdated": "" } })));
        assert_eq!(dispatches, vec![Dispatch::Refetch(Category::Zone)]);
    }

    #[test]
    fn test_unknown_tags_are_ignored() {
        let dispatches = classify(&doc(json!({
            "webserver/pingResponse": "",
            "updates": { "recentsUpdated": {}, "deviceID": "X" }
        })));
        assert!(dispatches.is_empty());
    }

    #[test]
    fn test_multiple_categories_follow_category_order() {
        let dispatches = classify(&doc(json!({
            "zone": { "master": "A" },
            "volume": { "actual": 10 },
            "info": { "name": "Den" },
            "updates": { "trackInfoUpdated": {}, "bassUpdated": { "bass": { "actual": -3 } } }
        })));

        let order: Vec<_> = dispatches.iter().map(Dispatch::category).collect();
        assert_eq!(
            order,
            vec![
                Category::Info,
                Category::Volume,
                Category::Zone,
                Category::Bass,
                Category::TrackInfo
            ]
        );
        assert_eq!(dispatches[4], Dispatch::Refetch(Category::TrackInfo));
    }

    #[test]
    fn test_classifies_decoded_update_envelope() {
        let raw = br#"<updates deviceID="X"><nowPlayingUpdated><nowPlaying source="SPOTIFY"><track>Song</track></nowPlaying></nowPlayingUpdated><sourcesUpdated/></updates>"#;
        let dispatches = classify(&decode(raw).unwrap());

        assert_eq!(
            dispatches,
            vec![
                Dispatch::Apply(
                    Category::NowPlaying,
                    json!({ "source": "SPOTIFY", "track": "Song" })
                ),
                Dispatch::Refetch(Category::Sources),
            ]
        );
    }
}
