//! Entity types returned by the portal API.
//!
//! Field sets mirror the portal's JSON wire format. Timestamps arrive as
//! opaque server-formatted strings and are kept as such; the cache layer
//! keeps its own bookkeeping clock.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether a collection is visible to everyone or only its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionVisibility {
    Public,
    Private,
}

/// One row of the collections listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<CollectionVisibility>,
}

/// An external link attached to a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionLink {
    pub link_name: String,
    pub link_type: String,
    pub link_url: String,
}

/// Dataset fields embedded in a collection detail response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

/// Full collection object from `GET /dp/v1/collections/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub contact_email: String,
    pub visibility: CollectionVisibility,
    #[serde(default)]
    pub links: Vec<CollectionLink>,
    #[serde(default)]
    pub datasets: Vec<DatasetSummary>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Envelope for `GET /dp/v1/collections`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionsResponse {
    pub collections: Vec<CollectionSummary>,
}

/// Envelope for `POST /dp/v1/collections`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCollectionResponse {
    pub collection_uuid: String,
}

/// Request body for creating a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCollectionPayload {
    pub name: String,
    pub description: String,
    pub contact_name: String,
    pub contact_email: String,
}

impl CreateCollectionPayload {
    /// Build the payload from raw form fields.
    ///
    /// Form field names use hyphens (`contact-name`); the API expects
    /// underscore keys, so every hyphen is translated before the fields
    /// are interpreted.
    pub fn from_form_fields<'a, I>(fields: I) -> Result<Self, serde_json::Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let map = form_fields_to_payload(fields);
        serde_json::from_value(Value::Object(map))
    }
}

/// Translate raw form fields into a JSON object suitable for the API.
///
/// Hyphenated field names become underscore keys; values pass through
/// unchanged.
pub fn form_fields_to_payload<'a, I>(fields: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut payload = Map::new();
    for (key, value) in fields {
        let translated = key.replace('-', "_");
        payload.insert(translated, Value::String(value.to_string()));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_key_translation() {
        let payload = form_fields_to_payload([
            ("name", "TEST"),
            ("description", "D"),
            ("contact-name", "N"),
            ("contact-email", "e@x.com"),
        ]);

        assert_eq!(payload["name"], "TEST");
        assert_eq!(payload["contact_name"], "N");
        assert_eq!(payload["contact_email"], "e@x.com");
        assert!(!payload.contains_key("contact-name"));
    }

    #[test]
    fn test_payload_from_form_fields() {
        let payload = CreateCollectionPayload::from_form_fields([
            ("name", "TEST"),
            ("description", "D"),
            ("contact-name", "N"),
            ("contact-email", "e@x.com"),
        ])
        .unwrap();

        assert_eq!(payload.name, "TEST");
        assert_eq!(payload.contact_name, "N");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["contact_email"], "e@x.com");
    }

    #[test]
    fn test_visibility_wire_format() {
        let json = serde_json::to_string(&CollectionVisibility::Private).unwrap();
        assert_eq!(json, "\"PRIVATE\"");
    }

    #[test]
    fn test_collections_response_decode() {
        let body = r#"{"collections":[{"id":"abc123","created_at":"1611600000","visibility":"PUBLIC"}]}"#;
        let decoded: CollectionsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.collections.len(), 1);
        assert_eq!(decoded.collections[0].id, "abc123");
        assert_eq!(
            decoded.collections[0].visibility,
            Some(CollectionVisibility::Public)
        );
    }
}
