//! Shared wire types, allowed values and request-size checks.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::error::ClientError;

pub const DEFAULT_MONITOR_FREQUENCY: i64 = 60;
pub const DEFAULT_NOTIFY_BEFORE_MINUTES: i64 = 60;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

pub const ALLOWED_FREQUENCIES: &[i64] = &[
    10, 20, 30, 60, 120, 180, 300, 600, 1800, 3600, 21600, 43200, 86400,
];
pub const ALLOWED_PROTOCOLS: &[&str] = &["http", "port", "icmp"];
pub const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];
pub const ALLOWED_REGIONS: &[&str] = &[
    "paris",
    "frankfurt",
    "amsterdam",
    "london",
    "singapore",
    "sydney",
    "tokyo",
    "seoul",
    "mumbai",
    "bangalore",
    "virginia",
    "california",
    "sanfrancisco",
    "oregon",
    "nyc",
    "toronto",
    "saopaulo",
    "bahrain",
    "capetown",
];
pub const ALLOWED_INCIDENT_TYPES: &[&str] = &["outage", "incident"];
pub const ALLOWED_INCIDENT_UPDATE_TYPES: &[&str] =
    &["investigating", "identified", "update", "monitoring", "resolved"];
pub const ALLOWED_NOTIFICATION_OPTIONS: &[&str] = &["scheduled", "immediate"];
pub const ALLOWED_PERIOD_TYPES: &[&str] = &["seconds", "minutes", "hours", "days"];
pub const ALLOWED_THEMES: &[&str] = &["light", "dark", "system"];
pub const ALLOWED_FONTS: &[&str] = &[
    "system-ui",
    "Lato",
    "Manrope",
    "Inter",
    "Open Sans",
    "Montserrat",
    "Poppins",
    "Roboto",
    "Raleway",
    "Nunito",
    "Merriweather",
    "DM Sans",
    "Work Sans",
];
pub const ALLOWED_LANGUAGES: &[&str] = &["en", "fr", "de", "ru", "nl", "es", "it", "pt", "ja", "zh"];
pub const ALLOWED_SUBSCRIBER_TYPES: &[&str] = &["email", "sms", "teams"];

const MAX_FLEXIBLE_STRING_BYTES: usize = 100;

/// A string the API sometimes sends as a JSON number (`200` vs `"2xx"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlexibleString(pub String);

impl FlexibleString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlexibleString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlexibleString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for FlexibleString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FlexibleString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;
        let raw_len = value.to_string().len();
        if raw_len > MAX_FLEXIBLE_STRING_BYTES {
            return Err(D::Error::custom(format!(
                "FlexibleString input exceeds maximum size of {} bytes",
                MAX_FLEXIBLE_STRING_BYTES
            )));
        }
        match value {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(D::Error::custom(format!(
                "cannot unmarshal {} into FlexibleString",
                other
            ))),
        }
    }
}

/// A single request header on an HTTP monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    pub name: String,
    pub value: String,
}

/// Escalation policy summary embedded in healthchecks and outages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationPolicyReference {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "alertedSteps")]
    pub alerted_steps: i64,
    #[serde(rename = "totalSteps")]
    pub total_steps: i64,
}

/// Text in several locales. Empty locales are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub en: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fr: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub de: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub es: String,
}

impl LocalizedText {
    pub fn en(text: impl Into<String>) -> Self {
        Self {
            en: text.into(),
            ..Self::default()
        }
    }

    fn locales(&self) -> [(&'static str, &str); 4] {
        [
            ("en", &self.en),
            ("fr", &self.fr),
            ("de", &self.de),
            ("es", &self.es),
        ]
    }
}

/// Reject `value` if it is longer than `max` characters (not bytes).
pub fn validate_string_length(field: &str, value: &str, max: usize) -> Result<(), ClientError> {
    let count = value.chars().count();
    if count > max {
        return Err(ClientError::InvalidInput(format!(
            "field {:?} exceeds maximum length of {} characters (got {})",
            field, max, count
        )));
    }
    Ok(())
}

pub fn validate_localized_text(
    prefix: &str,
    text: &LocalizedText,
    max: usize,
) -> Result<(), ClientError> {
    for (locale, value) in text.locales() {
        if !value.is_empty() {
            validate_string_length(&format!("{}.{}", prefix, locale), value, max)?;
        }
    }
    Ok(())
}

/// Deserialize `null` as the type's default. The API returns `null` for
/// empty lists and strings on some endpoints.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `None` for an empty string, for optional request fields the API rejects
/// when sent empty.
pub fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flexible_string_accepts_string_and_number() {
        let s: FlexibleString = serde_json::from_value(json!("2xx")).unwrap();
        assert_eq!(s.as_str(), "2xx");

        let n: FlexibleString = serde_json::from_value(json!(200)).unwrap();
        assert_eq!(n.as_str(), "200");

        assert_eq!(serde_json::to_value(&n).unwrap(), json!("200"));
    }

    #[test]
    fn test_flexible_string_rejects_other_shapes() {
        let err = serde_json::from_value::<FlexibleString>(json!(true)).unwrap_err();
        assert!(err.to_string().contains("cannot unmarshal true"));

        let long = json!("x".repeat(120));
        let err = serde_json::from_value::<FlexibleString>(long).unwrap_err();
        assert!(err
            .to_string()
            .contains("FlexibleString input exceeds maximum size of 100 bytes"));
    }

    #[test]
    fn test_validate_string_length_counts_chars() {
        assert!(validate_string_length("name", &"日".repeat(255), MAX_NAME_LENGTH).is_ok());
        let err = validate_string_length("name", &"a".repeat(256), MAX_NAME_LENGTH).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field \"name\" exceeds maximum length of 255 characters (got 256)"
        );
    }

    #[test]
    fn test_validate_localized_text_names_locale() {
        let text = LocalizedText {
            en: "ok".into(),
            fr: "x".repeat(11),
            ..Default::default()
        };
        let err = validate_localized_text("title", &text, 10).unwrap_err();
        assert!(err.to_string().contains("\"title.fr\""));
    }

    #[test]
    fn test_nullable_fields_default() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default, deserialize_with = "nullable")]
            items: Vec<String>,
        }
        let p: Probe = serde_json::from_value(json!({"items": null})).unwrap();
        assert!(p.items.is_empty());
        let p: Probe = serde_json::from_value(json!({})).unwrap();
        assert!(p.items.is_empty());
    }

    #[test]
    fn test_localized_text_omits_empty_locales() {
        let text = LocalizedText::en("Database degraded");
        assert_eq!(
            serde_json::to_value(&text).unwrap(),
            json!({"en": "Database degraded"})
        );
    }
}
