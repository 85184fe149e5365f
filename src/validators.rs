//! Plan-time attribute validators.
//!
//! Each [`Validator`] checks a single configured value. Null and unknown
//! values always pass; they are checked again once the host resolves them.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::schema::Diagnostic;
use crate::types::is_null_or_unknown;

/// Header names users may not set on monitor requests.
pub const RESERVED_HEADER_NAMES: &[&str] = &[
    "authorization",
    "host",
    "cookie",
    "set-cookie",
    "proxy-authorize",
    "transfer-encoding",
];

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern")
});

/// A check attached to a schema attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Rejects CR, LF and NUL. Carries the detail shown on failure.
    NoControlChars(&'static str),
    ReservedHeaderName,
    Iso8601,
    /// RFC 4122 UUIDs or prefixed ids such as `mon_abc123`.
    ResourceId,
    Url,
    /// Length in characters, inclusive.
    LengthBetween(usize, usize),
    Cron,
    Timezone,
    Port,
    HexColor,
    Email,
    OneOf(&'static [&'static str]),
    Int64OneOf(&'static [i64]),
    Int64Between(i64, i64),
    Int64AtLeast(i64),
    /// Every element of a string list must be one of the values.
    EachOneOf(&'static [&'static str]),
    NoSlackSubscriber,
}

impl Validator {
    /// Check `value`, returning a diagnostic on `path` when it fails.
    pub fn validate(&self, value: &Value, path: &str) -> Option<Diagnostic> {
        if is_null_or_unknown(value) {
            return None;
        }
        let diag = match self {
            Self::EachOneOf(allowed) => {
                let items = value.as_array()?;
                items.iter().enumerate().find_map(|(i, item)| {
                    if is_null_or_unknown(item) {
                        return None;
                    }
                    let s = item.as_str()?;
                    (!allowed.iter().any(|a| *a == s)).then(|| {
                        one_of_error(&format!("{}[{}]", path, i), allowed, s)
                    })
                })
            },
            Self::Int64OneOf(_) | Self::Int64Between(..) | Self::Int64AtLeast(_) | Self::Port => {
                self.check_int(value.as_i64()?, path)
            },
            _ => self.check_str(value.as_str()?, path),
        };
        diag.map(|d| {
            if d.attribute.is_some() {
                d
            } else {
                d.with_attribute(path)
            }
        })
    }

    fn check_int(&self, v: i64, path: &str) -> Option<Diagnostic> {
        match self {
            Self::Port if !is_valid_port(v) => Some(
                Diagnostic::error("Invalid Port Number")
                    .with_detail(format!("Port must be between 1 and 65535, got {}", v)),
            ),
            Self::Int64OneOf(allowed) if !allowed.contains(&v) => {
                let list = allowed
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(Diagnostic::error("Invalid Attribute Value Match").with_detail(format!(
                    "Attribute {} value must be one of: [{}], got: {}",
                    path, list, v
                )))
            },
            Self::Int64Between(min, max) if v < *min || v > *max => Some(
                Diagnostic::error("Invalid Attribute Value").with_detail(format!(
                    "Attribute {} value must be between {} and {}, got: {}",
                    path, min, max, v
                )),
            ),
            Self::Int64AtLeast(min) if v < *min => {
                Some(Diagnostic::error("Invalid Attribute Value").with_detail(format!(
                    "Attribute {} value must be at least {}, got: {}",
                    path, min, v
                )))
            },
            _ => None,
        }
    }

    fn check_str(&self, s: &str, path: &str) -> Option<Diagnostic> {
        match self {
            Self::NoControlChars(message) if contains_control_chars(s) => {
                Some(Diagnostic::error("Invalid Value").with_detail(*message))
            },
            Self::ReservedHeaderName if is_reserved_header(s) => {
                Some(Diagnostic::error("Reserved Header Name").with_detail(format!(
                    "The header name {:?} is reserved and cannot be overridden in request_headers. \
                     This protects API credentials and request integrity.",
                    s
                )))
            },
            Self::Iso8601 if !looks_like_iso8601(s) => {
                Some(Diagnostic::error("Invalid ISO 8601 Format").with_detail(format!(
                    "The value {:?} does not appear to be in ISO 8601 format. \
                     Expected format: 2026-01-29T10:00:00Z",
                    s
                )))
            },
            Self::ResourceId => check_resource_id_shape(s),
            Self::Url if !is_http_url(s) => Some(
                Diagnostic::error("Invalid URL Format")
                    .with_detail(format!("The value {:?} must be a valid HTTP or HTTPS URL", s)),
            ),
            Self::LengthBetween(min, max) => {
                let len = s.chars().count();
                (len < *min || len > *max).then(|| {
                    Diagnostic::error("Invalid String Length").with_detail(format!(
                        "The value must be between {} and {} characters, got {}",
                        min, max, len
                    ))
                })
            },
            Self::Cron => parse_cron(s).err().map(|err| {
                Diagnostic::error("Invalid Cron Expression").with_detail(format!(
                    "The value {:?} is not a valid cron expression: {}\n\
                     Expected format: 'minute hour day month weekday' (e.g., '0 0 * * *' for daily at midnight)",
                    s, err
                ))
            }),
            Self::Timezone if !is_valid_timezone(s) => {
                Some(Diagnostic::error("Invalid Timezone").with_detail(format!(
                    "The value {:?} is not a valid IANA timezone.\n\
                     Use standard timezone names like 'America/New_York', 'Europe/London', or 'UTC'.",
                    s
                )))
            },
            Self::HexColor if !is_hex_color(s) => {
                Some(Diagnostic::error("Invalid Hex Color").with_detail(format!(
                    "The value {:?} must be a 6-digit hex color (e.g., '#ff5733', '#000000')",
                    s
                )))
            },
            Self::Email if !is_email(s) => Some(
                Diagnostic::error("Invalid Email Format")
                    .with_detail(format!("The value {:?} is not a valid email address", s)),
            ),
            Self::OneOf(allowed) if !allowed.iter().any(|a| *a == s) => Some(one_of_error(path, allowed, s)),
            Self::NoSlackSubscriber if s.eq_ignore_ascii_case("slack") => Some(
                Diagnostic::error("Slack Subscribers Not Supported").with_detail(
                    "Slack subscribers cannot be managed through the API. \
                     Use type 'email', 'sms', or 'teams', or add Slack through the Hyperping dashboard.",
                ),
            ),
            _ => None,
        }
    }
}

fn one_of_error(path: &str, allowed: &[&str], got: &str) -> Diagnostic {
    let list = allowed
        .iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ");
    Diagnostic::error("Invalid Attribute Value Match")
        .with_detail(format!(
            "Attribute {} value must be one of: [{}], got: {:?}",
            path, list, got
        ))
        .with_attribute(path)
}

fn check_resource_id_shape(s: &str) -> Option<Diagnostic> {
    if s.len() < 8 {
        return Some(Diagnostic::error("Invalid UUID Format").with_detail(format!(
            "The value {:?} is too short to be a valid UUID or resource ID.",
            s
        )));
    }
    if !s.contains('-') && !s.contains('_') {
        return Some(Diagnostic::error("Invalid UUID Format").with_detail(format!(
            "The value {:?} does not match UUID format (xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx) \
             or Hyperping resource ID format (prefix_xxxxx).",
            s
        )));
    }
    None
}

pub fn contains_control_chars(s: &str) -> bool {
    s.contains(['\r', '\n', '\0'])
}

pub fn is_reserved_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_HEADER_NAMES.iter().any(|r| *r == lower)
}

/// Shape check only; the API does the real parsing.
pub fn looks_like_iso8601(s: &str) -> bool {
    s.contains('T')
}

pub fn is_resource_id_shape(s: &str) -> bool {
    check_resource_id_shape(s).is_none()
}

pub fn is_http_url(s: &str) -> bool {
    match reqwest::Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

pub fn is_valid_timezone(s: &str) -> bool {
    s.parse::<chrono_tz::Tz>().is_ok()
}

pub fn is_valid_port(port: i64) -> bool {
    (1..=65535).contains(&port)
}

pub fn is_hex_color(s: &str) -> bool {
    HEX_COLOR.is_match(s)
}

pub fn is_email(s: &str) -> bool {
    EMAIL.is_match(s)
}

/// Parse a standard five-field cron expression (minute hour dom month dow),
/// optionally prefixed with `CRON_TZ=<zone>` or `TZ=<zone>`.
pub fn parse_cron(expr: &str) -> Result<(), String> {
    let mut schedule = expr.trim();
    if let Some(rest) = schedule
        .strip_prefix("CRON_TZ=")
        .or_else(|| schedule.strip_prefix("TZ="))
    {
        let (zone, tail) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        if !is_valid_timezone(zone) {
            return Err(format!("provided bad location {}", zone));
        }
        schedule = tail.trim_start();
    }

    let fields: Vec<&str> = schedule.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!(
            "expected exactly 5 fields, found {}: {:?}",
            fields.len(),
            fields
        ));
    }
    croner::Cron::new(&schedule.to_ascii_uppercase())
        .parse()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNKNOWN_VALUE;
    use serde_json::json;

    fn check(v: Validator, value: Value) -> Option<Diagnostic> {
        v.validate(&value, "attr")
    }

    #[test]
    fn test_null_and_unknown_always_pass() {
        for v in [
            Validator::Cron,
            Validator::HexColor,
            Validator::Port,
            Validator::ResourceId,
            Validator::EachOneOf(&["paris"]),
        ] {
            assert!(check(v.clone(), Value::Null).is_none());
            assert!(check(v, json!(UNKNOWN_VALUE)).is_none());
        }
    }

    #[test]
    fn test_control_chars() {
        let v = Validator::NoControlChars("Header value must not contain CR, LF, or NULL");
        assert!(check(v.clone(), json!("application/json")).is_none());
        for bad in ["a\rb", "a\nb", "a\0b"] {
            let diag = check(v.clone(), json!(bad)).unwrap();
            assert_eq!(diag.summary, "Invalid Value");
            assert_eq!(diag.attribute.as_deref(), Some("attr"));
        }
    }

    #[test]
    fn test_reserved_header_names_case_insensitive() {
        for name in [
            "Authorization",
            "HOST",
            "cookie",
            "Set-Cookie",
            "Proxy-Authorize",
            "transfer-encoding",
        ] {
            let diag = check(Validator::ReservedHeaderName, json!(name)).unwrap();
            assert_eq!(diag.summary, "Reserved Header Name");
        }
        assert!(check(Validator::ReservedHeaderName, json!("X-Api-Version")).is_none());
        assert!(check(Validator::ReservedHeaderName, json!("Content-Type")).is_none());
    }

    #[test]
    fn test_iso8601_requires_t() {
        assert!(check(Validator::Iso8601, json!("2026-01-29T10:00:00Z")).is_none());
        assert!(check(Validator::Iso8601, json!("2026-01-29T10:00")).is_none());
        let diag = check(Validator::Iso8601, json!("2026-01-29 10:00:00")).unwrap();
        assert_eq!(diag.summary, "Invalid ISO 8601 Format");
    }

    #[test]
    fn test_resource_id_shape() {
        assert!(is_resource_id_shape("mon_abc123"));
        assert!(is_resource_id_shape("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_resource_id_shape("mon_1"));
        assert!(!is_resource_id_shape("abcdefghijkl"));

        let diag = check(Validator::ResourceId, json!("short")).unwrap();
        assert_eq!(diag.summary, "Invalid UUID Format");
        assert!(diag.detail.unwrap().contains("too short"));
    }

    #[test]
    fn test_cron_expressions() {
        for ok in [
            "0 0 * * *",
            "*/5 * * * *",
            "0 9-17 * * mon-fri",
            "30 2 1,15 * *",
            "0 0 1 jan *",
            "0-30/10 * * * SUN",
        ] {
            assert!(parse_cron(ok).is_ok(), "{} should parse", ok);
        }
        assert!(parse_cron("0 0 * *").unwrap_err().contains("expected exactly 5 fields"));
        assert!(parse_cron("0 0 * * * *").unwrap_err().contains("expected exactly 5 fields"));
        assert!(parse_cron("@daily").is_err());
        for bad in ["60 * * * *", "0 24 * * *", "0 0 0 * *", "0 0 * 13 *", "x * * * *"] {
            assert!(parse_cron(bad).is_err(), "{} should be rejected", bad);
        }

        assert!(parse_cron("CRON_TZ=UTC 0 3 * * *").is_ok());
        assert!(parse_cron("TZ=Europe/Paris */15 9-17 * * mon-fri").is_ok());
        assert!(parse_cron("CRON_TZ=Mars/Olympus 0 3 * * *")
            .unwrap_err()
            .contains("bad location"));
        assert!(parse_cron("CRON_TZ=UTC").unwrap_err().contains("expected exactly 5 fields"));

        let diag = check(Validator::Cron, json!("not a cron")).unwrap();
        assert_eq!(diag.summary, "Invalid Cron Expression");
    }

    #[test]
    fn test_timezone() {
        assert!(is_valid_timezone("America/New_York"));
        assert!(is_valid_timezone("Europe/London"));
        assert!(is_valid_timezone("UTC"));
        let diag = check(Validator::Timezone, json!("Mars/Olympus")).unwrap();
        assert_eq!(diag.summary, "Invalid Timezone");
    }

    #[test]
    fn test_port_range() {
        assert!(check(Validator::Port, json!(1)).is_none());
        assert!(check(Validator::Port, json!(65535)).is_none());
        let diag = check(Validator::Port, json!(0)).unwrap();
        assert_eq!(diag.summary, "Invalid Port Number");
        assert_eq!(
            diag.detail.as_deref(),
            Some("Port must be between 1 and 65535, got 0")
        );
        assert!(check(Validator::Port, json!(65536)).is_some());
    }

    #[test]
    fn test_hex_color() {
        assert!(check(Validator::HexColor, json!("#36b27e")).is_none());
        assert!(check(Validator::HexColor, json!("#FF5733")).is_none());
        assert!(check(Validator::HexColor, json!("#fff")).is_some());
        assert!(check(Validator::HexColor, json!("36b27e")).is_some());
    }

    #[test]
    fn test_email() {
        assert!(is_email("ops+alerts@example.co.uk"));
        assert!(!is_email("ops@localhost"));
        assert!(!is_email("not-an-email"));
        let diag = check(Validator::Email, json!("a@b")).unwrap();
        assert_eq!(diag.summary, "Invalid Email Format");
    }

    #[test]
    fn test_length_counts_characters() {
        let v = Validator::LengthBetween(1, 3);
        assert!(check(v.clone(), json!("äöü")).is_none());
        let diag = check(v.clone(), json!("")).unwrap();
        assert_eq!(diag.summary, "Invalid String Length");
        assert!(check(v, json!("abcd")).is_some());
    }

    #[test]
    fn test_one_of_variants() {
        let v = Validator::OneOf(&["http", "port", "icmp"]);
        assert!(check(v.clone(), json!("icmp")).is_none());
        let diag = check(v, json!("ftp")).unwrap();
        assert_eq!(diag.summary, "Invalid Attribute Value Match");
        assert!(diag.detail.unwrap().contains(r#"["http" "port" "icmp"]"#));

        let v = Validator::Int64OneOf(&[10, 60, 300]);
        assert!(check(v.clone(), json!(60)).is_none());
        assert!(check(v, json!(61)).is_some());

        let v = Validator::EachOneOf(&["paris", "london"]);
        assert!(check(v.clone(), json!(["paris", "london"])).is_none());
        let diag = check(v, json!(["paris", "mars"])).unwrap();
        assert_eq!(diag.attribute.as_deref(), Some("attr[1]"));
    }

    #[test]
    fn test_each_one_of_skips_unresolved_elements() {
        let v = Validator::EachOneOf(&["paris"]);
        assert!(check(v.clone(), json!(["paris", UNKNOWN_VALUE])).is_none());
        assert!(check(v.clone(), json!([null, "paris"])).is_none());
        let diag = check(v, json!([UNKNOWN_VALUE, "mars"])).unwrap();
        assert_eq!(diag.attribute.as_deref(), Some("attr[1]"));
    }

    #[test]
    fn test_int_ranges() {
        assert!(check(Validator::Int64Between(100, 599), json!(503)).is_none());
        assert!(check(Validator::Int64Between(100, 599), json!(600)).is_some());
        assert!(check(Validator::Int64AtLeast(1), json!(1)).is_none());
        let diag = check(Validator::Int64AtLeast(1), json!(0)).unwrap();
        assert!(diag.detail.unwrap().contains("at least 1"));
    }

    #[test]
    fn test_slack_subscribers_rejected() {
        let diag = check(Validator::NoSlackSubscriber, json!("slack")).unwrap();
        assert_eq!(diag.summary, "Slack Subscribers Not Supported");
        assert!(check(Validator::NoSlackSubscriber, json!("email")).is_none());
    }

    #[test]
    fn test_url() {
        assert!(is_http_url("https://api.example.com/health"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("not a url"));
    }
}
