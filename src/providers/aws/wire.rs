//! Wire protocol encoding and error classification.
//!
//! Two request styles cover the catalog: the Query protocol (form-encoded
//! `Action`/`Version` POST with XML errors) and the JSON protocol
//! (`X-Amz-Target` header with JSON errors). Both return errors with a code
//! string; the code decides whether a rejection carries a privilege signal.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::invoker::{ErrorDetail, Outcome};

use super::signing::uri_encode;

/// Error codes that mean the service rejected the call on authorization
/// grounds. Anything outside this list is not treated as a privilege signal.
pub const DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "AuthFailure",
    "AuthorizationError",
    "NotAuthorized",
    "UnauthorizedAccess",
    "UnauthorizedOperation",
];

/// Codes that indicate rate limiting rather than an authorization decision.
pub const THROTTLING_CODES: &[&str] = &[
    "EC2ThrottledException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
    "SlowDown",
    "ThrottledException",
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
];

/// A parsed service error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: Option<String>,
    pub message: String,
    pub status: u16,
}

/// Query-protocol errors sometimes prefix the code with the fault party,
/// e.g. `Client.UnauthorizedOperation`.
fn bare_code(code: &str) -> &str {
    code.strip_prefix("Client.").or_else(|| code.strip_prefix("Server.")).unwrap_or(code)
}

pub fn is_denied_code(code: &str) -> bool {
    DENIED_CODES.contains(&bare_code(code))
}

pub fn is_throttling(status: u16, code: Option<&str>) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
        || code.is_some_and(|c| THROTTLING_CODES.contains(&bare_code(c)))
}

/// Maps a parsed error to an outcome. Authorization errors fire before
/// request validation on AWS, so any non-denied, non-throttling service error
/// code means the caller was authorized and the request itself was bad.
pub fn classify(error: ServiceError) -> (Outcome, ErrorDetail) {
    let outcome = match error.code.as_deref() {
        Some(code) if is_denied_code(code) => Outcome::Denied,
        _ if is_throttling(error.status, error.code.as_deref()) => Outcome::Errored,
        Some(_) => Outcome::Allowed,
        None => Outcome::Errored,
    };
    (outcome, ErrorDetail::new(error.code, error.message))
}

/// Parses an error body in either wire format. XML bodies carry
/// `<Code>`/`<Message>` elements; JSON bodies carry `__type` and `message`.
pub fn parse_error_body(status: u16, body: &str) -> ServiceError {
    if body.trim_start().starts_with('<') {
        parse_xml_error(status, body)
    } else {
        parse_json_error(status, body)
    }
}

fn parse_xml_error(status: u16, body: &str) -> ServiceError {
    let code = extract_xml_tag(body, "Code");
    let message = extract_xml_tag(body, "Message")
        .unwrap_or_else(|| format!("HTTP {status} with unrecognized XML body"));
    ServiceError { code, message, status }
}

fn parse_json_error(status: u16, body: &str) -> ServiceError {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return ServiceError {
            code: None,
            message: format!("HTTP {status} with unparseable body"),
            status,
        };
    };
    // `__type` can be namespaced: `com.amazonaws.kms#AccessDeniedException`.
    let code = value
        .get("__type")
        .or_else(|| value.get("code"))
        .or_else(|| value.get("Code"))
        .and_then(Value::as_str)
        .map(|s| s.rsplit('#').next().unwrap_or(s).to_string());
    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    ServiceError { code, message, status }
}

/// Minimal tag extraction; enough for the fixed error envelope, avoids a full
/// XML parser dependency.
fn extract_xml_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}

/// Builds the parameter map for a Query-protocol call. Named arguments
/// flatten the way the Query wire expects: scalars verbatim, lists as
/// `Name.1`, `Name.2`, ..., nested maps as `Name.Key`.
pub fn flatten_query_params(
    action: &str,
    version: &str,
    named: &BTreeMap<String, Value>,
) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("Action".to_string(), action.to_string());
    params.insert("Version".to_string(), version.to_string());
    for (key, value) in named {
        flatten_value(key, value, &mut params);
    }
    params
}

fn flatten_value(key: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(key.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(key.to_string(), n.to_string());
        }
        Value::String(s) => {
            out.insert(key.to_string(), s.clone());
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(&format!("{key}.{}", index + 1), item, out);
            }
        }
        Value::Object(map) => {
            for (name, item) in map {
                flatten_value(&format!("{key}.{name}"), item, out);
            }
        }
    }
}

/// Percent-encoded form body from a flattened parameter map.
pub fn form_urlencode(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// JSON-protocol request body. Operations without arguments still send `{}`.
pub fn json_body(named: &BTreeMap<String, Value>) -> String {
    let object: serde_json::Map<String, Value> =
        named.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    Value::Object(object).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn named(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn flatten_includes_action_and_version() {
        let params = flatten_query_params("DescribeInstances", "2016-11-15", &BTreeMap::new());
        assert_eq!(params.get("Action").map(String::as_str), Some("DescribeInstances"));
        assert_eq!(params.get("Version").map(String::as_str), Some("2016-11-15"));
    }

    #[test]
    fn flatten_scalars_lists_and_maps() {
        let params = flatten_query_params(
            "DescribeImages",
            "2016-11-15",
            &named(&[
                ("Owner", json!(["self", "amazon"])),
                ("MaxResults", json!(50)),
                ("DryRun", json!(false)),
                ("Filter", json!([{"Name": "state", "Value": ["available"]}])),
            ]),
        );
        assert_eq!(params.get("Owner.1").map(String::as_str), Some("self"));
        assert_eq!(params.get("Owner.2").map(String::as_str), Some("amazon"));
        assert_eq!(params.get("MaxResults").map(String::as_str), Some("50"));
        assert_eq!(params.get("DryRun").map(String::as_str), Some("false"));
        assert_eq!(params.get("Filter.1.Name").map(String::as_str), Some("state"));
        assert_eq!(params.get("Filter.1.Value.1").map(String::as_str), Some("available"));
    }

    #[test]
    fn form_body_is_percent_encoded_and_sorted() {
        let params = flatten_query_params(
            "GetCallerIdentity",
            "2011-06-15",
            &named(&[("Marker", json!("a b"))]),
        );
        assert_eq!(
            form_urlencode(&params),
            "Action=GetCallerIdentity&Marker=a%20b&Version=2011-06-15"
        );
    }

    #[test]
    fn json_body_defaults_to_empty_object() {
        assert_eq!(json_body(&BTreeMap::new()), "{}");
        assert_eq!(json_body(&named(&[("Limit", json!(100))])), r#"{"Limit":100}"#);
    }

    #[test]
    fn xml_access_denied_classifies_as_denied() {
        let error = parse_error_body(
            403,
            r#"<ErrorResponse><Error><Type>Sender</Type><Code>AccessDenied</Code><Message>User is not authorized</Message></Error><RequestId>abc</RequestId></ErrorResponse>"#,
        );
        let (outcome, detail) = classify(error);
        assert_eq!(outcome, Outcome::Denied);
        assert_eq!(detail.code.as_deref(), Some("AccessDenied"));
    }

    #[test]
    fn ec2_client_prefixed_code_classifies_as_denied() {
        let error = ServiceError {
            code: Some("Client.UnauthorizedOperation".to_string()),
            message: "not authorized".to_string(),
            status: 403,
        };
        assert_eq!(classify(error).0, Outcome::Denied);
    }

    #[test]
    fn json_namespaced_type_classifies_as_denied() {
        let error = parse_error_body(
            400,
            r#"{"__type":"com.amazonaws.kms#AccessDeniedException","message":"no"}"#,
        );
        let (outcome, detail) = classify(error);
        assert_eq!(outcome, Outcome::Denied);
        assert_eq!(detail.code.as_deref(), Some("AccessDeniedException"));
    }

    #[test]
    fn validation_errors_are_never_denied() {
        for code in ["ValidationError", "MissingParameter", "InvalidParameterValue", "MissingAction"] {
            let error = ServiceError {
                code: Some(code.to_string()),
                message: "bad request".to_string(),
                status: 400,
            };
            let (outcome, _) = classify(error);
            assert_eq!(outcome, Outcome::Allowed, "code {code} must not read as denied");
        }
    }

    #[test]
    fn not_found_after_auth_is_allowed() {
        let error = parse_error_body(
            400,
            r#"{"__type":"ResourceNotFoundException","message":"Requested resource not found"}"#,
        );
        assert_eq!(classify(error).0, Outcome::Allowed);
    }

    #[test]
    fn throttling_is_errored_not_denied() {
        let error = ServiceError {
            code: Some("Throttling".to_string()),
            message: "Rate exceeded".to_string(),
            status: 400,
        };
        assert_eq!(classify(error).0, Outcome::Errored);

        let error = ServiceError { code: None, message: "busy".to_string(), status: 503 };
        assert_eq!(classify(error).0, Outcome::Errored);
    }

    #[test]
    fn unparseable_body_is_errored() {
        let error = parse_error_body(500, "gateway exploded");
        assert_eq!(classify(error).0, Outcome::Errored);
    }
}
