//! Wire model for the MockServer REST API.
//!
//! Field names follow MockServer's JSON format (camelCase). Everything is optional unless the
//! API requires it; absent fields are never serialized, so a matcher only constrains what the
//! caller actually set.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Name -> ordered values. A header or parameter name may repeat, so values are a list.
pub type KeyMultiValues = HashMap<String, Vec<String>>;

/// Predicate over an inbound HTTP request. Absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct RequestMatcher {
    /// HTTP method, e.g. `GET`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request path, e.g. `/users/123`. MockServer also accepts regular expressions here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Path parameters, for paths containing `{name}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_parameters: Option<KeyMultiValues>,
    /// Query string parameters.
    #[serde(
        default,
        alias = "queryParameters",
        skip_serializing_if = "Option::is_none"
    )]
    pub query_string_parameters: Option<KeyMultiValues>,
    /// Request headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<KeyMultiValues>,
    /// Body matcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyMatcher>,
}

impl RequestMatcher {
    /// One-line `METHOD /path` description used in logs and summaries.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "{} {}",
            self.method.as_deref().unwrap_or("*"),
            self.path.as_deref().unwrap_or("*")
        )
    }
}

/// Body matcher, tagged by `type` the way MockServer expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BodyMatcher {
    String {
        string: String,
    },
    Json {
        json: Value,
        #[serde(
            default,
            rename = "matchType",
            skip_serializing_if = "Option::is_none"
        )]
        match_type: Option<JsonMatchType>,
    },
    Regex {
        regex: String,
    },
    Xpath {
        xpath: String,
    },
    JsonPath {
        #[serde(rename = "jsonPath")]
        json_path: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonMatchType {
    Strict,
    OnlyMatchingFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Delay {
    pub time_unit: TimeUnit,
    pub value: u64,
}

/// Response body: raw text, or any other JSON value sent as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum ResponseBody {
    Text(String),
    Json(Value),
}

/// What MockServer answers when an expectation matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<KeyMultiValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
}

/// How many times an expectation may match before it is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Times {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_times: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct TimeToLive {
    pub time_unit: TimeUnit,
    pub time_to_live: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<bool>,
}

/// A rule stored on MockServer: a matcher plus the response to serve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    /// Expectation id. Reusing an id updates the existing expectation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Higher priority expectations are matched first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    pub http_request: RequestMatcher,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_response: Option<ResponseSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<Times>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<TimeToLive>,
}

/// Count constraint for a verification. All absent means "at least once".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct VerificationTimes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_least: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_most: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exactly: Option<u32>,
}

impl VerificationTimes {
    #[must_use]
    pub fn exactly(n: u32) -> Self {
        Self {
            exactly: Some(n),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn at_least(n: u32) -> Self {
        Self {
            at_least: Some(n),
            ..Self::default()
        }
    }

    /// Count reported on a successful verification: `exactly`, else `atLeast`, else 1.
    ///
    /// MockServer does not return a match count, so this is derived from the request.
    #[must_use]
    pub fn reported_count(&self) -> u32 {
        self.exactly.or(self.at_least).unwrap_or(1)
    }

    /// MockServer only understands `atLeast`/`atMost`; `exactly` pins both bounds.
    pub(crate) fn to_wire(self) -> WireVerificationTimes {
        match self.exactly {
            Some(n) => WireVerificationTimes {
                at_least: Some(n),
                at_most: Some(n),
            },
            None if self.at_least.is_none() && self.at_most.is_none() => WireVerificationTimes {
                at_least: Some(1),
                at_most: None,
            },
            None => WireVerificationTimes {
                at_least: self.at_least,
                at_most: self.at_most,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireVerificationTimes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_least: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_most: Option<u32>,
}

/// Outcome of a verification.
///
/// On failure `matched_count` is always 0: MockServer does not report how many requests did
/// match when the constraint is not met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub success: bool,
    pub matched_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A request MockServer received, as reported by `/mockserver/retrieve`.
///
/// Fields this crate does not model are kept in `extra` so records round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_parameters: Option<KeyMultiValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string_parameters: Option<KeyMultiValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<KeyMultiValues>,
    /// Text or structured body, exactly as MockServer reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reachability probe result. Computed on every call, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub host: String,
    pub port: u16,
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,
}

/// What `clear` removes. `All` sends no `type` hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearScope {
    #[default]
    All,
    Expectations,
    Log,
}

impl ClearScope {
    #[must_use]
    pub fn query_hint(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Expectations => Some("EXPECTATIONS"),
            Self::Log => Some("LOG"),
        }
    }
}
