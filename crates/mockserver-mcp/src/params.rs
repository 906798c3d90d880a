//! Tool argument types.
//!
//! The JSON schemas advertised in `tools/list` are derived from these types (and from the
//! client's wire model, which derives `JsonSchema` behind its `schema` feature).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use unrelated_mockserver_client::model::{ClearScope, RequestMatcher, VerificationTimes};

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequestParams {
    /// Matcher selecting the requests to count.
    pub http_request: RequestMatcher,
    /// Count constraint. Defaults to "at least once".
    #[serde(default)]
    pub times: Option<VerificationTimes>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearExpectationsParams {
    /// Only clear expectations and requests matching this. Omit to clear everything.
    #[serde(default)]
    pub http_request: Option<RequestMatcher>,
    /// What to clear: `ALL` (default), `EXPECTATIONS` or `LOG`.
    #[serde(default, rename = "type")]
    pub scope: Option<ClearScope>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveParams {
    /// Only return entries matching this. Omit to return everything.
    #[serde(default)]
    pub http_request: Option<RequestMatcher>,
}
