//! Human-readable one-line summaries for tool results.

use std::fmt::Write as _;
use unrelated_mockserver_client::MockServerError;
use unrelated_mockserver_client::model::{
    ClearScope, Expectation, RecordedRequest, RequestMatcher, ServerStatus, VerificationResult,
};

pub fn expectation_created(e: &Expectation) -> String {
    let mut out = format!("Expectation created for {}", e.http_request.describe());
    if let Some(code) = e.http_response.as_ref().and_then(|r| r.status_code) {
        let _ = write!(out, " -> {code}");
    }
    if let Some(id) = &e.id {
        let _ = write!(out, " (id: {id})");
    }
    out
}

pub fn verification(matcher: &RequestMatcher, result: &VerificationResult) -> String {
    if result.success {
        format!(
            "Verification passed: {} matched {} time(s)",
            matcher.describe(),
            result.matched_count
        )
    } else {
        format!(
            "Verification failed for {}: {}",
            matcher.describe(),
            result.message.as_deref().unwrap_or("no matching requests")
        )
    }
}

pub fn cleared(matcher: Option<&RequestMatcher>, scope: ClearScope) -> String {
    let what = match scope {
        ClearScope::All => "expectations and recorded requests",
        ClearScope::Expectations => "expectations",
        ClearScope::Log => "recorded requests",
    };
    match matcher {
        Some(m) => format!("Cleared {what} matching {}", m.describe()),
        None => format!("Cleared all {what}"),
    }
}

pub fn reset() -> String {
    "MockServer reset: all expectations and recorded requests removed".to_string()
}

pub fn recorded_requests(requests: &[RecordedRequest]) -> String {
    let mut out = format!("Found {} recorded request(s)", requests.len());
    for r in requests {
        let _ = write!(
            out,
            "\n- {} {}",
            r.method.as_deref().unwrap_or("?"),
            r.path.as_deref().unwrap_or("?")
        );
    }
    out
}

pub fn active_expectations(expectations: &[Expectation]) -> String {
    let mut out = format!("Found {} active expectation(s)", expectations.len());
    for e in expectations {
        let _ = write!(out, "\n- {}", e.http_request.describe());
        if let Some(id) = &e.id {
            let _ = write!(out, " (id: {id})");
        }
    }
    out
}

pub fn status(s: &ServerStatus) -> String {
    if !s.reachable {
        return format!("MockServer at {}:{} is not reachable", s.host, s.port);
    }
    match &s.version {
        Some(v) => format!("MockServer at {}:{} is running (version {v})", s.host, s.port),
        None => format!("MockServer at {}:{} is running", s.host, s.port),
    }
}

pub fn error(err: &MockServerError) -> String {
    format!("{}: {err}", err.kind())
}
