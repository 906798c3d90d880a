//! Argument checks run before any request reaches MockServer.
//!
//! Schema-level problems (wrong JSON types, unknown enum tags) are rejected by rmcp when the
//! arguments are deserialized. These checks cover what the schema cannot express; failures are
//! reported as [`MockServerError::InvalidParameters`] so callers see one error taxonomy.

use unrelated_mockserver_client::MockServerError;
use unrelated_mockserver_client::model::{
    Expectation, RequestMatcher, ResponseSpec, Times, VerificationTimes,
};

type Result<T> = std::result::Result<T, MockServerError>;

fn invalid(msg: impl Into<String>) -> MockServerError {
    MockServerError::InvalidParameters(msg.into())
}

pub fn expectation(e: &Expectation) -> Result<()> {
    matcher("httpRequest", &e.http_request)?;
    if let Some(resp) = &e.http_response {
        response(resp)?;
    }
    if let Some(t) = &e.times {
        times(t)?;
    }
    if let Some(id) = &e.id
        && id.trim().is_empty()
    {
        return Err(invalid("id must not be empty"));
    }
    Ok(())
}

pub fn matcher(field: &str, m: &RequestMatcher) -> Result<()> {
    if let Some(method) = &m.method
        && !is_http_token(method)
    {
        return Err(invalid(format!(
            "{field}.method '{method}' is not a valid HTTP method"
        )));
    }
    if let Some(path) = &m.path
        && !path.starts_with('/')
    {
        return Err(invalid(format!("{field}.path '{path}' must start with '/'")));
    }
    for (name, map) in [
        ("pathParameters", &m.path_parameters),
        ("queryStringParameters", &m.query_string_parameters),
        ("headers", &m.headers),
    ] {
        if let Some(map) = map
            && map.keys().any(|k| k.is_empty())
        {
            return Err(invalid(format!("{field}.{name} contains an empty name")));
        }
    }
    Ok(())
}

fn response(r: &ResponseSpec) -> Result<()> {
    if let Some(code) = r.status_code
        && !(100..=599).contains(&code)
    {
        return Err(invalid(format!(
            "httpResponse.statusCode {code} is outside 100-599"
        )));
    }
    Ok(())
}

fn times(t: &Times) -> Result<()> {
    if t.unlimited == Some(true) && t.remaining_times.is_some() {
        return Err(invalid(
            "times.remainingTimes cannot be combined with times.unlimited = true",
        ));
    }
    Ok(())
}

pub fn verification_times(t: &VerificationTimes) -> Result<()> {
    if let (Some(lo), Some(hi)) = (t.at_least, t.at_most)
        && lo > hi
    {
        return Err(invalid(format!(
            "times.atLeast ({lo}) is greater than times.atMost ({hi})"
        )));
    }
    if let Some(n) = t.exactly {
        if t.at_least.is_some_and(|lo| n < lo) {
            return Err(invalid(format!(
                "times.exactly ({n}) is below times.atLeast"
            )));
        }
        if t.at_most.is_some_and(|hi| n > hi) {
            return Err(invalid(format!("times.exactly ({n}) is above times.atMost")));
        }
    }
    Ok(())
}

/// RFC 9110 `token`: one or more `tchar`.
fn is_http_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use unrelated_mockserver_client::ErrorKind;

    fn matcher_with(method: Option<&str>, path: Option<&str>) -> RequestMatcher {
        RequestMatcher {
            method: method.map(str::to_string),
            path: path.map(str::to_string),
            ..RequestMatcher::default()
        }
    }

    #[test]
    fn accepts_empty_matcher() {
        assert!(matcher("httpRequest", &RequestMatcher::default()).is_ok());
    }

    #[test]
    fn rejects_relative_path_and_bad_method() {
        let err = matcher("httpRequest", &matcher_with(None, Some("test"))).expect_err("path");
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
        assert!(err.to_string().contains("must start with '/'"));

        let err =
            matcher("httpRequest", &matcher_with(Some("GE T"), Some("/x"))).expect_err("method");
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);

        assert!(matcher("httpRequest", &matcher_with(Some("PROPFIND"), Some("/x"))).is_ok());
    }

    #[test]
    fn rejects_empty_header_name() {
        let m = RequestMatcher {
            headers: Some(HashMap::from([(String::new(), vec!["v".to_string()])])),
            ..RequestMatcher::default()
        };
        assert!(matcher("httpRequest", &m).is_err());
    }

    #[test]
    fn expectation_checks_status_code_and_times() {
        let mut e = Expectation {
            http_request: matcher_with(Some("GET"), Some("/test")),
            http_response: Some(ResponseSpec {
                status_code: Some(200),
                ..ResponseSpec::default()
            }),
            ..Expectation::default()
        };
        assert!(expectation(&e).is_ok());

        e.http_response = Some(ResponseSpec {
            status_code: Some(99),
            ..ResponseSpec::default()
        });
        assert!(expectation(&e).is_err());

        e.http_response = None;
        e.times = Some(Times {
            remaining_times: Some(2),
            unlimited: Some(true),
        });
        assert!(expectation(&e).is_err());

        e.times = Some(Times {
            remaining_times: Some(2),
            unlimited: Some(false),
        });
        assert!(expectation(&e).is_ok());
    }

    #[test]
    fn verification_times_must_be_consistent() {
        assert!(verification_times(&VerificationTimes::default()).is_ok());
        assert!(verification_times(&VerificationTimes::exactly(3)).is_ok());

        let inverted = VerificationTimes {
            at_least: Some(3),
            at_most: Some(1),
            exactly: None,
        };
        assert!(verification_times(&inverted).is_err());

        let outside = VerificationTimes {
            at_least: Some(2),
            at_most: Some(4),
            exactly: Some(5),
        };
        assert!(verification_times(&outside).is_err());

        let inside = VerificationTimes {
            at_least: Some(2),
            at_most: Some(4),
            exactly: Some(3),
        };
        assert!(verification_times(&inside).is_ok());
    }
}
