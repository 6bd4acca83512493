use url::Url;

use crate::errors::ConvertError;
use crate::session::{split_host_port, Headers, Session};

const DEFAULT_SCHEME: &str = "http";

// Represents which section of the request dump the parser is in
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ParseState {
    RequestLine,
    Header,
    Body,
}

/// Scheme, explicit port and path resolved from a request target.
#[derive(Debug, Eq, PartialEq)]
struct Target {
    scheme: String,
    port: String,
    path: String,
}

fn parse_request_line(line: &str) -> Result<(String, String), ConvertError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    return match tokens.as_slice() {
        [method, target, _version] => Ok((method.to_string(), target.to_string())),
        _ => Err(ConvertError::MalformedRequestLine(line.trim().to_string())),
    };
}

fn parse_header(line: &str) -> Option<(&str, &str)> {
    line.split_once(':')
        .map(|(name, value)| (name.trim(), value.trim()))
}

fn non_empty_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

// Strips query and fragment, the path itself is kept exactly as captured
fn raw_path(target: &str) -> String {
    let end = target.find(|c: char| c == '?' || c == '#').unwrap_or(target.len());
    non_empty_path(&target[..end])
}

// Splits `scheme://authority/rest` into authority and the raw path
fn split_absolute(target: &str) -> Option<(&str, String)> {
    let (_, rest) = target.split_once("://")?;
    let end = rest.find(|c: char| c == '/' || c == '?' || c == '#').unwrap_or(rest.len());
    let authority = &rest[..end];
    let authority = authority.rsplit_once('@').map(|(_, a)| a).unwrap_or(authority);
    return Some((authority, raw_path(&rest[end..])));
}

fn resolve_target(target: &str, host: &str) -> Target {
    // absolute-form, e.g. proxied requests: GET http://host:8080/path HTTP/1.1
    if let Ok(url) = Url::parse(target) {
        if !url.cannot_be_a_base() {
            if let Some((authority, path)) = split_absolute(target) {
                let (_, port) = split_host_port(authority);
                return Target {
                    scheme: url.scheme().to_string(),
                    port: port.to_string(),
                    path,
                };
            }
        }
    }

    let (_, port) = split_host_port(host);

    // authority-form (CONNECT) and asterisk-form targets carry no path
    let path = if target.starts_with('/') {
        raw_path(target)
    } else {
        "/".to_string()
    };

    return Target {
        scheme: DEFAULT_SCHEME.to_string(),
        port: port.to_string(),
        path,
    };
}

/// Parses a raw HTTP/1.x request dump into a [`Session`].
///
/// The first line must consist of exactly three whitespace separated tokens.
/// Header lines run up to the first blank line, lines without a colon are
/// skipped. Everything after the blank line is the body.
pub fn parse_request(raw: &str) -> Result<Session, ConvertError> {
    let mut parse_state = ParseState::RequestLine;

    let mut method = String::new();
    let mut url = String::new();
    let mut headers = Headers::new();
    let mut body: Vec<&str> = Vec::new();

    for line in raw.lines() {
        match parse_state {
            ParseState::RequestLine => {
                (method, url) = parse_request_line(line)?;
                parse_state = ParseState::Header;
            }
            ParseState::Header => {
                if line.trim().is_empty() {
                    parse_state = ParseState::Body;
                } else if let Some((name, value)) = parse_header(line) {
                    headers.insert(name, value);
                }
            }
            ParseState::Body => body.push(line),
        }
    }

    if parse_state == ParseState::RequestLine {
        return Err(ConvertError::MalformedRequestLine(String::new()));
    }

    let host = headers.get_ignore_case("Host").unwrap_or_default().to_string();
    let target = resolve_target(&url, &host);

    return Ok(Session {
        method,
        url,
        headers,
        body: body.join("\n").trim_end().to_string(),
        host,
        scheme: target.scheme,
        port: target.port,
        path: target.path,
    });
}
