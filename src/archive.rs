use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::{debug, error, info, warn};
use regex::Regex;
use zip::ZipArchive;

use crate::config::SessionFilter;
use crate::errors::ConvertError;
use crate::request_parser::parse_request;
use crate::session::Session;

pub const REQUEST_SUFFIX: &str = "_c.txt";
pub const RESPONSE_SUFFIX: &str = "_s.txt";

/// Name of the response entry belonging to a request entry.
pub fn companion_name(request_entry: &str) -> Option<String> {
    request_entry
        .strip_suffix(REQUEST_SUFFIX)
        .map(|stem| format!("{}{}", stem, RESPONSE_SUFFIX))
}

fn status_line_regex() -> Regex {
    Regex::new(r"^HTTP/\d+(?:\.\d+)?\s+(\d{3})\b").unwrap()
}

fn parse_status_code(status_line_regex: &Regex, response: &str) -> Option<u16> {
    let first_line = response.lines().next()?;
    status_line_regex
        .captures(first_line.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, ConvertError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ConvertError::entry(name, e))?;
    let mut raw = Vec::new();
    entry
        .read_to_end(&mut raw)
        .map_err(|e| ConvertError::entry(name, e))?;
    // captured payloads need not be utf-8, only the request head matters
    return Ok(String::from_utf8_lossy(&raw).into_owned());
}

fn entry_names<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>, ConvertError> {
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    return Ok(names);
}

/// Pulls every complete, allowed session out of a session archive.
///
/// Entries are visited in archive order. A request entry (`<id>_c.txt`) only
/// counts if its response entry (`<id>_s.txt`) exists too. Entries that fail
/// to read or parse are logged and skipped; only a broken archive is an error.
pub fn extract<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    filter: &SessionFilter,
) -> Result<Vec<Session>, ConvertError> {
    let names = entry_names(archive)?;
    let members: HashSet<&str> = names.iter().map(|n| n.as_str()).collect();
    let status_line_regex = status_line_regex();

    let mut sessions = Vec::new();
    let mut request_entries = 0;

    for name in &names {
        let Some(response_name) = companion_name(name) else {
            continue;
        };
        request_entries += 1;

        if !members.contains(response_name.as_str()) {
            debug!("{}: no response entry {}, skipping", name, response_name);
            continue;
        }

        let session = match read_entry(archive, name).and_then(|raw| parse_request(&raw)) {
            Ok(session) => session,
            Err(e) => {
                error!("{}: {}", name, e);
                continue;
            }
        };

        if !filter.allows_host(&session.host) {
            debug!("{}: host '{}' not allowed", name, session.host);
            continue;
        }

        if filter.filters_status() {
            let status = read_entry(archive, &response_name)
                .map(|raw| parse_status_code(&status_line_regex, &raw));
            match status {
                Ok(Some(code)) if filter.allows_status(code) => {}
                Ok(Some(code)) => {
                    debug!("{}: status {} not allowed", name, code);
                    continue;
                }
                Ok(None) => {
                    warn!("{}: no status line in {}, skipping", name, response_name);
                    continue;
                }
                Err(e) => {
                    warn!("{}: {}", name, e);
                    continue;
                }
            }
        }

        sessions.push(session);
    }

    info!(
        "kept {} of {} request entries",
        sessions.len(),
        request_entries
    );
    return Ok(sessions);
}

pub fn extract_file(path: &Path, filter: &SessionFilter) -> Result<Vec<Session>, ConvertError> {
    let file = match File::open(path) {
        Err(reason) => {
            return Err(ConvertError::Archive(format!(
                "couldn't open {}: {}",
                path.display(),
                reason
            )))
        }
        Ok(file) => file,
    };
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    return extract(&mut archive, filter);
}
