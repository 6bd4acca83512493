/// Request headers in the order they were first seen.
///
/// Names keep their original casing. Inserting a name that is already present
/// replaces the value but keeps the original position.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Headers {
        return Headers { entries: Vec::new() };
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One captured request, parsed and normalized.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Session {
    pub method: String,
    /// Request target exactly as it appeared on the request line.
    pub url: String,
    pub headers: Headers,
    pub body: String,
    /// Value of the `Host` header, empty if there was none.
    pub host: String,
    /// `http` unless the target names another scheme.
    pub scheme: String,
    /// Explicit port from the target or the `Host` header, empty otherwise.
    pub port: String,
    /// Path component of the target, without query or fragment.
    pub path: String,
}

impl Session {
    /// Host name for the sampler, without the `:port` the `Host` header may carry.
    pub fn domain(&self) -> &str {
        split_host_port(&self.host).0
    }
}

/// Splits `host[:port]` from a `Host` header or URL authority.
///
/// The port is only split off when it is all digits, bracketed IPv6 literals
/// keep their brackets.
pub fn split_host_port(authority: &str) -> (&str, &str) {
    let port_start = match authority.rfind(']') {
        Some(close) => authority[close..].find(':').map(|i| close + i),
        None => authority.rfind(':'),
    };
    if let Some(colon) = port_start {
        let port = &authority[colon + 1..];
        if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
            return (&authority[..colon], port);
        }
    }
    return (authority, "");
}
