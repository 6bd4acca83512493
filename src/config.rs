use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::errors::ConvertError;

/// Decides which captured sessions make it into the test plan.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SessionFilter {
    /// Exact, case-sensitive host names. Empty lets nothing through.
    pub allowed_hosts: Vec<String>,
    /// Response status codes to keep. Empty disables status filtering.
    pub allowed_status_codes: Vec<u16>,
}

impl SessionFilter {
    pub fn new(allowed_hosts: Vec<String>) -> SessionFilter {
        return SessionFilter {
            allowed_hosts,
            allowed_status_codes: Vec::new(),
        };
    }

    pub fn with_status_codes(mut self, codes: Vec<u16>) -> SessionFilter {
        self.allowed_status_codes = codes;
        return self;
    }

    pub fn allows_host(&self, host: &str) -> bool {
        self.allowed_hosts.iter().any(|h| h == host)
    }

    pub fn filters_status(&self) -> bool {
        !self.allowed_status_codes.is_empty()
    }

    pub fn allows_status(&self, code: u16) -> bool {
        !self.filters_status() || self.allowed_status_codes.contains(&code)
    }
}

/// Contents of a `--config` file.
///
/// ```json
/// { "allowed_hosts": ["httpbin.org"], "allowed_status_codes": [200, 201] }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub allowed_hosts: Vec<String>,
    pub allowed_status_codes: Vec<u16>,
}

impl ConvertConfig {
    pub fn from_file(path: &Path) -> Result<ConvertConfig, ConvertError> {
        let file = match File::open(path) {
            Err(reason) => {
                return Err(ConvertError::Config(format!(
                    "couldn't open {}: {}",
                    path.display(),
                    reason
                )))
            }
            Ok(file) => file,
        };
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ConvertError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Appends hosts and status codes given on the command line, skipping duplicates.
    pub fn merge(mut self, hosts: &[String], status_codes: &[u16]) -> ConvertConfig {
        for host in hosts {
            if !self.allowed_hosts.contains(host) {
                self.allowed_hosts.push(host.clone());
            }
        }
        for code in status_codes {
            if !self.allowed_status_codes.contains(code) {
                self.allowed_status_codes.push(*code);
            }
        }
        return self;
    }

    pub fn filter(&self) -> SessionFilter {
        SessionFilter::new(self.allowed_hosts.clone())
            .with_status_codes(self.allowed_status_codes.clone())
    }
}

/// Fixed values the generated plan must carry to load in JMeter.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PlanDefaults {
    pub file_version: &'static str,
    pub properties_version: &'static str,
    pub jmeter_version: &'static str,
    pub num_threads: u32,
    pub ramp_time: u32,
    pub loops: u32,
    pub on_sample_error: &'static str,
    pub follow_redirects: bool,
    pub auto_redirects: bool,
    pub use_keepalive: bool,
    /// Samplers with exactly this method get no body argument.
    pub no_body_method: &'static str,
    pub transaction_suffix: &'static str,
    /// Group key for paths without any segment.
    pub root_group: &'static str,
    pub output_extension: &'static str,
}

impl Default for PlanDefaults {
    fn default() -> Self {
        PlanDefaults {
            file_version: "1.2",
            properties_version: "5.0",
            jmeter_version: "5.4.1",
            num_threads: 1,
            ramp_time: 1,
            loops: 1,
            on_sample_error: "continue",
            follow_redirects: true,
            auto_redirects: false,
            use_keepalive: true,
            no_body_method: "GET",
            transaction_suffix: "_txn",
            root_group: "root",
            output_extension: "jmx",
        }
    }
}
