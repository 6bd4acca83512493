use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ConvertError {
    /// The archive itself could not be opened or indexed.
    Archive(String),
    /// A single archive entry could not be read.
    Entry { entry: String, reason: String },
    /// The request line did not split into method, target and version.
    MalformedRequestLine(String),
    /// Nothing survived extraction and filtering.
    EmptyInput,
    Config(String),
    Io(std::io::Error),
}

impl ConvertError {
    pub fn entry(entry: &str, reason: impl Display) -> ConvertError {
        return ConvertError::Entry {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };
    }
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::Archive(reason) => write!(f, "couldn't read archive: {}", reason),
            ConvertError::Entry { entry, reason } => write!(f, "couldn't read entry {}: {}", entry, reason),
            ConvertError::MalformedRequestLine(line) => {
                write!(f, "malformed request line '{}', expected <method> <target> <version>", line)
            }
            ConvertError::EmptyInput => write!(f, "no sessions left to build a test plan from"),
            ConvertError::Config(reason) => write!(f, "invalid configuration: {}", reason),
            ConvertError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(e: std::io::Error) -> Self {
        ConvertError::Io(e)
    }
}

impl From<zip::result::ZipError> for ConvertError {
    fn from(e: zip::result::ZipError) -> Self {
        ConvertError::Archive(e.to_string())
    }
}
