pub mod archive;
pub mod config;
pub mod convert;
pub mod errors;
pub mod request_parser;
pub mod session;
pub mod test_plan;
pub mod xml;
