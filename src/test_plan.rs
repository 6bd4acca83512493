use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use crate::config::PlanDefaults;
use crate::errors::ConvertError;
use crate::session::Session;
use crate::xml::{to_xml_string, Element};

/// A generated JMeter plan, ready to be written as `.jmx`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TestPlanDocument {
    pub root: Element,
}

impl TestPlanDocument {
    pub fn to_xml(&self) -> String {
        to_xml_string(&self.root)
    }

    /// Writes the document to `path`, replacing any existing file only once
    /// the whole document has been written.
    pub fn write_to(&self, path: &Path) -> Result<(), ConvertError> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(self.to_xml().as_bytes())?;
        file.flush()?;
        file.persist(path).map_err(|e| ConvertError::Io(e.error))?;
        return Ok(());
    }
}

fn string_prop(name: &str, value: &str) -> Element {
    Element::new("stringProp").attr("name", name).text(value)
}

fn bool_prop(name: &str, value: bool) -> Element {
    Element::new("boolProp")
        .attr("name", name)
        .text(if value { "true" } else { "false" })
}

fn test_element(tag: &str, gui_class: &str, test_name: &str) -> Element {
    Element::new(tag)
        .attr("guiclass", gui_class)
        .attr("testclass", tag)
        .attr("testname", test_name)
        .attr("enabled", "true")
}

fn hash_tree() -> Element {
    Element::new("hashTree")
}

/// Group key of a request path: its first segment, or the root group.
pub fn group_key(path: &str, defaults: &PlanDefaults) -> String {
    return match path.trim_matches('/').split('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => defaults.root_group.to_string(),
    };
}

/// Groups sessions by [`group_key`], keeping the order groups and sessions
/// were first seen in.
pub fn group_sessions<'a>(
    sessions: &'a [Session],
    defaults: &PlanDefaults,
) -> Vec<(String, Vec<&'a Session>)> {
    let mut groups: Vec<(String, Vec<&Session>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for session in sessions {
        let key = group_key(&session.path, defaults);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(session),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![session]));
            }
        }
    }
    return groups;
}

fn test_plan() -> Element {
    test_element("TestPlan", "TestPlanGui", "Test Plan")
        .child(string_prop("TestPlan.comments", ""))
        .child(bool_prop("TestPlan.functional_mode", false))
        .child(bool_prop("TestPlan.tearDown_on_shutdown", true))
        .child(bool_prop("TestPlan.serialize_threadgroups", false))
        .child(
            Element::new("elementProp")
                .attr("name", "TestPlan.user_defined_variables")
                .attr("elementType", "Arguments")
                .attr("guiclass", "ArgumentsPanel")
                .attr("testclass", "Arguments")
                .attr("testname", "User Defined Variables")
                .attr("enabled", "true")
                .child(Element::new("collectionProp").attr("name", "Arguments.arguments")),
        )
        .child(string_prop("TestPlan.user_define_classpath", ""))
}

fn thread_group(defaults: &PlanDefaults) -> Element {
    let loop_controller = Element::new("elementProp")
        .attr("name", "ThreadGroup.main_controller")
        .attr("elementType", "LoopController")
        .attr("guiclass", "LoopControlPanel")
        .attr("testclass", "LoopController")
        .attr("testname", "Loop Controller")
        .attr("enabled", "true")
        .child(bool_prop("LoopController.continue_forever", false))
        .child(string_prop("LoopController.loops", &defaults.loops.to_string()));

    test_element("ThreadGroup", "ThreadGroupGui", "Thread Group")
        .child(string_prop("ThreadGroup.on_sample_error", defaults.on_sample_error))
        .child(loop_controller)
        .child(string_prop("ThreadGroup.num_threads", &defaults.num_threads.to_string()))
        .child(string_prop("ThreadGroup.ramp_time", &defaults.ramp_time.to_string()))
        .child(bool_prop("ThreadGroup.scheduler", false))
        .child(string_prop("ThreadGroup.duration", ""))
        .child(string_prop("ThreadGroup.delay", ""))
        .child(bool_prop("ThreadGroup.same_user_on_next_iteration", true))
}

fn transaction_controller(group: &str, defaults: &PlanDefaults) -> Element {
    test_element(
        "TransactionController",
        "TransactionControllerGui",
        &format!("{}{}", group, defaults.transaction_suffix),
    )
    .child(bool_prop("TransactionController.includeTimers", false))
    .child(bool_prop("TransactionController.parent", false))
}

// Raw body modelled as a single unnamed argument
fn body_arguments(body: &str) -> Element {
    let argument = Element::new("elementProp")
        .attr("name", "")
        .attr("elementType", "HTTPArgument")
        .child(bool_prop("HTTPArgument.always_encode", false))
        .child(string_prop("Argument.value", body))
        .child(string_prop("Argument.metadata", "="));

    Element::new("elementProp")
        .attr("name", "HTTPsampler.Arguments")
        .attr("elementType", "Arguments")
        .attr("guiclass", "HTTPArgumentsPanel")
        .attr("testclass", "Arguments")
        .attr("enabled", "true")
        .child(Element::new("collectionProp").attr("name", "Arguments.arguments").child(argument))
}

fn http_sampler(session: &Session, defaults: &PlanDefaults) -> Element {
    let has_body = session.method != defaults.no_body_method;
    let mut sampler = test_element(
        "HTTPSamplerProxy",
        "HttpTestSampleGui",
        &format!("HTTP {} - {}", session.method, session.path),
    );

    if has_body {
        sampler.push(bool_prop("HTTPSampler.postBodyRaw", true));
        sampler.push(body_arguments(&session.body));
    }

    sampler
        .child(string_prop("HTTPSampler.domain", session.domain()))
        .child(string_prop("HTTPSampler.port", &session.port))
        .child(string_prop("HTTPSampler.protocol", &session.scheme))
        .child(string_prop("HTTPSampler.path", &session.path))
        .child(string_prop("HTTPSampler.method", &session.method))
        .child(bool_prop("HTTPSampler.follow_redirects", defaults.follow_redirects))
        .child(bool_prop("HTTPSampler.auto_redirects", defaults.auto_redirects))
        .child(bool_prop("HTTPSampler.use_keepalive", defaults.use_keepalive))
        .child(bool_prop("HTTPSampler.DO_MULTIPART_POST", false))
}

fn header_manager(session: &Session) -> Element {
    let mut headers = Element::new("collectionProp").attr("name", "HeaderManager.headers");
    for (name, value) in session.headers.iter() {
        if value.trim().is_empty() {
            continue;
        }
        headers.push(
            Element::new("elementProp")
                .attr("name", name)
                .attr("elementType", "Header")
                .child(string_prop("Header.name", name))
                .child(string_prop("Header.value", value)),
        );
    }

    test_element("HeaderManager", "HeaderPanel", "HTTP Header Manager").child(headers)
}

/// Builds the plan with the standard [`PlanDefaults`].
pub fn build(sessions: &[Session]) -> Result<TestPlanDocument, ConvertError> {
    build_with(sessions, &PlanDefaults::default())
}

/// Builds a JMeter plan with one transaction controller per path group.
///
/// Every element JMeter treats as a parent is followed by a sibling
/// `hashTree` holding its children, down to an empty one after each
/// header manager.
pub fn build_with(sessions: &[Session], defaults: &PlanDefaults) -> Result<TestPlanDocument, ConvertError> {
    if sessions.is_empty() {
        return Err(ConvertError::EmptyInput);
    }

    let mut transactions = hash_tree();
    for (group, members) in group_sessions(sessions, defaults) {
        debug!("group {}: {} requests", group, members.len());
        let mut samplers = hash_tree();
        for session in members {
            samplers.push(http_sampler(session, defaults));
            samplers.push(
                hash_tree()
                    .child(header_manager(session))
                    .child(hash_tree()),
            );
        }
        transactions.push(transaction_controller(&group, defaults));
        transactions.push(samplers);
    }

    let root = Element::new("jmeterTestPlan")
        .attr("version", defaults.file_version)
        .attr("properties", defaults.properties_version)
        .attr("jmeter", defaults.jmeter_version)
        .child(
            hash_tree().child(test_plan()).child(
                hash_tree()
                    .child(thread_group(defaults))
                    .child(transactions),
            ),
        );

    return Ok(TestPlanDocument { root });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_parser::parse_request;
    use test_case::test_case;

    fn session(method: &str, target: &str, body: &str) -> Session {
        parse_request(&format!(
            "{} {} HTTP/1.1\r\nHost: httpbin.org\r\nAccept: */*\r\n\r\n{}",
            method, target, body
        ))
        .unwrap()
    }

    fn names(elements: &[Element]) -> Vec<&str> {
        elements.iter().map(|e| e.name.as_str()).collect()
    }

    #[test_case("/api/v1/users", "api"; "nested path")]
    #[test_case("api/", "api"; "no leading slash")]
    #[test_case("//static//app.js", "static"; "repeated slashes")]
    #[test_case("/a/../b", "a"; "dot segments")]
    #[test_case("/", "root"; "root path")]
    #[test_case("", "root"; "empty path")]
    fn derives_group_keys(path: &str, expected: &str) {
        assert_eq!(group_key(path, &PlanDefaults::default()), expected);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(build(&[]), Err(ConvertError::EmptyInput)));
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let sessions = vec![
            session("GET", "/zeta/1", ""),
            session("GET", "/alpha/1", ""),
            session("GET", "/zeta/2", ""),
            session("GET", "/", ""),
        ];
        let groups = group_sessions(&sessions, &PlanDefaults::default());
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "root"]);
        let zeta: Vec<&str> = groups[0].1.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(zeta, vec!["/zeta/1", "/zeta/2"]);
    }

    #[test]
    fn containers_follow_their_elements() {
        let document = build(&[session("GET", "/api/v1/users", "")]).unwrap();
        let root = &document.root;
        assert_eq!(root.attribute("version"), Some("1.2"));
        assert_eq!(root.attribute("properties"), Some("5.0"));
        assert_eq!(names(&root.children), vec!["hashTree"]);

        let top = &root.children[0];
        assert_eq!(names(&top.children), vec!["TestPlan", "hashTree"]);
        let plan_tree = &top.children[1];
        assert_eq!(names(&plan_tree.children), vec!["ThreadGroup", "hashTree"]);
        let group_tree = &plan_tree.children[1];
        assert_eq!(names(&group_tree.children), vec!["TransactionController", "hashTree"]);
        let txn_tree = &group_tree.children[1];
        assert_eq!(names(&txn_tree.children), vec!["HTTPSamplerProxy", "hashTree"]);
        let sampler_tree = &txn_tree.children[1];
        assert_eq!(names(&sampler_tree.children), vec!["HeaderManager", "hashTree"]);
        assert!(sampler_tree.children[1].children.is_empty());
    }

    #[test]
    fn thread_group_runs_once_and_continues_on_error() {
        let document = build(&[session("GET", "/", "")]).unwrap();
        let thread_group = document.root.descendants_named("ThreadGroup")[0];
        assert_eq!(thread_group.prop("ThreadGroup.num_threads"), Some("1"));
        assert_eq!(thread_group.prop("ThreadGroup.on_sample_error"), Some("continue"));
        let loops = thread_group.descendants_named("stringProp");
        assert!(loops
            .iter()
            .any(|p| p.attribute("name") == Some("LoopController.loops") && p.text.as_deref() == Some("1")));
    }

    #[test]
    fn get_sampler_has_no_arguments() {
        let document = build(&[session("GET", "/api/v1/users?x=1", "")]).unwrap();
        let sampler = document.root.descendants_named("HTTPSamplerProxy")[0];

        assert_eq!(sampler.attribute("testname"), Some("HTTP GET - /api/v1/users"));
        assert_eq!(sampler.prop("HTTPSampler.domain"), Some("httpbin.org"));
        assert_eq!(sampler.prop("HTTPSampler.port"), Some(""));
        assert_eq!(sampler.prop("HTTPSampler.protocol"), Some("http"));
        assert_eq!(sampler.prop("HTTPSampler.path"), Some("/api/v1/users"));
        assert_eq!(sampler.prop("HTTPSampler.method"), Some("GET"));
        assert_eq!(sampler.prop("HTTPSampler.follow_redirects"), Some("true"));
        assert_eq!(sampler.prop("HTTPSampler.auto_redirects"), Some("false"));
        assert_eq!(sampler.prop("HTTPSampler.use_keepalive"), Some("true"));
        assert!(sampler.descendants_named("collectionProp").is_empty());
    }

    #[test_case("POST", r#"{"name":"Alice"}"#)]
    #[test_case("PUT", "a=1&b=2")]
    #[test_case("DELETE", "")]
    #[test_case("get", "lowercase is not GET")]
    fn non_get_sampler_carries_raw_body(method: &str, body: &str) {
        let document = build(&[session(method, "/api/v1/users", body)]).unwrap();
        let sampler = document.root.descendants_named("HTTPSamplerProxy")[0];
        let arguments = sampler.descendants_named("elementProp");
        let http_arguments: Vec<&&Element> = arguments
            .iter()
            .filter(|e| e.attribute("elementType") == Some("HTTPArgument"))
            .collect();

        assert_eq!(http_arguments.len(), 1);
        let argument = http_arguments[0];
        assert_eq!(argument.attribute("name"), Some(""));
        assert_eq!(argument.prop("Argument.value"), Some(body));
        assert_eq!(argument.prop("HTTPArgument.always_encode"), Some("false"));
        assert_eq!(argument.prop("Argument.metadata"), Some("="));
        assert_eq!(sampler.prop("HTTPSampler.postBodyRaw"), Some("true"));

        let container = arguments
            .iter()
            .find(|e| e.attribute("name") == Some("HTTPsampler.Arguments"))
            .unwrap();
        assert_eq!(container.attribute("guiclass"), Some("HTTPArgumentsPanel"));
        assert_eq!(container.attribute("testclass"), Some("Arguments"));
        assert_eq!(container.attribute("enabled"), Some("true"));
    }

    #[test]
    fn blank_header_values_are_omitted() {
        let raw = "GET / HTTP/1.1\nHost: httpbin.org\nX-Empty:\nX-Blank:    \nX-Zero: 0\n\n";
        let document = build(&[parse_request(raw).unwrap()]).unwrap();
        let manager = document.root.descendants_named("HeaderManager")[0];
        let headers: Vec<(&str, &str)> = manager
            .descendants_named("elementProp")
            .iter()
            .map(|h| {
                (
                    h.prop("Header.name").unwrap_or_default(),
                    h.prop("Header.value").unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(headers, vec![("Host", "httpbin.org"), ("X-Zero", "0")]);
    }

    #[test]
    fn header_manager_is_present_without_headers() {
        let document = build(&[parse_request("GET / HTTP/1.1\n\n").unwrap()]).unwrap();
        let managers = document.root.descendants_named("HeaderManager");
        assert_eq!(managers.len(), 1);
        assert!(managers[0].descendants_named("elementProp").is_empty());
    }

    #[test]
    fn one_transaction_per_group() {
        let sessions = vec![
            session("GET", "/api/a", ""),
            session("POST", "/login", "user=a"),
            session("GET", "/api/b", ""),
            session("GET", "https://httpbin.org/", ""),
        ];
        let document = build(&sessions).unwrap();
        let transactions: Vec<&str> = document
            .root
            .descendants_named("TransactionController")
            .iter()
            .map(|t| t.attribute("testname").unwrap_or_default())
            .collect();
        assert_eq!(transactions, vec!["api_txn", "login_txn", "root_txn"]);
        assert_eq!(document.root.descendants_named("HTTPSamplerProxy").len(), 4);
        assert_eq!(document.root.descendants_named("TestPlan").len(), 1);
        assert_eq!(document.root.descendants_named("ThreadGroup").len(), 1);
    }

    #[test]
    fn domain_drops_port_from_host_header() {
        let raw = "GET /a HTTP/1.1\nHost: httpbin.org:8080\n\n";
        let document = build(&[parse_request(raw).unwrap()]).unwrap();
        let sampler = document.root.descendants_named("HTTPSamplerProxy")[0];
        assert_eq!(sampler.prop("HTTPSampler.domain"), Some("httpbin.org"));
        assert_eq!(sampler.prop("HTTPSampler.port"), Some("8080"));
    }

    #[test_case("GET /a HTTP/1.1\nHost: httpbin.org:80\n\n", "80"; "origin form")]
    #[test_case("GET https://httpbin.org:443/a HTTP/1.1\nHost: httpbin.org:443\n\n", "443"; "absolute form")]
    fn default_ports_stay_explicit(raw: &str, port: &str) {
        let document = build(&[parse_request(raw).unwrap()]).unwrap();
        let sampler = document.root.descendants_named("HTTPSamplerProxy")[0];
        assert_eq!(sampler.prop("HTTPSampler.domain"), Some("httpbin.org"));
        assert_eq!(sampler.prop("HTTPSampler.port"), Some(port));
    }

    #[test]
    fn build_is_deterministic() {
        let sessions = vec![session("GET", "/b/1", ""), session("GET", "/a/1", "")];
        assert_eq!(build(&sessions).unwrap().to_xml(), build(&sessions).unwrap().to_xml());
    }

    #[test]
    fn writes_document_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.jmx");
        let document = build(&[session("GET", "/", "")]).unwrap();

        document.write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<jmeterTestPlan"));
        assert_eq!(written, document.to_xml());
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let document = build(&[session("GET", "/", "")]).unwrap();
        let result = document.write_to(Path::new("/nonexistent/dir/plan.jmx"));
        assert!(matches!(result, Err(ConvertError::Io(_))));
    }
}
