/// A node of the generated document.
///
/// Attributes keep insertion order so the output matches what JMeter writes
/// itself.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: &str) -> Element {
        return Element {
            name: name.to_string(),
            ..Default::default()
        };
    }

    pub fn attr(mut self, name: &str, value: &str) -> Element {
        self.attributes.push((name.to_string(), value.to_string()));
        return self;
    }

    pub fn text(mut self, text: &str) -> Element {
        self.text = Some(text.to_string());
        return self;
    }

    pub fn child(mut self, child: Element) -> Element {
        self.children.push(child);
        return self;
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All elements below this one with the given tag, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            found.extend(child.descendants_named(name));
        }
        return found;
    }

    /// Text of the direct `*Prop` child whose `name` attribute matches.
    pub fn prop(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|c| c.name.ends_with("Prop") && c.attribute("name") == Some(name))
            .map(|c| c.text.as_deref().unwrap_or_default())
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn write_element(out: &mut String, element: &Element, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
    }

    match (&element.text, element.children.is_empty()) {
        (None, true) => out.push_str("/>\n"),
        (Some(text), true) => {
            out.push_str(&format!(">{}</{}>\n", escape(text), element.name));
        }
        (text, false) => {
            out.push('>');
            if let Some(text) = text {
                out.push_str(&escape(text));
            }
            out.push('\n');
            for child in &element.children {
                write_element(out, child, depth + 1);
            }
            out.push_str(&format!("{}</{}>\n", indent, element.name));
        }
    }
}

/// Serializes `root` as a standalone UTF-8 XML document.
pub fn to_xml_string(root: &Element) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(&mut out, root, 0);
    out
}
