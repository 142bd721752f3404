//! Reading and writing i18next JSON resource files.
//!
//! Files are parsed in document order and written back with keys sorted, so
//! the written form of a tree does not depend on how it was built.

use std::io::Read;

use encoding_rs_io::DecodeReaderBytesBuilder;
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Value, ser::PrettyFormatter};

use crate::{
    error::Error,
    types::{KeyPath, ResourceNode, Tree},
};

/// Indentation used when writing JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indent {
    Spaces(usize),
    Text(String),
}

impl Indent {
    /// Parses the user-facing form: a number of spaces, or a literal string
    /// such as `"\t"`. At most ten characters are used.
    pub fn parse(raw: &str) -> Indent {
        match raw.trim().parse::<usize>() {
            Ok(n) => Indent::Spaces(n.min(10)),
            Err(_) => Indent::Text(raw.chars().take(10).collect()),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Indent::Spaces(n) => " ".repeat(*n),
            Indent::Text(text) => text.clone(),
        }
    }
}

impl Default for Indent {
    fn default() -> Self {
        Indent::Spaces(4)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

impl std::str::FromStr for LineEnding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LF" => Ok(LineEnding::Lf),
            "CRLF" => Ok(LineEnding::Crlf),
            _ => Err(format!("Unknown line ending: {} (expected LF or CRLF)", s)),
        }
    }
}

/// How trees are rendered back to text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub indent: Indent,
    pub line_ending: LineEnding,
    pub final_newline: bool,
}

/// Decodes file bytes to text. A UTF-8 BOM is dropped; UTF-16 with a BOM is transcoded.
pub fn decode_bytes(bytes: &[u8]) -> Result<String, Error> {
    let mut text = String::new();
    DecodeReaderBytesBuilder::new()
        .bom_sniffing(true)
        .strip_bom(true)
        .build(bytes)
        .read_to_string(&mut text)?;
    Ok(text)
}

/// Parses a resource file. The root must be an object and every value a
/// string or an object.
pub fn parse_tree(text: &str) -> Result<Tree, Error> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(map) => tree_from_map(map, &KeyPath::root()),
        other => Err(Error::invalid_resource(format!(
            "the document root must be an object, found {}",
            value_kind(&other)
        ))),
    }
}

fn tree_from_map(map: serde_json::Map<String, Value>, path: &KeyPath) -> Result<Tree, Error> {
    let mut tree = Tree::with_capacity(map.len());
    for (key, value) in map {
        let child = path.child(&key);
        let node = match value {
            Value::String(text) => ResourceNode::Leaf(text),
            Value::Object(inner) => ResourceNode::Subtree(tree_from_map(inner, &child)?),
            other => {
                return Err(Error::invalid_resource(format!(
                    "value at `{}` is {}; only strings and objects are supported",
                    child,
                    value_kind(&other)
                )));
            }
        };
        tree.insert(key, node);
    }
    Ok(tree)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Serializes a tree with its keys sorted at every level.
struct Sorted<'a>(&'a Tree);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            match &self.0[key.as_str()] {
                ResourceNode::Leaf(text) => map.serialize_entry(key, text)?,
                ResourceNode::Subtree(tree) => map.serialize_entry(key, &Sorted(tree))?,
            }
        }
        map.end()
    }
}

/// Renders a tree the way it is written to disk.
pub fn render_tree(tree: &Tree, options: &FormatOptions) -> Result<String, Error> {
    let indent = options.indent.as_text();
    let mut text = if indent.is_empty() {
        serde_json::to_string(&Sorted(tree))?
    } else {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        Sorted(tree).serialize(&mut serializer)?;
        String::from_utf8(buffer)
            .map_err(|e| Error::invalid_resource(format!("rendered JSON is not UTF-8: {e}")))?
    };

    if options.line_ending == LineEnding::Crlf {
        text = text.replace('\n', "\r\n");
    }
    if options.final_newline {
        text.push_str(options.line_ending.as_str());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_parse_keeps_document_order() {
        let tree = parse_tree(r#"{"b": "B", "a": {"d": "D", "c": "C"}}"#).unwrap();
        let keys: Vec<&String> = tree.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        let inner: Vec<&String> = tree["a"].as_subtree().unwrap().keys().collect();
        assert_eq!(inner, vec!["d", "c"]);
    }

    #[test]
    fn test_parse_rejects_unsupported_values() {
        let err = parse_tree(r#"{"menu": {"count": 3}}"#).unwrap_err();
        assert!(err.to_string().contains("menu::count"));
        assert!(err.to_string().contains("a number"));

        let err = parse_tree(r#"["a"]"#).unwrap_err();
        assert!(err.to_string().contains("root must be an object"));

        assert!(parse_tree("{ not json").is_err());
    }

    #[test]
    fn test_render_sorts_keys() {
        let tree = parse_tree(r#"{"b": "B", "a": {"d": "D", "c": "C"}}"#).unwrap();
        let text = render_tree(&tree, &FormatOptions::default()).unwrap();
        let expected = indoc! {r#"
            {
                "a": {
                    "c": "C",
                    "d": "D"
                },
                "b": "B"
            }"#};
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_options() {
        let tree = parse_tree(r#"{"a": "A"}"#).unwrap();

        let compact = FormatOptions {
            indent: Indent::Spaces(0),
            ..FormatOptions::default()
        };
        assert_eq!(render_tree(&tree, &compact).unwrap(), r#"{"a":"A"}"#);

        let tabs_crlf = FormatOptions {
            indent: Indent::parse("\t"),
            line_ending: LineEnding::Crlf,
            final_newline: true,
        };
        assert_eq!(
            render_tree(&tree, &tabs_crlf).unwrap(),
            "{\r\n\t\"a\": \"A\"\r\n}\r\n"
        );

        let empty = Tree::new();
        assert_eq!(render_tree(&empty, &FormatOptions::default()).unwrap(), "{}");
    }

    #[test]
    fn test_indent_parse() {
        assert_eq!(Indent::parse("2"), Indent::Spaces(2));
        assert_eq!(Indent::parse("\t"), Indent::Text("\t".to_string()));
        assert_eq!(Indent::parse("40"), Indent::Spaces(10));
    }

    #[test]
    fn test_line_ending_from_str() {
        assert_eq!("crlf".parse::<LineEnding>().unwrap(), LineEnding::Crlf);
        assert!("cr".parse::<LineEnding>().is_err());
    }

    #[test]
    fn test_decode_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(br#"{"a": "A"}"#);
        assert_eq!(decode_bytes(&bytes).unwrap(), r#"{"a": "A"}"#);

        let utf16: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain("{}".encode_utf16().flat_map(|u| u.to_le_bytes()))
            .collect();
        assert_eq!(decode_bytes(&utf16).unwrap(), "{}");
    }
}
