//! Small quick-xml helpers shared by the OOXML adapters.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Value of the attribute whose local name is `key`, prefix ignored
pub fn attribute(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .with_checks(false)
        .filter_map(std::result::Result::ok)
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Namespace prefix of an element, including the colon, or an empty string
pub fn prefix_of(element: &BytesStart) -> String {
    let name = element.name();
    let qualified = String::from_utf8_lossy(name.as_ref());
    qualified
        .split_once(':')
        .map(|(prefix, _)| format!("{}:", prefix))
        .unwrap_or_default()
}

/// Consume events up to and including the end tag of an element whose start
/// tag was just read
pub fn skip_element<R: std::io::BufRead>(reader: &mut Reader<R>) -> Result<(), String> {
    let mut depth = 1usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Ok(Event::Eof) => return Err("unexpected end of document".to_string()),
            Ok(_) => {}
            Err(e) => return Err(format!("malformed XML at {}: {}", reader.buffer_position(), e)),
        }
        buf.clear();
    }
}

/// A relationship entry from a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub target: String,
    /// Relationship type URI
    pub kind: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the type URI ends with the given short name, e.g. `drawing`
    pub fn is(&self, short_kind: &str) -> bool {
        self.kind.rsplit('/').next() == Some(short_kind)
    }
}

/// Parse a relationships part
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, String> {
    let mut reader = Reader::from_str(xml);
    let mut relationships = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                let (Some(id), Some(target)) = (attribute(&e, b"Id"), attribute(&e, b"Target")) else {
                    continue;
                };
                relationships.push(Relationship {
                    id,
                    target,
                    kind: attribute(&e, b"Type").unwrap_or_default(),
                    external: attribute(&e, b"TargetMode").is_some_and(|m| m == "External"),
                });
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("malformed relationships at {}: {}", reader.buffer_position(), e)),
        }
        buf.clear();
    }

    Ok(relationships)
}
