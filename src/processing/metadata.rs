// src/processing/metadata.rs
use std::borrow::Cow;
use std::fmt::Display;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesCData, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, info};

use crate::error::TemplateError;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Byte-order mark written ahead of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bom {
    None,
    #[default]
    Utf8,
}

/// Ordered `$name` -> value table.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    entries: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `name`.
    pub fn set(&mut self, name: &str, value: impl Display) -> &mut Self {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn longest_first(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .sorted_by(|a, b| b.0.len().cmp(&a.0.len()))
            .collect()
    }
}

/// Replaces `$name` tokens; unknown tokens stay as written.
pub fn substitute_tokens<'a>(text: &'a str, subs: &Substitutions) -> Cow<'a, str> {
    substitute_with(text, &subs.longest_first(), |v| Cow::Borrowed(v))
}

fn substitute_with<'a, F>(text: &'a str, keys: &[(&str, &str)], encode: F) -> Cow<'a, str>
where
    F: for<'v> Fn(&'v str) -> Cow<'v, str>,
{
    if !text.contains('$') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        match keys.iter().find(|(k, _)| !k.is_empty() && tail.starts_with(k)) {
            Some((k, v)) => {
                out.push_str(&encode(v));
                rest = &tail[k.len()..];
            }
            None => {
                out.push('$');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Substitutes tokens in every text node, CDATA section and attribute value.
pub fn render_template(xml: &str, subs: &Substitutions) -> Result<String, TemplateError> {
    let keys = subs.longest_first();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        let event = reader.read_event().map_err(|e| TemplateError::Parse {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        let rendered = match event {
            Event::Eof => break,
            Event::Start(e) => Event::Start(substitute_attributes(&e, &keys)?),
            Event::Empty(e) => Event::Empty(substitute_attributes(&e, &keys)?),
            Event::Text(t) => {
                let raw = std::str::from_utf8(&t).map_err(|e| parse_error(&reader, e))?;
                let text = substitute_with(raw, &keys, partial_escape);
                Event::Text(BytesText::from_escaped(text.into_owned()))
            }
            Event::CData(c) => {
                let raw = std::str::from_utf8(&c).map_err(|e| parse_error(&reader, e))?;
                let text = substitute_with(raw, &keys, |v| Cow::Borrowed(v));
                Event::CData(BytesCData::new(text.into_owned()))
            }
            other => other,
        };

        writer.write_event(rendered).map_err(|e| parse_error(&reader, e))?;
    }

    String::from_utf8(writer.into_inner()).map_err(|e| TemplateError::Parse {
        position: e.utf8_error().valid_up_to(),
        message: e.to_string(),
    })
}

fn substitute_attributes(start: &BytesStart, keys: &[(&str, &str)]) -> Result<BytesStart<'static>, TemplateError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    for attr in start.attributes().with_checks(false) {
        let attr = attr.map_err(|e| TemplateError::Parse { position: 0, message: e.to_string() })?;
        let raw = String::from_utf8_lossy(&attr.value);
        let value = substitute_with(&raw, keys, escape);
        // values are re-emitted inside double quotes
        let value = value.replace('"', "&quot;");
        rebuilt.push_attribute((attr.key.as_ref(), value.as_bytes()));
    }
    Ok(rebuilt)
}

fn parse_error(reader: &Reader<&[u8]>, e: impl Display) -> TemplateError {
    TemplateError::Parse { position: reader.buffer_position(), message: e.to_string() }
}

/// Loads `template`, substitutes tokens and optionally writes the result with an
/// XML declaration and byte-order mark. Returns the rendered document.
pub fn fill_template(
    template: &Path,
    subs: &Substitutions,
    output: Option<(&Path, Bom)>,
) -> Result<String, TemplateError> {
    if !template.is_file() {
        return Err(TemplateError::NotFound(template.to_path_buf()));
    }
    let source = fs::read_to_string(template).map_err(|source| TemplateError::Read {
        path: template.to_path_buf(),
        source,
    })?;
    let source = source.trim_start_matches('\u{feff}');
    if source.trim().is_empty() {
        return Err(TemplateError::Empty(template.to_path_buf()));
    }

    debug!(template = %template.display(), params = subs.len(), "Rendering template");
    let rendered = render_template(source, subs)?;

    if let Some((path, bom)) = output {
        let mut bytes = Vec::with_capacity(rendered.len() + XML_DECLARATION.len() + UTF8_BOM.len());
        if bom == Bom::Utf8 {
            bytes.extend_from_slice(UTF8_BOM);
        }
        if !rendered.trim_start().starts_with("<?xml") {
            bytes.extend_from_slice(XML_DECLARATION.as_bytes());
        }
        bytes.extend_from_slice(rendered.as_bytes());
        fs::write(path, bytes)?;
        info!(output = %path.display(), "Wrote product description");
    }

    Ok(rendered)
}
