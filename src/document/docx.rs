/*!
 * Flow-text adapter (`.docx`).
 *
 * Every `<w:p>` of the main document part gets an index in document order,
 * empty paragraphs included, so indices stay stable between extraction and
 * write-back. A paragraph contributes a text unit when the concatenation of
 * its text runs is not blank.
 *
 * Write-back happens in place on a duplicate of the source: the first text
 * run of a translated paragraph receives the whole translation and the
 * paragraph's remaining text runs are emptied. Tabs and line breaks of the
 * original runs are dropped and rebuilt from the `\t` and `\n` of the
 * translation. Paragraph and run properties, tables, images and everything
 * outside the main part are left as they were.
 */

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

use log::{debug, info};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader as XmlReader, Writer as XmlWriter};

use super::model::{Extraction, Locator, TextUnit, Translations};
use super::package::{resolve_target, OfficePackage};
use super::xml::{parse_relationships, prefix_of, skip_element};
use crate::errors::DocumentError;
use crate::file_utils::FileManager;

const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

/// Locate the main document part through the package relationships
fn main_document_part(package: &mut OfficePackage) -> Result<String, DocumentError> {
    let Some(rels) = package.read_optional_part_string("_rels/.rels")? else {
        return Ok(DEFAULT_DOCUMENT_PART.to_string());
    };
    let relationships =
        parse_relationships(&rels).map_err(|e| DocumentError::unreadable(package.path().to_path_buf(), e))?;

    Ok(relationships
        .iter()
        .find(|rel| rel.is("officeDocument") && !rel.external)
        .map(|rel| resolve_target("", &rel.target))
        .unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string()))
}

/// Extract one text unit per non-blank paragraph
pub fn extract(path: &Path) -> Result<Extraction, DocumentError> {
    let mut package = OfficePackage::open(path)?;
    let part = main_document_part(&mut package)?;
    let xml = package.read_part(&part)?;
    drop(package);

    let paragraphs = read_paragraphs(&xml).map_err(|e| DocumentError::unreadable(path, e))?;
    let units: Vec<TextUnit> = paragraphs
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| TextUnit::new(text, Locator::Paragraph { index }))
        .collect();

    info!("Extracted {} paragraphs from {:?}", units.len(), path);
    Ok(Extraction {
        units,
        images: Vec::new(),
    })
}

/// Element names of the WordprocessingML namespace as used by one document
struct WordNames {
    paragraph: Vec<u8>,
    run: Vec<u8>,
    text: Vec<u8>,
    tab: Vec<u8>,
    line_break: Vec<u8>,
    carriage_return: Vec<u8>,
}

impl WordNames {
    fn with_prefix(prefix: &str) -> Self {
        let name = |local: &str| format!("{}{}", prefix, local).into_bytes();
        Self {
            paragraph: name("p"),
            run: name("r"),
            text: name("t"),
            tab: name("tab"),
            line_break: name("br"),
            carriage_return: name("cr"),
        }
    }

    /// Run content read back as `\t` or `\n`
    fn is_break(&self, name: &[u8]) -> bool {
        name == self.tab.as_slice() || name == self.line_break.as_slice() || name == self.carriage_return.as_slice()
    }
}

/// All paragraphs as (index, text), in index order
fn read_paragraphs(xml: &[u8]) -> Result<Vec<(usize, String)>, String> {
    let mut reader = XmlReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut names: Option<WordNames> = None;

    let mut next_index = 0usize;
    let mut open: Vec<(usize, String)> = Vec::new();
    let mut done: Vec<(usize, String)> = Vec::new();
    let mut in_text = false;
    let mut in_run = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("malformed document at {}: {}", reader.buffer_position(), e))?;

        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let names = names.get_or_insert_with(|| WordNames::with_prefix(&prefix_of(e)));
                let name = e.name();
                let is_start = matches!(event, Event::Start(_));

                if name.as_ref() == names.paragraph.as_slice() {
                    if is_start {
                        open.push((next_index, String::new()));
                    } else {
                        done.push((next_index, String::new()));
                    }
                    next_index += 1;
                } else if name.as_ref() == names.run.as_slice() {
                    in_run = is_start;
                } else if name.as_ref() == names.text.as_slice() {
                    in_text = is_start;
                } else if in_run && names.is_break(name.as_ref()) {
                    // tab stops in paragraph properties share the tab element name
                    if let Some((_, text)) = open.last_mut() {
                        text.push(if name.as_ref() == names.tab.as_slice() { '\t' } else { '\n' });
                    }
                }
            }
            Event::Text(t) if in_text => {
                if let Some((_, text)) = open.last_mut() {
                    text.push_str(&t.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::End(e) => {
                if let Some(names) = &names {
                    if e.name().as_ref() == names.text.as_slice() {
                        in_text = false;
                    } else if e.name().as_ref() == names.run.as_slice() {
                        in_run = false;
                    } else if e.name().as_ref() == names.paragraph.as_slice() {
                        if let Some(paragraph) = open.pop() {
                            done.push(paragraph);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    done.sort_by_key(|(index, _)| *index);
    Ok(done)
}

/// Write translated paragraphs into a duplicate of the source at `output`
pub fn reinsert(source: &Path, output: &Path, translations: &Translations) -> Result<(), DocumentError> {
    let mut by_index: HashMap<usize, &str> = HashMap::new();
    for (locator, text) in translations.iter() {
        match locator {
            Locator::Paragraph { index } => {
                by_index.insert(*index, text);
            }
            other => return Err(DocumentError::UnresolvedLocator { locator: other.clone() }),
        }
    }

    FileManager::copy_file(source, output).map_err(|e| DocumentError::write_failure(output, e))?;
    let mut package = OfficePackage::open(output).map_err(DocumentError::into_write_failure)?;
    let part = main_document_part(&mut package).map_err(DocumentError::into_write_failure)?;
    let xml = package.read_part(&part).map_err(DocumentError::into_write_failure)?;

    let (rewritten, written) =
        rewrite_paragraphs(&xml, &by_index).map_err(|e| DocumentError::write_failure(output, e))?;
    if let Some(missing) = by_index.keys().filter(|index| !written.contains(index)).min() {
        return Err(DocumentError::UnresolvedLocator {
            locator: Locator::Paragraph { index: *missing },
        });
    }

    debug!("Rewrote {} paragraphs in {}", written.len(), part);
    package.replace_part(part, rewritten);
    package.save()
}

struct OpenParagraph<'a> {
    index: usize,
    replacement: Option<&'a str>,
    emitted: bool,
}

fn rewrite_paragraphs(xml: &[u8], by_index: &HashMap<usize, &str>) -> Result<(Vec<u8>, HashSet<usize>), String> {
    let mut reader = XmlReader::from_reader(xml);
    let mut writer = XmlWriter::new(Cursor::new(Vec::with_capacity(xml.len())));
    let mut buf = Vec::new();
    let mut names: Option<WordNames> = None;

    let mut next_index = 0usize;
    let mut open: Vec<OpenParagraph> = Vec::new();
    let mut written = HashSet::new();
    let mut in_run = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("malformed document at {}: {}", reader.buffer_position(), e))?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if names.is_none() => {
                names = Some(WordNames::with_prefix(&prefix_of(e)));
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            Event::Start(ref e) if names.as_ref().is_some_and(|n| e.name().as_ref() == n.paragraph.as_slice()) => {
                open.push(OpenParagraph {
                    index: next_index,
                    replacement: by_index.get(&next_index).copied(),
                    emitted: false,
                });
                next_index += 1;
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            Event::Empty(ref e) if names.as_ref().is_some_and(|n| e.name().as_ref() == n.paragraph.as_slice()) => {
                next_index += 1;
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            Event::End(ref e) if names.as_ref().is_some_and(|n| e.name().as_ref() == n.paragraph.as_slice()) => {
                open.pop();
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            Event::Start(ref e) if names.as_ref().is_some_and(|n| e.name().as_ref() == n.run.as_slice()) => {
                in_run = true;
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            Event::End(ref e) if names.as_ref().is_some_and(|n| e.name().as_ref() == n.run.as_slice()) => {
                in_run = false;
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            Event::Start(ref e)
                if in_run
                    && open.last().is_some_and(|p| p.replacement.is_some())
                    && names.as_ref().is_some_and(|n| n.is_break(e.name().as_ref())) =>
            {
                skip_element(&mut reader)?;
            }
            Event::Empty(ref e)
                if in_run
                    && open.last().is_some_and(|p| p.replacement.is_some())
                    && names.as_ref().is_some_and(|n| n.is_break(e.name().as_ref())) => {}
            Event::Start(start)
                if names.as_ref().is_some_and(|n| start.name().as_ref() == n.text.as_slice())
                    && open.last().is_some_and(|p| p.replacement.is_some()) =>
            {
                let start = start.into_owned();
                skip_element(&mut reader)?;

                let Some(paragraph) = open.last_mut() else {
                    continue;
                };
                if paragraph.emitted {
                    writer.write_event(Event::Empty(start)).map_err(|e| e.to_string())?;
                } else {
                    let text = paragraph.replacement.unwrap_or_default();
                    write_text_run(&mut writer, &start, text)?;
                    paragraph.emitted = true;
                    written.insert(paragraph.index);
                }
            }
            other => writer.write_event(other).map_err(|e| e.to_string())?,
        }
        buf.clear();
    }

    Ok((writer.into_inner().into_inner(), written))
}

/// Write a translation as text elements, turning `\t` and `\n` back into
/// `tab` and `br` siblings
fn write_text_run<W: std::io::Write>(writer: &mut XmlWriter<W>, original: &BytesStart, text: &str) -> Result<(), String> {
    let name = String::from_utf8_lossy(original.name().as_ref()).into_owned();
    let prefix = prefix_of(original);

    let mut piece_start = 0;
    for (at, separator) in text.match_indices(['\t', '\n']) {
        write_text_piece(writer, original, &name, &text[piece_start..at], piece_start == 0)?;
        let element = if separator == "\t" { "tab" } else { "br" };
        writer
            .write_event(Event::Empty(BytesStart::new(format!("{}{}", prefix, element))))
            .map_err(|e| e.to_string())?;
        piece_start = at + separator.len();
    }
    write_text_piece(writer, original, &name, &text[piece_start..], piece_start == 0)
}

fn write_text_piece<W: std::io::Write>(
    writer: &mut XmlWriter<W>,
    original: &BytesStart,
    name: &str,
    piece: &str,
    force: bool,
) -> Result<(), String> {
    if piece.is_empty() && !force {
        return Ok(());
    }
    let mut start = BytesStart::new(name);
    for attr in original.attributes().with_checks(false).filter_map(std::result::Result::ok) {
        if attr.key.as_ref() != b"xml:space" {
            start.push_attribute(attr);
        }
    }
    start.push_attribute(("xml:space", "preserve"));

    writer.write_event(Event::Start(start)).map_err(|e| e.to_string())?;
    writer
        .write_event(Event::Text(BytesText::new(piece)))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| e.to_string())?;
    Ok(())
}
