/*!
 * Workbook adapter (`.xlsx`).
 *
 * Text extraction goes through calamine: a cell becomes a text unit when its
 * cached value is a non-blank string and the cell carries no formula. Numbers,
 * dates, booleans and formula results are never extracted, so they are never
 * touched on write-back.
 *
 * Write-back edits a byte-for-byte duplicate of the source package. Each
 * translated cell keeps its `<c>` element and attributes (style included) and
 * receives the translation as an inline string; every other element of the
 * sheet is streamed through unchanged. Pictures are located through the
 * sheet -> drawing -> media relationships, staged on disk during extraction and
 * written back into their media part after the text pass has been saved.
 */

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, SheetType, Xlsx};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader as XmlReader, Writer as XmlWriter};
use regex::Regex;

use super::model::{Extraction, ImageArtifact, Locator, TextUnit, Translations};
use super::package::{part_dir, rels_path_for, resolve_target, OfficePackage};
use super::xml::{attribute, parse_relationships, prefix_of, skip_element};
use crate::errors::DocumentError;
use crate::file_utils::FileManager;

const WORKBOOK_PART: &str = "xl/workbook.xml";

static CELL_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").expect("valid cell reference pattern"));

/// A worksheet and the package part that holds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPart {
    pub index: usize,
    pub name: String,
    pub part: String,
}

/// A picture anchored on a sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PictureRef {
    pub row: u32,
    pub column: u32,
    pub media_part: String,
}

/// Parse an A1 reference into a 0-based (row, column) pair
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let captures = CELL_REFERENCE.captures(reference.trim())?;
    let letters = captures.get(1)?.as_str();
    let row: u32 = captures.get(2)?.as_str().parse().ok()?;
    if row == 0 {
        return None;
    }

    let column = letters
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1));
    Some((row - 1, column - 1))
}

/// Extract text units and stage pictures
pub fn extract(path: &Path, staging_dir: &Path) -> Result<Extraction, DocumentError> {
    let units = extract_text_units(path)?;
    let images = stage_images(path, staging_dir)?;
    info!(
        "Extracted {} text cells and {} images from {:?}",
        units.len(),
        images.len(),
        path
    );
    Ok(Extraction { units, images })
}

fn extract_text_units(path: &Path) -> Result<Vec<TextUnit>, DocumentError> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| DocumentError::unreadable(path, e))?;
    let mut units = Vec::new();

    let worksheets: Vec<(usize, String)> = workbook
        .sheets_metadata()
        .iter()
        .enumerate()
        .filter(|(_, meta)| matches!(meta.typ, SheetType::WorkSheet))
        .map(|(index, meta)| (index, meta.name.clone()))
        .collect();

    for (sheet_index, sheet) in worksheets {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| DocumentError::unreadable(path, format!("sheet {}: {}", sheet, e)))?;
        let formulas = workbook.worksheet_formula(&sheet).unwrap_or_else(|e| {
            warn!("Cannot read formulas of sheet {}: {}", sheet, e);
            Range::empty()
        });

        let Some((first_row, first_column)) = range.start() else {
            debug!("Sheet {} has no used range", sheet);
            continue;
        };

        for (r, c, value) in range.used_cells() {
            let Data::String(text) = value else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }

            let (row, column) = (first_row + r as u32, first_column + c as u32);
            if formulas.get_value((row, column)).is_some_and(|f| !f.is_empty()) {
                continue;
            }

            units.push(TextUnit::new(text.clone(), Locator::cell(sheet_index, sheet.clone(), row, column)));
        }
    }

    Ok(units)
}

/// Sheets in workbook order with the part each one lives in
pub fn workbook_sheets(package: &mut OfficePackage) -> Result<Vec<SheetPart>, DocumentError> {
    let path = package.path().to_path_buf();
    let workbook_xml = package.read_part_string(WORKBOOK_PART)?;
    let rels_xml = package.read_part_string(&rels_path_for(WORKBOOK_PART))?;
    let relationships = parse_relationships(&rels_xml).map_err(|e| DocumentError::unreadable(&path, e))?;
    let targets: HashMap<&str, &str> = relationships
        .iter()
        .filter(|rel| rel.is("worksheet"))
        .map(|rel| (rel.id.as_str(), rel.target.as_str()))
        .collect();

    let mut reader = XmlReader::from_str(&workbook_xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut position = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let index = position;
                position += 1;
                let (Some(name), Some(id)) = (attribute(&e, b"name"), attribute(&e, b"id")) else {
                    continue;
                };
                // chartsheets and dialog sheets have no worksheet relationship
                if let Some(target) = targets.get(id.as_str()) {
                    sheets.push(SheetPart {
                        index,
                        name,
                        part: resolve_target(part_dir(WORKBOOK_PART), target),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(DocumentError::unreadable(&path, format!("malformed workbook: {}", e))),
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Pictures drawn on a sheet, in drawing order
pub fn sheet_pictures(package: &mut OfficePackage, sheet: &SheetPart) -> Result<Vec<PictureRef>, DocumentError> {
    let path = package.path().to_path_buf();
    let Some(sheet_rels) = package.read_optional_part_string(&rels_path_for(&sheet.part))? else {
        return Ok(Vec::new());
    };
    let sheet_rels = parse_relationships(&sheet_rels).map_err(|e| DocumentError::unreadable(&path, e))?;

    let mut pictures = Vec::new();
    for drawing in sheet_rels.iter().filter(|rel| rel.is("drawing") && !rel.external) {
        let drawing_part = resolve_target(part_dir(&sheet.part), &drawing.target);
        let Some(drawing_xml) = package.read_optional_part_string(&drawing_part)? else {
            warn!("Sheet {} references missing drawing {}", sheet.name, drawing_part);
            continue;
        };
        let drawing_rels = match package.read_optional_part_string(&rels_path_for(&drawing_part))? {
            Some(xml) => parse_relationships(&xml).map_err(|e| DocumentError::unreadable(&path, e))?,
            None => continue,
        };
        let media: HashMap<&str, String> = drawing_rels
            .iter()
            .filter(|rel| rel.is("image") && !rel.external)
            .map(|rel| (rel.id.as_str(), resolve_target(part_dir(&drawing_part), &rel.target)))
            .collect();

        let anchors = parse_drawing_anchors(&drawing_xml).map_err(|e| DocumentError::unreadable(&path, e))?;
        for (rel_id, row, column) in anchors {
            match media.get(rel_id.as_str()) {
                Some(media_part) => pictures.push(PictureRef {
                    row,
                    column,
                    media_part: media_part.clone(),
                }),
                None => warn!("Picture {} on sheet {} has no image relationship", rel_id, sheet.name),
            }
        }
    }

    Ok(pictures)
}

/// Parse a drawing part into (image relationship id, from-row, from-column)
///
/// Only one-cell and two-cell anchors are reported; absolute anchors have no
/// cell to attach to.
fn parse_drawing_anchors(xml: &str) -> Result<Vec<(String, u32, u32)>, String> {
    #[derive(PartialEq)]
    enum Slot {
        None,
        Row,
        Column,
    }

    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();
    let mut anchors = Vec::new();

    let mut in_anchor = false;
    let mut in_from = false;
    let mut in_picture = false;
    let mut slot = Slot::None;
    let mut from: (Option<u32>, Option<u32>) = (None, None);
    let mut embeds: Vec<String> = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("malformed drawing at {}: {}", reader.buffer_position(), e))?;
        let is_start = matches!(event, Event::Start(_));
        match event {
            Event::Start(e) | Event::Empty(e) => {
                match e.local_name().as_ref() {
                    b"oneCellAnchor" | b"twoCellAnchor" => {
                        in_anchor = true;
                        from = (None, None);
                        embeds.clear();
                    }
                    b"from" if in_anchor => in_from = is_start,
                    b"row" if in_from => slot = Slot::Row,
                    b"col" if in_from => slot = Slot::Column,
                    b"pic" if in_anchor => in_picture = is_start,
                    b"blip" if in_picture => {
                        if let Some(id) = attribute(&e, b"embed") {
                            embeds.push(id);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) if slot != Slot::None => {
                let value = t.unescape().map_err(|e| e.to_string())?;
                let parsed = value.trim().parse::<u32>().ok();
                match slot {
                    Slot::Row => from.0 = parsed,
                    Slot::Column => from.1 = parsed,
                    Slot::None => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"row" | b"col" => slot = Slot::None,
                b"from" => in_from = false,
                b"pic" => in_picture = false,
                b"oneCellAnchor" | b"twoCellAnchor" => {
                    in_anchor = false;
                    if let (Some(row), Some(column)) = from {
                        anchors.extend(embeds.drain(..).map(|id| (id, row, column)));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(anchors)
}

fn stage_images(path: &Path, staging_dir: &Path) -> Result<Vec<ImageArtifact>, DocumentError> {
    let mut package = OfficePackage::open(path)?;
    let sheets = workbook_sheets(&mut package)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".to_string());

    let mut images = Vec::new();
    for sheet in &sheets {
        for (n, picture) in sheet_pictures(&mut package, sheet)?.into_iter().enumerate() {
            let bytes = package.read_part(&picture.media_part)?;
            let extension = Path::new(&picture.media_part)
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| "bin".to_string());

            FileManager::ensure_dir(staging_dir).map_err(|e| DocumentError::write_failure(staging_dir, e))?;
            let staged_path = staging_dir.join(format!("{}_{}_{}.{}", stem, sheet.index + 1, n + 1, extension));
            fs::write(&staged_path, &bytes).map_err(|e| DocumentError::write_failure(&staged_path, e))?;
            debug!("Staged {} as {:?}", picture.media_part, staged_path);

            images.push(ImageArtifact {
                locator: Locator::cell(sheet.index, sheet.name.clone(), picture.row, picture.column),
                part_name: picture.media_part,
                staged_path,
            });
        }
    }

    Ok(images)
}

/// Write translations into the duplicate at `output`, then re-attach pictures
pub fn reinsert(
    source: &Path,
    output: &Path,
    translations: &Translations,
    images: &[ImageArtifact],
) -> Result<(), DocumentError> {
    FileManager::copy_file(source, output).map_err(|e| DocumentError::write_failure(output, e))?;

    let mut package = OfficePackage::open(output).map_err(DocumentError::into_write_failure)?;
    let sheets = workbook_sheets(&mut package).map_err(DocumentError::into_write_failure)?;

    let mut by_sheet: HashMap<&str, HashMap<(u32, u32), (&Locator, &str)>> = HashMap::new();
    for (locator, text) in translations.iter() {
        match locator {
            Locator::Cell { sheet, row, column, .. } => {
                by_sheet
                    .entry(sheet.as_str())
                    .or_default()
                    .insert((*row, *column), (locator, text));
            }
            other => return Err(DocumentError::UnresolvedLocator { locator: other.clone() }),
        }
    }

    for sheet in &sheets {
        let Some(cells) = by_sheet.remove(sheet.name.as_str()) else {
            continue;
        };
        let xml = package.read_part(&sheet.part).map_err(DocumentError::into_write_failure)?;
        let (rewritten, written) =
            rewrite_cells(&xml, &cells).map_err(|e| DocumentError::write_failure(output, format!("{}: {}", sheet.part, e)))?;

        if let Some(missing) = cells
            .iter()
            .filter(|(position, _)| !written.contains(position))
            .map(|(_, (locator, _))| *locator)
            .min()
        {
            return Err(DocumentError::UnresolvedLocator { locator: missing.clone() });
        }

        debug!("Rewrote {} cells on sheet {}", written.len(), sheet.name);
        package.replace_part(sheet.part.clone(), rewritten);
    }

    if let Some(missing) = by_sheet.values().flat_map(|cells| cells.values()).map(|(locator, _)| *locator).min() {
        return Err(DocumentError::UnresolvedLocator { locator: missing.clone() });
    }

    package.save()?;

    if !images.is_empty() {
        reattach_images(output, images)?;
    }

    Ok(())
}

/// Stream a worksheet, replacing the listed cells with inline strings
///
/// Returns the new XML and the positions that were actually written.
fn rewrite_cells(
    xml: &[u8],
    cells: &HashMap<(u32, u32), (&Locator, &str)>,
) -> Result<(Vec<u8>, HashSet<(u32, u32)>), String> {
    let mut reader = XmlReader::from_reader(xml);
    let mut writer = XmlWriter::new(Cursor::new(Vec::with_capacity(xml.len())));
    let mut buf = Vec::new();
    let mut written = HashSet::new();

    let mut row: Option<u32> = None;
    let mut column: Option<u32> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("malformed sheet at {}: {}", reader.buffer_position(), e))?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                row = attribute(e, b"r")
                    .and_then(|r| r.parse::<u32>().ok())
                    .and_then(|r| r.checked_sub(1))
                    .or_else(|| Some(row.map_or(0, |r| r + 1)));
                column = None;
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                let position = match attribute(e, b"r").and_then(|r| parse_cell_reference(&r)) {
                    Some(position) => position,
                    None => (row.unwrap_or(0), column.map_or(0, |c| c + 1)),
                };
                row = Some(position.0);
                column = Some(position.1);

                let replacement = match event {
                    Event::Start(_) => cells.get(&position).map(|(_, text)| *text),
                    _ => None,
                };

                match (replacement, event) {
                    (Some(text), Event::Start(start)) => {
                        let start = start.into_owned();
                        skip_element(&mut reader)?;
                        write_inline_string(&mut writer, &start, text)?;
                        written.insert(position);
                    }
                    (_, event) => writer.write_event(event).map_err(|e| e.to_string())?,
                }
            }
            other => writer.write_event(other).map_err(|e| e.to_string())?,
        }
        buf.clear();
    }

    Ok((writer.into_inner().into_inner(), written))
}

fn write_inline_string<W: std::io::Write>(
    writer: &mut XmlWriter<W>,
    cell: &BytesStart,
    text: &str,
) -> Result<(), String> {
    let prefix = prefix_of(cell);
    let cell_name = String::from_utf8_lossy(cell.name().as_ref()).into_owned();

    let mut start = BytesStart::new(cell_name.clone());
    for attr in cell.attributes().with_checks(false).filter_map(std::result::Result::ok) {
        if attr.key.local_name().as_ref() != b"t" {
            start.push_attribute(attr);
        }
    }
    start.push_attribute(("t", "inlineStr"));

    let is_name = format!("{}is", prefix);
    let t_name = format!("{}t", prefix);
    let mut t_start = BytesStart::new(t_name.clone());
    t_start.push_attribute(("xml:space", "preserve"));

    for event in [
        Event::Start(start),
        Event::Start(BytesStart::new(is_name.clone())),
        Event::Start(t_start),
        Event::Text(BytesText::new(text)),
        Event::End(BytesEnd::new(t_name)),
        Event::End(BytesEnd::new(is_name)),
        Event::End(BytesEnd::new(cell_name)),
    ] {
        writer.write_event(event).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Write staged image bytes back into their media parts
///
/// Every artifact must still be anchored at its original cell in the output.
fn reattach_images(output: &Path, images: &[ImageArtifact]) -> Result<(), DocumentError> {
    let mut package = OfficePackage::open(output).map_err(DocumentError::into_write_failure)?;
    let sheets = workbook_sheets(&mut package).map_err(DocumentError::into_write_failure)?;

    let mut anchored: HashSet<(String, PictureRef)> = HashSet::new();
    for sheet in &sheets {
        for picture in sheet_pictures(&mut package, sheet).map_err(DocumentError::into_write_failure)? {
            anchored.insert((sheet.name.clone(), picture));
        }
    }

    let mut reattached = BTreeSet::new();
    for image in images {
        let Locator::Cell { sheet, row, column, .. } = &image.locator else {
            return Err(DocumentError::UnresolvedLocator { locator: image.locator.clone() });
        };
        let key = (
            sheet.clone(),
            PictureRef {
                row: *row,
                column: *column,
                media_part: image.part_name.clone(),
            },
        );
        if !anchored.contains(&key) {
            return Err(DocumentError::write_failure(
                output,
                format!("no picture anchored at {} for {}", image.locator, image.part_name),
            ));
        }

        let bytes = fs::read(&image.staged_path).map_err(|e| DocumentError::write_failure(&image.staged_path, e))?;
        package.replace_part(image.part_name.clone(), bytes);
        reattached.insert(image.locator.to_string());
    }

    package.save()?;
    info!("Re-attached {} images at {:?}", images.len(), reattached);
    Ok(())
}
