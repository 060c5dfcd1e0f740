/*!
 * Tests for the format adapters
 */

use anyhow::Result;
use std::fs;
use std::path::Path;

use docxlate::document::{self, DocumentKind, Locator, Translations};
use docxlate::errors::DocumentError;
use crate::common;

fn translate_all(extraction: &document::Extraction) -> Translations {
    let texts = extraction.units.iter().map(|u| format!("<{}>", u.text)).collect();
    Translations::align(&extraction.units, texts).unwrap()
}

/// Test format detection by extension
#[test]
fn test_document_kind_fromPath_shouldDetectSupportedFormats() {
    assert_eq!(DocumentKind::from_path(Path::new("a.xlsx")).unwrap(), DocumentKind::Workbook);
    assert_eq!(DocumentKind::from_path(Path::new("a.DOCX")).unwrap(), DocumentKind::FlowText);
    assert_eq!(DocumentKind::from_path(Path::new("a.pdf")).unwrap(), DocumentKind::Paged);
    assert_eq!(DocumentKind::from_path(Path::new("a.csv")).unwrap(), DocumentKind::Rows);

    match DocumentKind::from_path(Path::new("notes.txt")) {
        Err(DocumentError::UnsupportedFormat { extension }) => assert_eq!(extension, ".txt"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
    for name in ["legacy.xls", "legacy.doc", "README"] {
        assert!(!DocumentKind::is_supported(Path::new(name)), "{} should be unsupported", name);
    }
}

/// Test output extensions, with PDFs written as text
#[test]
fn test_document_kind_outputExtension_shouldDumpPdfAsText() {
    assert_eq!(DocumentKind::Paged.output_extension(Path::new("scan.pdf")), "txt");
    assert_eq!(DocumentKind::Workbook.output_extension(Path::new("book.xlsx")), "xlsx");
    assert!(DocumentKind::Workbook.carries_images());
    assert!(!DocumentKind::Rows.carries_images());
}

/// Test a missing or corrupt source is unreadable
#[test]
fn test_extract_withMissingOrCorruptFile_shouldBeUnreadable() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let staging = dir.path().join("images");

    let missing = document::extract(DocumentKind::Workbook, &dir.path().join("nope.xlsx"), &staging);
    assert!(matches!(missing, Err(DocumentError::SourceUnreadable { .. })));

    let corrupt = common::create_test_file(dir.path(), "broken.xlsx", "not a zip archive")?;
    let result = document::extract(DocumentKind::Workbook, &corrupt, &staging);
    assert!(matches!(result, Err(DocumentError::SourceUnreadable { .. })));

    let corrupt = common::create_test_file(dir.path(), "broken.docx", "not a zip archive")?;
    let result = document::extract(DocumentKind::FlowText, &corrupt, &staging);
    assert!(matches!(result, Err(DocumentError::SourceUnreadable { .. })));
    Ok(())
}

/// Test workbook extraction keeps only literal text cells, in sheet then row order
#[test]
fn test_xlsx_extract_shouldSkipNumbersFormulasAndBlanks() -> Result<()> {
    common::init_logging();
    let dir = common::create_temp_dir()?;
    let path = common::create_test_workbook(dir.path(), "book.xlsx", false)?;

    let extraction = document::extract(DocumentKind::Workbook, &path, &dir.path().join("images"))?;
    let got: Vec<(&str, Locator)> = extraction
        .units
        .iter()
        .map(|u| (u.text.as_str(), u.locator.clone()))
        .collect();

    assert_eq!(
        got,
        vec![
            ("Xin chào", Locator::cell(0, "Sheet1", 0, 1)),
            ("Bảng tính", Locator::cell(0, "Sheet1", 0, 2)),
            ("Tạm biệt", Locator::cell(0, "Sheet1", 1, 0)),
            ("Ghi chú", Locator::cell(1, "Notes", 2, 1)),
        ]
    );
    assert!(extraction.images.is_empty());
    Ok(())
}

/// Test workbook write-back replaces text cells and leaves numbers and formulas alone
#[test]
fn test_xlsx_reinsert_shouldRewriteTextCellsOnly() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_workbook(dir.path(), "book.xlsx", false)?;
    let output = dir.path().join("out").join("book-translated.xlsx");
    let staging = dir.path().join("images");

    let extraction = document::extract(DocumentKind::Workbook, &source, &staging)?;
    let translations = translate_all(&extraction);
    document::reinsert(DocumentKind::Workbook, &source, &output, &translations, &extraction.images)?;

    let reread = document::extract(DocumentKind::Workbook, &output, &staging)?;
    let texts: Vec<&str> = reread.units.iter().map(|u| u.text.as_str()).collect();
    assert_eq!(texts, vec!["<Xin chào>", "<Bảng tính>", "<Tạm biệt>", "<Ghi chú>"]);
    for (before, after) in extraction.units.iter().zip(&reread.units) {
        assert_eq!(before.locator, after.locator);
    }

    let sheet = common::read_zip_part(&output, "xl/worksheets/sheet1.xml")?;
    assert!(sheet.contains(r#"<c r="A1"><v>42</v></c>"#));
    assert!(sheet.contains("<f>"));
    assert!(sheet.contains("Xin chào!"));

    // source untouched
    let original = document::extract(DocumentKind::Workbook, &source, &staging)?;
    assert_eq!(original.units[0].text, "Xin chào");
    Ok(())
}

/// Test workbook pictures are staged and end up at the same anchor with the same bytes
#[test]
fn test_xlsx_images_shouldRoundTripAtSameAnchor() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_workbook(dir.path(), "pics.xlsx", true)?;
    let output = dir.path().join("pics-translated.xlsx");

    let extraction = document::extract(DocumentKind::Workbook, &source, &dir.path().join("staged"))?;
    assert_eq!(extraction.images.len(), 1);
    let image = &extraction.images[0];
    let (row, column) = common::PICTURE_ANCHOR;
    assert_eq!(image.locator, Locator::cell(0, "Sheet1", row, column));
    assert_eq!(image.part_name, "xl/media/image1.png");
    assert_eq!(image.staged_path.file_name().unwrap().to_string_lossy(), "pics_1_1.png");
    assert_eq!(fs::read(&image.staged_path)?, common::PICTURE_BYTES);

    let translations = translate_all(&extraction);
    document::reinsert(DocumentKind::Workbook, &source, &output, &translations, &extraction.images)?;

    let reread = document::extract(DocumentKind::Workbook, &output, &dir.path().join("restaged"))?;
    assert_eq!(reread.images.len(), 1);
    assert_eq!(reread.images[0].locator, image.locator);
    assert_eq!(fs::read(&reread.images[0].staged_path)?, common::PICTURE_BYTES);
    Ok(())
}

/// Test a translation for a cell that does not exist is reported
#[test]
fn test_xlsx_reinsert_withUnknownCell_shouldBeUnresolved() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_workbook(dir.path(), "book.xlsx", false)?;

    let mut translations = Translations::default();
    translations.insert(Locator::cell(0, "Sheet1", 40, 9), "lost".to_string());

    let result = document::reinsert(
        DocumentKind::Workbook,
        &source,
        &dir.path().join("out.xlsx"),
        &translations,
        &[],
    );
    assert!(matches!(result, Err(DocumentError::UnresolvedLocator { .. })));
    Ok(())
}

/// Test Word extraction counts empty paragraphs and joins runs
#[test]
fn test_docx_extract_shouldIndexParagraphs() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_docx(dir.path(), "memo.docx", &["Xin chào", "", "Tạm biệt"], true)?;

    let extraction = document::extract(DocumentKind::FlowText, &path, dir.path())?;
    let got: Vec<(&str, Locator)> = extraction
        .units
        .iter()
        .map(|u| (u.text.as_str(), u.locator.clone()))
        .collect();

    assert_eq!(
        got,
        vec![
            ("Xin chào", Locator::Paragraph { index: 0 }),
            ("Tạm biệt", Locator::Paragraph { index: 2 }),
            ("Phần cuối", Locator::Paragraph { index: 3 }),
        ]
    );
    Ok(())
}

/// Test Word write-back keeps run formatting and collapses split runs
#[test]
fn test_docx_reinsert_shouldKeepFormatting() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_docx(dir.path(), "memo.docx", &["Xin chào", "", "Tạm biệt"], true)?;
    let output = dir.path().join("memo-translated.docx");

    let extraction = document::extract(DocumentKind::FlowText, &source, dir.path())?;
    document::reinsert(DocumentKind::FlowText, &source, &output, &translate_all(&extraction), &[])?;

    let reread = document::extract(DocumentKind::FlowText, &output, dir.path())?;
    let texts: Vec<&str> = reread.units.iter().map(|u| u.text.as_str()).collect();
    assert_eq!(texts, vec!["<Xin chào>", "<Tạm biệt>", "<Phần cuối>"]);

    let xml = common::read_zip_part(&output, "word/document.xml")?;
    assert!(xml.contains("<w:b/>"));
    assert!(xml.contains("<w:i/>"));
    assert!(xml.contains(r#"<w:jc w:val="left"/>"#));
    Ok(())
}

/// Test Word write-back rejects locators it cannot place
#[test]
fn test_docx_reinsert_withForeignLocators_shouldBeUnresolved() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_docx(dir.path(), "memo.docx", &["một"], false)?;

    let mut translations = Translations::default();
    translations.insert(Locator::Paragraph { index: 7 }, "bảy".to_string());
    let result = document::reinsert(DocumentKind::FlowText, &source, &dir.path().join("a.docx"), &translations, &[]);
    assert!(matches!(
        result,
        Err(DocumentError::UnresolvedLocator {
            locator: Locator::Paragraph { index: 7 }
        })
    ));

    let mut translations = Translations::default();
    translations.insert(Locator::Page { index: 0 }, "x".to_string());
    let result = document::reinsert(DocumentKind::FlowText, &source, &dir.path().join("b.docx"), &translations, &[]);
    assert!(matches!(result, Err(DocumentError::UnresolvedLocator { .. })));
    Ok(())
}

/// Test CSV round trip keeps the header and untranslated fields
#[test]
fn test_csv_reinsert_shouldKeepHeaderAndBlanks() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_csv(
        dir.path(),
        "people.csv",
        &["name", "city"],
        &[&["An", "Hà Nội"], &["", "Huế"]],
    )?;
    let output = dir.path().join("people-translated.csv");

    let extraction = document::extract(DocumentKind::Rows, &source, dir.path())?;
    assert_eq!(extraction.units.len(), 3);
    document::reinsert(DocumentKind::Rows, &source, &output, &translate_all(&extraction), &[])?;

    let content = fs::read_to_string(&output)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, vec!["name,city", "<An>,<Hà Nội>", ",<Huế>"]);
    Ok(())
}

/// Test PDF pages are extracted with their page index and written as text
#[test]
fn test_pdf_extract_and_reinsert_shouldDumpPagesInOrder() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_pdf(dir.path(), "scan.pdf", &["", "Hello World"])?;

    let extraction = document::extract(DocumentKind::Paged, &source, dir.path())?;
    assert_eq!(extraction.units.len(), 1);
    assert_eq!(extraction.units[0].locator, Locator::Page { index: 1 });
    assert!(extraction.units[0].text.contains("Hello"));

    let mut translations = Translations::default();
    translations.insert(Locator::Page { index: 4 }, "trang năm".to_string());
    translations.insert(Locator::Page { index: 1 }, "trang hai".to_string());
    let output = dir.path().join("scan-translated.txt");
    document::reinsert(DocumentKind::Paged, &source, &output, &translations, &[])?;

    assert_eq!(fs::read_to_string(&output)?, "trang hai\ntrang năm");
    Ok(())
}
