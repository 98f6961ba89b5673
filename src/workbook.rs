//! Minimal xlsx/xlsm workbook decoding.
//!
//! Reads an OOXML spreadsheet (a ZIP of XML parts) into a per-sheet cell
//! grid, then exposes header-keyed row records the import pipeline consumes.
//! Handles shared strings, inline strings, and raw numeric cells; missing
//! cells default to the empty string. This is deliberately not a general
//! spreadsheet parser: one header row, flat tabular data.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

/// One data row keyed by header text. Cells under an empty header are
/// dropped; mapped headers always have an entry, possibly empty.
pub type Row = HashMap<String, String>;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb cap).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// A decoded workbook: named sheets with their raw cell grids.
pub struct Workbook {
    sheets: Vec<Sheet>,
}

struct Sheet {
    name: String,
    grid: Vec<Vec<String>>,
}

impl Workbook {
    /// Reads and decodes a workbook file.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read workbook: {}", path.display()))?;
        Self::from_bytes(&bytes)
            .with_context(|| format!("failed to decode workbook: {}", path.display()))
    }

    /// Decodes a workbook from in-memory bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).context("not a valid xlsx archive")?;

        let shared = read_shared_strings(&mut archive)?;
        let names = read_sheet_names(&mut archive)?;
        let parts = list_worksheet_parts(&archive);

        // Sheet names from workbook.xml pair with worksheet parts by
        // position; both follow the authoring order in practice.
        let mut sheets = Vec::new();
        for (idx, part) in parts.iter().enumerate() {
            let xml = read_zip_entry_bounded(&mut archive, part, MAX_XML_ENTRY_BYTES)?;
            let grid = parse_sheet_grid(&xml, &shared)?;
            let name = names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("Sheet{}", idx + 1));
            sheets.push(Sheet { name, grid });
        }

        if sheets.is_empty() {
            bail!("workbook contains no worksheets");
        }
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn first_sheet(&self) -> &str {
        &self.sheets[0].name
    }

    fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets.iter().find(|s| s.name == name).ok_or_else(|| {
            anyhow::anyhow!(
                "sheet '{}' not found (available: {})",
                name,
                self.sheet_names().join(", ")
            )
        })
    }

    /// Non-empty header cells of the given sheet, reading the header from
    /// the 0-based `header_row` offset.
    pub fn headers(&self, sheet: &str, header_row: usize) -> Result<Vec<String>> {
        let sheet = self.sheet(sheet)?;
        let row = sheet.grid.get(header_row).ok_or_else(|| {
            anyhow::anyhow!(
                "header row {} is past the end of sheet '{}' ({} rows)",
                header_row + 1,
                sheet.name,
                sheet.grid.len()
            )
        })?;
        Ok(row
            .iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect())
    }

    /// Data rows below the header, keyed by header text. Cells beyond the
    /// stored row width come back as empty strings.
    pub fn rows(&self, sheet: &str, header_row: usize) -> Result<Vec<Row>> {
        let sheet_ref = self.sheet(sheet)?;
        let header = sheet_ref.grid.get(header_row).ok_or_else(|| {
            anyhow::anyhow!(
                "header row {} is past the end of sheet '{}'",
                header_row + 1,
                sheet_ref.name
            )
        })?;

        let columns: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .map(|(i, h)| (i, h.trim().to_string()))
            .filter(|(_, h)| !h.is_empty())
            .collect();

        let mut rows = Vec::new();
        for cells in sheet_ref.grid.iter().skip(header_row + 1) {
            let mut row = Row::with_capacity(columns.len());
            for (col, name) in &columns {
                let value = cells.get(*col).cloned().unwrap_or_default();
                row.insert(name.clone(), value);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>> {
    let entry = archive
        .by_name(name)
        .with_context(|| format!("ZIP entry {} not found", name))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .with_context(|| format!("failed to read ZIP entry {}", name))?;
    if out.len() as u64 >= max_bytes {
        bail!("ZIP entry {} exceeds size limit ({} bytes)", name, max_bytes);
    }
    Ok(out)
}

/// Reads `xl/sharedStrings.xml`; absent table means no shared strings.
/// Rich-text runs inside one `<si>` are concatenated into a single string.
fn read_shared_strings(archive: &mut zip::ZipArchive<Cursor<&[u8]>>) -> Result<Vec<String>> {
    if archive.by_name("xl/sharedStrings.xml").is_err() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("sharedStrings.xml parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Sheet names from `xl/workbook.xml`, in document order.
fn read_sheet_names(archive: &mut zip::ZipArchive<Cursor<&[u8]>>) -> Result<Vec<String>> {
    let xml = read_zip_entry_bounded(archive, "xl/workbook.xml", MAX_XML_ENTRY_BYTES)?;
    let mut names = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) | Ok(quick_xml::events::Event::Empty(e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    if let Some(name) = attr_value(&e, b"name") {
                        names.push(name);
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("workbook.xml parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(names)
}

/// Worksheet part names (`xl/worksheets/sheetN.xml`) sorted by N.
fn list_worksheet_parts(archive: &zip::ZipArchive<Cursor<&[u8]>>) -> Vec<String> {
    let mut parts: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    parts.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    parts
}

/// How a `<c>` element's value should be interpreted.
#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    /// `t="s"`: `<v>` holds an index into the shared-strings table.
    Shared,
    /// `t="inlineStr"`: value lives in `<is><t>`.
    Inline,
    /// Everything else: `<v>` text is the value (numbers, formula results).
    Raw,
}

/// Parses one worksheet XML into a dense cell grid. Row and cell positions
/// come from the `r` attributes so gaps in sparse sheets stay aligned.
fn parse_sheet_grid(xml: &[u8], shared: &[String]) -> Result<Vec<Vec<String>>> {
    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut row_target: usize = 0;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut kind = CellKind::Raw;
    let mut col: usize = 0;
    let mut in_v = false;
    let mut in_inline_t = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row_target = attr_value(&e, b"r")
                        .and_then(|r| r.parse::<usize>().ok())
                        .map(|r| r.saturating_sub(1))
                        .unwrap_or(grid.len());
                    row = Vec::new();
                }
                b"c" => {
                    col = attr_value(&e, b"r")
                        .and_then(|r| column_from_ref(&r))
                        .unwrap_or(row.len());
                    kind = match attr_value(&e, b"t").as_deref() {
                        Some("s") => CellKind::Shared,
                        Some("inlineStr") => CellKind::Inline,
                        _ => CellKind::Raw,
                    };
                }
                b"v" => in_v = true,
                b"t" if kind == CellKind::Inline => in_inline_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) => {
                let text = te.unescape().unwrap_or_default();
                if in_v {
                    let value = match kind {
                        CellKind::Shared => text
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i).cloned())
                            .unwrap_or_default(),
                        _ => text.into_owned(),
                    };
                    set_cell(&mut row, col, value);
                } else if in_inline_t {
                    set_cell(&mut row, col, text.into_owned());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"t" => in_inline_t = false,
                b"row" => {
                    while grid.len() < row_target {
                        grid.push(Vec::new());
                    }
                    grid.push(std::mem::take(&mut row));
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("worksheet parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(grid)
}

fn set_cell(row: &mut Vec<String>, col: usize, value: String) {
    while row.len() <= col {
        row.push(String::new());
    }
    row[col] = value;
}

/// 0-based column index from a cell reference like `"C5"` or `"BC12"`.
fn column_from_ref(cell_ref: &str) -> Option<usize> {
    let letters: String = cell_ref
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index: usize = 0;
    for c in letters.chars() {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(a.value.as_ref()).into_owned())
}
