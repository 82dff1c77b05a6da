//! Fill cells of an existing xlsx template without disturbing the rest of it.
//!
//! Only the first worksheet's XML is rewritten; every other part of the
//! package is copied through unchanged. Written cells keep their original
//! style and become inline strings.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use calamine::{Reader as _, Xlsx};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::CtrError;
use crate::projection::cell::CellRef;
use crate::projection::CellSink;

const DEFAULT_SHEET_PATH: &str = "xl/worksheets/sheet1.xml";

/// An xlsx template plus the cell values to write into its first worksheet.
pub struct XlsxTemplate {
    bytes: Vec<u8>,
    edits: BTreeMap<CellRef, String>,
}

impl XlsxTemplate {
    pub fn open(path: &Path) -> Result<Self, CtrError> {
        if !path.exists() {
            return Err(CtrError::SourceNotFound(path.to_path_buf()));
        }
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        XlsxTemplate {
            bytes,
            edits: BTreeMap::new(),
        }
    }

    pub fn edits(&self) -> &BTreeMap<CellRef, String> {
        &self.edits
    }

    /// Render the filled workbook.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CtrError> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let sheet_path = first_sheet_path(&mut archive)?;

        let mut sheet_xml = String::new();
        archive
            .by_name(&sheet_path)
            .map_err(|e| CtrError::Template(format!("{sheet_path}: {e}")))?
            .read_to_string(&mut sheet_xml)?;
        let patched = patch_sheet(&sheet_xml, &self.edits)?;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.name() == sheet_path {
                let options =
                    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
                writer.start_file(sheet_path.as_str(), options)?;
                writer.write_all(&patched)?;
            } else {
                writer.raw_copy_file(file)?;
            }
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Save the filled workbook to `path`. The template file is never modified.
    pub fn save(&self, path: &Path) -> Result<(), CtrError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        tracing::info!("saved {} cells to {}", self.edits.len(), path.display());
        Ok(())
    }
}

impl CellSink for XlsxTemplate {
    fn set_cell(&mut self, cell: CellRef, value: String) {
        self.edits.insert(cell, value);
    }
}

/// Read the given cells of the first worksheet as display strings.
///
/// Empty or missing cells map to the empty string.
pub fn read_cells(bytes: &[u8], cells: &[CellRef]) -> Result<BTreeMap<CellRef, String>, CtrError> {
    let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| CtrError::Template(format!("failed to open xlsx: {e}")))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CtrError::Template("workbook has no worksheets".into()))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| CtrError::Template(format!("sheet '{first}' could not be read: {e}")))?;

    Ok(cells
        .iter()
        .map(|c| {
            let value = range
                .get_value((c.row - 1, c.col - 1))
                .and_then(cell_as_string)
                .unwrap_or_default();
            (*c, value)
        })
        .collect())
}

fn cell_as_string(cell: &calamine::Data) -> Option<String> {
    match cell {
        calamine::Data::String(s) => Some(s.clone()),
        calamine::Data::Float(f) => Some(f.to_string()),
        calamine::Data::Int(i) => Some(i.to_string()),
        calamine::Data::Bool(b) => Some(b.to_string()),
        calamine::Data::DateTime(dt) => Some(dt.to_string()),
        calamine::Data::Empty => None,
        _ => Some(format!("{cell}")),
    }
}

fn xml_err(e: impl std::fmt::Display) -> CtrError {
    CtrError::Template(e.to_string())
}

/// Locate the first worksheet part through the workbook relationships.
fn first_sheet_path<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Result<String, CtrError> {
    let Some(workbook) = read_entry(archive, "xl/workbook.xml")? else {
        return Ok(DEFAULT_SHEET_PATH.to_string());
    };
    let Some(rel_id) = first_attr(&workbook, b"sheet", b"id")? else {
        return Ok(DEFAULT_SHEET_PATH.to_string());
    };
    let Some(rels) = read_entry(archive, "xl/_rels/workbook.xml.rels")? else {
        return Ok(DEFAULT_SHEET_PATH.to_string());
    };

    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attr(&e, b"Id")?.as_deref() == Some(rel_id.as_str()) {
                    let target = attr(&e, b"Target")?
                        .ok_or_else(|| CtrError::Template(format!("relationship {rel_id} has no target")))?;
                    return Ok(match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{target}"),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Err(CtrError::Template(format!(
        "first worksheet relationship {rel_id} not found"
    )))
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, CtrError> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut s = String::new();
    file.read_to_string(&mut s)?;
    Ok(Some(s))
}

/// Value of attribute `attr_name` on the first `element` in `xml`.
fn first_attr(xml: &str, element: &[u8], attr_name: &[u8]) -> Result<Option<String>, CtrError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == element => {
                return attr(&e, attr_name);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Attribute value by local name, so `r:id` matches `id`.
fn attr(e: &BytesStart, local: &[u8]) -> Result<Option<String>, CtrError> {
    for a in e.attributes() {
        let a = a.map_err(xml_err)?;
        if a.key.local_name().as_ref() == local {
            return Ok(Some(a.unescape_value().map_err(xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

/// Rewrite worksheet XML so every edited cell holds its new value.
///
/// Existing cells are replaced in place, keeping their style. Missing cells
/// and rows are inserted in row-major order.
fn patch_sheet(xml: &str, edits: &BTreeMap<CellRef, String>) -> Result<Vec<u8>, CtrError> {
    let mut pending: BTreeMap<u32, BTreeMap<u32, &str>> = BTreeMap::new();
    for (cell, value) in edits {
        pending
            .entry(cell.row)
            .or_default()
            .insert(cell.col, value.as_str());
    }

    let mut reader = Reader::from_str(xml);
    let mut out = SheetWriter {
        writer: Writer::new(Vec::new()),
        prefix: String::new(),
    };

    let mut in_sheet_data = false;
    let mut row_cells: Option<(u32, BTreeMap<u32, &str>)> = None;
    let mut last_row: u32 = 0;
    let mut last_col: u32 = 0;

    loop {
        let event = reader.read_event().map_err(xml_err)?;
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                out.prefix = name_prefix(&e);
                in_sheet_data = true;
                out.emit(Event::Start(e))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                out.prefix = name_prefix(&e);
                out.emit(Event::Start(e))?;
                out.flush_rows_before(&mut pending, u32::MAX)?;
                out.end("sheetData")?;
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                out.flush_rows_before(&mut pending, u32::MAX)?;
                in_sheet_data = false;
                out.emit(Event::End(e))?;
            }
            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let r = number_attr(&e, b"r")?.unwrap_or(last_row + 1);
                last_row = r;
                last_col = 0;
                out.flush_rows_before(&mut pending, r)?;
                row_cells = Some((r, pending.remove(&r).unwrap_or_default()));
                out.emit(Event::Start(e))?;
            }
            Event::Empty(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let r = number_attr(&e, b"r")?.unwrap_or(last_row + 1);
                last_row = r;
                out.flush_rows_before(&mut pending, r)?;
                match pending.remove(&r) {
                    Some(cells) => {
                        out.emit(Event::Start(e))?;
                        out.cells(r, &cells)?;
                        out.end("row")?;
                    }
                    None => out.emit(Event::Empty(e))?,
                }
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                if let Some((r, cells)) = row_cells.take() {
                    out.cells(r, &cells)?;
                }
                out.emit(Event::End(e))?;
            }
            Event::Start(e) if row_cells.is_some() && e.local_name().as_ref() == b"c" => {
                patch_cell(&mut reader, &mut out, &mut row_cells, &mut last_col, e, false)?;
            }
            Event::Empty(e) if row_cells.is_some() && e.local_name().as_ref() == b"c" => {
                patch_cell(&mut reader, &mut out, &mut row_cells, &mut last_col, e, true)?;
            }
            Event::Eof => break,
            other => out.emit(other)?,
        }
    }

    if !pending.is_empty() {
        return Err(CtrError::Template("worksheet has no sheetData element".into()));
    }
    Ok(out.writer.into_inner())
}

/// Copy or replace one `<c>` element of the current row, first inserting any
/// pending cells that sort before it.
fn patch_cell<'x, 'v>(
    reader: &mut Reader<&'x [u8]>,
    out: &mut SheetWriter,
    row_cells: &mut Option<(u32, BTreeMap<u32, &'v str>)>,
    last_col: &mut u32,
    e: BytesStart<'x>,
    is_empty: bool,
) -> Result<(), CtrError> {
    let Some((row, cells)) = row_cells.as_mut() else {
        return Err(xml_err("cell outside of a row"));
    };
    let col = attr(&e, b"r")?
        .and_then(|addr| CellRef::parse(&addr))
        .map(|c| c.col)
        .unwrap_or(*last_col + 1);
    *last_col = col;

    let before: Vec<u32> = cells.range(..col).map(|(k, _)| *k).collect();
    for k in before {
        if let Some(value) = cells.remove(&k) {
            out.cell(CellRef::new(*row, k), None, value)?;
        }
    }

    match cells.remove(&col) {
        Some(value) => {
            if !is_empty {
                reader.read_to_end(e.name()).map_err(xml_err)?;
            }
            let style = attr(&e, b"s")?;
            out.cell(CellRef::new(*row, col), style.as_deref(), value)
        }
        None if is_empty => out.emit(Event::Empty(e)),
        None => out.emit(Event::Start(e)),
    }
}

fn name_prefix(e: &BytesStart) -> String {
    match e.name().prefix() {
        Some(p) => format!("{}:", String::from_utf8_lossy(p.as_ref())),
        None => String::new(),
    }
}

fn number_attr(e: &BytesStart, local: &[u8]) -> Result<Option<u32>, CtrError> {
    Ok(attr(e, local)?.and_then(|v| v.trim().parse().ok()))
}

struct SheetWriter {
    writer: Writer<Vec<u8>>,
    /// Namespace prefix used by the worksheet, e.g. `x:`; usually empty.
    prefix: String,
}

impl SheetWriter {
    fn emit(&mut self, event: Event<'_>) -> Result<(), CtrError> {
        self.writer.write_event(event).map_err(xml_err)?;
        Ok(())
    }

    fn start(&mut self, local: &str, attrs: &[(&str, &str)]) -> Result<(), CtrError> {
        let name = format!("{}{local}", self.prefix);
        let mut start = BytesStart::new(name);
        for (k, v) in attrs {
            start.push_attribute((*k, *v));
        }
        self.emit(Event::Start(start))
    }

    fn end(&mut self, local: &str) -> Result<(), CtrError> {
        let name = format!("{}{local}", self.prefix);
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn cell(&mut self, cell: CellRef, style: Option<&str>, value: &str) -> Result<(), CtrError> {
        let r = cell.to_string();
        let mut attrs = vec![("r", r.as_str())];
        if let Some(s) = style {
            attrs.push(("s", s));
        }
        attrs.push(("t", "inlineStr"));
        self.start("c", &attrs)?;
        self.start("is", &[])?;
        self.start("t", &[("xml:space", "preserve")])?;
        self.emit(Event::Text(BytesText::new(value)))?;
        self.end("t")?;
        self.end("is")?;
        self.end("c")
    }

    fn cells(&mut self, row: u32, cells: &BTreeMap<u32, &str>) -> Result<(), CtrError> {
        for (col, value) in cells {
            self.cell(CellRef::new(row, *col), None, value)?;
        }
        Ok(())
    }

    /// Write whole new rows for every pending row numbered below `limit`.
    fn flush_rows_before(
        &mut self,
        pending: &mut BTreeMap<u32, BTreeMap<u32, &str>>,
        limit: u32,
    ) -> Result<(), CtrError> {
        let rows: Vec<u32> = pending.range(..limit).map(|(r, _)| *r).collect();
        for r in rows {
            if let Some(cells) = pending.remove(&r) {
                let num = r.to_string();
                self.start("row", &[("r", num.as_str())])?;
                self.cells(r, &cells)?;
                self.end("row")?;
            }
        }
        Ok(())
    }
}
