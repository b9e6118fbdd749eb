//! XLSX reader
//!
//! Reads the parts of an Office Open XML package the dependency walker
//! needs: sheet names, cell values, formula text with cached results, and
//! the external link table. Styles, comments and drawing parts are ignored.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use lazy_regex::regex_replace_all;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use zip::read::ZipFile;
use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};
use sheet_lineage_core::{CellAddress, CellError, CellValue, Workbook, Worksheet};
use sheet_lineage_formula::shift_relative_references;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Decode `_xHHHH_` escapes (`_x000d_` is CR, `_x005f_` a literal `_`).
/// Sequences that do not name a character are left alone.
fn decode_excel_escapes(s: &str) -> Cow<'_, str> {
    regex_replace_all!(r"_x([0-9A-Fa-f]{4})_", s, |whole: &str, hex: &str| {
        u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| whole.to_string(), String::from)
    })
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|s| s.into_owned()))
}

/// `si` of a `<f t="shared">` element
fn shared_index(e: &BytesStart) -> Option<u32> {
    attr_value(e, b"t")
        .filter(|t| t == "shared")
        .and_then(|_| attr_value(e, b"si")?.parse().ok())
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(source_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = source_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// `xl/externalLinks/externalLink1.xml` -> `xl/externalLinks/_rels/externalLink1.xml.rels`
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Open `path` in the package as an XML event reader
fn open_part<'a, R: Read + Seek>(
    archive: &'a mut ZipArchive<R>,
    path: &str,
) -> Option<Reader<BufReader<ZipFile<'a, R>>>> {
    let file = archive.by_name(path).ok()?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    reader.trim_text(true);
    Some(reader)
}

/// Feed every event of `reader` to `on_event` until end of input
fn for_each_event<B: BufRead>(
    reader: &mut Reader<B>,
    mut on_event: impl FnMut(Event<'_>) -> XlsxResult<()>,
) -> XlsxResult<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => return Ok(()),
            event => on_event(event)?,
        }
        buf.clear();
    }
}

/// Relationship id -> (type, target)
type Relationships = HashMap<String, (String, String)>;

/// What `xl/workbook.xml` declares
#[derive(Debug, Default)]
struct WorkbookPart {
    /// `(name, r:id)` in tab order
    sheets: Vec<(String, String)>,
    /// `r:id` of each `externalReference`, in link-index order
    external_references: Vec<String>,
}

/// Master cells of the shared formula groups seen so far, by `si`
#[derive(Default)]
struct SharedFormulas(HashMap<u32, (CellAddress, String)>);

impl SharedFormulas {
    /// Formula text of `cell`. A master registers its text; a follower
    /// (no text of its own) gets the master's formula moved to its position.
    fn formula_for(&mut self, cell: CellAddress, si: u32, text: Option<String>) -> Option<String> {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            self.0.insert(si, (cell, text.clone()));
            return Some(text);
        }
        let Some((anchor, master)) = self.0.get(&si) else {
            log::warn!("shared formula {} at {} has no master cell", si, cell);
            return None;
        };
        let rows = i64::from(cell.row) - i64::from(anchor.row);
        let cols = i64::from(cell.col) - i64::from(anchor.col);
        let formula = format!("={}", master.trim_start_matches('='));
        Some(shift_relative_references(&formula, rows, cols))
    }
}

/// Which text node the worksheet reader is inside
#[derive(Clone, Copy, PartialEq)]
enum Capture {
    Nothing,
    Value,
    Formula,
    InlineText,
}

/// A `<c>` element being read
struct PendingCell {
    reference: String,
    kind: Option<String>,
    raw: Option<String>,
    formula: Option<String>,
    shared_index: Option<u32>,
}

impl PendingCell {
    fn new(e: &BytesStart) -> Option<Self> {
        Some(Self {
            reference: attr_value(e, b"r")?,
            kind: attr_value(e, b"t"),
            raw: None,
            formula: None,
            shared_index: None,
        })
    }

    /// Store the cell; formula cells keep `<v>` as their cached result
    fn finish(
        self,
        worksheet: &mut Worksheet,
        shared: &mut SharedFormulas,
        strings: &[String],
    ) -> XlsxResult<()> {
        let addr = CellAddress::parse(&self.reference).map_err(|e| {
            let message = format!("Invalid cell reference '{}': {}", self.reference, e);
            XlsxError::Parse(message)
        })?;
        let formula = match self.shared_index {
            Some(si) => shared.formula_for(addr, si, self.formula),
            None => self.formula,
        };
        let kind = self.kind.as_deref();

        let value = match (formula, self.raw) {
            (Some(text), raw) => {
                let cached = raw.and_then(|raw| decode_value(kind, &raw, strings).ok());
                let text = if text.starts_with('=') {
                    text
                } else {
                    format!("={}", text)
                };
                match cached {
                    Some(cached) => CellValue::formula_with_value(text, cached),
                    None => CellValue::formula(text),
                }
            }
            (None, Some(raw)) => decode_value(kind, &raw, strings)?,
            // Style-only cell
            (None, None) => return Ok(()),
        };
        worksheet.set_cell_value_at(addr, value);
        Ok(())
    }
}

/// Interpret a `<v>` text by the cell's `t` attribute
fn decode_value(kind: Option<&str>, raw: &str, strings: &[String]) -> XlsxResult<CellValue> {
    let value = match kind {
        Some("s") => {
            let text = raw
                .parse::<usize>()
                .ok()
                .and_then(|i| strings.get(i))
                .ok_or_else(|| XlsxError::Parse(format!("bad shared string index '{}'", raw)))?;
            CellValue::string(text.as_str())
        }
        Some("b") => CellValue::Boolean(raw == "1" || raw.eq_ignore_ascii_case("true")),
        Some("e") => CellError::parse(raw).map_or_else(|| CellValue::string(raw), CellValue::Error),
        Some("str") | Some("inlineStr") => CellValue::string(decode_excel_escapes(raw)),
        None | Some("n") => raw
            .parse::<f64>()
            .map_or_else(|_| CellValue::string(raw), CellValue::Number),
        Some(_) => CellValue::string(raw),
    };
    Ok(value)
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = ZipArchive::new(reader)?;
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let strings = Self::read_shared_strings(&mut archive)?;
        let declared = Self::read_workbook_part(&mut archive)?;
        let rels = Self::read_rels(&mut archive, WORKBOOK_RELS)?
            .ok_or_else(|| XlsxError::MissingPart(WORKBOOK_RELS.into()))?;

        let mut workbook = Workbook::empty();
        for (name, r_id) in &declared.sheets {
            let Some((kind, target)) = rels.get(r_id) else {
                continue;
            };
            // Chart sheets and dialog sheets hold no cells
            if !kind.ends_with("/worksheet") {
                continue;
            }
            let mut worksheet = Worksheet::new(name);
            let path = resolve_target("xl", target);
            Self::read_worksheet(&mut archive, &path, &mut worksheet, &strings)?;
            workbook.add_existing_worksheet(worksheet)?;
        }

        for r_id in &declared.external_references {
            let target = match rels.get(r_id) {
                Some((_, part)) => {
                    let part = resolve_target("xl", part);
                    Self::read_link_target(&mut archive, &part)?
                }
                None => None,
            };
            if target.is_none() {
                log::warn!("external reference {} has no link path", r_id);
            }
            // An empty slot keeps later indices aligned
            workbook.add_external_link(target.unwrap_or_default());
        }

        Ok(workbook)
    }

    /// `xl/sharedStrings.xml`; a package without one has no shared strings
    fn read_shared_strings<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();
        let Some(mut xml) = open_part(archive, SHARED_STRINGS_PART) else {
            return Ok(strings);
        };

        // Text of the open <si>, and whether we are inside a visible <t>.
        // Phonetic runs (<rPh>) repeat the text and are skipped.
        let mut item: Option<String> = None;
        let mut in_text = false;
        let mut in_phonetic = false;

        for_each_event(&mut xml, |event| {
            match event {
                Event::Start(e) => match e.name().as_ref() {
                    b"si" => item = Some(String::new()),
                    b"rPh" => in_phonetic = true,
                    b"t" => in_text = item.is_some() && !in_phonetic,
                    _ => {}
                },
                Event::End(e) => match e.name().as_ref() {
                    b"si" => {
                        let text = item.take().unwrap_or_default();
                        strings.push(decode_excel_escapes(&text).into_owned());
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_text = false,
                    _ => {}
                },
                Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Event::Text(t) if in_text => {
                    if let (Some(item), Ok(text)) = (item.as_mut(), t.unescape()) {
                        item.push_str(&text);
                    }
                }
                _ => {}
            }
            Ok(())
        })?;

        Ok(strings)
    }

    /// Sheet names with their relationship ids, and the external references
    fn read_workbook_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<WorkbookPart> {
        let mut xml = open_part(archive, WORKBOOK_PART)
            .ok_or_else(|| XlsxError::MissingPart(WORKBOOK_PART.into()))?;
        let mut part = WorkbookPart::default();

        for_each_event(&mut xml, |event| {
            if let Event::Empty(e) | Event::Start(e) = event {
                match e.name().as_ref() {
                    b"sheet" => {
                        let name = attr_value(&e, b"name");
                        if let (Some(name), Some(r_id)) = (name, attr_value(&e, b"r:id")) {
                            part.sheets.push((name, r_id));
                        }
                    }
                    b"externalReference" => match attr_value(&e, b"r:id") {
                        Some(r_id) => part.external_references.push(r_id),
                        None => log::warn!("externalReference without r:id"),
                    },
                    _ => {}
                }
            }
            Ok(())
        })?;

        Ok(part)
    }

    /// A relationships part; `None` if the package has no such part
    fn read_rels<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> XlsxResult<Option<Relationships>> {
        let Some(mut xml) = open_part(archive, path) else {
            return Ok(None);
        };
        let mut rels = Relationships::new();

        for_each_event(&mut xml, |event| {
            if let Event::Empty(e) | Event::Start(e) = event {
                if e.name().as_ref() == b"Relationship" {
                    if let (Some(id), Some(kind), Some(target)) = (
                        attr_value(&e, b"Id"),
                        attr_value(&e, b"Type"),
                        attr_value(&e, b"Target"),
                    ) {
                        rels.insert(id, (kind, target));
                    }
                }
            }
            Ok(())
        })?;

        Ok(Some(rels))
    }

    /// The raw target path of one external link part. With several
    /// `externalLinkPath` relationships the lowest id wins.
    fn read_link_target<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        part: &str,
    ) -> XlsxResult<Option<String>> {
        let rels_path = rels_path_for(part);
        let Some(rels) = Self::read_rels(archive, &rels_path)? else {
            log::warn!("missing relationship part {}", rels_path);
            return Ok(None);
        };

        Ok(rels
            .into_iter()
            .filter(|(_, (kind, _))| kind.ends_with("/externalLinkPath"))
            .min_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, (_, target))| target))
    }

    fn read_worksheet<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        strings: &[String],
    ) -> XlsxResult<()> {
        let mut xml = open_part(archive, path)
            .ok_or_else(|| XlsxError::MissingPart(path.to_string()))?;

        let mut shared = SharedFormulas::default();
        let mut cell: Option<PendingCell> = None;
        let mut capture = Capture::Nothing;
        let mut in_inline = false;

        for_each_event(&mut xml, |event| {
            match event {
                Event::Start(e) => match e.name().as_ref() {
                    b"c" => cell = PendingCell::new(&e),
                    b"v" => capture = Capture::Value,
                    b"f" => {
                        capture = Capture::Formula;
                        if let Some(c) = cell.as_mut() {
                            c.shared_index = shared_index(&e);
                        }
                    }
                    b"is" => in_inline = true,
                    b"t" if in_inline => capture = Capture::InlineText,
                    _ => {}
                },
                // Shared formula follower: <f t="shared" si="0"/>
                Event::Empty(e) if e.name().as_ref() == b"f" => {
                    if let Some(c) = cell.as_mut() {
                        c.shared_index = shared_index(&e);
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(done) = cell.take() {
                            let reference = done.reference.clone();
                            if let Err(err) = done.finish(worksheet, &mut shared, strings) {
                                log::warn!("skipping cell {} in {}: {}", reference, path, err);
                            }
                        }
                    }
                    b"is" => in_inline = false,
                    b"v" | b"f" | b"t" => capture = Capture::Nothing,
                    _ => {}
                },
                Event::Text(t) if capture != Capture::Nothing => {
                    if let (Some(c), Ok(text)) = (cell.as_mut(), t.unescape()) {
                        let text = text.into_owned();
                        match capture {
                            Capture::Formula => c.formula = Some(text),
                            Capture::InlineText => {
                                c.raw = Some(text);
                                c.kind = Some("inlineStr".into());
                            }
                            _ => c.raw = Some(text),
                        }
                    }
                }
                _ => {}
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};

    const XML_DECL: &str = r#"<?xml version="1.0"?>"#;
    const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    const NS_PACKAGE_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
    const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
    const REL_WORKSHEET: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
    const REL_EXTERNAL_LINK: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/externalLink";
    const REL_LINK_PATH: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/externalLinkPath";

    /// Build a package from `(sheet name, sheetData inner xml)` pairs and
    /// external link targets.
    fn package(sheets: &[(&str, &str)], shared: &[&str], links: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            let content_types = format!(
                r#"{}<Types xmlns="{}"><Default Extension="xml" ContentType="application/xml"/></Types>"#,
                XML_DECL, NS_CONTENT_TYPES
            );
            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(content_types.as_bytes()).unwrap();

            let mut workbook = format!(
                r#"{}<workbook xmlns="{}" xmlns:r="{}"><sheets>"#,
                XML_DECL, NS_MAIN, NS_REL
            );
            let mut rels = format!(r#"{}<Relationships xmlns="{}">"#, XML_DECL, NS_PACKAGE_REL);
            for (i, (name, data)) in sheets.iter().enumerate() {
                let n = i + 1;
                workbook.push_str(&format!(
                    r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                    name, n, n
                ));
                rels.push_str(&format!(
                    r#"<Relationship Id="rId{}" Type="{}" Target="worksheets/sheet{}.xml"/>"#,
                    n, REL_WORKSHEET, n
                ));
                let sheet_xml = format!(
                    r#"{}<worksheet xmlns="{}"><sheetData>{}</sheetData></worksheet>"#,
                    XML_DECL, NS_MAIN, data
                );
                zip.start_file(format!("xl/worksheets/sheet{}.xml", n), options)
                    .unwrap();
                zip.write_all(sheet_xml.as_bytes()).unwrap();
            }
            workbook.push_str("</sheets>");
            if !links.is_empty() {
                workbook.push_str("<externalReferences>");
                for (i, target) in links.iter().enumerate() {
                    let id = 100 + i;
                    let n = i + 1;
                    workbook.push_str(&format!(r#"<externalReference r:id="rId{}"/>"#, id));
                    rels.push_str(&format!(
                        r#"<Relationship Id="rId{}" Type="{}" Target="externalLinks/externalLink{}.xml"/>"#,
                        id, REL_EXTERNAL_LINK, n
                    ));
                    let link_rels = format!(
                        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}" Target="{}" TargetMode="External"/></Relationships>"#,
                        XML_DECL, NS_PACKAGE_REL, REL_LINK_PATH, target
                    );
                    let link_part = format!("xl/externalLinks/externalLink{}.xml", n);
                    zip.start_file(link_part, options).unwrap();
                    zip.write_all(format!("{}<externalLink/>", XML_DECL).as_bytes())
                        .unwrap();
                    zip.start_file(
                        format!("xl/externalLinks/_rels/externalLink{}.xml.rels", n),
                        options,
                    )
                    .unwrap();
                    zip.write_all(link_rels.as_bytes()).unwrap();
                }
                workbook.push_str("</externalReferences>");
            }
            workbook.push_str("</workbook>");
            rels.push_str("</Relationships>");

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(workbook.as_bytes()).unwrap();
            zip.start_file("xl/_rels/workbook.xml.rels", options)
                .unwrap();
            zip.write_all(rels.as_bytes()).unwrap();

            if !shared.is_empty() {
                let items: String = shared
                    .iter()
                    .map(|s| format!("<si><t>{}</t></si>", s))
                    .collect();
                let sst = format!(r#"{}<sst xmlns="{}">{}</sst>"#, XML_DECL, NS_MAIN, items);
                zip.start_file("xl/sharedStrings.xml", options).unwrap();
                zip.write_all(sst.as_bytes()).unwrap();
            }

            zip.finish().unwrap();
        }
        buf
    }

    fn value(wb: &Workbook, sheet: &str, cell: &str) -> CellValue {
        wb.worksheet_by_name(sheet)
            .unwrap()
            .get_value(cell)
            .unwrap()
    }

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("a_x000d_b"), "a\rb");
        assert_eq!(decode_excel_escapes("_x0009_x_x005f_"), "\tx_");
        assert_eq!(decode_excel_escapes("no escapes"), "no escapes");
        assert_eq!(decode_excel_escapes("my_var"), "my_var");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl", "/xl/worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets", "../sharedStrings.xml"),
            "xl/sharedStrings.xml"
        );
        assert_eq!(
            rels_path_for("xl/externalLinks/externalLink1.xml"),
            "xl/externalLinks/_rels/externalLink1.xml.rels"
        );
    }

    #[test]
    fn test_read_values_and_formulas() {
        let data = package(
            &[
                (
                    "Sheet1",
                    r#"<row r="1"><c r="A1"><v>2</v></c><c r="B1" t="s"><v>0</v></c><c r="C1" t="b"><v>1</v></c><c r="D1" t="e"><v>#REF!</v></c></row><row r="2"><c r="A2"><f>A1*10</f><v>20</v></c><c r="B2" t="str"><f>"Sheet"&amp;A1</f><v>Sheet2</v></c><c r="C2" t="inlineStr"><is><t>inline</t></is></c></row>"#,
                ),
                ("Data", r#"<row r="1"><c r="A1"><v>1.5</v></c></row>"#),
            ],
            &["hello"],
            &[],
        );
        let wb = XlsxReader::read(Cursor::new(data)).unwrap();

        assert_eq!(wb.sheet_count(), 2);
        assert_eq!(value(&wb, "Sheet1", "A1"), CellValue::Number(2.0));
        assert_eq!(
            value(&wb, "Sheet1", "B1"),
            CellValue::String("hello".into())
        );
        assert_eq!(value(&wb, "Sheet1", "C1"), CellValue::Boolean(true));
        assert_eq!(value(&wb, "Sheet1", "D1"), CellValue::Error(CellError::Ref));
        assert_eq!(
            value(&wb, "Sheet1", "A2"),
            CellValue::formula_with_value("=A1*10", CellValue::Number(20.0))
        );
        assert_eq!(
            value(&wb, "Sheet1", "B2"),
            CellValue::formula_with_value("=\"Sheet\"&A1", CellValue::String("Sheet2".into()))
        );
        assert_eq!(
            value(&wb, "Sheet1", "C2"),
            CellValue::String("inline".into())
        );
        assert_eq!(value(&wb, "Data", "A1"), CellValue::Number(1.5));
    }

    #[test]
    fn test_shared_formulas_are_shifted() {
        let data = package(
            &[(
                "Sheet1",
                r#"<row r="1"><c r="B1"><f t="shared" ref="B1:B3" si="0">A1*$C$1</f><v>0</v></c></row><row r="2"><c r="B2"><f t="shared" si="0"/><v>0</v></c></row><row r="3"><c r="B3"><f t="shared" si="0"/><v>0</v></c></row>"#,
            )],
            &[],
            &[],
        );
        let wb = XlsxReader::read(Cursor::new(data)).unwrap();
        let ws = wb.worksheet_by_name("Sheet1").unwrap();

        let formula = |cell: &str| {
            ws.get_formula_at(CellAddress::parse(cell).unwrap())
                .map(str::to_string)
        };
        assert_eq!(formula("B1").as_deref(), Some("=A1*$C$1"));
        assert_eq!(formula("B2").as_deref(), Some("=A2*$C$1"));
        assert_eq!(formula("B3").as_deref(), Some("=A3*$C$1"));
    }

    #[test]
    fn test_external_links_in_declaration_order() {
        let data = package(
            &[("Sheet1", "")],
            &[],
            &["file:///C:/data/Rates.xlsx", "Other%20Book.xlsx"],
        );
        let wb = XlsxReader::read(Cursor::new(data)).unwrap();
        assert_eq!(
            wb.external_links(),
            &[
                "file:///C:/data/Rates.xlsx".to_string(),
                "Other%20Book.xlsx".to_string()
            ]
        );
    }

    #[test]
    fn test_not_a_package() {
        let err = XlsxReader::read(Cursor::new(b"not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)));
    }
}
