//! Builds small `.xlsx` packages on disk for store and explosion tests

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

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

/// A workbook to write: sheets of `(cell, content)` where content starting
/// with `=` is a formula and anything else a number or inline string.
#[derive(Default)]
pub struct BookSpec {
    pub sheets: Vec<(String, Vec<(String, String)>)>,
    pub links: Vec<String>,
}

impl BookSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, name: &str, cells: &[(&str, &str)]) -> Self {
        self.sheets.push((
            name.to_string(),
            cells
                .iter()
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    pub fn link(mut self, target: &str) -> Self {
        self.links.push(target.to_string());
        self
    }

    pub fn write(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        let file = File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
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

        for (i, (name, cells)) in self.sheets.iter().enumerate() {
            let n = i + 1;
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(name),
                n,
                n
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="worksheets/sheet{}.xml"/>"#,
                n, REL_WORKSHEET, n
            ));

            let mut data = String::new();
            for (cell, content) in cells {
                if let Some(formula) = content.strip_prefix('=') {
                    let formula = escape(formula);
                    data.push_str(&format!(r#"<c r="{}"><f>{}</f></c>"#, cell, formula));
                } else if content.parse::<f64>().is_ok() {
                    data.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell, content));
                } else {
                    data.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        cell,
                        escape(content)
                    ));
                }
            }
            let sheet_xml = format!(
                r#"{}<worksheet xmlns="{}"><sheetData><row r="1">{}</row></sheetData></worksheet>"#,
                XML_DECL, NS_MAIN, data
            );
            zip.start_file(format!("xl/worksheets/sheet{}.xml", n), options)
                .unwrap();
            zip.write_all(sheet_xml.as_bytes()).unwrap();
        }
        workbook.push_str("</sheets>");

        if !self.links.is_empty() {
            workbook.push_str("<externalReferences>");
            for (i, target) in self.links.iter().enumerate() {
                let n = i + 1;
                workbook.push_str(&format!(r#"<externalReference r:id="rIdLink{}"/>"#, n));
                rels.push_str(&format!(
                    r#"<Relationship Id="rIdLink{}" Type="{}" Target="externalLinks/externalLink{}.xml"/>"#,
                    n, REL_EXTERNAL_LINK, n
                ));

                let link_rels = format!(
                    r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}" Target="{}" TargetMode="External"/></Relationships>"#,
                    XML_DECL,
                    NS_PACKAGE_REL,
                    REL_LINK_PATH,
                    escape(target)
                );
                zip.start_file(format!("xl/externalLinks/externalLink{}.xml", n), options)
                    .unwrap();
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
        zip.finish().unwrap();

        path
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
