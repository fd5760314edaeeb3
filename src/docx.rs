use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::Error;
use crate::model::{Document, Paragraph, Table};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const FALLBACK_STYLE: &str = "Normal";

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

fn wml_children<'a>(
    node: roxmltree::Node<'a, 'a>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    node.children().filter(move |n| is_wml(*n, name))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn on_off(val: Option<&str>) -> bool {
    matches!(val, Some("1" | "true" | "on"))
}

/// Built-in styles are stored under lower-case names; Word shows them capitalized.
fn ui_style_name(name: &str) -> String {
    match name {
        "caption" => "Caption".to_string(),
        "footer" => "Footer".to_string(),
        "header" => "Header".to_string(),
        _ => {
            if let Some(level) = name.strip_prefix("heading ")
                && matches!(level, "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9")
            {
                format!("Heading {level}")
            } else {
                name.to_string()
            }
        }
    }
}

struct StyleSheet {
    /// paragraph style id -> UI name
    names: HashMap<String, String>,
    default_paragraph: Option<String>,
}

impl StyleSheet {
    fn empty() -> Self {
        StyleSheet { names: HashMap::new(), default_paragraph: None }
    }

    fn default_name(&self) -> &str {
        self.default_paragraph
            .as_deref()
            .and_then(|id| self.names.get(id))
            .map(String::as_str)
            .unwrap_or(FALLBACK_STYLE)
    }

    fn resolve(&self, style_id: Option<&str>) -> String {
        let Some(id) = style_id else {
            return self.default_name().to_string();
        };
        match self.names.get(id) {
            Some(name) => name.clone(),
            None => {
                log::warn!("Unknown paragraph style id {id:?}, using default style");
                self.default_name().to_string()
            }
        }
    }
}

fn read_part<R: Read + Seek>(zip: &mut zip::ZipArchive<R>, name: &str) -> Option<String> {
    let mut content = String::new();
    let mut file = zip.by_name(name).ok()?;
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

fn parse_styles<R: Read + Seek>(zip: &mut zip::ZipArchive<R>) -> StyleSheet {
    let Some(xml_content) = read_part(zip, STYLES_PART) else {
        log::warn!("No readable {STYLES_PART}, every paragraph uses {FALLBACK_STYLE:?}");
        return StyleSheet::empty();
    };
    let Ok(xml) = roxmltree::Document::parse(&xml_content) else {
        log::warn!("Malformed {STYLES_PART}, every paragraph uses {FALLBACK_STYLE:?}");
        return StyleSheet::empty();
    };

    let mut sheet = StyleSheet::empty();
    for style_node in wml_children(xml.root_element(), "style") {
        if style_node.attribute((WML_NS, "type")) != Some("paragraph") {
            continue;
        }
        let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
            continue;
        };
        let name = wml_attr(style_node, "name")
            .map(ui_style_name)
            .unwrap_or_else(|| style_id.to_string());
        // Word resolves several defaults to the last one.
        if on_off(style_node.attribute((WML_NS, "default"))) {
            sheet.default_paragraph = Some(style_id.to_string());
        }
        sheet.names.insert(style_id.to_string(), name);
    }
    log::debug!("Read {} paragraph styles", sheet.names.len());
    sheet
}

fn run_text(run: roxmltree::Node, out: &mut String) {
    for child in run.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "t" => out.push_str(child.text().unwrap_or_default()),
            "tab" | "ptab" => out.push('\t'),
            "br" => match child.attribute((WML_NS, "type")) {
                None | Some("textWrapping") => out.push('\n'),
                _ => {}
            },
            "cr" => out.push('\n'),
            "noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
}

fn collect_text(node: roxmltree::Node, out: &mut String) {
    for child in node.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "r" => run_text(child, out),
            "hyperlink" | "ins" | "smartTag" | "fldSimple" | "customXml" => {
                collect_text(child, out)
            }
            "sdt" => {
                if let Some(content) = wml(child, "sdtContent") {
                    collect_text(content, out);
                }
            }
            _ => {}
        }
    }
}

fn paragraph_text(para: roxmltree::Node) -> String {
    let mut text = String::new();
    collect_text(para, &mut text);
    text
}

fn cell_text(cell: roxmltree::Node) -> String {
    wml_children(cell, "p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_table(tbl: roxmltree::Node) -> Table {
    let mut rows: Vec<Vec<String>> = Vec::new();

    for tr in wml_children(tbl, "tr") {
        let mut row: Vec<String> = Vec::new();
        for tc in wml_children(tr, "tc") {
            let tc_pr = wml(tc, "tcPr");
            let span = tc_pr
                .and_then(|n| wml_attr(n, "gridSpan"))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            let continues_merge = tc_pr
                .and_then(|n| wml(n, "vMerge"))
                .is_some_and(|m| m.attribute((WML_NS, "val")) != Some("restart"));

            // A merge continuation shows the text of the cell above it.
            let text = if continues_merge {
                rows.last()
                    .and_then(|above| above.get(row.len()))
                    .cloned()
                    .unwrap_or_default()
            } else {
                cell_text(tc)
            };
            row.extend(std::iter::repeat_n(text, span));
        }
        rows.push(row);
    }

    Table { rows }
}

/// Read body paragraphs and tables from any seekable DOCX source.
pub fn parse_reader<R: Read + Seek>(reader: R) -> Result<Document, Error> {
    let mut zip = zip::ZipArchive::new(reader)?;

    let styles = parse_styles(&mut zip);

    let mut xml_content = String::new();
    zip.by_name(DOCUMENT_PART)?
        .read_to_string(&mut xml_content)?;

    let xml = roxmltree::Document::parse(&xml_content)?;
    let root = xml.root_element();

    let body = wml(root, "body")
        .ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

    let mut doc = Document::default();

    for node in body.children() {
        if node.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "p" => {
                let style_id = wml(node, "pPr").and_then(|ppr| wml_attr(ppr, "pStyle"));
                doc.paragraphs.push(Paragraph {
                    text: paragraph_text(node),
                    style_name: styles.resolve(style_id),
                });
            }
            "tbl" => doc.tables.push(parse_table(node)),
            _ => {}
        }
    }

    log::debug!(
        "Parsed {} paragraphs and {} tables",
        doc.paragraphs.len(),
        doc.tables.len()
    );
    Ok(doc)
}

pub fn parse(path: &Path) -> Result<Document, Error> {
    let file = std::fs::File::open(path)?;
    parse_reader(std::io::BufReader::new(file))
}
