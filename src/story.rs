use crate::model::{Document, Table};
use crate::sanitize::clean;

pub const INCH: f32 = 72.0;

/// Gap left by an empty paragraph and after every table.
pub const BLANK_SPACE: f32 = 0.2 * INCH;
/// Gap after every text paragraph.
pub const PARAGRAPH_GAP: f32 = 0.1 * INCH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleClass {
    Heading,
    Body,
}

impl StyleClass {
    /// Map a source style name to the output style it renders with.
    pub fn classify(style_name: &str) -> Self {
        if style_name.starts_with("Heading") {
            StyleClass::Heading
        } else {
            StyleClass::Body
        }
    }
}

/// One unit of output content. Text and cells are already sanitized markup.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Text { text: String, style: StyleClass },
    Spacer { height: f32 },
    Table { rows: Vec<Vec<String>> },
}

/// Assemble the story: all paragraphs in order, then all tables in order.
pub fn build_story(doc: &Document) -> Vec<Block> {
    let mut story = Vec::with_capacity(doc.paragraphs.len() * 2 + doc.tables.len() * 2);

    for para in &doc.paragraphs {
        let text = clean(&para.text);
        if text.is_empty() {
            story.push(Block::Spacer { height: BLANK_SPACE });
            continue;
        }
        let style = StyleClass::classify(&para.style_name);
        story.push(Block::Text { text, style });
        story.push(Block::Spacer { height: PARAGRAPH_GAP });
    }

    for table in &doc.tables {
        let rows = table_rows(table);
        if rows.is_empty() {
            log::debug!("Skipping table with no text");
            continue;
        }
        story.push(Block::Table { rows });
        story.push(Block::Spacer { height: BLANK_SPACE });
    }

    story
}

fn table_rows(table: &Table) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| clean(cell)).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect()
}
