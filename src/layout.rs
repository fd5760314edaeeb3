use crate::error::Error;
use crate::fonts::Font;
use crate::markup::{self, Piece};
use crate::story::{Block, StyleClass};

/// Inset of the text frame from the page margins on every side.
const FRAME_PADDING: f32 = 6.0;

/// Page size and margins in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageLayout {
    pub fn letter() -> Self {
        PageLayout {
            width: 612.0,
            height: 792.0,
            margin_top: 72.0,
            margin_bottom: 18.0,
            margin_left: 72.0,
            margin_right: 72.0,
        }
    }

    pub fn a4() -> Self {
        PageLayout { width: 595.276, height: 841.89, ..PageLayout::letter() }
    }

    fn frame_top(&self) -> f32 {
        self.height - self.margin_top - FRAME_PADDING
    }

    fn frame_bottom(&self) -> f32 {
        self.margin_bottom + FRAME_PADDING
    }

    fn frame_left(&self) -> f32 {
        self.margin_left + FRAME_PADDING
    }

    fn frame_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right - 2.0 * FRAME_PADDING
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        PageLayout::letter()
    }
}

pub(crate) type Rgb = [f32; 3];

const BLACK: Rgb = [0.0, 0.0, 0.0];
const GREY: Rgb = [0.502, 0.502, 0.502];
const WHITESMOKE: Rgb = [0.961, 0.961, 0.961];
const BEIGE: Rgb = [0.961, 0.961, 0.863];

/// A positioned drawing instruction in PDF user space (origin bottom-left).
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Op {
    Text { x: f32, y: f32, font: Font, size: f32, color: Rgb, text: String },
    FillRect { x: f32, y: f32, width: f32, height: f32, color: Rgb },
    Line { from: (f32, f32), to: (f32, f32), width: f32, color: Rgb },
}

#[derive(Debug, Default)]
pub(crate) struct Page {
    pub(crate) ops: Vec<Op>,
}

struct ParagraphStyle {
    font: Font,
    size: f32,
    leading: f32,
    space_after: f32,
}

fn paragraph_style(class: StyleClass) -> ParagraphStyle {
    match class {
        StyleClass::Body => ParagraphStyle {
            font: Font::Helvetica,
            size: 10.0,
            leading: 12.0,
            space_after: 0.0,
        },
        StyleClass::Heading => ParagraphStyle {
            font: Font::HelveticaBold,
            size: 18.0,
            leading: 22.0,
            space_after: 6.0,
        },
    }
}

const CELL_PADDING_X: f32 = 6.0;
const CELL_PADDING_TOP: f32 = 3.0;
const GRID_WIDTH: f32 = 1.0;

struct CellStyle {
    font: Font,
    size: f32,
    color: Rgb,
    background: Rgb,
    padding_bottom: f32,
}

impl CellStyle {
    fn leading(&self) -> f32 {
        self.size * 1.2
    }
}

const HEADER_CELLS: CellStyle = CellStyle {
    font: Font::HelveticaBold,
    size: 10.0,
    color: WHITESMOKE,
    background: GREY,
    padding_bottom: 12.0,
};

const BODY_CELLS: CellStyle = CellStyle {
    font: Font::Helvetica,
    size: 9.0,
    color: BLACK,
    background: BEIGE,
    padding_bottom: 3.0,
};

// ---------------------------------------------------------------------------
// Line breaking
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Word {
    segments: Vec<(Font, String)>,
}

impl Word {
    fn width(&self, size: f32) -> f32 {
        self.segments.iter().map(|(font, text)| font.text_width(text, size)).sum()
    }
}

#[derive(Debug)]
enum Token {
    Word(Word),
    Space,
    Break,
}

fn tokenize(pieces: &[Piece], base: Font, hard_newlines: bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word: Option<Word> = None;

    for piece in pieces {
        let (text, font) = match piece {
            Piece::Text { text, bold, italic } => (text, base.with_style(*bold, *italic)),
            Piece::LineBreak => {
                tokens.extend(word.take().map(Token::Word));
                tokens.push(Token::Break);
                continue;
            }
        };
        for c in text.chars() {
            if c.is_whitespace() && c != '\u{00A0}' {
                tokens.extend(word.take().map(Token::Word));
                tokens.push(if hard_newlines && c == '\n' { Token::Break } else { Token::Space });
                continue;
            }
            let w = word.get_or_insert_with(|| Word { segments: Vec::new() });
            match w.segments.last_mut() {
                Some((last_font, s)) if *last_font == font => s.push(c),
                _ => w.segments.push((font, c.to_string())),
            }
        }
    }
    tokens.extend(word.take().map(Token::Word));
    tokens
}

#[derive(Debug, Default)]
struct Line {
    runs: Vec<(Font, String)>,
    width: f32,
}

impl Line {
    fn push_space(&mut self, size: f32) {
        if let Some((font, text)) = self.runs.last_mut() {
            text.push(' ');
            self.width += font.text_width(" ", size);
        }
    }

    fn push_segment(&mut self, font: Font, text: &str, size: f32) {
        self.width += font.text_width(text, size);
        match self.runs.last_mut() {
            Some((last_font, s)) if *last_font == font => s.push_str(text),
            _ => self.runs.push((font, text.to_string())),
        }
    }

    fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Greedy word wrap. Whitespace runs collapse to one space and never start a line.
fn break_lines(tokens: &[Token], size: f32, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut pending_space = false;

    for token in tokens {
        match token {
            Token::Space => pending_space = true,
            Token::Break => {
                lines.push(std::mem::take(&mut line));
                pending_space = false;
            }
            Token::Word(word) => {
                let width = word.width(size);
                if !line.is_empty() {
                    let space = line.runs.last().map_or(0.0, |(f, _)| f.text_width(" ", size));
                    let gap = if pending_space { space } else { 0.0 };
                    if line.width + gap + width <= max_width {
                        if pending_space {
                            line.push_space(size);
                        }
                        for (font, text) in &word.segments {
                            line.push_segment(*font, text, size);
                        }
                        pending_space = false;
                        continue;
                    }
                    lines.push(std::mem::take(&mut line));
                }
                pending_space = false;
                if width <= max_width {
                    for (font, text) in &word.segments {
                        line.push_segment(*font, text, size);
                    }
                } else {
                    split_word(word, size, max_width, &mut lines, &mut line);
                }
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Break a word wider than a line at character boundaries. The tail stays in `line`.
fn split_word(word: &Word, size: f32, max_width: f32, lines: &mut Vec<Line>, line: &mut Line) {
    for (font, text) in &word.segments {
        let mut buf = [0u8; 4];
        for c in text.chars() {
            let ch: &str = c.encode_utf8(&mut buf);
            let w = font.text_width(ch, size);
            if !line.is_empty() && line.width + w > max_width {
                lines.push(std::mem::take(line));
            }
            line.push_segment(*font, ch, size);
        }
    }
}

/// Widest hard line when nothing wraps.
fn natural_width(tokens: &[Token], size: f32) -> f32 {
    let mut widest: f32 = 0.0;
    let mut current: f32 = 0.0;
    let mut last_font: Option<Font> = None;
    let mut pending_space = false;

    for token in tokens {
        match token {
            Token::Space => pending_space = true,
            Token::Break => {
                widest = widest.max(current);
                current = 0.0;
                last_font = None;
                pending_space = false;
            }
            Token::Word(word) => {
                if pending_space && let Some(font) = last_font {
                    current += font.text_width(" ", size);
                }
                current += word.width(size);
                last_font = word.segments.last().map(|(f, _)| *f);
                pending_space = false;
            }
        }
    }
    widest.max(current)
}

/// Shrink column widths to `available`, keeping narrow columns at their natural width
/// and sharing what is left equally among the rest.
fn fit_columns(natural: &[f32], available: f32) -> Vec<f32> {
    let total: f32 = natural.iter().sum();
    if total <= available {
        return natural.to_vec();
    }
    let mut widths = vec![0.0; natural.len()];
    let mut open: Vec<usize> = (0..natural.len()).collect();
    let mut remaining = available;

    while !open.is_empty() {
        let share = remaining / open.len() as f32;
        let (narrow, wide): (Vec<usize>, Vec<usize>) =
            open.iter().partition(|&&i| natural[i] <= share);
        if narrow.is_empty() {
            for i in wide {
                widths[i] = share;
            }
            break;
        }
        for i in narrow {
            widths[i] = natural[i];
            remaining -= natural[i];
        }
        open = wide;
    }
    widths
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

struct Composer<'a> {
    layout: &'a PageLayout,
    pages: Vec<Page>,
    page: Page,
    y: f32,
    at_top: bool,
}

impl<'a> Composer<'a> {
    fn new(layout: &'a PageLayout) -> Self {
        Composer {
            layout,
            pages: Vec::new(),
            page: Page::default(),
            y: layout.frame_top(),
            at_top: true,
        }
    }

    fn available(&self) -> f32 {
        self.y - self.layout.frame_bottom()
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.page));
        self.y = self.layout.frame_top();
        self.at_top = true;
        log::debug!("Starting page {}", self.pages.len() + 1);
    }

    fn advance(&mut self, height: f32) {
        self.y -= height;
        self.at_top = false;
    }

    fn spacer(&mut self, height: f32) {
        if height > self.available() {
            if !self.at_top {
                self.new_page();
            }
            return;
        }
        self.advance(height);
    }

    fn paragraph(&mut self, text: &str, class: StyleClass) -> Result<(), Error> {
        let style = paragraph_style(class);
        let pieces = markup::parse(text)?;
        let tokens = tokenize(&pieces, style.font, false);
        let lines = break_lines(&tokens, style.size, self.layout.frame_width());
        if lines.is_empty() {
            return Ok(());
        }

        let mut remaining = &lines[..];
        while !remaining.is_empty() {
            let room = (self.available() / style.leading).floor().max(0.0) as usize;
            let mut fit = room.min(remaining.len());
            // Do not strand the first line of a longer paragraph at the page foot.
            if fit == 1 && remaining.len() == lines.len() && lines.len() > 1 && !self.at_top {
                fit = 0;
            }
            if fit == 0 {
                if self.at_top {
                    return Err(Error::Layout(format!(
                        "a {} pt line does not fit in the page frame",
                        style.leading
                    )));
                }
                self.new_page();
                continue;
            }
            for line in &remaining[..fit] {
                self.draw_line(line, self.layout.frame_left(), style.size, BLACK);
                self.advance(style.leading);
            }
            remaining = &remaining[fit..];
            if !remaining.is_empty() {
                self.new_page();
            }
        }

        self.y = (self.y - style.space_after).max(self.layout.frame_bottom());
        Ok(())
    }

    fn draw_line(&mut self, line: &Line, x: f32, size: f32, color: Rgb) {
        let baseline = self.y - size;
        let mut x = x;
        for (font, text) in &line.runs {
            self.page.ops.push(Op::Text {
                x,
                y: baseline,
                font: *font,
                size,
                color,
                text: text.clone(),
            });
            x += font.text_width(text, size);
        }
    }

    fn table(&mut self, rows: &[Vec<String>]) -> Result<(), Error> {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Ok(());
        }

        let mut cells: Vec<Vec<Vec<Token>>> = Vec::with_capacity(rows.len());
        for (r, row) in rows.iter().enumerate() {
            let style = if r == 0 { &HEADER_CELLS } else { &BODY_CELLS };
            let mut parsed = Vec::with_capacity(columns);
            for c in 0..columns {
                let text = row.get(c).map(String::as_str).unwrap_or_default();
                parsed.push(tokenize(&markup::parse(text)?, style.font, true));
            }
            cells.push(parsed);
        }

        let natural: Vec<f32> = (0..columns)
            .map(|c| {
                cells
                    .iter()
                    .enumerate()
                    .map(|(r, row)| {
                        let style = if r == 0 { &HEADER_CELLS } else { &BODY_CELLS };
                        natural_width(&row[c], style.size)
                    })
                    .fold(0.0, f32::max)
                    + 2.0 * CELL_PADDING_X
            })
            .collect();
        let widths = fit_columns(&natural, self.layout.frame_width());
        let total_width: f32 = widths.iter().sum();
        let x0 = self.layout.frame_left() + ((self.layout.frame_width() - total_width) / 2.0).max(0.0);

        for (r, row) in cells.iter().enumerate() {
            let style = if r == 0 { &HEADER_CELLS } else { &BODY_CELLS };
            let cell_lines: Vec<Vec<Line>> = row
                .iter()
                .zip(&widths)
                .map(|(tokens, w)| {
                    break_lines(tokens, style.size, (w - 2.0 * CELL_PADDING_X).max(1.0))
                })
                .collect();
            let line_count = cell_lines.iter().map(Vec::len).max().unwrap_or(0).max(1);
            let height =
                line_count as f32 * style.leading() + CELL_PADDING_TOP + style.padding_bottom;

            if height > self.available() && !self.at_top {
                self.new_page();
            }
            if height > self.available() {
                return Err(Error::Layout(format!(
                    "table row {} is {height:.0} pt tall, taller than the page frame",
                    r + 1
                )));
            }
            self.draw_row(&cell_lines, &widths, x0, height, style);
            self.advance(height);
        }
        Ok(())
    }

    fn draw_row(&mut self, cell_lines: &[Vec<Line>], widths: &[f32], x0: f32, height: f32, style: &CellStyle) {
        let top = self.y;
        let bottom = top - height;
        let total_width: f32 = widths.iter().sum();

        self.page.ops.push(Op::FillRect {
            x: x0,
            y: bottom,
            width: total_width,
            height,
            color: style.background,
        });

        let grid = |from, to| Op::Line { from, to, width: GRID_WIDTH, color: BLACK };
        self.page.ops.push(grid((x0, top), (x0 + total_width, top)));
        self.page.ops.push(grid((x0, bottom), (x0 + total_width, bottom)));
        let mut x = x0;
        self.page.ops.push(grid((x, top), (x, bottom)));
        for w in widths {
            x += w;
            self.page.ops.push(grid((x, top), (x, bottom)));
        }

        // Cell text sits on the bottom padding.
        let mut x = x0;
        for (lines, w) in cell_lines.iter().zip(widths) {
            let block_top = bottom + style.padding_bottom + lines.len() as f32 * style.leading();
            for (i, line) in lines.iter().enumerate() {
                let baseline = block_top - i as f32 * style.leading() - style.size;
                let mut tx = x + CELL_PADDING_X;
                for (font, text) in &line.runs {
                    self.page.ops.push(Op::Text {
                        x: tx,
                        y: baseline,
                        font: *font,
                        size: style.size,
                        color: style.color,
                        text: text.clone(),
                    });
                    tx += font.text_width(text, style.size);
                }
            }
            x += w;
        }
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.page.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.page);
        }
        self.pages
    }
}

/// Flow the story into pages.
pub(crate) fn compose(story: &[Block], layout: &PageLayout) -> Result<Vec<Page>, Error> {
    let mut composer = Composer::new(layout);
    for block in story {
        match block {
            Block::Text { text, style } => composer.paragraph(text, *style)?,
            Block::Spacer { height } => composer.spacer(*height),
            Block::Table { rows } => composer.table(rows)?,
        }
    }
    let pages = composer.finish();
    log::debug!("Laid out {} page(s)", pages.len());
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(text: &str, size: f32, max_width: f32) -> Vec<String> {
        let tokens = tokenize(&markup::parse(text).unwrap(), Font::Helvetica, false);
        break_lines(&tokens, size, max_width)
            .iter()
            .map(|l| l.runs.iter().map(|(_, t)| t.as_str()).collect())
            .collect()
    }

    fn texts(page: &Page) -> Vec<&str> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                Op::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn wraps_and_collapses_whitespace() {
        // "aaaa" at 10pt = 22.24pt, space = 2.78pt
        let lines = lines_of("aaaa   aaaa\taaaa", 10.0, 50.0);
        assert_eq!(lines, vec!["aaaa aaaa", "aaaa"]);
    }

    #[test]
    fn splits_words_wider_than_line() {
        let lines = lines_of("mmmmmmmmmm", 10.0, 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "mmmmmmmmmm");
    }

    #[test]
    fn br_forces_new_line() {
        assert_eq!(lines_of("one<br/>two", 10.0, 400.0), vec!["one", "two"]);
    }

    #[test]
    fn mixed_styles_stay_in_one_word() {
        let tokens = tokenize(&markup::parse("<b>bold</b>face x").unwrap(), Font::Helvetica, false);
        let lines = break_lines(&tokens, 10.0, 400.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].runs[0], (Font::HelveticaBold, "bold".to_string()));
        assert_eq!(lines[0].runs[1], (Font::Helvetica, "face x".to_string()));
    }

    #[test]
    fn narrow_columns_keep_natural_width() {
        let widths = fit_columns(&[50.0, 400.0, 300.0], 456.0);
        assert_eq!(widths[0], 50.0);
        assert!((widths[1] - 203.0).abs() < 1e-3);
        assert!((widths[2] - 203.0).abs() < 1e-3);
        assert_eq!(fit_columns(&[10.0, 20.0], 456.0), vec![10.0, 20.0]);
    }

    #[test]
    fn empty_story_is_one_blank_page() {
        let pages = compose(&[], &PageLayout::default()).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].ops.is_empty());
    }

    #[test]
    fn long_story_flows_onto_more_pages() {
        let story: Vec<Block> = (0..120)
            .flat_map(|i| {
                [
                    Block::Text { text: format!("Paragraph {i}"), style: StyleClass::Body },
                    Block::Spacer { height: 7.2 },
                ]
            })
            .collect();
        let pages = compose(&story, &PageLayout::default()).unwrap();
        assert!(pages.len() >= 2);
        assert_eq!(texts(&pages[0])[0], "Paragraph 0");
        let all: Vec<&str> = pages.iter().flat_map(texts).collect();
        assert_eq!(all.len(), 120);
        assert_eq!(all[119], "Paragraph 119");
    }

    #[test]
    fn heading_uses_bold_font() {
        let story = [Block::Text { text: "Scope".into(), style: StyleClass::Heading }];
        let pages = compose(&story, &PageLayout::default()).unwrap();
        assert!(matches!(
            &pages[0].ops[0],
            Op::Text { font: Font::HelveticaBold, size, .. } if *size == 18.0
        ));
    }

    #[test]
    fn table_header_has_grey_background_and_light_text() {
        let story = [Block::Table {
            rows: vec![vec!["Name".into(), "Qty".into()], vec!["Bolts".into(), "4".into()]],
        }];
        let pages = compose(&story, &PageLayout::default()).unwrap();
        let ops = &pages[0].ops;
        assert!(ops.iter().any(|op| matches!(op, Op::FillRect { color, .. } if *color == GREY)));
        assert!(ops.iter().any(|op| matches!(op, Op::FillRect { color, .. } if *color == BEIGE)));
        assert!(ops.iter().any(|op| matches!(
            op,
            Op::Text { text, font: Font::HelveticaBold, color, size, .. }
                if text == "Name" && *color == WHITESMOKE && *size == 10.0
        )));
        assert!(ops.iter().any(|op| matches!(
            op,
            Op::Text { text, font: Font::Helvetica, size, .. } if text == "Bolts" && *size == 9.0
        )));
    }

    #[test]
    fn table_cell_entities_are_decoded() {
        let story = [Block::Table { rows: vec![vec!["R&amp;D".into()]] }];
        let pages = compose(&story, &PageLayout::default()).unwrap();
        assert!(texts(&pages[0]).contains(&"R&D"));
    }

    #[test]
    fn long_table_splits_between_rows() {
        let rows: Vec<Vec<String>> = (0..80).map(|i| vec![format!("row {i}")]).collect();
        let pages = compose(&[Block::Table { rows }], &PageLayout::default()).unwrap();
        assert!(pages.len() >= 2);
        let all: Vec<&str> = pages.iter().flat_map(texts).collect();
        assert_eq!(all.len(), 80);
    }

    /// Leave exactly `room` points between the cursor and the frame foot.
    fn composer_with_room(layout: &PageLayout, room: f32) -> Composer<'_> {
        let mut composer = Composer::new(layout);
        composer.advance(composer.available() - room);
        composer
    }

    #[test]
    fn first_line_is_not_left_alone_at_page_foot() {
        let layout = PageLayout::default();
        let mut composer = composer_with_room(&layout, 13.0);
        let text = "word ".repeat(200);
        composer.paragraph(&text, StyleClass::Body).unwrap();
        let pages = composer.finish();
        assert!(texts(&pages[0]).is_empty());
        assert!(texts(&pages[1]).len() > 1);
    }

    #[test]
    fn single_line_paragraph_fills_page_foot() {
        let layout = PageLayout::default();
        let mut composer = composer_with_room(&layout, 13.0);
        composer.paragraph("Closing line", StyleClass::Body).unwrap();
        let pages = composer.finish();
        assert_eq!(pages.len(), 1);
        assert_eq!(texts(&pages[0]), vec!["Closing line"]);
    }

    #[test]
    fn spacer_that_does_not_fit_is_dropped() {
        let layout = PageLayout::default();
        let mut composer = composer_with_room(&layout, 10.0);
        composer.spacer(14.4);
        assert_eq!(composer.pages.len(), 1);
        assert!(composer.at_top);
        assert_eq!(composer.y, layout.frame_top());
        composer.paragraph("Next", StyleClass::Body).unwrap();
        let pages = composer.finish();
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[1]), vec!["Next"]);
    }

    #[test]
    fn spacer_that_fits_moves_cursor() {
        let layout = PageLayout::default();
        let mut composer = Composer::new(&layout);
        composer.spacer(14.4);
        assert_eq!(composer.y, layout.frame_top() - 14.4);
        assert!(!composer.at_top);
    }

    #[test]
    fn paragraph_longer_than_frame_continues_on_next_page() {
        // 14 words per 456 pt line, 57 lines per 690 pt frame
        let words: Vec<String> = (0..1200).map(|i| format!("w{i:04}")).collect();
        let story = [Block::Text { text: words.join(" "), style: StyleClass::Body }];
        let pages = compose(&story, &PageLayout::default()).unwrap();
        assert!(pages.len() >= 2);
        let first_page_lines = texts(&pages[0]).len();
        assert_eq!(first_page_lines, (690.0f32 / 12.0).floor() as usize);
        let joined: Vec<&str> = pages.iter().flat_map(texts).collect();
        assert_eq!(joined.join(" "), words.join(" "));
    }

    #[test]
    fn tall_row_after_other_content_is_a_layout_error() {
        let story = [
            Block::Text { text: "Intro".into(), style: StyleClass::Body },
            Block::Table { rows: vec![vec!["word ".repeat(20_000)]] },
        ];
        let err = compose(&story, &PageLayout::default()).unwrap_err();
        assert!(matches!(err, Error::Layout(_)));
    }

    #[test]
    fn row_taller_than_frame_is_a_layout_error() {
        let cell = vec!["word ".repeat(20_000)];
        let story = [Block::Table { rows: vec![cell] }];
        let err = compose(&story, &PageLayout::default()).unwrap_err();
        assert!(matches!(err, Error::Layout(_)));
    }
}
