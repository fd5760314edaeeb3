use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::fonts::{Font, to_winansi_bytes};
use crate::layout::{Op, Page, PageLayout};

const PRODUCER: &str = concat!("docxflow-pdf ", env!("CARGO_PKG_VERSION"));

fn draw(content: &mut Content, op: &Op) {
    match op {
        Op::Text { x, y, font, size, color, text } => {
            let [r, g, b] = *color;
            content
                .set_fill_rgb(r, g, b)
                .begin_text()
                .set_font(Name(font.resource_name()), *size)
                .next_line(*x, *y)
                .show(Str(&to_winansi_bytes(text)))
                .end_text();
        }
        Op::FillRect { x, y, width, height, color } => {
            let [r, g, b] = *color;
            content
                .set_fill_rgb(r, g, b)
                .rect(*x, *y, *width, *height)
                .fill_nonzero();
        }
        Op::Line { from, to, width, color } => {
            let [r, g, b] = *color;
            content
                .set_stroke_rgb(r, g, b)
                .set_line_width(*width)
                .move_to(from.0, from.1)
                .line_to(to.0, to.1)
                .stroke();
        }
    }
}

/// Serialize laid-out pages. All pages share one set of font objects.
pub(crate) fn render(pages: &[Page], layout: &PageLayout, title: Option<&str>) -> Vec<u8> {
    let mut pdf = Pdf::new();

    let mut next_id = 1;
    let mut alloc = || {
        let id = Ref::new(next_id);
        next_id += 1;
        id
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();
    let font_ids: Vec<(Font, Ref)> = Font::ALL.iter().map(|&f| (f, alloc())).collect();
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc(), alloc())).collect();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().map(|(page_id, _)| *page_id))
        .count(page_ids.len() as i32);

    for (font, font_id) in &font_ids {
        pdf.type1_font(*font_id)
            .base_font(Name(font.base_font()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    let media_box = Rect::new(0.0, 0.0, layout.width, layout.height);
    for (page, (page_id, content_id)) in pages.iter().zip(&page_ids) {
        let mut content = Content::new();
        for op in &page.ops {
            draw(&mut content, op);
        }
        pdf.stream(*content_id, &content.finish());

        let mut page_writer = pdf.page(*page_id);
        page_writer
            .media_box(media_box)
            .parent(pages_id)
            .contents(*content_id);
        let mut resources = page_writer.resources();
        let mut fonts = resources.fonts();
        for (font, font_id) in &font_ids {
            fonts.pair(Name(font.resource_name()), *font_id);
        }
    }

    let mut info = pdf.document_info(info_id);
    info.producer(TextStr(PRODUCER));
    if let Some(title) = title {
        info.title(TextStr(title));
    }
    drop(info);

    pdf.finish()
}
