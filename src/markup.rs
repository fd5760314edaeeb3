//! Inline paragraph markup: the small XML-like language text blocks are written in.
//!
//! Supported: `&amp; &lt; &gt; &quot; &apos; &nbsp;`, numeric character
//! references, `<b>`/`<strong>`, `<i>`/`<em>` and `<br/>`. Anything else is
//! rejected so that unescaped text surfaces as an error instead of vanishing.

use crate::error::Error;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Piece {
    Text { text: String, bold: bool, italic: bool },
    LineBreak,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Tag {
    Bold,
    Italic,
}

fn tag_from_name(name: &str) -> Option<Tag> {
    match name {
        "b" | "strong" => Some(Tag::Bold),
        "i" | "em" => Some(Tag::Italic),
        _ => None,
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

struct Builder {
    pieces: Vec<Piece>,
    text: String,
    stack: Vec<Tag>,
}

impl Builder {
    fn style(&self) -> (bool, bool) {
        (self.stack.contains(&Tag::Bold), self.stack.contains(&Tag::Italic))
    }

    fn flush(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let (bold, italic) = self.style();
        self.pieces.push(Piece::Text { text: std::mem::take(&mut self.text), bold, italic });
    }

    fn tag(&mut self, raw: &str) -> Result<(), Error> {
        let raw = raw.trim();
        if let Some(name) = raw.strip_suffix('/') {
            return match name.trim() {
                "br" => {
                    self.flush();
                    self.pieces.push(Piece::LineBreak);
                    Ok(())
                }
                other => Err(Error::Markup(format!("unsupported empty tag <{other}/>"))),
            };
        }
        if let Some(name) = raw.strip_prefix('/') {
            let tag = tag_from_name(name.trim())
                .ok_or_else(|| Error::Markup(format!("unsupported closing tag </{name}>")))?;
            if self.stack.last() != Some(&tag) {
                return Err(Error::Markup(format!("mismatched closing tag </{name}>")));
            }
            self.flush();
            self.stack.pop();
            return Ok(());
        }
        if raw == "br" {
            self.flush();
            self.pieces.push(Piece::LineBreak);
            return Ok(());
        }
        let tag = tag_from_name(raw)
            .ok_or_else(|| Error::Markup(format!("unsupported tag <{raw}>")))?;
        self.flush();
        self.stack.push(tag);
        Ok(())
    }
}

/// Parse markup into styled pieces. Whitespace is kept verbatim; the line
/// breaker collapses it.
pub(crate) fn parse(input: &str) -> Result<Vec<Piece>, Error> {
    let mut builder = Builder { pieces: Vec::new(), text: String::new(), stack: Vec::new() };
    let mut rest = input;

    while let Some(pos) = rest.find(['&', '<']) {
        builder.text.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if let Some(after) = rest.strip_prefix('&') {
            let end = after
                .find(';')
                .ok_or_else(|| Error::Markup(format!("unterminated entity in {input:?}")))?;
            let entity = &after[..end];
            let ch = decode_entity(entity)
                .ok_or_else(|| Error::Markup(format!("unknown entity &{entity};")))?;
            builder.text.push(ch);
            rest = &after[end + 1..];
        } else {
            let after = &rest[1..];
            let end = after
                .find('>')
                .ok_or_else(|| Error::Markup(format!("unterminated tag in {input:?}")))?;
            builder.tag(&after[..end])?;
            rest = &after[end + 1..];
        }
    }
    builder.text.push_str(rest);
    builder.flush();

    if let Some(open) = builder.stack.last() {
        log::debug!("Unclosed {open:?} tag at end of paragraph markup");
    }
    Ok(builder.pieces)
}
