/// The Helvetica family from the PDF base-14 set. Viewers supply these, so
/// nothing is embedded and only metrics are needed here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
}

impl Font {
    pub(crate) const ALL: [Font; 4] = [
        Font::Helvetica,
        Font::HelveticaBold,
        Font::HelveticaOblique,
        Font::HelveticaBoldOblique,
    ];

    pub(crate) fn styled(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Font::Helvetica,
            (true, false) => Font::HelveticaBold,
            (false, true) => Font::HelveticaOblique,
            (true, true) => Font::HelveticaBoldOblique,
        }
    }

    pub(crate) fn with_style(self, bold: bool, italic: bool) -> Self {
        Font::styled(bold || self.is_bold(), italic || self.is_italic())
    }

    fn is_bold(self) -> bool {
        matches!(self, Font::HelveticaBold | Font::HelveticaBoldOblique)
    }

    fn is_italic(self) -> bool {
        matches!(self, Font::HelveticaOblique | Font::HelveticaBoldOblique)
    }

    pub(crate) fn base_font(self) -> &'static [u8] {
        match self {
            Font::Helvetica => b"Helvetica",
            Font::HelveticaBold => b"Helvetica-Bold",
            Font::HelveticaOblique => b"Helvetica-Oblique",
            Font::HelveticaBoldOblique => b"Helvetica-BoldOblique",
        }
    }

    /// Name of the font in each page's resource dictionary.
    pub(crate) fn resource_name(self) -> &'static [u8] {
        match self {
            Font::Helvetica => b"F1",
            Font::HelveticaBold => b"F2",
            Font::HelveticaOblique => b"F3",
            Font::HelveticaBoldOblique => b"F4",
        }
    }

    /// Advance width of one WinAnsi byte at 1000 units/em.
    /// Oblique faces share the upright metrics.
    fn width_1000(self, byte: u8) -> f32 {
        let table = if self.is_bold() { &HELVETICA_BOLD_ASCII } else { &HELVETICA_ASCII };
        match byte {
            32..=126 => table[(byte - 32) as usize] as f32,
            0xA0 => 278.0, // nbsp
            0x85 => 1000.0, // ellipsis
            0x96 => 556.0,
            0x97 => 1000.0,
            0x91 | 0x92 => if self.is_bold() { 278.0 } else { 222.0 },
            0x93 | 0x94 => if self.is_bold() { 500.0 } else { 333.0 },
            0x95 => 350.0, // bullet
            _ => 556.0,
        }
    }

    /// Width in points of `text` set at `size`.
    pub(crate) fn text_width(self, text: &str, size: f32) -> f32 {
        let units: f32 = text.chars().map(|c| self.width_1000(winansi_byte(c))).sum();
        units * size / 1000.0
    }
}

/// Helvetica AFM widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space - /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // 0 - 9
    278, 278, 584, 584, 584, 556, 1015,                                             // : - @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // A - M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // N - Z
    278, 278, 278, 469, 556, 333,                                                   // [ - `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // a - m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // n - z
    334, 260, 334, 584,                                                             // { - ~
];

/// Helvetica-Bold AFM widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

const UNMAPPED: u8 = b'?';

/// Windows-1252 (WinAnsi) byte for a char, `?` when the encoding has no slot.
fn winansi_byte(c: char) -> u8 {
    match c as u32 {
        0x0000..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8, // Latin-1 supplement maps directly
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => UNMAPPED,
    }
}

/// Convert a UTF-8 string to WinAnsi bytes for a PDF string operand.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    let bytes: Vec<u8> = s.chars().map(winansi_byte).collect();
    let lost = s.chars().filter(|&c| c != '?' && winansi_byte(c) == UNMAPPED).count();
    if lost > 0 {
        log::warn!("{lost} character(s) outside WinAnsi replaced with '?' in {s:?}");
    }
    bytes
}
