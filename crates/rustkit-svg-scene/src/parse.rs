//! Value parsers: a byte cursor over attribute text plus the numeric,
//! length and angle readers built on it.
//!
//! None of the readers fail loudly. A reader that cannot make sense of the
//! input returns `None` (or the supplied default for the `*_or` variants) and
//! leaves the cursor where it was, so callers decide whether a missing value
//! matters.

use std::f64::consts::PI;

/// CSS reference pixels per inch.
pub const PIXELS_PER_INCH: f64 = 96.0;

/// Font size used for `em`/`ex` conversion when no font size is known.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

// ==================== Cursor ====================

/// A cursor over attribute text.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `src`.
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unconsumed input.
    pub fn remaining(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// True once only whitespace is left.
    pub fn is_at_end(&self) -> bool {
        self.remaining().trim_start().is_empty()
    }

    /// Peek the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) {
        if self.pos < self.src.len() {
            self.pos += 1;
        }
    }

    /// Consume and return the next byte.
    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.bump();
        Some(b)
    }

    /// Skip ASCII whitespace.
    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// Skip whitespace and at most one comma.
    pub fn skip_separators(&mut self) {
        self.skip_whitespace();
        if self.peek() == Some(b',') {
            self.bump();
            self.skip_whitespace();
        }
    }

    /// Consume `expected` if it is the next non-whitespace byte.
    pub fn eat(&mut self, expected: u8) -> bool {
        let start = self.pos;
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            self.pos = start;
            false
        }
    }

    /// Skip everything up to and including `byte`. Returns false if `byte`
    /// never appears, in which case the cursor moves to the end.
    pub fn skip_past(&mut self, byte: u8) -> bool {
        match self.remaining().bytes().position(|b| b == byte) {
            Some(offset) => {
                self.pos += offset + 1;
                true
            }
            None => {
                self.pos = self.src.len();
                false
            }
        }
    }

    /// Read an identifier (`[A-Za-z_-][A-Za-z0-9_-]*`).
    pub fn next_ident(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            if self.pos == start && self.peek().is_some_and(|b| b.is_ascii_digit()) {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            None
        } else {
            Some(&self.src[start..self.pos])
        }
    }

    fn take_digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }
        self.pos - start
    }

    fn take_sign(&mut self) {
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.bump();
        }
    }

    /// Read an optionally signed integer.
    pub fn next_number(&mut self) -> Option<i64> {
        let saved = self.pos;
        self.skip_separators();
        let start = self.pos;
        self.take_sign();
        if self.take_digits() == 0 {
            self.pos = saved;
            return None;
        }
        match self.src[start..self.pos].parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.pos = saved;
                None
            }
        }
    }

    /// Read a real number: integer part, fraction and exponent.
    ///
    /// An `e` only starts an exponent when digits follow it, so `1em` reads
    /// as `1` followed by the unit `em`.
    pub fn next_double(&mut self) -> Option<f64> {
        let saved = self.pos;
        self.skip_separators();
        let start = self.pos;
        self.take_sign();

        let int_digits = self.take_digits();
        let mut frac_digits = 0;
        if self.peek() == Some(b'.') {
            let dot = self.pos;
            self.bump();
            frac_digits = self.take_digits();
            if frac_digits == 0 && int_digits == 0 {
                self.pos = dot;
            }
        }
        if int_digits == 0 && frac_digits == 0 {
            self.pos = saved;
            return None;
        }

        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let exp_start = self.pos;
            self.bump();
            self.take_sign();
            if self.take_digits() == 0 {
                self.pos = exp_start;
            }
        }

        match self.src[start..self.pos].parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                self.pos = saved;
                None
            }
        }
    }

    /// Read a real number or fall back to `default`.
    pub fn next_double_or(&mut self, default: f64) -> f64 {
        self.next_double().unwrap_or(default)
    }

    /// Read a number followed by an optional unit or `%`.
    pub fn next_length_or_percentage(&mut self) -> Option<Length> {
        let saved = self.pos;
        let value = self.next_double()?;
        if self.peek() == Some(b'%') {
            self.bump();
            return Some(Length::new(value, Unit::Percent));
        }

        let unit_start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
            self.bump();
        }
        let unit = match self.src[unit_start..self.pos].to_ascii_lowercase().as_str() {
            "" => Unit::User,
            "px" => Unit::Px,
            "pt" => Unit::Pt,
            "in" => Unit::In,
            "cm" => Unit::Cm,
            "mm" => Unit::Mm,
            "pc" => Unit::Pc,
            "em" => Unit::Em,
            "ex" => Unit::Ex,
            _ => {
                self.pos = saved;
                return None;
            }
        };
        Some(Length::new(value, unit))
    }

    /// Read an angle and return it in radians. Degrees are assumed when no
    /// unit is given.
    pub fn next_angle(&mut self) -> Option<f64> {
        let saved = self.pos;
        let value = self.next_double()?;
        let unit_start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
            self.bump();
        }
        let radians = match &self.src[unit_start..self.pos] {
            "" | "deg" => value.to_radians(),
            "rad" => value,
            "grad" => value * PI / 200.0,
            "turn" => value * 2.0 * PI,
            _ => {
                self.pos = saved;
                return None;
            }
        };
        Some(radians)
    }

    /// Read a single-character arc flag (`0` or `1`).
    pub fn next_flag(&mut self) -> Option<bool> {
        let saved = self.pos;
        self.skip_separators();
        let flag = match self.peek() {
            Some(b'0') => false,
            Some(b'1') => true,
            _ => {
                self.pos = saved;
                return None;
            }
        };
        self.bump();
        Some(flag)
    }
}

// ==================== Length ====================

/// Length unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    /// No unit given; user units are pixels.
    #[default]
    User,
    Px,
    Pt,
    In,
    Cm,
    Mm,
    Pc,
    Em,
    Ex,
    Percent,
}

/// A length with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Length {
    pub value: f64,
    pub unit: Unit,
}

impl Length {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// A length in user units.
    pub const fn user(value: f64) -> Self {
        Self::new(value, Unit::User)
    }

    /// Parse a complete length string. Trailing garbage makes the whole value
    /// invalid.
    pub fn parse(s: &str) -> Option<Self> {
        let mut cursor = Cursor::new(s);
        let length = cursor.next_length_or_percentage()?;
        cursor.skip_whitespace();
        cursor.is_at_end().then_some(length)
    }

    pub fn is_percent(&self) -> bool {
        self.unit == Unit::Percent
    }

    /// Convert to pixels using the default font size for `em`/`ex`.
    ///
    /// Percentages resolve against `reference`; without one the raw number is
    /// returned.
    pub fn to_pixels(&self, reference: Option<f64>) -> f64 {
        self.to_pixels_with_font(reference, DEFAULT_FONT_SIZE)
    }

    /// Convert to pixels with an explicit font size.
    pub fn to_pixels_with_font(&self, reference: Option<f64>, font_size: f64) -> f64 {
        let v = self.value;
        match self.unit {
            Unit::User | Unit::Px => v,
            Unit::Pt => v * PIXELS_PER_INCH / 72.0,
            Unit::In => v * PIXELS_PER_INCH,
            Unit::Cm => v * PIXELS_PER_INCH / 2.54,
            Unit::Mm => v * PIXELS_PER_INCH / 25.4,
            Unit::Pc => v * PIXELS_PER_INCH / 6.0,
            Unit::Em => v * font_size,
            Unit::Ex => v * font_size / 2.0,
            Unit::Percent => match reference {
                Some(r) => r * v / 100.0,
                None => v,
            },
        }
    }
}

/// Which viewport dimension a percentage refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
    /// Used for radii and stroke widths.
    Diagonal,
}

impl Axis {
    /// The percentage reference for this axis inside a `width` x `height`
    /// viewport.
    pub fn reference(self, width: f64, height: f64) -> f64 {
        match self {
            Axis::Horizontal => width,
            Axis::Vertical => height,
            Axis::Diagonal => ((width * width + height * height) / 2.0).sqrt(),
        }
    }
}

// ==================== Lists ====================

/// Parse a whitespace/comma separated list of numbers, stopping at the first
/// token that is not a number.
pub fn parse_number_list(s: &str) -> Vec<f64> {
    let mut cursor = Cursor::new(s);
    let mut out = Vec::new();
    while let Some(v) = cursor.next_double() {
        out.push(v);
    }
    out
}

/// Parse a list of lengths (as used by `stroke-dasharray`). Returns `None`
/// if any entry is malformed.
pub fn parse_length_list(s: &str) -> Option<Vec<Length>> {
    let mut cursor = Cursor::new(s);
    let mut out = Vec::new();
    while !cursor.is_at_end() {
        out.push(cursor.next_length_or_percentage()?);
        cursor.skip_separators();
    }
    Some(out)
}

/// Parse `points` into coordinate pairs. A trailing odd coordinate is
/// dropped.
pub fn parse_points(s: &str) -> Vec<(f64, f64)> {
    parse_number_list(s)
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// Parse an opacity value (number or percentage), clamped to `[0, 1]`.
pub fn parse_opacity(s: &str) -> Option<f64> {
    let length = Length::parse(s)?;
    let value = match length.unit {
        Unit::Percent => length.value / 100.0,
        Unit::User => length.value,
        _ => return None,
    };
    Some(value.clamp(0.0, 1.0))
}

/// Split a `style` attribute into `name: value` declarations.
pub fn parse_style_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            let value = value.trim().trim_end_matches("!important").trim();
            if name.is_empty() || value.is_empty() {
                None
            } else {
                Some((name.to_ascii_lowercase(), value.to_string()))
            }
        })
        .collect()
}
