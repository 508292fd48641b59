// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream interpreter. Walks a page's decoded operations once and
// collects positioned text fragments, image placements and ruling lines.
//
// Only the state that affects geometry is tracked: the CTM stack, the text
// and line matrices, font size and leading. Glyph widths are estimated from
// the font size because font programs are not parsed.

use lopdf::Object;
use lopdf::content::Operation;

use docsift_core::types::{ImageBox, PageGeometry, RulingLine, TextBlock};

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f32 = 0.5;

/// TJ adjustments more negative than this (thousandths of an em) read as a
/// word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Segments within this many points of axis-aligned count as ruling lines.
const AXIS_SLACK: f32 = 1.0;

/// Ruling lines shorter than this are dropped (tick marks, glyph strokes).
const MIN_RULING_LENGTH: f32 = 2.0;

/// Nested `q` depth beyond which saves are ignored (malformed streams).
const MAX_STATE_DEPTH: usize = 64;

/// Affine transform in PDF row-vector convention: `p' = p × M`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translate(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// Read six numeric operands (`cm`, `Tm`).
    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        Some(Self {
            a: number(&operands[0])?,
            b: number(&operands[1])?,
            c: number(&operands[2])?,
            d: number(&operands[3])?,
            e: number(&operands[4])?,
            f: number(&operands[5])?,
        })
    }

    /// `self × other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn horizontal_scale(&self) -> f32 {
        self.a.hypot(self.b)
    }

    fn vertical_scale(&self) -> f32 {
        self.c.hypot(self.d)
    }
}

/// Everything collected from one page.
#[derive(Debug, Default)]
pub(crate) struct PageScan {
    pub blocks: Vec<TextBlock>,
    pub image_boxes: Vec<ImageBox>,
    pub lines: Vec<RulingLine>,
}

/// Maps user-space points into top-left page coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PageFrame {
    origin_x: f32,
    top: f32,
}

impl PageFrame {
    pub(crate) fn new(media_origin: (f32, f32), geometry: PageGeometry) -> Self {
        Self {
            origin_x: media_origin.0,
            top: media_origin.1 + geometry.height,
        }
    }

    fn x(&self, x: f32) -> f32 {
        x - self.origin_x
    }

    fn y(&self, y: f32) -> f32 {
        self.top - y
    }
}

struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    font_size: f32,
    leading: f32,
}

impl TextState {
    fn new() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 0.0,
            leading: 0.0,
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.move_line(0.0, -leading);
    }
}

/// Interpret `operations`. `is_image` tells whether an XObject name refers to
/// an image (as opposed to a form or an unknown name).
pub(crate) fn scan_operations(
    operations: &[Operation],
    frame: PageFrame,
    is_image: impl Fn(&[u8]) -> bool,
) -> PageScan {
    let mut scan = PageScan::default();
    let mut ctm = Matrix::IDENTITY;
    let mut saved: Vec<Matrix> = Vec::new();
    let mut text = TextState::new();
    let mut path = PathBuilder::default();

    for op in operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => {
                if saved.len() < MAX_STATE_DEPTH {
                    saved.push(ctm);
                }
            }
            "Q" => {
                if let Some(previous) = saved.pop() {
                    ctm = previous;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    ctm = m.then(&ctm);
                }
            }

            // -- Text object ---------------------------------------------------
            "BT" => {
                text.matrix = Matrix::IDENTITY;
                text.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    text.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    text.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    if op.operator == "TD" {
                        text.leading = -ty;
                    }
                    text.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    text.matrix = m;
                    text.line_matrix = m;
                }
            }
            "T*" => text.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let shown = decode_pdf_string(bytes);
                    show_text(&mut scan, &mut text, &ctm, frame, &shown, 0.0);
                }
            }
            "'" => {
                text.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let shown = decode_pdf_string(bytes);
                    show_text(&mut scan, &mut text, &ctm, frame, &shown, 0.0);
                }
            }
            "\"" => {
                text.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let shown = decode_pdf_string(bytes);
                    show_text(&mut scan, &mut text, &ctm, frame, &shown, 0.0);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut shown = String::new();
                    let mut adjustment = 0.0;
                    for item in items {
                        match item {
                            Object::String(bytes, _) => shown.push_str(&decode_pdf_string(bytes)),
                            other => {
                                if let Some(n) = number(other) {
                                    if n < TJ_SPACE_THRESHOLD && !shown.ends_with(' ') {
                                        shown.push(' ');
                                    }
                                    adjustment += n;
                                }
                            }
                        }
                    }
                    show_text(&mut scan, &mut text, &ctm, frame, &shown, adjustment);
                }
            }

            // -- Images ----------------------------------------------------------
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    if is_image(name) {
                        scan.image_boxes.push(unit_square_box(&ctm, frame));
                    }
                }
            }

            // -- Paths -----------------------------------------------------------
            "m" => {
                if let Some((x, y)) = point(operands) {
                    path.move_to(ctm.apply(x, y));
                }
            }
            "l" => {
                if let Some((x, y)) = point(operands) {
                    path.line_to(ctm.apply(x, y));
                }
            }
            "re" => {
                if operands.len() >= 4 {
                    if let (Some(x), Some(y), Some(w), Some(h)) = (
                        number(&operands[0]),
                        number(&operands[1]),
                        number(&operands[2]),
                        number(&operands[3]),
                    ) {
                        path.rectangle(&ctm, x, y, w, h);
                    }
                }
            }
            "h" => path.close(),
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                if op.operator == "s" || op.operator == "b" || op.operator == "b*" {
                    path.close();
                }
                path.flush_into(&mut scan.lines, frame);
            }
            "n" => path.clear(),
            _ => {}
        }
    }

    scan
}

/// Emit one fragment at the current text position and advance past it.
fn show_text(
    scan: &mut PageScan,
    text: &mut TextState,
    ctm: &Matrix,
    frame: PageFrame,
    shown: &str,
    tj_adjustment: f32,
) {
    let glyphs = shown.chars().count() as f32;
    let advance =
        glyphs * text.font_size * GLYPH_ADVANCE - tj_adjustment / 1000.0 * text.font_size;

    let render = text.matrix.then(ctm);
    let (x, y) = render.apply(0.0, 0.0);
    let height = text.font_size * render.vertical_scale();
    let width = advance.max(0.0) * render.horizontal_scale();

    if !shown.trim().is_empty() {
        scan.blocks.push(
            TextBlock::new(frame.x(x), frame.y(y + height), shown.trim().to_string())
                .with_size(width, height),
        );
    }

    text.matrix = Matrix::translate(advance, 0.0).then(&text.matrix);
}

/// Bounding box of the unit square under `ctm` (the image space of `Do`).
fn unit_square_box(ctm: &Matrix, frame: PageFrame) -> ImageBox {
    let corners = [
        ctm.apply(0.0, 0.0),
        ctm.apply(1.0, 0.0),
        ctm.apply(0.0, 1.0),
        ctm.apply(1.0, 1.0),
    ];
    let (min_x, max_x, min_y, max_y) = bounds(&corners);
    ImageBox {
        left: frame.x(min_x),
        top: frame.y(max_y),
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

fn bounds(points: &[(f32, f32)]) -> (f32, f32, f32, f32) {
    points.iter().fold(
        (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
        |(min_x, max_x, min_y, max_y), &(x, y)| {
            (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
        },
    )
}

/// Accumulates the current path's straight segments in user space.
#[derive(Default)]
struct PathBuilder {
    segments: Vec<((f32, f32), (f32, f32))>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
}

impl PathBuilder {
    fn move_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    fn line_to(&mut self, p: (f32, f32)) {
        if let Some(from) = self.current {
            self.segments.push((from, p));
        }
        self.current = Some(p);
    }

    fn close(&mut self) {
        if let (Some(from), Some(start)) = (self.current, self.subpath_start) {
            if from != start {
                self.segments.push((from, start));
            }
            self.current = Some(start);
        }
    }

    fn rectangle(&mut self, ctm: &Matrix, x: f32, y: f32, w: f32, h: f32) {
        let p0 = ctm.apply(x, y);
        let p1 = ctm.apply(x + w, y);
        let p2 = ctm.apply(x + w, y + h);
        let p3 = ctm.apply(x, y + h);
        self.segments
            .extend_from_slice(&[(p0, p1), (p1, p2), (p2, p3), (p3, p0)]);
        self.current = Some(p0);
        self.subpath_start = Some(p0);
    }

    fn clear(&mut self) {
        self.segments.clear();
        self.current = None;
        self.subpath_start = None;
    }

    /// Keep the axis-aligned segments of a painted path as ruling lines.
    fn flush_into(&mut self, lines: &mut Vec<RulingLine>, frame: PageFrame) {
        for &((x0, y0), (x1, y1)) in &self.segments {
            let dx = (x1 - x0).abs();
            let dy = (y1 - y0).abs();
            if dy <= AXIS_SLACK && dx >= MIN_RULING_LENGTH {
                let y = frame.y((y0 + y1) / 2.0);
                lines.push(RulingLine::horizontal(y, frame.x(x0), frame.x(x1)));
            } else if dx <= AXIS_SLACK && dy >= MIN_RULING_LENGTH {
                let x = frame.x((x0 + x1) / 2.0);
                lines.push(RulingLine::vertical(x, frame.y(y0), frame.y(y1)));
            }
        }
        self.clear();
    }
}

fn point(operands: &[Object]) -> Option<(f32, f32)> {
    Some((number(operands.first()?)?, number(operands.get(1)?)?))
}

/// Numeric value of an integer or real operand.
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Decode a PDF string: UTF-16BE when it carries a BOM, otherwise one byte
/// per character (PDFDocEncoding and WinAnsi agree on the printable range).
pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes
        .iter()
        .map(|&b| if b.is_ascii_control() { ' ' } else { b as char })
        .collect()
}
