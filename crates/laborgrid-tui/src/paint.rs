// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use laborgrid_app::Rgb;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use std::collections::BTreeMap;

/// Upper half block: foreground paints the top pixel, background the bottom.
pub const HALF_BLOCK: &str = "▀";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Moves each edge by the given delta: left, top, right, bottom.
    pub fn adjusted(self, dx1: f32, dy1: f32, dx2: f32, dy2: f32) -> Self {
        Self::new(self.x + dx1, self.y + dy1, self.w - dx1 + dx2, self.h - dy1 + dy2)
    }

    pub fn top_left(self) -> PointF {
        PointF::new(self.x, self.y)
    }

    /// Last pixel column and row inside the rect.
    pub fn top_right(self) -> PointF {
        PointF::new(self.x + self.w - 1.0, self.y)
    }

    pub fn bottom_left(self) -> PointF {
        PointF::new(self.x, self.y + self.h - 1.0)
    }

    pub fn bottom_right(self) -> PointF {
        PointF::new(self.x + self.w - 1.0, self.y + self.h - 1.0)
    }

    /// Maps a point given in unit coordinates onto this rect.
    pub fn map_unit(self, point: PointF) -> PointF {
        PointF::new(self.x + point.x * self.w, self.y + point.y * self.h)
    }
}

pub trait Painter {
    fn fill_rect(&mut self, rect: RectF, color: Rgb);
    /// One-pixel outline covering both edges inclusively.
    fn stroke_rect(&mut self, rect: RectF, color: Rgb);
    fn line(&mut self, from: PointF, to: PointF, color: Rgb);
    fn polygon(&mut self, points: &[PointF], fill: Rgb, outline: Rgb);
    fn text(&mut self, rect: RectF, text: &str, fg: Rgb);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextCell {
    ch: char,
    fg: Rgb,
}

/// A pixel raster where one terminal cell is one pixel wide and two pixels
/// tall. Text is kept on a separate layer addressed by terminal cell.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    width: u16,
    height: u16,
    pixels: Vec<Rgb>,
    text: BTreeMap<(u16, u16), TextCell>,
}

impl PixelCanvas {
    pub fn new(columns: u16, rows: u16, background: Rgb) -> Self {
        let height = rows.saturating_mul(2);
        Self {
            width: columns,
            height,
            pixels: vec![background; usize::from(columns) * usize::from(height)],
            text: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    pub fn text_at(&self, column: u16, row: u16) -> Option<char> {
        self.text.get(&(column, row)).map(|cell| cell.ch)
    }

    fn set(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 || x >= i32::from(self.width) || y >= i32::from(self.height) {
            return;
        }
        let offset = y as usize * usize::from(self.width) + x as usize;
        self.pixels[offset] = color;
    }

    fn hline(&mut self, x0: i32, x1: i32, y: i32, color: Rgb) {
        for x in x0.min(x1)..=x0.max(x1) {
            self.set(x, y, color);
        }
    }

    fn vline(&mut self, x: i32, y0: i32, y1: i32, color: Rgb) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.set(x, y, color);
        }
    }

    /// Copies the canvas into `buf` starting at `area`'s top-left corner.
    pub fn blit(&self, area: Rect, buf: &mut Buffer) {
        let columns = self.width.min(area.width);
        let rows = (self.height / 2).min(area.height);
        for row in 0..rows {
            for column in 0..columns {
                let (Some(top), Some(bottom)) =
                    (self.pixel(column, row * 2), self.pixel(column, row * 2 + 1))
                else {
                    continue;
                };
                let Some(cell) = buf.cell_mut((area.x + column, area.y + row)) else {
                    continue;
                };
                match self.text.get(&(column, row)) {
                    Some(text) => {
                        cell.set_char(text.ch)
                            .set_fg(terminal_color(text.fg))
                            .set_bg(terminal_color(top));
                    }
                    None => {
                        cell.set_symbol(HALF_BLOCK)
                            .set_fg(terminal_color(top))
                            .set_bg(terminal_color(bottom));
                    }
                }
            }
        }
    }
}

impl Painter for PixelCanvas {
    fn fill_rect(&mut self, rect: RectF, color: Rgb) {
        // A pixel is covered when its centre lies inside the rect.
        let x0 = (rect.x - 0.5).ceil() as i32;
        let x1 = (rect.x + rect.w - 0.5).ceil() as i32;
        let y0 = (rect.y - 0.5).ceil() as i32;
        let y1 = (rect.y + rect.h - 0.5).ceil() as i32;
        for y in y0..y1 {
            for x in x0..x1 {
                self.set(x, y, color);
            }
        }
    }

    fn stroke_rect(&mut self, rect: RectF, color: Rgb) {
        if rect.w < 0.0 || rect.h < 0.0 {
            return;
        }
        let left = rect.x.floor() as i32;
        let top = rect.y.floor() as i32;
        let right = (rect.x + rect.w).floor() as i32;
        let bottom = (rect.y + rect.h).floor() as i32;
        self.hline(left, right, top, color);
        self.hline(left, right, bottom, color);
        self.vline(left, top, bottom, color);
        self.vline(right, top, bottom, color);
    }

    fn line(&mut self, from: PointF, to: PointF, color: Rgb) {
        let (mut x, mut y) = (from.x.floor() as i32, from.y.floor() as i32);
        let (x1, y1) = (to.x.floor() as i32, to.y.floor() as i32);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.set(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let doubled = 2 * err;
            if doubled >= dy {
                err += dy;
                x += sx;
            }
            if doubled <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn polygon(&mut self, points: &[PointF], fill: Rgb, outline: Rgb) {
        if points.len() < 3 {
            return;
        }
        let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = points.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

        // Even-odd scanline fill sampled at pixel centres.
        let first_row = (min_y - 0.5).ceil() as i32;
        let last_row = (max_y - 0.5).ceil() as i32;
        let mut crossings = Vec::with_capacity(points.len());
        for row in first_row..last_row {
            let centre = row as f32 + 0.5;
            crossings.clear();
            for (index, a) in points.iter().enumerate() {
                let b = points[(index + 1) % points.len()];
                if (a.y <= centre) != (b.y <= centre) {
                    crossings.push(a.x + (centre - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
            crossings.sort_by(f32::total_cmp);
            for pair in crossings.chunks_exact(2) {
                let x0 = (pair[0] - 0.5).ceil() as i32;
                let x1 = (pair[1] - 0.5).ceil() as i32;
                for x in x0..x1 {
                    self.set(x, row, fill);
                }
            }
        }

        for (index, a) in points.iter().enumerate() {
            let b = points[(index + 1) % points.len()];
            self.line(*a, b, outline);
        }
    }

    fn text(&mut self, rect: RectF, text: &str, fg: Rgb) {
        let row = ((rect.y + rect.h / 2.0).floor() as i32).div_euclid(2);
        let start = rect.x.floor() as i32;
        let max_chars = rect.w.floor().max(0.0) as usize;
        let rows = i32::from(self.height / 2);
        if row < 0 || row >= rows {
            return;
        }
        for (offset, ch) in text.chars().take(max_chars).enumerate() {
            let column = start + offset as i32;
            if column < 0 || column >= i32::from(self.width) {
                continue;
            }
            self.text
                .insert((column as u16, row as u16), TextCell { ch, fg });
        }
    }
}

pub fn terminal_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::{HALF_BLOCK, Painter, PixelCanvas, PointF, RectF, terminal_color};
    use laborgrid_app::Rgb;
    use ratatui::buffer::Buffer;
    use ratatui::layout::Rect;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn painted(canvas: &PixelCanvas, color: Rgb) -> Vec<(u16, u16)> {
        let mut pixels = Vec::new();
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                if canvas.pixel(x, y) == Some(color) {
                    pixels.push((x, y));
                }
            }
        }
        pixels
    }

    #[test]
    fn fill_rect_covers_pixel_centres() {
        let mut canvas = PixelCanvas::new(8, 4, Rgb::WHITE);
        canvas.fill_rect(RectF::new(1.0, 1.0, 2.0, 2.0), RED);
        assert_eq!(painted(&canvas, RED), vec![(1, 1), (2, 1), (1, 2), (2, 2)]);

        let mut canvas = PixelCanvas::new(8, 4, Rgb::WHITE);
        canvas.fill_rect(RectF::new(1.05, 1.05, 3.9, 3.9), RED);
        assert_eq!(painted(&canvas, RED).len(), 16);
    }

    #[test]
    fn stroke_rect_includes_far_edges() {
        let mut canvas = PixelCanvas::new(8, 4, Rgb::WHITE);
        canvas.stroke_rect(RectF::new(0.0, 0.0, 2.0, 2.0), RED);
        let pixels = painted(&canvas, RED);
        assert_eq!(pixels.len(), 8);
        assert!(pixels.contains(&(0, 0)));
        assert!(pixels.contains(&(2, 2)));
        assert!(!pixels.contains(&(1, 1)));
    }

    #[test]
    fn negative_stroke_is_ignored() {
        let mut canvas = PixelCanvas::new(4, 2, Rgb::WHITE);
        canvas.stroke_rect(RectF::new(2.0, 2.0, -1.0, 3.0), RED);
        assert!(painted(&canvas, RED).is_empty());
    }

    #[test]
    fn line_draws_both_endpoints() {
        let mut canvas = PixelCanvas::new(8, 4, Rgb::WHITE);
        canvas.line(PointF::new(0.0, 0.0), PointF::new(0.0, 5.0), RED);
        assert_eq!(painted(&canvas, RED).len(), 6);

        canvas.line(PointF::new(0.0, 0.0), PointF::new(3.0, 3.0), BLUE);
        assert_eq!(painted(&canvas, BLUE), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn polygon_fills_interior_and_outlines_edges() {
        let mut canvas = PixelCanvas::new(12, 6, Rgb::WHITE);
        let diamond = [
            PointF::new(6.0, 1.0),
            PointF::new(10.0, 6.0),
            PointF::new(6.0, 11.0),
            PointF::new(2.0, 6.0),
        ];
        canvas.polygon(&diamond, RED, BLUE);
        assert_eq!(canvas.pixel(6, 6), Some(RED));
        assert_eq!(canvas.pixel(6, 1), Some(BLUE));
        assert_eq!(canvas.pixel(0, 0), Some(Rgb::WHITE));
    }

    #[test]
    fn text_is_clipped_to_rect_width() {
        let mut canvas = PixelCanvas::new(10, 3, Rgb::WHITE);
        canvas.text(RectF::new(2.0, 0.0, 3.0, 6.0), "Urist", Rgb::BLACK);
        assert_eq!(canvas.text_at(2, 1), Some('U'));
        assert_eq!(canvas.text_at(4, 1), Some('i'));
        assert_eq!(canvas.text_at(5, 1), None);
    }

    #[test]
    fn blit_uses_half_blocks_and_text_overlay() {
        let mut canvas = PixelCanvas::new(2, 1, Rgb::WHITE);
        canvas.fill_rect(RectF::new(0.0, 0.0, 1.0, 1.0), RED);
        canvas.fill_rect(RectF::new(0.0, 1.0, 1.0, 1.0), BLUE);
        canvas.text(RectF::new(1.0, 0.0, 1.0, 2.0), "x", Rgb::BLACK);

        let area = Rect::new(3, 1, 4, 2);
        let mut buf = Buffer::empty(Rect::new(0, 0, 8, 4));
        canvas.blit(area, &mut buf);

        let block = &buf[(3, 1)];
        assert_eq!(block.symbol(), HALF_BLOCK);
        assert_eq!(block.fg, terminal_color(RED));
        assert_eq!(block.bg, terminal_color(BLUE));

        let text = &buf[(4, 1)];
        assert_eq!(text.symbol(), "x");
        assert_eq!(text.fg, terminal_color(Rgb::BLACK));
        assert_eq!(text.bg, terminal_color(Rgb::WHITE));
    }
}
