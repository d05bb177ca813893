// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use laborgrid_app::{
    CellIndex, ColumnType, DwarfId, NAME_COLUMN, Rgb, RosterModel, RowKind, ViewMapping,
};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};

use crate::delegate::{CellOption, CellRenderer};
use crate::paint::{Painter, PixelCanvas, RectF, terminal_color};

const CANVAS_BACKGROUND: Rgb = Rgb::WHITE;
const HEADER_ROWS: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    /// Width of the name column in terminal columns.
    pub name_width: u16,
    /// Row height in pixels; two pixels per terminal row.
    pub cell_size: u16,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            name_width: 20,
            cell_size: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridHit {
    Header(usize),
    Name(usize),
    Cell { row: usize, column: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnSpan {
    column: usize,
    x: u16,
    width: u16,
}

/// Cursor, scroll offsets and geometry of the dwarf grid. Rows are the
/// flattened tree: each top-level row followed by its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    options: GridOptions,
    cursor_row: usize,
    cursor_col: usize,
    scroll_row: usize,
    scroll_col: usize,
    area: Rect,
}

impl GridView {
    pub fn new(options: GridOptions) -> Self {
        Self {
            options,
            cursor_row: 0,
            cursor_col: 1,
            scroll_row: 0,
            scroll_col: 1,
            area: Rect::default(),
        }
    }

    pub fn options(&self) -> GridOptions {
        self.options
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_col)
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    fn row_height(&self) -> u16 {
        (self.options.cell_size / 2).max(1)
    }

    fn body(&self) -> Rect {
        let area = self.area;
        Rect::new(
            area.x,
            area.y.saturating_add(HEADER_ROWS),
            area.width,
            area.height.saturating_sub(HEADER_ROWS),
        )
    }

    fn cells_area(&self) -> Rect {
        let body = self.body();
        let name_width = self.options.name_width.min(body.width);
        Rect::new(
            body.x + name_width,
            body.y,
            body.width - name_width,
            body.height,
        )
    }

    fn row_capacity(&self) -> usize {
        usize::from(self.body().height / self.row_height())
    }

    pub fn visible_rows<V: ViewMapping + ?Sized>(
        &self,
        model: &RosterModel,
        view: &V,
    ) -> Vec<CellIndex> {
        let mut rows = Vec::new();
        for top in 0..view.row_count(model, None) {
            rows.push(CellIndex::top(top, NAME_COLUMN));
            for child in 0..view.row_count(model, Some(top)) {
                rows.push(CellIndex::child(top, child, NAME_COLUMN));
            }
        }
        rows
    }

    /// View index of the cell under the cursor.
    pub fn cursor_index<V: ViewMapping + ?Sized>(
        &self,
        model: &RosterModel,
        view: &V,
    ) -> Option<CellIndex> {
        self.visible_rows(model, view)
            .get(self.cursor_row)
            .map(|row| row.sibling(self.cursor_col))
    }

    /// Dwarf shown on the cursor row, if it is a dwarf row.
    pub fn cursor_dwarf<V: ViewMapping + ?Sized>(
        &self,
        model: &RosterModel,
        view: &V,
    ) -> Option<DwarfId> {
        let row = *self.visible_rows(model, view).get(self.cursor_row)?;
        match model.row_kind(view.to_origin(model, row)?)? {
            RowKind::Leaf { dwarf_id } => Some(*dwarf_id),
            RowKind::Group { .. } => None,
        }
    }

    pub fn move_rows<V: ViewMapping + ?Sized>(
        &mut self,
        model: &RosterModel,
        view: &V,
        delta: isize,
    ) {
        let rows = self.visible_rows(model, view).len();
        if rows == 0 {
            self.cursor_row = 0;
            return;
        }
        self.cursor_row = self
            .cursor_row
            .saturating_add_signed(delta)
            .min(rows - 1);
    }

    /// Moves horizontally, stepping over spacer columns.
    pub fn move_columns(&mut self, model: &RosterModel, delta: isize) {
        let columns = model.column_count();
        let mut column = self.cursor_col;
        for _ in 0..delta.unsigned_abs() {
            let mut candidate = column;
            loop {
                candidate = if delta < 0 {
                    candidate.saturating_sub(1)
                } else {
                    candidate + 1
                };
                if candidate == NAME_COLUMN || candidate >= columns {
                    break;
                }
                if !is_spacer(model, candidate) {
                    column = candidate;
                    break;
                }
            }
        }
        self.cursor_col = column;
    }

    pub fn set_cursor(&mut self, row: usize, column: usize) {
        self.cursor_row = row;
        self.cursor_col = column.max(1);
    }

    /// Puts the cursor on `dwarf`'s row, keeping the column.
    pub fn focus_dwarf<V: ViewMapping + ?Sized>(
        &mut self,
        model: &RosterModel,
        view: &V,
        dwarf: DwarfId,
    ) {
        let Some(target) = model.leaf_index(dwarf) else {
            return;
        };
        let position = self
            .visible_rows(model, view)
            .iter()
            .position(|row| view.to_origin(model, *row) == Some(target));
        if let Some(position) = position {
            self.cursor_row = position;
        }
    }

    /// Keeps the cursor inside the grid and scrolls it into view.
    pub fn ensure_cursor_visible<V: ViewMapping + ?Sized>(
        &mut self,
        model: &RosterModel,
        view: &V,
        area: Rect,
    ) {
        self.area = area;
        let rows = self.visible_rows(model, view).len();
        self.cursor_row = self.cursor_row.min(rows.saturating_sub(1));
        let last_column = model.column_count().saturating_sub(1).max(1);
        self.cursor_col = self.cursor_col.clamp(1, last_column);

        let capacity = self.row_capacity().max(1);
        if self.cursor_row < self.scroll_row {
            self.scroll_row = self.cursor_row;
        } else if self.cursor_row >= self.scroll_row + capacity {
            self.scroll_row = self.cursor_row + 1 - capacity;
        }
        self.scroll_row = self.scroll_row.min(rows.saturating_sub(1));

        self.scroll_col = self.scroll_col.clamp(1, last_column);
        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        }
        while self.scroll_col < self.cursor_col
            && !self
                .column_spans(model)
                .iter()
                .any(|span| span.column == self.cursor_col)
        {
            self.scroll_col += 1;
        }
    }

    fn column_spans(&self, model: &RosterModel) -> Vec<ColumnSpan> {
        let available = self.cells_area().width;
        let mut spans = Vec::new();
        let mut x = 0u16;
        for column in self.scroll_col..model.column_count() {
            let width = model.header(column).map_or(0, |header| header.width);
            if x.saturating_add(width) > available {
                break;
            }
            spans.push(ColumnSpan { column, x, width });
            x += width;
        }
        spans
    }

    pub fn hit_test<V: ViewMapping + ?Sized>(
        &self,
        model: &RosterModel,
        view: &V,
        column: u16,
        row: u16,
    ) -> Option<GridHit> {
        let area = self.area;
        if column < area.x || column >= area.right() || row < area.y || row >= area.bottom() {
            return None;
        }
        let cells = self.cells_area();
        let span = |x: u16| {
            self.column_spans(model)
                .into_iter()
                .find(|span| x >= cells.x + span.x && x < cells.x + span.x + span.width)
                .map(|span| span.column)
        };

        if row < area.y + HEADER_ROWS {
            return span(column).map(GridHit::Header);
        }

        let visible = self.scroll_row + usize::from((row - self.body().y) / self.row_height());
        if visible >= self.visible_rows(model, view).len() {
            return None;
        }
        if column < cells.x {
            return Some(GridHit::Name(visible));
        }
        span(column).map(|column| GridHit::Cell {
            row: visible,
            column,
        })
    }

    pub fn render<V: ViewMapping + ?Sized>(
        &self,
        model: &RosterModel,
        view: &V,
        renderer: &CellRenderer,
        buf: &mut Buffer,
    ) {
        let spans = self.column_spans(model);
        let rows = self.visible_rows(model, view);
        self.render_header(model, &spans, buf);

        let cells = self.cells_area();
        let cell_size = self.options.cell_size.max(2);
        let mut canvas = PixelCanvas::new(cells.width, cells.height, CANVAS_BACKGROUND);
        let body = self.body();
        let row_height = self.row_height();

        for (offset, row) in rows
            .iter()
            .enumerate()
            .skip(self.scroll_row)
            .take(self.row_capacity())
        {
            let line = (offset - self.scroll_row) as u16;
            let top = f32::from(line * cell_size);
            let selected = offset == self.cursor_row;
            for span in &spans {
                let rect = RectF::new(
                    f32::from(span.x),
                    top,
                    f32::from(span.width),
                    f32::from(cell_size),
                );
                let option = CellOption { rect, selected };
                renderer.paint(&mut canvas, &option, model, view, row.sibling(span.column));
                if selected && span.column == self.cursor_col {
                    canvas.stroke_rect(
                        rect.adjusted(0.0, 0.0, -1.0, -1.0),
                        renderer.colors().cursor,
                    );
                }
            }

            let y = body.y + line * row_height + row_height / 2;
            self.render_name(model, view, *row, selected, y, buf);
        }

        canvas.blit(cells, buf);
    }

    fn render_header(&self, model: &RosterModel, spans: &[ColumnSpan], buf: &mut Buffer) {
        let area = self.area;
        if area.height == 0 {
            return;
        }
        let name_width = self.options.name_width.min(area.width);
        let title = match model.group_by().is_grouped() {
            true => format!("by {}", model.group_by().label()),
            false => "dwarf".to_owned(),
        };
        buf.set_stringn(
            area.x,
            area.y,
            title,
            usize::from(name_width),
            Style::default().add_modifier(Modifier::BOLD),
        );

        let cells_x = self.cells_area().x;
        for span in spans {
            let Some(header) = model.header(span.column) else {
                continue;
            };
            let mut style = Style::default().fg(Color::Black);
            if let Some(bg) = header.bg_color {
                style = style.bg(terminal_color(bg));
            }
            if model.selected_col() == Some(span.column) {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            let x = cells_x + span.x;
            buf.set_stringn(x, area.y, " ".repeat(usize::from(span.width)), usize::from(span.width), style);
            buf.set_stringn(x, area.y, &header.title, usize::from(span.width), style);
        }
    }

    fn render_name<V: ViewMapping + ?Sized>(
        &self,
        model: &RosterModel,
        view: &V,
        row: CellIndex,
        selected: bool,
        y: u16,
        buf: &mut Buffer,
    ) {
        let Some(cell) = view.to_origin(model, row).and_then(|origin| model.cell(origin)) else {
            return;
        };
        let body = self.body();
        if y >= body.bottom() {
            return;
        }
        let mut style = Style::default();
        if cell.aggregate {
            style = style.add_modifier(Modifier::BOLD);
        }
        if selected {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let indent = if row.parent.is_some() { "  " } else { "" };
        let width = usize::from(self.options.name_width.min(body.width));
        buf.set_stringn(body.x, y, format!("{indent}{}", cell.text), width, style);
    }
}

fn is_spacer(model: &RosterModel, column: usize) -> bool {
    model
        .header(column)
        .is_some_and(|header| header.column_type == ColumnType::Spacer)
}
