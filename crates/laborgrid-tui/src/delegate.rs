// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use laborgrid_app::{
    CellData, CellIndex, ColumnType, GridColors, GridSettings, NAME_COLUMN, Rgb, RosterModel,
    ViewMapping,
};
use tracing::debug;

use crate::paint::{Painter, PointF, RectF};

const TEXT_COLOR: Rgb = Rgb::BLACK;
/// Distance between the cell edge and the area the diamond is scaled into.
const DIAMOND_INSET: f32 = 1.0;
const DIAMOND: [PointF; 4] = [
    PointF::new(0.5, 0.1),
    PointF::new(0.75, 0.5),
    PointF::new(0.5, 0.9),
    PointF::new(0.25, 0.5),
];

/// Where and how one cell is being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellOption {
    pub rect: RectF,
    pub selected: bool,
}

/// Mark drawn for a skill rating. Square sizes are fractions of the cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Glyph {
    None,
    Square { size: f32 },
    Diamond,
}

pub fn glyph_for_rating(rating: i16) -> Glyph {
    match rating {
        r if r >= 15 => Glyph::Diamond,
        11..=14 => Glyph::Square {
            size: 0.80 * (f32::from(rating) / 14.0),
        },
        1..=10 => Glyph::Square {
            size: 0.65 * (f32::from(rating) / 10.0),
        },
        _ => Glyph::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRenderer {
    colors: GridColors,
    cell_padding: u16,
}

impl CellRenderer {
    pub fn new(settings: &GridSettings) -> Self {
        let mut renderer = Self::default();
        renderer.read_settings(settings);
        renderer
    }

    pub fn read_settings(&mut self, settings: &GridSettings) {
        self.colors = settings.colors;
        self.cell_padding = settings.cell_padding;
    }

    pub fn colors(&self) -> &GridColors {
        &self.colors
    }

    pub fn cell_padding(&self) -> u16 {
        self.cell_padding
    }

    pub fn paint<P, V>(
        &self,
        painter: &mut P,
        option: &CellOption,
        model: &RosterModel,
        view: &V,
        proxy_index: CellIndex,
    ) where
        P: Painter + ?Sized,
        V: ViewMapping + ?Sized,
    {
        let Some(origin) = view.to_origin(model, proxy_index) else {
            return;
        };
        if proxy_index.column == NAME_COLUMN {
            self.paint_default(painter, option, model.cell(origin));
            return;
        }

        self.paint_cell(painter, option, model, view, proxy_index, origin);

        if model.selected_col() == Some(proxy_index.column) {
            let rect = option.rect;
            painter.line(rect.top_left(), rect.bottom_left(), self.colors.guides);
            painter.line(rect.top_right(), rect.bottom_right(), self.colors.guides);
        }
    }

    fn paint_cell<P, V>(
        &self,
        painter: &mut P,
        option: &CellOption,
        model: &RosterModel,
        view: &V,
        proxy_index: CellIndex,
        origin: CellIndex,
    ) where
        P: Painter + ?Sized,
        V: ViewMapping + ?Sized,
    {
        let Some(cell) = model.cell(origin) else {
            return;
        };
        match cell.column_type {
            ColumnType::Skill => {
                let bg = self.paint_bg(false, painter, option, cell);
                self.paint_skill(cell.rating, bg, painter, option);
                self.paint_grid(false, painter, option);
            }
            ColumnType::Labor => {
                if !model.group_by().is_grouped() || !cell.aggregate {
                    self.paint_labor(painter, option, model, cell);
                } else {
                    self.paint_aggregate(painter, option, model, view, proxy_index, cell);
                }
            }
            ColumnType::Happiness => {
                self.paint_default(painter, option, Some(cell));
                self.paint_grid(false, painter, option);
            }
            ColumnType::Default | ColumnType::Spacer => {
                self.paint_default(painter, option, Some(cell));
            }
        }
    }

    /// Shrinks a cell rect by the padding, leaving room for the outline.
    pub fn adjust_rect(&self, rect: RectF) -> RectF {
        let padding = f32::from(self.cell_padding);
        rect.adjusted(
            padding,
            padding,
            -2.0 * padding - 1.0,
            -2.0 * padding - 1.0,
        )
    }

    fn paint_default<P: Painter + ?Sized>(
        &self,
        painter: &mut P,
        option: &CellOption,
        cell: Option<&CellData>,
    ) {
        let Some(cell) = cell else {
            return;
        };
        painter.fill_rect(option.rect, cell.bg_color);
        if !cell.text.is_empty() {
            painter.text(option.rect, &cell.text, TEXT_COLOR);
        }
    }

    /// Fills the cell background and returns the colour glyphs sit on.
    fn paint_bg<P: Painter + ?Sized>(
        &self,
        active: bool,
        painter: &mut P,
        option: &CellOption,
        cell: &CellData,
    ) -> Rgb {
        painter.fill_rect(option.rect, cell.bg_color);
        if active {
            painter.fill_rect(self.adjust_rect(option.rect), self.colors.active_labor);
            return self.colors.active_labor;
        }
        cell.bg_color
    }

    fn paint_skill<P: Painter + ?Sized>(
        &self,
        rating: i16,
        bg: Rgb,
        painter: &mut P,
        option: &CellOption,
    ) {
        let complement = bg.complement();
        let rect = option.rect;
        match glyph_for_rating(rating) {
            Glyph::Diamond => {
                let area = rect.adjusted(
                    DIAMOND_INSET,
                    DIAMOND_INSET,
                    -DIAMOND_INSET,
                    -DIAMOND_INSET,
                );
                let points = DIAMOND.map(|point| area.map_unit(point));
                painter.polygon(&points, complement, Rgb::GRAY);
            }
            Glyph::Square { size } => {
                let inset = (1.0 - size) / 2.0;
                let top_left = rect.map_unit(PointF::new(inset, inset));
                painter.fill_rect(
                    RectF::new(top_left.x, top_left.y, size * rect.w, size * rect.h),
                    complement,
                );
            }
            Glyph::None => {}
        }
    }

    fn paint_labor<P: Painter + ?Sized>(
        &self,
        painter: &mut P,
        option: &CellOption,
        model: &RosterModel,
        cell: &CellData,
    ) {
        let dwarf = cell.dwarf_id.and_then(|id| model.dwarf(id));
        let (Some(dwarf), Some(labor_id)) = (dwarf, cell.labor_id) else {
            debug!(dwarf = ?cell.dwarf_id, "labor cell without a dwarf; painting plain");
            self.paint_default(painter, option, Some(cell));
            return;
        };

        let enabled = dwarf.is_labor_enabled(labor_id);
        let dirty = dwarf.is_labor_state_dirty(labor_id);

        let bg = self.paint_bg(enabled, painter, option, cell);
        self.paint_skill(cell.rating, bg, painter, option);
        self.paint_grid(dirty, painter, option);
    }

    fn paint_aggregate<P, V>(
        &self,
        painter: &mut P,
        option: &CellOption,
        model: &RosterModel,
        view: &V,
        proxy_index: CellIndex,
        cell: &CellData,
    ) where
        P: Painter + ?Sized,
        V: ViewMapping + ?Sized,
    {
        let Some(labor_id) = cell.labor_id else {
            return;
        };
        if view
            .index(model, proxy_index.row, NAME_COLUMN, proxy_index.parent)
            .is_none()
        {
            return;
        }

        let children = view.row_count(model, Some(proxy_index.row));
        let mut enabled_count = 0;
        let mut dirty_count = 0;
        for child in 0..children {
            let dwarf = view
                .index(model, child, NAME_COLUMN, Some(proxy_index.row))
                .and_then(|index| view.to_origin(model, index))
                .and_then(|origin| model.cell(origin))
                .and_then(|name| name.dwarf_id)
                .and_then(|id| model.dwarf(id));
            let Some(dwarf) = dwarf else {
                continue;
            };
            if dwarf.is_labor_enabled(labor_id) {
                enabled_count += 1;
            }
            if dwarf.is_labor_state_dirty(labor_id) {
                dirty_count += 1;
            }
        }

        let fill = if enabled_count == children {
            self.colors.active_group
        } else if enabled_count > 0 {
            self.colors.partial_group
        } else {
            self.colors.inactive_group
        };
        painter.fill_rect(self.adjust_rect(option.rect), fill);

        self.paint_grid(dirty_count > 0, painter, option);
    }

    fn paint_grid<P: Painter + ?Sized>(&self, dirty: bool, painter: &mut P, option: &CellOption) {
        let adjusted = self.adjust_rect(option.rect);
        painter.stroke_rect(adjusted, self.colors.border);
        if option.selected {
            let rect = option.rect;
            painter.line(rect.top_left(), rect.top_right(), self.colors.guides);
            painter.line(rect.bottom_left(), rect.bottom_right(), self.colors.guides);
        }
        if dirty {
            painter.stroke_rect(adjusted, self.colors.dirty_border);
        }
    }
}
