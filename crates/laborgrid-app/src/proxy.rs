// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::grid::{CellIndex, RosterModel};

/// Coordinate mapping between what the view shows and the model rows.
///
/// A view may reorder or hide rows; everything that reads cell metadata maps
/// back to the model with `to_origin` first. `row_count` and `index` speak
/// in view coordinates.
pub trait ViewMapping {
    fn to_origin(&self, model: &RosterModel, index: CellIndex) -> Option<CellIndex>;

    fn row_count(&self, model: &RosterModel, parent: Option<usize>) -> usize;

    fn index(
        &self,
        model: &RosterModel,
        row: usize,
        column: usize,
        parent: Option<usize>,
    ) -> Option<CellIndex> {
        if row >= self.row_count(model, parent) || column >= model.column_count() {
            return None;
        }
        Some(CellIndex {
            parent,
            row,
            column,
        })
    }
}

/// The identity mapping: the view shows model rows as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Passthrough;

impl ViewMapping for Passthrough {
    fn to_origin(&self, model: &RosterModel, index: CellIndex) -> Option<CellIndex> {
        model.cell(index).map(|_| index)
    }

    fn row_count(&self, model: &RosterModel, parent: Option<usize>) -> usize {
        model.row_count(parent)
    }
}
