// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod color;
pub mod columns;
pub mod grid;
pub mod grouping;
pub mod ids;
pub mod model;
pub mod proxy;
pub mod state;

pub use color::*;
pub use columns::*;
pub use grid::*;
pub use grouping::*;
pub use ids::*;
pub use model::*;
pub use proxy::*;
pub use state::*;
