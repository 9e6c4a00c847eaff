// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod controller;
pub mod forms;
pub mod html;
pub mod model;
pub mod numeric;
pub mod state;
pub mod table;
pub mod tokens;
pub mod view;

pub use controller::*;
pub use forms::*;
pub use model::*;
pub use state::*;
pub use table::{
    CellTone, GridCell, NEGATIVE_CLASS, POSITIVE_CLASS, TableGrid, TableRow, parse_grid,
    tag_numeric_cells,
};
pub use tokens::*;
pub use view::*;
