// Library exports for statgraph

pub mod coerce;
pub mod config;
pub mod csv_reader;
pub mod data;
pub mod error;
pub mod ir;
pub mod layout;
pub mod palette;
pub mod scale;
pub mod selector;
pub mod spatial;
pub mod stats;
pub mod transform;

pub use config::{Config, FieldNames, Frame, StatOptions};
pub use data::{CellValue, Dataset, Record};
pub use error::{ConfigError, LoadError};
pub use ir::AggregateResult;
pub use palette::{CategoryRegistry, ColorAssignment, ColorPalette};
pub use selector::{Aggregation, ChartKind, ChartTable, Panel, Selection};
