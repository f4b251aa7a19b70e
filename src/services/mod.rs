pub mod allocation;
pub mod audit;
pub mod bulk;
pub mod charts;
pub mod csv_io;
pub mod dictionary;
pub mod grid;
pub mod templates;
