//! Summary views over library catalog files.
//!
//! [`table`] loads a catalog into an immutable [`table::Table`], [`stats`] validates it and
//! computes the summary counts and value counts, the remaining modules make up the
//! terminal front end.

pub mod controller;
pub mod domain;
pub mod inputter;
pub mod model;
pub mod stats;
pub mod table;
pub mod ui;
