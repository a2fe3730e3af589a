//! Domain types for stockfeed

pub mod bar;

pub use bar::{round2, DailyBar};
