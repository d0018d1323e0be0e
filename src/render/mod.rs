pub mod ics;

pub use ics::{render_ics, render_ics_at};
