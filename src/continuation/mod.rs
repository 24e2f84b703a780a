//! Learns the phrases a player feeds it and answers with a new phrase in the
//! same style instead of a straight echo.

mod memory;
mod phrase;

pub use memory::Memory;
pub use phrase::{PlayedNote, extract_notes, render};
