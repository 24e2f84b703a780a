mod buffer;
mod tracker;

pub use buffer::RecordingBuffer;
pub use tracker::ActiveNotes;
