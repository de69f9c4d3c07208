mod buffer;
mod editor;
mod table;

pub use buffer::EditBuffer;
pub use editor::FeatureEditor;
pub use table::{Feature, FeatureTable};
