use crate::types::{FeatureId, Value};

/// Write access to an editable feature layer with a host-managed undo stack.
///
/// Edits made between [`begin_edit_command`](FeatureEditor::begin_edit_command)
/// and [`end_edit_command`](FeatureEditor::end_edit_command) form one undo step;
/// [`destroy_edit_command`](FeatureEditor::destroy_edit_command) reverts them instead.
pub trait FeatureEditor {
    /// Whether the layer currently accepts edits.
    fn is_editable(&self) -> bool;

    fn begin_edit_command(&mut self, text: &str);

    /// Set one attribute; `false` if the write was rejected.
    fn change_attribute_value(&mut self, feature: FeatureId, field: usize, value: Value) -> bool;

    /// Current (edited) value of an attribute.
    fn attribute(&self, feature: FeatureId, field: usize) -> Option<Value>;

    fn end_edit_command(&mut self);

    fn destroy_edit_command(&mut self);

    /// Position in the host undo stack: the number of applied commands.
    fn undo_index(&self) -> usize;
}
