use crate::{
    error::{Error, Result},
    store::FeatureEditor,
    types::{FeatureId, Value},
};

/// Writes district assignments into one field of an editable layer, one
/// undo step per assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedistrictHandler {
    target_field: usize,
}

impl RedistrictHandler {
    pub fn new(target_field: usize) -> Self { Self { target_field } }

    #[inline] pub fn target_field(&self) -> usize { self.target_field }

    pub fn begin_edit_group(&self, editor: &mut dyn FeatureEditor, text: &str) {
        editor.begin_edit_command(text)
    }

    pub fn end_edit_group(&self, editor: &mut dyn FeatureEditor) {
        editor.end_edit_command()
    }

    pub fn discard_edit_group(&self, editor: &mut dyn FeatureEditor) {
        editor.destroy_edit_command()
    }

    /// Set the target field of every feature in `targets` to `district`.
    /// If any write fails the whole group is discarded.
    pub fn assign_district(&self, editor: &mut dyn FeatureEditor, targets: &[FeatureId], district: Value) -> Result<()> {
        if !editor.is_editable() {
            return Err(Error::AssignmentFailed(String::from("layer is not editable")))
        }
        self.begin_edit_group(editor, "Redistrict");
        match self.write_targets(editor, targets, &district) {
            Ok(()) => {
                self.end_edit_group(editor);
                Ok(())
            }
            Err(e) => {
                self.discard_edit_group(editor);
                Err(e)
            }
        }
    }

    /// Write `district` to each target inside an already open group.
    pub(crate) fn write_targets(&self, editor: &mut dyn FeatureEditor, targets: &[FeatureId], district: &Value) -> Result<()> {
        for &fid in targets {
            if !editor.change_attribute_value(fid, self.target_field, district.clone()) {
                return Err(Error::AssignmentFailed(format!("could not update feature {fid}")))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EditBuffer, FeatureTable};

    fn buffer(n: usize) -> EditBuffer {
        let mut table = FeatureTable::new("meshblocks", ["meshblock_number", "staged_electorate"]);
        for i in 0..n {
            table.add_feature(vec![Value::Int(i as i64), Value::Int(1)], None);
        }
        let mut buffer = EditBuffer::new(table);
        buffer.start_editing();
        buffer
    }

    #[test]
    fn assigns_in_one_undo_step() {
        let mut buffer = buffer(3);
        let handler = RedistrictHandler::new(1);
        handler.assign_district(&mut buffer, &[FeatureId(0), FeatureId(2)], Value::Int(5)).unwrap();
        assert_eq!(buffer.table().attribute(FeatureId(0), 1), Some(&Value::Int(5)));
        assert_eq!(buffer.table().attribute(FeatureId(1), 1), Some(&Value::Int(1)));
        assert_eq!(buffer.undo_index(), 1);

        buffer.undo();
        assert_eq!(buffer.table().attribute(FeatureId(2), 1), Some(&Value::Int(1)));
    }

    #[test]
    fn failed_write_discards_group() {
        let mut buffer = buffer(2);
        let handler = RedistrictHandler::new(1);
        let result = handler.assign_district(&mut buffer, &[FeatureId(0), FeatureId(7)], Value::Int(5));
        assert!(matches!(result, Err(Error::AssignmentFailed(_))));
        assert_eq!(buffer.table().attribute(FeatureId(0), 1), Some(&Value::Int(1)));
        assert_eq!(buffer.undo_index(), 0);
    }

    #[test]
    fn read_only_layer_is_rejected() {
        let mut buffer = EditBuffer::new(FeatureTable::new("meshblocks", ["staged_electorate"]));
        let handler = RedistrictHandler::new(0);
        assert!(matches!(
            handler.assign_district(&mut buffer, &[FeatureId(0)], Value::Int(1)),
            Err(Error::AssignmentFailed(_))
        ));
    }
}
