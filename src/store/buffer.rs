use std::collections::BTreeMap;

use crate::{
    error::{Error, Result},
    store::{FeatureEditor, FeatureTable},
    types::{FeatureId, Value},
};

#[derive(Debug, Clone)]
struct AttributeEdit {
    feature: FeatureId,
    field: usize,
    old: Value,
    new: Value,
}

#[derive(Debug, Clone, Default)]
struct EditCommand {
    text: String,
    edits: Vec<AttributeEdit>,
}

/// An edit session over a [`FeatureTable`] with a linear undo stack.
///
/// Edits are written through to the table immediately; the undo stack holds
/// enough to revert them. [`commit`](EditBuffer::commit) keeps the edits and
/// forgets the history, [`rollback`](EditBuffer::rollback) reverts everything.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    table: FeatureTable,
    editing: bool,
    commands: Vec<EditCommand>,
    index: usize, // commands[..index] are applied
    open: Option<EditCommand>,
}

impl EditBuffer {
    pub fn new(table: FeatureTable) -> Self {
        Self { table, editing: false, commands: Vec::new(), index: 0, open: None }
    }

    /// Current table contents, including uncommitted edits.
    #[inline] pub fn table(&self) -> &FeatureTable { &self.table }

    #[inline] pub fn is_editing(&self) -> bool { self.editing }

    pub fn start_editing(&mut self) { self.editing = true }

    /// Whether any applied command changes the table.
    pub fn is_modified(&self) -> bool {
        self.open.as_ref().is_some_and(|cmd| !cmd.edits.is_empty())
            || self.commands[..self.index].iter().any(|cmd| !cmd.edits.is_empty())
    }

    /// Text of the command that [`undo`](EditBuffer::undo) would revert.
    pub fn undo_text(&self) -> Option<&str> {
        self.index.checked_sub(1).map(|i| self.commands[i].text.as_str())
    }

    pub fn can_undo(&self) -> bool { self.open.is_none() && self.index > 0 }

    pub fn can_redo(&self) -> bool { self.open.is_none() && self.index < self.commands.len() }

    /// Revert the most recent command.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() { return false }
        self.index -= 1;
        revert(&mut self.table, &self.commands[self.index]);
        true
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() { return false }
        reapply(&mut self.table, &self.commands[self.index]);
        self.index += 1;
        true
    }

    /// Net uncommitted changes: for each feature, the fields whose current
    /// value differs from the value before the session started.
    pub fn pending_changes(&self) -> BTreeMap<FeatureId, BTreeMap<usize, Value>> {
        let mut original: BTreeMap<(FeatureId, usize), &Value> = BTreeMap::new();
        for edit in self.commands[..self.index].iter().flat_map(|cmd| &cmd.edits) {
            original.entry((edit.feature, edit.field)).or_insert(&edit.old);
        }

        let mut changes: BTreeMap<FeatureId, BTreeMap<usize, Value>> = BTreeMap::new();
        for ((feature, field), old) in original {
            if let Some(current) = self.table.attribute(feature, field) {
                if current != old {
                    changes.entry(feature).or_default().insert(field, current.clone());
                }
            }
        }
        changes
    }

    /// Keep all applied edits and end the session.
    pub fn commit(&mut self) {
        self.destroy_edit_command();
        self.commands.clear();
        self.index = 0;
        self.editing = false;
    }

    /// Revert all applied edits and end the session.
    pub fn rollback(&mut self) {
        self.destroy_edit_command();
        while self.undo() {}
        self.commands.clear();
        self.editing = false;
    }

    /// Direct write access, bypassing the undo stack. Only allowed while
    /// nothing is modified; any redo history is discarded.
    pub fn provider_mut(&mut self) -> Result<&mut FeatureTable> {
        if self.is_modified() || self.open.is_some() { return Err(Error::EditSessionOpen) }
        self.commands.clear();
        self.index = 0;
        Ok(&mut self.table)
    }

    fn push_command(&mut self, command: EditCommand) {
        self.commands.truncate(self.index);
        self.commands.push(command);
        self.index += 1;
    }
}

fn revert(table: &mut FeatureTable, command: &EditCommand) {
    for edit in command.edits.iter().rev() {
        if let Some(feature) = table.feature_mut(edit.feature) {
            feature.attributes[edit.field] = edit.old.clone();
        }
    }
}

fn reapply(table: &mut FeatureTable, command: &EditCommand) {
    for edit in &command.edits {
        if let Some(feature) = table.feature_mut(edit.feature) {
            feature.attributes[edit.field] = edit.new.clone();
        }
    }
}

impl FeatureEditor for EditBuffer {
    #[inline] fn is_editable(&self) -> bool { self.editing }

    fn begin_edit_command(&mut self, text: &str) {
        if self.open.is_none() {
            self.open = Some(EditCommand { text: text.to_string(), edits: Vec::new() });
        }
    }

    fn change_attribute_value(&mut self, feature: FeatureId, field: usize, value: Value) -> bool {
        if !self.editing { return false }
        let Ok(old) = self.table.change_attribute_value(feature, field, value.clone()) else { return false };

        let edit = AttributeEdit { feature, field, old, new: value };
        match self.open.as_mut() {
            Some(command) => command.edits.push(edit),
            None => self.push_command(EditCommand { text: String::from("change attribute"), edits: vec![edit] }),
        }
        true
    }

    fn attribute(&self, feature: FeatureId, field: usize) -> Option<Value> {
        self.table.attribute(feature, field).cloned()
    }

    fn end_edit_command(&mut self) {
        if let Some(command) = self.open.take() {
            if !command.edits.is_empty() { self.push_command(command) }
        }
    }

    fn destroy_edit_command(&mut self) {
        if let Some(command) = self.open.take() {
            revert(&mut self.table, &command);
        }
    }

    #[inline] fn undo_index(&self) -> usize { self.index }
}
