use super::{Entry, UndoHistory};
use crate::{
    commands::{Command, CommandError},
    state::document::Document,
};

/// A group of commands applied to a document as one undo step.
///
/// Commands take effect as they're executed. [`Transaction::commit`] records them as a single entry in the
/// history, [`Transaction::rollback`] undoes them. Dropping a transaction without committing rolls it back, so
/// a panic or early return mid-way leaves the document as it was.
pub struct Transaction<'a> {
    pub(super) history: &'a mut UndoHistory,
    pub(super) document: &'a mut Document,
    pub(super) label: String,
    // Optimize for exactly one command (the most common case)
    pub(super) commands: smallvec::SmallVec<[Command; 1]>,
    pub(super) finished: bool,
}
impl<'a> Transaction<'a> {
    /// Execute a command now, as part of this transaction. A command that fails is not kept.
    pub fn execute(&mut self, command: impl Into<Command>) -> Result<(), CommandError> {
        let mut command = command.into();
        command.execute(self.document)?;
        self.commands.push(command);
        Ok(())
    }
    /// The document, for reading while building commands.
    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.commands.is_empty()
    }
    /// Record the executed commands as one undo step. Returns false if there was nothing to record.
    pub fn commit(mut self) -> bool {
        self.finished = true;
        if self.commands.is_empty() {
            return false;
        }
        let entry = Entry {
            label: std::mem::take(&mut self.label),
            commands: std::mem::take(&mut self.commands),
        };
        log::trace!("Committing {:?} ({} commands)", entry.label, entry.commands.len());
        self.history.push(entry);
        true
    }
    /// Undo every executed command, newest first.
    pub fn rollback(mut self) -> Result<(), CommandError> {
        self.finished = true;
        self.undo_all()
    }
    /// Keeps going past failures, so as much as possible is undone. Returns the first failure.
    fn undo_all(&mut self) -> Result<(), CommandError> {
        let mut first_err = None;
        while let Some(mut command) = self.commands.pop() {
            if let Err(err) = command.undo(self.document) {
                log::error!("Undoing part of {:?}: {err}", self.label);
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished || self.commands.is_empty() {
            return;
        }
        if std::thread::panicking() {
            log::error!("Rolling back {:?} after panic mid-write", self.label);
        } else {
            log::warn!("Rolling back uncommitted {:?}", self.label);
        }
        if let Err(err) = self.undo_all() {
            // Nothing more to be done, the document is now out of step with its history.
            log::error!("Failed to roll back {:?}: {err}", self.label);
        }
    }
}
