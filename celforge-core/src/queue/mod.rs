//! # Undo history
//!
//! Commands are applied to a document through [`writer::Transaction`]s, each of which becomes one entry of an
//! [`UndoHistory`] when committed. Undo walks back one entry at a time, redo walks forward again. Committing
//! anything new forgets every entry that was undone.

pub mod writer;

use crate::{
    commands::{Command, CommandError},
    state::document::Document,
};

/// Commands committed together, undone and redone together.
struct Entry {
    label: String,
    commands: smallvec::SmallVec<[Command; 1]>,
}
impl Entry {
    /// Undo newest to oldest. If any fails, those already undone are redone and the error returned.
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        for idx in (0..self.commands.len()).rev() {
            if let Err(err) = self.commands[idx].undo(document) {
                for command in &mut self.commands[idx + 1..] {
                    if let Err(err) = command.redo(document) {
                        log::error!("Failed to restore {:?} after failed undo: {err}", self.label);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
    /// Redo oldest to newest. If any fails, those already redone are undone and the error returned.
    fn redo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        for idx in 0..self.commands.len() {
            if let Err(err) = self.commands[idx].redo(document) {
                for command in self.commands[..idx].iter_mut().rev() {
                    if let Err(err) = command.undo(document) {
                        log::error!("Failed to restore {:?} after failed redo: {err}", self.label);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

pub struct UndoHistory {
    /// Oldest first.
    done: std::collections::VecDeque<Entry>,
    /// Most recently undone last.
    undone: Vec<Entry>,
    /// Entries beyond this many are forgotten, oldest first. Zero for unlimited.
    max_steps: usize,
}
impl Default for UndoHistory {
    /// Limited as configured in the global [`Settings`](crate::settings::Settings).
    fn default() -> Self {
        Self::from_settings(&crate::settings::Settings::get().history)
    }
}
impl UndoHistory {
    #[must_use]
    pub fn new(max_steps: usize) -> Self {
        Self {
            done: std::collections::VecDeque::new(),
            undone: Vec::new(),
            max_steps,
        }
    }
    #[must_use]
    pub fn from_settings(settings: &crate::settings::HistorySettings) -> Self {
        Self::new(settings.max_undo_steps)
    }
    /// Begin applying commands to `document` as one undo step.
    pub fn transaction<'a>(
        &'a mut self,
        document: &'a mut Document,
        label: impl Into<String>,
    ) -> writer::Transaction<'a> {
        writer::Transaction {
            history: self,
            document,
            label: label.into(),
            commands: smallvec::SmallVec::new(),
            finished: false,
        }
    }
    /// Run `write` in a transaction, committing it if `write` succeeds and rolling it back otherwise.
    pub fn write_with<F, T, E>(
        &mut self,
        document: &mut Document,
        label: impl Into<String>,
        write: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut writer::Transaction<'_>) -> Result<T, E>,
        E: From<CommandError>,
    {
        let mut transaction = self.transaction(document, label);
        // Panic safe - the transaction's Drop rolls back anything left uncommitted.
        match write(&mut transaction) {
            Ok(value) => {
                transaction.commit();
                Ok(value)
            }
            Err(err) => {
                transaction.rollback()?;
                Err(err)
            }
        }
    }
    fn push(&mut self, entry: Entry) {
        if !self.undone.is_empty() {
            log::trace!("Forgetting {} undone entries", self.undone.len());
            self.undone.clear();
        }
        self.done.push_back(entry);
        if self.max_steps != 0 {
            while self.done.len() > self.max_steps {
                if let Some(forgotten) = self.done.pop_front() {
                    log::trace!("Forgetting {:?}, history full", forgotten.label);
                }
            }
        }
    }
    /// Undo the latest entry. Returns false if there was none.
    pub fn undo(&mut self, document: &mut Document) -> Result<bool, CommandError> {
        let Some(mut entry) = self.done.pop_back() else {
            return Ok(false);
        };
        if let Err(err) = entry.undo(document) {
            self.done.push_back(entry);
            return Err(err);
        }
        log::debug!("Undid {:?}", entry.label);
        self.undone.push(entry);
        Ok(true)
    }
    /// Redo the latest undone entry. Returns false if there was none.
    pub fn redo(&mut self, document: &mut Document) -> Result<bool, CommandError> {
        let Some(mut entry) = self.undone.pop() else {
            return Ok(false);
        };
        if let Err(err) = entry.redo(document) {
            self.undone.push(entry);
            return Err(err);
        }
        log::debug!("Redid {:?}", entry.label);
        self.done.push_back(entry);
        Ok(true)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }
    #[must_use]
    pub fn undo_label(&self) -> Option<&str> {
        self.done.back().map(|entry| entry.label.as_str())
    }
    #[must_use]
    pub fn redo_label(&self) -> Option<&str> {
        self.undone.last().map(|entry| entry.label.as_str())
    }
    /// Number of entries that can be undone.
    #[must_use]
    pub fn len(&self) -> usize {
        self.done.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        commands::{AddCel, RemoveCel},
        image::{Image, PixelFormat},
        state::{
            cel::Cel,
            layer::{Layer, LayerID},
            sprite::Sprite,
            Frame,
        },
    };

    fn setup() -> (UndoHistory, Document, LayerID) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut sprite = Sprite::new(PixelFormat::Rgb, 2, 2);
        let layer = sprite.add_layer(Layer::new_image("a"));
        (UndoHistory::new(0), Document::new(sprite), layer)
    }
    fn add(layer: LayerID, frame: u32) -> AddCel {
        AddCel::new(
            layer,
            Cel::new(Frame(frame), Image::new(PixelFormat::Rgb, 2, 2).into_ref()),
        )
    }
    fn cel_count(doc: &Document, layer: LayerID) -> usize {
        doc.sprite.layer(layer).unwrap().image().unwrap().cel_count()
    }

    #[test]
    fn default_follows_global_settings() {
        let history = UndoHistory::default();
        assert_eq!(
            history.max_steps,
            crate::settings::Settings::get().history.max_undo_steps
        );
    }
    #[test]
    fn rollback_continues_past_failure() {
        let (mut history, mut doc, layer) = setup();
        let other = doc.sprite.add_layer(Layer::new_image("b"));
        let mut transaction = history.transaction(&mut doc, "Add both");
        transaction.execute(add(layer, 0)).unwrap();
        transaction.execute(add(other, 0)).unwrap();
        // The newest command can no longer be undone.
        assert!(transaction.document.sprite.remove_layer(other).is_some());
        assert!(matches!(
            transaction.rollback(),
            Err(CommandError::UnknownResource)
        ));
        // The older one was still undone.
        assert_eq!(cel_count(&doc, layer), 0);
        assert!(!history.can_undo());
    }
    #[test]
    fn transaction_is_one_step() {
        let (mut history, mut doc, layer) = setup();
        let mut transaction = history.transaction(&mut doc, "Add two");
        transaction.execute(add(layer, 0)).unwrap();
        transaction.execute(add(layer, 1)).unwrap();
        assert!(transaction.commit());
        assert_eq!(cel_count(&doc, layer), 2);
        assert_eq!(history.undo_label(), Some("Add two"));

        assert!(history.undo(&mut doc).unwrap());
        assert_eq!(cel_count(&doc, layer), 0);
        assert_eq!(history.redo_label(), Some("Add two"));
        assert!(!history.undo(&mut doc).unwrap());

        assert!(history.redo(&mut doc).unwrap());
        assert_eq!(cel_count(&doc, layer), 2);
        assert!(!history.redo(&mut doc).unwrap());
    }
    #[test]
    fn new_commit_forgets_undone() {
        let (mut history, mut doc, layer) = setup();
        history
            .write_with(&mut doc, "one", |t| t.execute(add(layer, 0)))
            .unwrap();
        history.undo(&mut doc).unwrap();
        assert!(history.can_redo());
        history
            .write_with(&mut doc, "two", |t| t.execute(add(layer, 1)))
            .unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.len(), 1);
    }
    #[test]
    fn failed_write_rolls_back() {
        let (mut history, mut doc, layer) = setup();
        let result = history.write_with(&mut doc, "bad", |t| {
            t.execute(add(layer, 0))?;
            // Nothing at frame 3.
            t.execute(RemoveCel::new(layer, Frame(3)))
        });
        assert!(matches!(result, Err(CommandError::UnknownResource)));
        assert_eq!(cel_count(&doc, layer), 0);
        assert!(!history.can_undo());
    }
    #[test]
    fn drop_rolls_back() {
        let (mut history, mut doc, layer) = setup();
        {
            let mut transaction = history.transaction(&mut doc, "abandoned");
            transaction.execute(add(layer, 0)).unwrap();
            assert_eq!(cel_count(transaction.document(), layer), 1);
        }
        assert_eq!(cel_count(&doc, layer), 0);
        assert!(!history.can_undo());
    }
    #[test]
    fn panic_rolls_back() {
        let (mut history, mut doc, layer) = setup();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<(), CommandError> = history.write_with(&mut doc, "panics", |t| {
                t.execute(add(layer, 0))?;
                panic!("oh no");
            });
        }));
        assert!(result.is_err());
        assert_eq!(cel_count(&doc, layer), 0);
        assert!(!history.can_undo());
    }
    #[test]
    fn limited_steps() {
        let (_, mut doc, layer) = setup();
        let mut history = UndoHistory::new(2);
        for frame in 0..4 {
            history
                .write_with(&mut doc, format!("add {frame}"), |t| t.execute(add(layer, frame)))
                .unwrap();
        }
        assert_eq!(history.len(), 2);
        assert!(history.undo(&mut doc).unwrap());
        assert!(history.undo(&mut doc).unwrap());
        assert!(!history.undo(&mut doc).unwrap());
        // The two oldest are permanent.
        assert_eq!(cel_count(&doc, layer), 2);
    }
}
