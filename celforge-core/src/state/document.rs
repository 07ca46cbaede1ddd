use super::{
    layer::LayerID,
    observer::{ChannelObserver, DocumentChange, DocumentEvent, DocumentObserver},
    sprite::Sprite,
    Frame,
};

pub type DocumentID = crate::id::ObjectID<Document>;

/// Returned by [`Document::add_observer`], used to remove it again.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ObserverHandle(crate::id::ObjectID<ObserverHandle>);

pub struct Document {
    id: DocumentID,
    /// The path from which the file was loaded or saved, or None if opened as new.
    pub path: Option<std::path::PathBuf>,
    /// Name of the document, inferred from its path or generated.
    pub name: String,
    pub sprite: Sprite,
    observers: Vec<(ObserverHandle, std::sync::Arc<dyn DocumentObserver>)>,
}
impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("sprite", &self.sprite)
            .field("observers", &self.observers.len())
            .finish()
    }
}
impl Document {
    #[must_use]
    pub fn new(sprite: Sprite) -> Self {
        Self {
            id: DocumentID::default(),
            path: None,
            name: "New Document".into(),
            sprite,
            observers: Vec::new(),
        }
    }
    /// A document for a sprite read from `path`, named after the file.
    #[must_use]
    pub fn from_path(sprite: Sprite, path: std::path::PathBuf) -> Self {
        let mut document = Self::new(sprite);
        if let Some(stem) = path.file_stem() {
            document.name = stem.to_string_lossy().into_owned();
        }
        document.path = Some(path);
        document
    }
    #[must_use]
    pub fn id(&self) -> DocumentID {
        self.id
    }
    pub fn add_observer(&mut self, observer: std::sync::Arc<dyn DocumentObserver>) -> ObserverHandle {
        let handle = ObserverHandle(crate::id::ObjectID::default());
        self.observers.push((handle, observer));
        handle
    }
    /// Returns the observer, if it was registered.
    pub fn remove_observer(
        &mut self,
        handle: ObserverHandle,
    ) -> Option<std::sync::Arc<dyn DocumentObserver>> {
        let idx = self.observers.iter().position(|(h, _)| *h == handle)?;
        Some(self.observers.remove(idx).1)
    }
    /// Receive every change from now on over a channel.
    pub fn subscribe(&mut self) -> crossbeam::channel::Receiver<DocumentChange> {
        let (sender, receiver) = crossbeam::channel::unbounded();
        self.add_observer(std::sync::Arc::new(ChannelObserver::new(sender)));
        receiver
    }
    fn with_cel_event(&self, layer: LayerID, frame: Frame, f: impl Fn(&dyn DocumentObserver, &DocumentEvent<'_>)) {
        if self.observers.is_empty() {
            return;
        }
        let Some(layer) = self.sprite.layer(layer) else {
            log::warn!("no event for missing {layer}");
            return;
        };
        let Some(cel) = layer.image().and_then(|image| image.cel(frame)) else {
            log::warn!("no event for empty {frame} of {}", layer.name);
            return;
        };
        let event = DocumentEvent {
            sprite: &self.sprite,
            layer,
            cel,
        };
        for (_, observer) in &self.observers {
            f(observer.as_ref(), &event);
        }
    }
    /// Announce the cel now at `frame` of `layer`.
    pub(crate) fn notify_add_cel(&self, layer: LayerID, frame: Frame) {
        self.with_cel_event(layer, frame, |observer, event| observer.on_add_cel(event));
    }
    /// Announce the cel at `frame` of `layer` is about to be removed.
    pub(crate) fn notify_remove_cel(&self, layer: LayerID, frame: Frame) {
        self.with_cel_event(layer, frame, |observer, event| {
            observer.on_remove_cel(event);
        });
    }
    /// Merge `incoming` into this document's sprite, announcing every imported cel and then the merge itself.
    ///
    /// This is not undoable.
    pub fn merge_from(&mut self, incoming: &Sprite) -> crate::merge::MergeReport {
        let report = crate::merge::merge_with_report(&mut self.sprite, incoming, crate::clock::now());
        for &(layer, frame) in &report.imported {
            self.notify_add_cel(layer, frame);
        }
        if report.changed() {
            for (_, observer) in &self.observers {
                observer.on_sprite_merged(&self.sprite);
            }
        }
        report
    }
}
