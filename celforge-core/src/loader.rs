//! # Background loading
//!
//! Decoding a document can be slow, so it happens on a worker thread building a [`Document`] nobody else can see
//! yet. The worker reports progress and polls for cancellation through a [`LoadContext`]. Cancellation is
//! cooperative: the decoder notices whenever it next checks, and whatever it built is thrown away.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::state::{document::Document, sprite::Sprite};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to decode document: {0}")]
    Decode(anyhow::Error),
    #[error("load worker panicked")]
    WorkerPanicked,
}

pub enum LoadOutcome {
    Loaded(Document),
    Cancelled,
}
impl std::fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(document) => write!(f, "Loaded({:?})", document.name),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// The worker's side of a [`LoadJob`].
pub struct LoadContext {
    progress: crossbeam::channel::Sender<f32>,
    cancelled: Arc<AtomicBool>,
}
impl LoadContext {
    /// Report progress, from zero to one. Dropped if the job isn't keeping up with reading them.
    pub fn report(&self, progress: f32) {
        let _ = self.progress.try_send(progress.clamp(0.0, 1.0));
    }
    /// Whether the job has been cancelled. Decoders should check this often and bail out early if so.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// A document being decoded on a worker thread.
pub struct LoadJob {
    worker: std::thread::JoinHandle<anyhow::Result<Sprite>>,
    progress: crossbeam::channel::Receiver<f32>,
    latest: f32,
    cancelled: Arc<AtomicBool>,
}
impl LoadJob {
    /// Run `decode` on a new worker, configured by the global [`Settings`](crate::settings::Settings).
    pub fn spawn<F>(decode: F) -> std::io::Result<Self>
    where
        F: FnOnce(&LoadContext) -> anyhow::Result<Sprite> + Send + 'static,
    {
        Self::spawn_with_settings(&crate::settings::Settings::get().loader, decode)
    }
    pub fn spawn_with_settings<F>(
        settings: &crate::settings::LoaderSettings,
        decode: F,
    ) -> std::io::Result<Self>
    where
        F: FnOnce(&LoadContext) -> anyhow::Result<Sprite> + Send + 'static,
    {
        // A zero capacity channel would be a rendezvous, which `try_send` never succeeds on.
        let (send, progress) = crossbeam::channel::bounded(settings.progress_capacity.max(1));
        let cancelled = Arc::new(AtomicBool::new(false));
        let context = LoadContext {
            progress: send,
            cancelled: cancelled.clone(),
        };
        let worker = std::thread::Builder::new()
            .name(settings.thread_name.clone())
            .spawn(move || {
                log::debug!("Load started");
                let result = decode(&context);
                if context.is_cancelled() {
                    log::debug!("Load noticed cancellation");
                }
                result
            })?;
        Ok(Self {
            worker,
            progress,
            latest: 0.0,
            cancelled,
        })
    }
    /// Ask the worker to stop. It will do so next time it checks.
    pub fn cancel(&self) {
        log::info!("Cancelling load");
        self.cancelled.store(true, Ordering::Relaxed);
    }
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
    /// The most recently reported progress.
    pub fn progress(&mut self) -> f32 {
        if let Some(latest) = self.progress.try_iter().last() {
            self.latest = latest;
        }
        self.latest
    }
    /// Whether the worker has stopped, so that [`Self::wait`] won't block.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }
    /// Block until the worker finishes.
    ///
    /// A job cancelled before it finished is reported as cancelled regardless of what the decoder returned,
    /// and anything it built is dropped.
    pub fn wait(self) -> Result<LoadOutcome, LoadError> {
        let result = self.worker.join().map_err(|_| LoadError::WorkerPanicked)?;
        if self.cancelled.load(Ordering::Relaxed) {
            log::info!("Load cancelled, discarding");
            return Ok(LoadOutcome::Cancelled);
        }
        match result {
            Ok(sprite) => {
                log::info!(
                    "Loaded {}x{} sprite, {} frames",
                    sprite.width(),
                    sprite.height(),
                    sprite.frames()
                );
                Ok(LoadOutcome::Loaded(Document::new(sprite)))
            }
            Err(err) => {
                log::error!("Load failed: {err:#}");
                Err(LoadError::Decode(err))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{image::PixelFormat, settings::LoaderSettings};

    #[test]
    fn loads() {
        let job = LoadJob::spawn(|context| {
            context.report(0.5);
            Ok(Sprite::new(PixelFormat::Rgb, 8, 4))
        })
        .unwrap();
        match job.wait().unwrap() {
            LoadOutcome::Loaded(document) => assert_eq!(document.sprite.width(), 8),
            LoadOutcome::Cancelled => panic!("not cancelled"),
        }
    }
    #[test]
    fn reports_latest_progress() {
        let (go, wait) = crossbeam::channel::bounded::<()>(0);
        let mut job = LoadJob::spawn_with_settings(&LoaderSettings::default(), move |context| {
            context.report(0.25);
            context.report(2.0);
            let _ = wait.recv();
            Ok(Sprite::new(PixelFormat::Rgb, 1, 1))
        })
        .unwrap();
        // Progress is sent before the worker blocks, so once it's blocked both are in.
        while job.progress.len() < 2 {
            std::thread::yield_now();
        }
        // Clamped.
        assert!((job.progress() - 1.0).abs() < f32::EPSILON);
        assert!(!job.is_finished());
        go.send(()).unwrap();
        assert!(matches!(job.wait(), Ok(LoadOutcome::Loaded(_))));
    }
    #[test]
    fn full_progress_channel_drops() {
        let settings = LoaderSettings {
            progress_capacity: 1,
            ..LoaderSettings::default()
        };
        let mut job = LoadJob::spawn_with_settings(&settings, |context| {
            for i in 0..10u8 {
                context.report(f32::from(i) / 10.0);
            }
            Ok(Sprite::new(PixelFormat::Rgb, 1, 1))
        })
        .unwrap();
        while !job.is_finished() {
            std::thread::yield_now();
        }
        // Only the first made it.
        assert!(job.progress().abs() < f32::EPSILON);
        assert!(job.wait().is_ok());
    }
    #[test]
    fn cancelled_discards() {
        let (started, on_start) = crossbeam::channel::bounded::<()>(1);
        let job = LoadJob::spawn(move |context| {
            let _ = started.send(());
            while !context.is_cancelled() {
                std::thread::yield_now();
            }
            // Built something anyway.
            Ok(Sprite::new(PixelFormat::Rgb, 1, 1))
        })
        .unwrap();
        on_start.recv().unwrap();
        job.cancel();
        assert!(job.is_cancelled());
        assert!(matches!(job.wait(), Ok(LoadOutcome::Cancelled)));
    }
    #[test]
    fn decode_errors_propagate() {
        let job = LoadJob::spawn(|_| anyhow::bail!("truncated")).unwrap();
        match job.wait() {
            Err(LoadError::Decode(err)) => assert_eq!(err.to_string(), "truncated"),
            other => panic!("unexpected {other:?}"),
        }
    }
    #[test]
    fn panics_are_caught() {
        let job = LoadJob::spawn(|_| panic!("bad decoder")).unwrap();
        assert!(matches!(job.wait(), Err(LoadError::WorkerPanicked)));
    }
    #[test]
    fn thread_is_named() {
        let settings = LoaderSettings {
            thread_name: "test loader".to_owned(),
            ..LoaderSettings::default()
        };
        let job = LoadJob::spawn_with_settings(&settings, |_| {
            assert_eq!(std::thread::current().name(), Some("test loader"));
            Ok(Sprite::new(PixelFormat::Rgb, 1, 1))
        })
        .unwrap();
        assert!(job.wait().is_ok());
    }
    #[test]
    fn spawn_uses_global_settings() {
        let expected = crate::settings::Settings::get().loader.thread_name.clone();
        let job = LoadJob::spawn(move |_| {
            assert_eq!(std::thread::current().name(), Some(expected.as_str()));
            Ok(Sprite::new(PixelFormat::Rgb, 1, 1))
        })
        .unwrap();
        assert!(job.wait().is_ok());
    }
}
