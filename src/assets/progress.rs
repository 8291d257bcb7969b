//! Loading manager shared by the decode workers
//!
//! Counts finished items over registered items. Both assets are registered
//! before any worker starts, so observers never see the fraction reach 1.0
//! early.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::debug;

/// Notification raised by [`LoadProgress`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Progress {
        url: String,
        loaded: usize,
        total: usize,
    },
    /// Every registered item finished successfully
    Loaded,
    Error {
        url: String,
    },
}

type Observer = Box<dyn Fn(ProgressEvent) + Send + Sync>;

pub struct LoadProgress {
    items_loaded: AtomicUsize,
    items_total: AtomicUsize,
    failed: AtomicBool,
    observer: Observer,
}

impl LoadProgress {
    pub fn new(observer: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        Self {
            items_loaded: AtomicUsize::new(0),
            items_total: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            observer: Box::new(observer),
        }
    }

    /// Progress without an observer
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    /// Registers one more item to wait for
    pub fn item_start(&self, url: &str) {
        let total = self.items_total.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Loading {} ({} item(s) registered)", url, total);
    }

    pub fn item_end(&self, url: &str) {
        let loaded = self.items_loaded.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.items_total.load(Ordering::SeqCst);
        debug!("Loaded {} ({}/{})", url, loaded, total);

        (self.observer)(ProgressEvent::Progress {
            url: url.to_string(),
            loaded,
            total,
        });

        if loaded == total && !self.failed.load(Ordering::SeqCst) {
            (self.observer)(ProgressEvent::Loaded);
        }
    }

    /// Marks an item as failed; it never counts as loaded
    pub fn item_error(&self, url: &str) {
        self.failed.store(true, Ordering::SeqCst);
        debug!("Failed {}", url);
        (self.observer)(ProgressEvent::Error {
            url: url.to_string(),
        });
    }

    pub fn items_loaded(&self) -> usize {
        self.items_loaded.load(Ordering::SeqCst)
    }

    pub fn items_total(&self) -> usize {
        self.items_total.load(Ordering::SeqCst)
    }

    /// `items_loaded / items_total`, or 0.0 before anything is registered
    pub fn fraction(&self) -> f32 {
        let total = self.items_total();
        if total == 0 {
            return 0.0;
        }
        self.items_loaded() as f32 / total as f32
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording() -> (LoadProgress, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let progress = LoadProgress::new(move |event| sink.lock().unwrap().push(event));
        (progress, events)
    }

    #[test]
    fn test_fraction_reaches_one_after_both_items() {
        let (progress, events) = recording();
        progress.item_start("env.hdr");
        progress.item_start("bike.glb");
        assert_eq!(progress.fraction(), 0.0);

        progress.item_end("bike.glb");
        assert_eq!(progress.fraction(), 0.5);
        assert!(!events.lock().unwrap().contains(&ProgressEvent::Loaded));

        progress.item_end("env.hdr");
        assert_eq!(progress.fraction(), 1.0);

        let events = events.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &[
                ProgressEvent::Progress {
                    url: "bike.glb".into(),
                    loaded: 1,
                    total: 2
                },
                ProgressEvent::Progress {
                    url: "env.hdr".into(),
                    loaded: 2,
                    total: 2
                },
                ProgressEvent::Loaded,
            ]
        );
    }

    #[test]
    fn test_failure_blocks_loaded() {
        let (progress, events) = recording();
        progress.item_start("env.hdr");
        progress.item_start("bike.glb");
        progress.item_error("env.hdr");
        progress.item_end("bike.glb");

        assert!(progress.has_failed());
        assert!(progress.fraction() < 1.0);
        let events = events.lock().unwrap();
        assert!(events.contains(&ProgressEvent::Error {
            url: "env.hdr".into()
        }));
        assert!(!events.contains(&ProgressEvent::Loaded));
    }

    #[test]
    fn test_fraction_is_monotonic() {
        let progress = LoadProgress::silent();
        progress.item_start("a");
        progress.item_start("b");
        progress.item_start("c");
        let mut last = progress.fraction();
        for url in ["a", "b", "c"] {
            progress.item_end(url);
            let now = progress.fraction();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 1.0);
    }
}
