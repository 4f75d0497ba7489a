//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline renders and tiles each page.
//!
//! Callers can forward events to a channel, a job record, or a terminal
//! progress bar without the library knowing how the host application
//! communicates.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2tiles::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct TileCounter {
//!     kept: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for TileCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, kept: usize, filtered: usize) {
//!         self.kept.fetch_add(kept, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} kept, {} blank", page_num, total_pages, kept, filtered);
//!     }
//! }
//!
//! let counter = Arc::new(TileCounter { kept: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Implementations must be `Send + Sync`: the conversion loop runs on a
/// blocking worker thread, not the caller's thread. All methods have default
/// no-op implementations so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page is rendered.
    ///
    /// # Arguments
    /// * `total_pages`: number of pages that will be processed
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is rendered.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: number of selected pages
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when every kept tile of a page has been written.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: number of selected pages
    /// * `kept`       : tiles written to disk
    /// * `filtered`   : tiles dropped as blank
    fn on_page_complete(&self, page_num: usize, total_pages: usize, kept: usize, filtered: usize) {
        let _ = (page_num, total_pages, kept, filtered);
    }

    /// Called when a page fails to render, tile or write.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: number of selected pages
    /// * `error`      : human-readable error description
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after all pages have been attempted.
    ///
    /// # Arguments
    /// * `total_pages`  : number of selected pages
    /// * `success_count`: pages tiled without error
    /// * `tile_count`   : tiles written across the document
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize, tile_count: usize) {
        let _ = (total_pages, success_count, tile_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        kept: AtomicUsize,
        filtered: AtomicUsize,
        errors: AtomicUsize,
        completed_tiles: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page: usize, _total: usize, kept: usize, filtered: usize) {
            self.kept.fetch_add(kept, Ordering::SeqCst);
            self.filtered.fetch_add(filtered, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _total: usize, _success: usize, tile_count: usize) {
            self.completed_tiles.store(tile_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 6, 2);
        cb.on_page_error(2, 5, "some error");
        cb.on_conversion_complete(5, 4, 24);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 5, 1);
        tracker.on_page_start(2, 2);
        tracker.on_page_error(2, 2, "render failed");
        tracker.on_conversion_complete(2, 1, 5);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.kept.load(Ordering::SeqCst), 5);
        assert_eq!(tracker.filtered.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_tiles.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(10);
        cb.on_page_complete(1, 10, 3, 3);
    }
}
