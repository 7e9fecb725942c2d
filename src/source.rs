//! # Emotion Sources
//!
//! An [`EmotionSource`] answers one question per loop iteration: what is the
//! current mood? Two implementations live here:
//!
//! - [`RandomCycleSource`]: the timer-driven placeholder. Every `interval` it
//!   draws a fresh label uniformly from its label set. The draw may land on
//!   the label it already has; that is intentional and the label simply
//!   stays put.
//! - [`ClassifierSource`]: glue for a real classifier. It pulls one frame
//!   from a [`FrameSource`] per call and hands it to a [`FrameClassifier`].
//!
//! Both log `label changed to X` once per actual change and stay quiet on
//! unchanged polls.

use crate::emotion::EmotionLabel;
use log::{debug, info};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, Instant};

/// Default refresh cadence of the random source.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// Produces the label that is current at `now`.
pub trait EmotionSource {
    fn current_label(&mut self, now: Instant) -> EmotionLabel;
}

impl<E: EmotionSource + ?Sized> EmotionSource for Box<E> {
    fn current_label(&mut self, now: Instant) -> EmotionLabel {
        (**self).current_label(now)
    }
}

/// Placeholder source that re-rolls its label every `interval`.
#[derive(Debug)]
pub struct RandomCycleSource<R: Rng = ThreadRng> {
    labels: Vec<EmotionLabel>,
    interval: Duration,
    last_change: Instant,
    label: EmotionLabel,
    rng: R,
}

impl RandomCycleSource<ThreadRng> {
    /// Create a source starting at `neutral`, with its clock starting at `start`.
    pub fn new(labels: &[EmotionLabel], interval: Duration, start: Instant) -> Self {
        Self::with_rng(labels, interval, start, rand::thread_rng())
    }
}

impl<R: Rng> RandomCycleSource<R> {
    pub fn with_rng(labels: &[EmotionLabel], interval: Duration, start: Instant, rng: R) -> Self {
        let labels = if labels.is_empty() {
            EmotionLabel::BASIC.to_vec()
        } else {
            labels.to_vec()
        };
        Self {
            labels,
            interval,
            last_change: start,
            label: EmotionLabel::Neutral,
            rng,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the label was last re-rolled.
    pub fn last_change(&self) -> Instant {
        self.last_change
    }

    pub fn label(&self) -> EmotionLabel {
        self.label
    }
}

impl<R: Rng> EmotionSource for RandomCycleSource<R> {
    fn current_label(&mut self, now: Instant) -> EmotionLabel {
        // `saturating_duration_since` so a stale `now` never panics.
        if now.saturating_duration_since(self.last_change) > self.interval {
            let picked = self
                .labels
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(EmotionLabel::Neutral);
            self.last_change = now;

            if picked != self.label {
                info!("Emotion label changed to {picked}");
                self.label = picked;
            } else {
                debug!("Emotion re-rolled, staying at {picked}");
            }
        }
        self.label
    }
}

/// A captured video frame (packed 8-bit pixels, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Camera capability consumed by [`ClassifierSource`].
pub trait FrameSource {
    /// Next frame, or `None` when the device produced nothing.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Give the device back. Called once, on drop of the owning source.
    fn release(&mut self);
}

/// Turns a frame into a label. `None` means no face was found.
pub trait FrameClassifier {
    fn classify(&mut self, frame: &Frame) -> Option<EmotionLabel>;
}

/// Emotion source backed by a camera and a synchronous classifier.
///
/// The label is sticky: frames without a face (or missing frames) keep the
/// previous label.
pub struct ClassifierSource<F: FrameSource, C: FrameClassifier> {
    frames: F,
    classifier: C,
    label: EmotionLabel,
}

impl<F: FrameSource, C: FrameClassifier> ClassifierSource<F, C> {
    pub fn new(frames: F, classifier: C) -> Self {
        Self {
            frames,
            classifier,
            label: EmotionLabel::Neutral,
        }
    }
}

impl<F: FrameSource, C: FrameClassifier> EmotionSource for ClassifierSource<F, C> {
    fn current_label(&mut self, _now: Instant) -> EmotionLabel {
        let Some(frame) = self.frames.next_frame() else {
            debug!("No frame captured, keeping {}", self.label);
            return self.label;
        };

        if let Some(detected) = self.classifier.classify(&frame) {
            if detected != self.label {
                info!("Emotion label changed to {detected}");
                self.label = detected;
            }
        }
        self.label
    }
}

impl<F: FrameSource, C: FrameClassifier> Drop for ClassifierSource<F, C> {
    fn drop(&mut self) {
        self.frames.release();
        debug!("Frame source released");
    }
}
