//! Regeneration pipeline: form snapshot in, published preview out.
//!
//! Every request gets the next sequence number and runs on its own task. A
//! finished render is published only if its sequence number is still the
//! latest issued; anything older is dropped on arrival. A failed render
//! leaves the previously published preview in place.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::{
    encoder::{EncodeError, EncodeOptions, Encoder},
    options::RenderOptions,
    payload::{self, FieldSet, PayloadType},
};

/// Both images for one (type, fields, options) triple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPreview {
    /// Sequence number of the request that produced it.
    pub seq: u64,
    pub payload_type: PayloadType,
    pub payload: String,
    pub options: RenderOptions,
    /// PNG as a `data:` URI.
    pub raster: String,
    /// SVG markup.
    pub vector: String,
}

/// Completion message sent back from a render task.
#[derive(Debug)]
pub enum PipelineEvent {
    Rendered(RenderedPreview),
    Failed { seq: u64, error: EncodeError },
}

/// What [`Pipeline::accept`] did with an event.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The preview is now the displayed one.
    Published { seq: u64 },
    /// A newer request was issued after this one; result dropped.
    Superseded { seq: u64, latest: u64 },
    /// The latest request failed; the previous preview stays.
    Failed { seq: u64, error: EncodeError },
}

/// Render one triple: format the payload, then run the raster and vector
/// encodes concurrently with identical options.
pub async fn regenerate(
    encoder: &dyn Encoder,
    seq: u64,
    fields: &FieldSet,
    options: &RenderOptions,
) -> Result<RenderedPreview, EncodeError> {
    let payload = payload::format(fields);
    let enc = EncodeOptions::from(options);
    let (raster, vector) = tokio::join!(
        encoder.encode_raster(&payload, &enc),
        encoder.encode_vector(&payload, &enc)
    );
    Ok(RenderedPreview {
        seq,
        payload_type: fields.payload_type(),
        payload,
        options: options.clone(),
        raster: raster?,
        vector: vector?,
    })
}

/// Issues render requests and decides which results get displayed.
pub struct Pipeline {
    encoder: Arc<dyn Encoder>,
    events_tx: mpsc::Sender<PipelineEvent>,
    latest_issued: u64,
    current: Option<RenderedPreview>,
}

impl Pipeline {
    pub fn new(encoder: Arc<dyn Encoder>, events_tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self {
            encoder,
            events_tx,
            latest_issued: 0,
            current: None,
        }
    }

    /// Start rendering a snapshot; returns its sequence number.
    pub fn issue(&mut self, fields: FieldSet, options: RenderOptions) -> u64 {
        self.latest_issued += 1;
        let seq = self.latest_issued;
        let encoder = Arc::clone(&self.encoder);
        let tx = self.events_tx.clone();
        tracing::debug!("render request {seq} issued ({})", fields.payload_type());

        tokio::spawn(async move {
            let ev = match regenerate(encoder.as_ref(), seq, &fields, &options).await {
                Ok(preview) => PipelineEvent::Rendered(preview),
                Err(error) => PipelineEvent::Failed { seq, error },
            };
            // The receiver is gone only during shutdown.
            let _ = tx.send(ev).await;
        });
        seq
    }

    /// Apply a completion event.
    pub fn accept(&mut self, ev: PipelineEvent) -> Outcome {
        let seq = match &ev {
            PipelineEvent::Rendered(p) => p.seq,
            PipelineEvent::Failed { seq, .. } => *seq,
        };
        if seq != self.latest_issued {
            tracing::debug!(
                "render result {seq} dropped, latest is {}",
                self.latest_issued
            );
            return Outcome::Superseded {
                seq,
                latest: self.latest_issued,
            };
        }
        match ev {
            PipelineEvent::Rendered(preview) => {
                tracing::info!(
                    "preview {seq} published ({}, {} px)",
                    preview.payload_type,
                    preview.options.size_px()
                );
                self.current = Some(preview);
                Outcome::Published { seq }
            }
            PipelineEvent::Failed { error, .. } => {
                tracing::error!("render {seq} failed, keeping previous preview: {error}");
                Outcome::Failed { seq, error }
            }
        }
    }

    /// The preview currently on display.
    pub fn current(&self) -> Option<&RenderedPreview> {
        self.current.as_ref()
    }

    pub fn latest_issued(&self) -> u64 {
        self.latest_issued
    }
}

/// Trailing-edge debounce: fires once `delay` has passed since the last touch.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    dirty_since: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            dirty_since: None,
        }
    }

    /// Record an input change, restarting the quiet period.
    pub fn touch(&mut self, now: Instant) {
        self.dirty_since = Some(now);
    }

    /// True exactly once per quiet period.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.dirty_since {
            Some(t) if now.saturating_duration_since(t) >= self.delay => {
                self.dirty_since = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.dirty_since.is_some()
    }
}
