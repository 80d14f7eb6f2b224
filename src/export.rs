//! Export of the displayed preview to PNG/SVG files.
//!
//! Exports never re-render: the bytes come from the preview that is on
//! screen, and the file is named after the type that preview was rendered
//! from. A successful export reports one conversion to the usage sink.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::Result;
use thiserror::Error;

use crate::{
    encoder::decode_png_data_uri,
    payload::PayloadType,
    pipeline::RenderedPreview,
    usage::{ConversionEvent, UsageSink},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Svg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("nothing to export yet")]
    NoPreview,
    #[error("preview raster is not a PNG data URI")]
    MalformedRaster,
}

/// File contents ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// `qrcode-<type>.<ext>`
pub fn file_name(payload_type: PayloadType, format: ExportFormat) -> String {
    format!("qrcode-{}.{}", payload_type.as_str(), format.extension())
}

/// PNG bytes of the displayed preview.
pub fn export_raster(preview: &RenderedPreview) -> Result<ExportedFile, ExportError> {
    let bytes = decode_png_data_uri(&preview.raster).ok_or(ExportError::MalformedRaster)?;
    Ok(ExportedFile {
        file_name: file_name(preview.payload_type, ExportFormat::Png),
        bytes,
    })
}

/// SVG markup of the displayed preview.
pub fn export_vector(preview: &RenderedPreview) -> ExportedFile {
    ExportedFile {
        file_name: file_name(preview.payload_type, ExportFormat::Svg),
        bytes: preview.vector.clone().into_bytes(),
    }
}

/// Writes exported files and reports conversions.
pub struct Exporter {
    output_dir: PathBuf,
    sink: Arc<dyn UsageSink>,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>, sink: Arc<dyn UsageSink>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sink,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the displayed preview in `format`; returns the written path.
    pub fn export(
        &self,
        preview: Option<&RenderedPreview>,
        format: ExportFormat,
    ) -> Result<PathBuf> {
        let started = Instant::now();
        let preview = preview.ok_or(ExportError::NoPreview)?;
        let file = match format {
            ExportFormat::Png => export_raster(preview)?,
            ExportFormat::Svg => export_vector(preview),
        };

        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(&file.file_name);
        fs::write(&path, &file.bytes)?;
        tracing::info!(
            "exported preview {} to {} ({} bytes)",
            preview.seq,
            path.display(),
            file.bytes.len()
        );

        self.sink.conversion(ConversionEvent {
            payload_type: preview.payload_type,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            file_size: file.bytes.len() as u64,
        });
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encoder::{PNG_DATA_URI_PREFIX, QrEncoder},
        options::RenderOptions,
        payload::{FieldSet, PhoneFields},
        pipeline::{Outcome, Pipeline},
        usage::RecordingSink,
    };
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use tokio::sync::mpsc;

    fn preview(size: u32) -> RenderedPreview {
        RenderedPreview {
            seq: 3,
            payload_type: PayloadType::Sms,
            payload: "sms:123".into(),
            options: RenderOptions::new(size, "#000000", "#FFFFFF"),
            raster: format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(b"\x89PNG fake")),
            vector: format!("<svg width=\"{size}\"></svg>\n"),
        }
    }

    #[test]
    fn files_are_named_after_rendered_type() {
        assert_eq!(file_name(PayloadType::Vcard, ExportFormat::Png), "qrcode-vcard.png");
        let mut p = preview(256);
        p.payload_type = PayloadType::Email;
        assert_eq!(export_vector(&p).file_name, "qrcode-email.svg");
    }

    #[test]
    fn raster_export_decodes_data_uri() {
        let file = export_raster(&preview(256)).unwrap();
        assert_eq!(file.bytes, b"\x89PNG fake");
    }

    #[test]
    fn malformed_raster_is_an_error() {
        let mut p = preview(256);
        p.raster = "not a data uri".into();
        assert_eq!(
            export_raster(&p),
            Err(ExportError::MalformedRaster)
        );
    }

    #[test]
    fn export_writes_displayed_preview_and_reports_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let exporter = Exporter::new(dir.path().join("out"), sink.clone());

        let shown = preview(448);
        let path = exporter
            .export(Some(&shown), ExportFormat::Svg)
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "qrcode-sms.svg");
        assert_eq!(fs::read_to_string(&path).unwrap(), "<svg width=\"448\"></svg>\n");

        let conversions = sink.conversions.lock().unwrap();
        assert_eq!(conversions.len(), 1);
        assert_eq!(conversions[0].payload_type, PayloadType::Sms);
        assert_eq!(conversions[0].file_size, shown.vector.len() as u64);
    }

    #[test]
    fn nothing_exported_without_preview() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let exporter = Exporter::new(dir.path(), sink.clone());

        let err = exporter
            .export(None, ExportFormat::Png)
            .unwrap_err();
        assert_eq!(err.downcast_ref::<ExportError>(), Some(&ExportError::NoPreview));
        assert!(sink.conversions.lock().unwrap().is_empty());
        assert!(!dir.path().join("qrcode-url.png").exists());
    }

    #[tokio::test]
    async fn export_carries_options_of_latest_published_preview() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut pipeline = Pipeline::new(Arc::new(QrEncoder), tx);
        let phone = FieldSet::Phone(PhoneFields {
            number: "123".into(),
        });

        pipeline.issue(phone.clone(), RenderOptions::default());
        let ev = rx.recv().await.unwrap();
        assert_eq!(pipeline.accept(ev), Outcome::Published { seq: 1 });

        // A request that finishes but is overtaken before it is applied.
        let stale = pipeline.issue(phone.clone(), RenderOptions::new(128, "#000000", "#FFFFFF"));
        let stale_ev = rx.recv().await.unwrap();
        let latest = pipeline.issue(phone, RenderOptions::new(448, "#112233", "#FFFFFF"));
        let ev = rx.recv().await.unwrap();
        assert_eq!(pipeline.accept(ev), Outcome::Published { seq: latest });
        assert_eq!(
            pipeline.accept(stale_ev),
            Outcome::Superseded { seq: stale, latest }
        );

        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path(), Arc::new(RecordingSink::default()));
        let path = exporter
            .export(pipeline.current(), ExportFormat::Svg)
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "qrcode-phone.svg");
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains(r#"width="448""#));
        assert!(svg.contains(r##"stroke="#112233""##));

        let png = exporter
            .export(pipeline.current(), ExportFormat::Png)
            .unwrap();
        let img = image::load_from_memory(&fs::read(png).unwrap()).unwrap();
        assert_eq!(img.width(), 448);
    }
}
