//! Upload boundary: validate the media type, decode off-thread, hand the
//! store an opaque image reference. Rejections never touch the document.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use image::{ImageFormat, ImageReader};
use thiserror::Error;

use crate::editor::SourceImage;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{name} is not an image file ({detected})")]
    UnsupportedMediaType { name: String, detected: String },
    #[error("could not decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} has no pixels ({width}x{height})")]
    EmptyImage {
        name: String,
        width: u32,
        height: u32,
    },
}

impl IngestError {
    /// Message shown to the user when an upload is rejected.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedMediaType { name, .. } => {
                format!("\"{name}\" is not an image. Please choose an image file.")
            }
            other => other.to_string(),
        }
    }
}

/// Raw bytes presumed to be an image, as dropped or selected by the user.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            bytes,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    fn extension(&self) -> Option<&str> {
        Path::new(&self.name)
            .extension()
            .and_then(|extension| extension.to_str())
    }
}

/// Resolves the decoder for `source` or rejects it before any decoding.
///
/// A declared media type must be `image/*`. Without one, the file extension
/// decides, and extensionless sources are sniffed from their leading bytes.
pub fn validate(source: &ImageSource) -> Result<ImageFormat, IngestError> {
    let unsupported = |detected: String| IngestError::UnsupportedMediaType {
        name: source.name.clone(),
        detected,
    };

    if let Some(media_type) = source.media_type.as_deref() {
        let media_type = media_type.trim().to_ascii_lowercase();
        if !media_type.starts_with("image/") {
            return Err(unsupported(media_type));
        }
        if let Some(format) = ImageFormat::from_mime_type(&media_type) {
            return Ok(format);
        }
        return sniff(source).ok_or_else(|| unsupported(media_type));
    }

    match source.extension() {
        Some(extension) => ImageFormat::from_extension(extension)
            .ok_or_else(|| unsupported(format!(".{} file", extension.to_ascii_lowercase()))),
        None => sniff(source).ok_or_else(|| unsupported("unrecognized content".to_string())),
    }
}

fn sniff(source: &ImageSource) -> Option<ImageFormat> {
    source
        .extension()
        .and_then(ImageFormat::from_extension)
        .or_else(|| image::guess_format(&source.bytes).ok())
}

/// Validates then decodes `source` into an RGBA image.
pub fn decode(source: &ImageSource) -> Result<SourceImage, IngestError> {
    let format = validate(source)?;
    let decoded = ImageReader::with_format(Cursor::new(&source.bytes), format)
        .decode()
        .map_err(|source_error| IngestError::Decode {
            name: source.name.clone(),
            source: source_error,
        })?;

    let pixels = decoded.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(IngestError::EmptyImage {
            name: source.name.clone(),
            width: pixels.width(),
            height: pixels.height(),
        });
    }
    Ok(SourceImage::new(pixels))
}

#[derive(Debug)]
pub struct DecodeOutcome {
    pub ticket: u64,
    pub name: String,
    pub result: Result<SourceImage, IngestError>,
}

#[derive(Debug)]
struct PendingDecode {
    ticket: u64,
    name: String,
    rx: mpsc::Receiver<Result<SourceImage, IngestError>>,
}

/// Off-thread decoder where the most recent submission wins: submitting a
/// new source drops the channel of any decode still in flight.
#[derive(Debug, Default)]
pub struct DecodeWorker {
    next_ticket: u64,
    pending: Option<PendingDecode>,
}

impl DecodeWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn submit(&mut self, source: ImageSource) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        if let Some(previous) = self.pending.take() {
            tracing::debug!(
                superseded = previous.ticket,
                name = %previous.name,
                "dropping in-flight decode"
            );
        }

        let (tx, rx) = mpsc::channel();
        let name = source.name.clone();
        std::thread::spawn(move || {
            let result = decode(&source);
            let _ = tx.send(result);
        });
        self.pending = Some(PendingDecode { ticket, name, rx });
        ticket
    }

    /// Non-blocking check for the latest submission.
    pub fn poll(&mut self) -> Option<DecodeOutcome> {
        let pending = self.pending.as_ref()?;
        match pending.rx.try_recv() {
            Ok(result) => self.finish(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                tracing::warn!(ticket = pending.ticket, "decode worker exited without a result");
                self.pending = None;
                None
            }
        }
    }

    /// Blocks until the latest submission finishes.
    pub fn wait(&mut self) -> Option<DecodeOutcome> {
        let pending = self.pending.as_ref()?;
        match pending.rx.recv() {
            Ok(result) => self.finish(result),
            Err(_) => {
                tracing::warn!(ticket = pending.ticket, "decode worker exited without a result");
                self.pending = None;
                None
            }
        }
    }

    fn finish(&mut self, result: Result<SourceImage, IngestError>) -> Option<DecodeOutcome> {
        let PendingDecode { ticket, name, .. } = self.pending.take()?;
        Some(DecodeOutcome {
            ticket,
            name,
            result,
        })
    }
}
