// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

pub mod session;

use bytes::Bytes;
use thiserror::Error;

use crate::format::FormatError;
use crate::format::HostVideoFormat;
use crate::format::ImageDescriptor;
use crate::format::VideoInfo;
use crate::format::MAX_HEIGHT;
use crate::format::MAX_WIDTH;
use crate::format::MIN_HEIGHT;
use crate::format::MIN_WIDTH;
use crate::format::SUPPORTED_FORMATS;
use crate::params::BaseCodec;
use crate::params::ParamError;
use crate::params::ParamValue;
use crate::params::PriorityMode;
use crate::params::Settings;
use crate::params::TransformType;
use crate::Fraction;
use crate::PlaneLayout;
use crate::Resolution;

/// Parameters an engine instance is built with. Captured from [`Settings`] when the session is
/// configured and never modified afterwards; a parameter change only reaches the engine through a
/// new configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingConfiguration {
    /// Quantization parameter of the enhancement layer
    pub qp: u32,
    /// Quantization parameter of the base layer
    pub base_qp: u32,
    /// Enhancement step widths, for LOQ1 and LOQ2 respectively
    pub step_widths: [u32; 2],
    pub base_codec: BaseCodec,
    pub transform_type: TransformType,
    pub priority_mode: PriorityMode,
    pub temporal_enabled: bool,
    pub enhancement_enabled: bool,
    pub base_depth: u32,
    pub enhancement_depth: u32,
    /// Stream framerate in frames per second
    pub fps: u32,
    /// Target bitrate in kbps
    pub bitrate: u32,
    /// Quality target between 0.0 and 1.0
    pub quality: f32,
    pub enhancement_layers: u32,
    pub two_pass: bool,
}

impl From<&Settings> for EncodingConfiguration {
    fn from(settings: &Settings) -> Self {
        // The signed parameters have strictly positive ranges.
        Self {
            qp: settings.qp,
            base_qp: settings.base_qp,
            step_widths: [settings.step_width_loq1, settings.step_width_loq2],
            base_codec: settings.base_encoder,
            transform_type: settings.transform_type,
            priority_mode: settings.priority_mode,
            temporal_enabled: settings.temporal_enabled,
            enhancement_enabled: settings.enhancement_enabled,
            base_depth: settings.base_depth,
            enhancement_depth: settings.enhancement_depth,
            fps: settings.fps,
            bitrate: settings.bitrate.unsigned_abs(),
            quality: settings.quality,
            enhancement_layers: settings.enhancement_layers.unsigned_abs(),
            two_pass: settings.two_pass,
        }
    }
}

impl Default for EncodingConfiguration {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

/// Raw frame handed over by the host.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Presentation timestamp
    pub timestamp: u64,
    pub duration: Option<u64>,
    /// Read-only buffer holding all the planes
    pub data: Bytes,
    /// Position of each plane within [`Self::data`]
    pub layout: Vec<PlaneLayout>,
}

impl RawFrame {
    /// Creates a frame whose planes are packed one after the other, as described by
    /// [`ImageDescriptor::packed_layout`].
    pub fn packed(descriptor: &ImageDescriptor, timestamp: u64, data: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            duration: None,
            data: data.into(),
            layout: descriptor.packed_layout(),
        }
    }
}

/// Engine's output for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResult {
    pub payload: Vec<u8>,
    pub is_keyframe: bool,
}

/// Result an engine still held when it was flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainedResult {
    /// Presentation timestamp of the frame the result belongs to
    pub timestamp: u64,
    pub result: EncodedResult,
}

/// Buffer returned to the host for one input frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    pub data: Bytes,
    /// Presentation timestamp, identical to the input frame's
    pub pts: u64,
    /// Decode timestamp. The enhancement stream is never reordered so it always equals `pts`.
    pub dts: u64,
    pub duration: Option<u64>,
    pub keyframe: bool,
}

/// Format of the produced stream, published once the session is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub media_type: &'static str,
    pub resolution: Resolution,
    pub framerate: Fraction,
}

/// Static description of the element, as registered with the host.
#[derive(Debug, Clone, Copy)]
pub struct ElementMetadata {
    /// Name the host loads the element by
    pub name: &'static str,
    pub long_name: &'static str,
    pub classification: &'static str,
    pub description: &'static str,
    /// Raw formats accepted on the sink pad
    pub sink_formats: &'static [HostVideoFormat],
    pub width_range: (u32, u32),
    pub height_range: (u32, u32),
    /// Media type of the source pad
    pub src_media_type: &'static str,
}

pub const ELEMENT_METADATA: ElementMetadata = ElementMetadata {
    name: "lcevcenc",
    long_name: "LCEVC Encoder",
    classification: "Codec/Encoder/Video",
    description: "Encodes video using LCEVC (Low Complexity Enhancement Video Coding)",
    sink_formats: &SUPPORTED_FORMATS,
    width_range: (MIN_WIDTH, MAX_WIDTH),
    height_range: (MIN_HEIGHT, MAX_HEIGHT),
    src_media_type: "video/x-lcevc",
};

impl ElementMetadata {
    /// Whether `info` can be negotiated on the sink pad.
    pub fn accepts(&self, info: &VideoInfo) -> bool {
        self.sink_formats.contains(&info.format)
            && (self.width_range.0..=self.width_range.1).contains(&info.resolution.width)
            && (self.height_range.0..=self.height_range.1).contains(&info.resolution.height)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported format")]
    UnsupportedFormat,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    /// The engine cannot process any further frame and must be recreated.
    #[error("engine is no longer usable: {0}")]
    Unusable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(#[from] FormatError),
    #[error("failed to create the encoding engine: {0}")]
    EngineInitFailed(#[source] EngineError),
    #[error("no encoding session, the element is not configured")]
    NotInitialized,
    #[error("failed to encode frame: {0}")]
    EncodeFailed(#[source] EngineError),
    #[error("failed to allocate output buffer")]
    AllocationFailed,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// An instance of an external LCEVC engine, bound to one image description and configuration.
/// Dropping it releases the engine.
pub trait EncoderEngine {
    /// Encodes `frame`. Blocks until the engine produced the result for that frame.
    fn encode(&mut self, frame: &RawFrame) -> EngineResult<EncodedResult>;

    /// Returns the results the engine still holds. Engines producing one result per
    /// [`encode`] call hold nothing.
    ///
    /// [`encode`]: EncoderEngine::encode
    fn flush(&mut self) -> EngineResult<Vec<DrainedResult>> {
        Ok(Vec::new())
    }
}

/// Constructs engines for a session.
pub trait EngineFactory {
    /// Name of the engine, for logging.
    fn name(&self) -> &'static str;

    /// Creates a new engine for images of `descriptor` encoded with `config`.
    fn create_engine(
        &mut self,
        descriptor: &ImageDescriptor,
        config: &EncodingConfiguration,
    ) -> EngineResult<Box<dyn EncoderEngine>>;
}

/// Lifecycle interface the host drives the element through.
///
/// Calls must be serialized by the host. Every method takes `&mut self` and nothing is locked
/// internally; independent streams use independent elements.
pub trait EncoderElement {
    /// Prepares the element for a new stream and resets its statistics. No engine is created
    /// until the format is known.
    fn start(&mut self) -> SessionResult<()>;

    /// Binds the element to the negotiated input format, replacing any previous engine.
    fn configure(&mut self, info: &VideoInfo) -> SessionResult<OutputFormat>;

    /// Encodes one frame and returns its output buffer.
    fn submit_frame(&mut self, frame: RawFrame) -> SessionResult<OutputBuffer>;

    /// Returns the output of frames the engine still holds.
    fn flush(&mut self) -> SessionResult<Vec<OutputBuffer>>;

    /// Releases the engine and the negotiated format. Calling it on a stopped element is a no-op.
    fn stop(&mut self);

    fn set_property(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError>;

    fn property(&self, name: &str) -> Result<ParamValue, ParamError>;
}

/// Feeds all of `frames` to `element`, passing each output buffer to `consumer`, then flushes
/// the element. The element must already be configured.
pub fn encode_loop<E, I, C>(element: &mut E, frames: I, mut consumer: C) -> SessionResult<()>
where
    E: EncoderElement + ?Sized,
    I: IntoIterator<Item = RawFrame>,
    C: FnMut(OutputBuffer),
{
    for frame in frames {
        let output = element.submit_frame(frame)?;
        consumer(output);
    }

    for output in element.flush()? {
        consumer(output);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fills a packed 8-bit frame of `descriptor` with a gradient that moves with `t`.
    pub fn gen_test_frame(descriptor: &ImageDescriptor, t: u8) -> Vec<u8> {
        let mut data = vec![0u8; descriptor.packed_size()];
        let layout = descriptor.packed_layout();
        let bytes_per_sample = descriptor.format().bytes_per_sample();

        for (plane, plane_layout) in layout.iter().enumerate() {
            let rows = descriptor.plane_resolution(plane).height as usize;
            let row_size = descriptor.row_size(plane);
            for row in 0..rows {
                let start = plane_layout.offset + row * plane_layout.stride;
                for (col, sample) in data[start..start + row_size]
                    .chunks_exact_mut(bytes_per_sample)
                    .enumerate()
                {
                    // Keep 10-bit samples in range by only filling the low byte.
                    sample[0] = (row + col) as u8 ^ t;
                }
            }
        }

        data
    }

    #[test]
    fn configuration_from_settings() {
        let mut settings = Settings::default();
        settings.set("step-width-loq1", 1000u32).unwrap();
        settings.set("step-width-loq2", 300u32).unwrap();
        settings.set("enhancement-layers", 4i32).unwrap();
        settings.set("base-encoder", "vvc").unwrap();

        let config = EncodingConfiguration::from(&settings);
        assert_eq!(config.step_widths, [1000, 300]);
        assert_eq!(config.enhancement_layers, 4);
        assert_eq!(config.base_codec, BaseCodec::Vvc);
        assert_eq!(config.qp, 28);
        assert_eq!(config.bitrate, 2000);
    }

    #[test]
    fn element_accepts_sink_caps() {
        let ok = VideoInfo::new(HostVideoFormat::Y444_10LE, 7680, 4320, Fraction::new(60, 1));
        assert!(ELEMENT_METADATA.accepts(&ok));

        let rgb = VideoInfo::new(HostVideoFormat::RGB, 640, 480, Fraction::new(30, 1));
        assert!(!ELEMENT_METADATA.accepts(&rgb));

        let tiny = VideoInfo::new(HostVideoFormat::I420, 8, 8, Fraction::new(30, 1));
        assert!(!ELEMENT_METADATA.accepts(&tiny));
    }
}
