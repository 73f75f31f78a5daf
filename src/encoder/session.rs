// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Binding of a negotiated format to an engine instance.
//!
//! [`SessionManager`] owns at most one engine at a time. The engine is created by `configure`
//! once the input format is known, replaced by every subsequent `configure` and released by
//! `stop`. The previous engine is always dropped before the next one is created.

use std::time::Duration;
use std::time::Instant;

use bytes::Bytes;

use crate::encoder::EncoderElement;
use crate::encoder::EncoderEngine;
use crate::encoder::EncodingConfiguration;
use crate::encoder::EngineError;
use crate::encoder::EngineFactory;
use crate::encoder::OutputBuffer;
use crate::encoder::OutputFormat;
use crate::encoder::RawFrame;
use crate::encoder::SessionError;
use crate::encoder::SessionResult;
use crate::encoder::ELEMENT_METADATA;
use crate::format::ImageDescriptor;
use crate::format::VideoInfo;
use crate::params::ParamError;
use crate::params::ParamValue;
use crate::params::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started, or stopped.
    Idle,
    /// Started, waiting for a format.
    Started,
    /// An engine is ready, no frame was submitted yet.
    Configured,
    /// At least one frame went through the engine.
    Running,
}

/// Statistics accumulated since the last `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_processed: u64,
    /// Time spent in the engine and copying its output
    pub processing_time: Duration,
}

/// A live engine and everything it was built from.
struct EncoderSession {
    engine: Box<dyn EncoderEngine>,
    descriptor: ImageDescriptor,
    config: EncodingConfiguration,
    input: VideoInfo,
}

/// Copies `payload` into a freshly allocated output buffer.
fn output_buffer(
    payload: &[u8],
    timestamp: u64,
    duration: Option<u64>,
    keyframe: bool,
) -> SessionResult<OutputBuffer> {
    let mut data = Vec::new();
    data.try_reserve_exact(payload.len())
        .map_err(|_| SessionError::AllocationFailed)?;
    data.extend_from_slice(payload);

    Ok(OutputBuffer {
        data: Bytes::from(data),
        pts: timestamp,
        dts: timestamp,
        duration,
        keyframe,
    })
}

pub struct SessionManager<F>
where
    F: EngineFactory,
{
    /// Instance name, prefixed to every log record of this session
    name: String,

    /// Creates the engines
    factory: F,

    /// Current parameters. Only read when configuring.
    settings: Settings,

    state: SessionState,

    /// Live engine, present in the `Configured` and `Running` states only
    session: Option<EncoderSession>,

    stats: SessionStats,
}

impl<F> SessionManager<F>
where
    F: EngineFactory,
{
    /// Creates an idle element named `name` that builds its engines with `factory`.
    pub fn new(name: impl Into<String>, factory: F) -> Self {
        Self {
            name: name.into(),
            factory,
            settings: Default::default(),
            state: SessionState::Idle,
            session: None,
            stats: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether an engine is currently alive.
    pub fn has_engine(&self) -> bool {
        self.session.is_some()
    }

    /// Image description of the live engine.
    pub fn descriptor(&self) -> Option<&ImageDescriptor> {
        self.session.as_ref().map(|s| &s.descriptor)
    }

    /// Configuration the live engine was built with.
    pub fn configuration(&self) -> Option<&EncodingConfiguration> {
        self.session.as_ref().map(|s| &s.config)
    }

    /// Input format the live engine was built for.
    pub fn input_format(&self) -> Option<&VideoInfo> {
        self.session.as_ref().map(|s| &s.input)
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Drops the live engine, if any. Does not change the state.
    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!(
                "{}: destroying {} engine for {}x{} {}",
                self.name,
                self.factory.name(),
                session.descriptor.resolution().width,
                session.descriptor.resolution().height,
                session.descriptor.format()
            );
        }
    }
}

impl<F> EncoderElement for SessionManager<F>
where
    F: EngineFactory,
{
    fn start(&mut self) -> SessionResult<()> {
        log::debug!("{}: starting encoder", self.name);

        self.stats = Default::default();
        if self.state == SessionState::Idle {
            self.state = SessionState::Started;
        }

        Ok(())
    }

    fn configure(&mut self, info: &VideoInfo) -> SessionResult<OutputFormat> {
        log::debug!(
            "{}: setting format {} {}x{} @ {} fps",
            self.name,
            info.format,
            info.resolution.width,
            info.resolution.height,
            info.framerate
        );

        let pending_state = match self.state {
            SessionState::Idle => SessionState::Idle,
            _ => SessionState::Started,
        };

        // Whatever happens next, the previous engine is gone before another one is created.
        self.teardown();
        self.state = pending_state;

        let descriptor = ImageDescriptor::try_from(info).map_err(|err| {
            log::warn!("{}: {}", self.name, err);
            SessionError::UnsupportedFormat(err)
        })?;

        let config = EncodingConfiguration::from(&self.settings);

        log::debug!(
            "{}: creating {} engine for {}x{} {} with {:?}",
            self.name,
            self.factory.name(),
            info.resolution.width,
            info.resolution.height,
            descriptor.format(),
            config
        );

        let engine = match self.factory.create_engine(&descriptor, &config) {
            Ok(engine) => engine,
            Err(err) => {
                log::error!("{}: failed to create encoder: {}", self.name, err);
                self.state = SessionState::Idle;
                return Err(SessionError::EngineInitFailed(err));
            }
        };

        self.session = Some(EncoderSession {
            engine,
            descriptor,
            config,
            input: *info,
        });
        self.state = SessionState::Configured;

        Ok(OutputFormat {
            media_type: ELEMENT_METADATA.src_media_type,
            resolution: info.resolution,
            framerate: info.framerate,
        })
    }

    fn submit_frame(&mut self, frame: RawFrame) -> SessionResult<OutputBuffer> {
        let session = match (self.state, self.session.as_mut()) {
            (SessionState::Configured | SessionState::Running, Some(session)) => session,
            _ => {
                log::error!(
                    "{}: encoder not initialized, dropping frame timestamp={}",
                    self.name,
                    frame.timestamp
                );
                return Err(SessionError::NotInitialized);
            }
        };

        if let Err(msg) = session.descriptor.validate_frame(&frame.data, &frame.layout) {
            log::error!(
                "{}: rejecting frame timestamp={}: {}",
                self.name,
                frame.timestamp,
                msg
            );
            return Err(SessionError::EncodeFailed(EngineError::InvalidFrame(msg)));
        }

        let start = Instant::now();

        let result = match session.engine.encode(&frame) {
            Ok(result) => result,
            Err(err) => {
                log::error!(
                    "{}: failed to encode frame timestamp={}: {}",
                    self.name,
                    frame.timestamp,
                    err
                );
                if let EngineError::Unusable(_) = err {
                    self.teardown();
                    self.state = SessionState::Started;
                }
                return Err(SessionError::EncodeFailed(err));
            }
        };

        let output = output_buffer(
            &result.payload,
            frame.timestamp,
            frame.duration,
            result.is_keyframe,
        )
        .map_err(|err| {
            log::error!("{}: {}", self.name, err);
            err
        })?;

        self.stats.processing_time += start.elapsed();
        self.stats.frames_processed += 1;
        self.state = SessionState::Running;

        log::trace!(
            "{}: encoded frame timestamp={} bytes={} keyframe={}",
            self.name,
            output.pts,
            output.data.len(),
            output.keyframe
        );

        Ok(output)
    }

    fn flush(&mut self) -> SessionResult<Vec<OutputBuffer>> {
        let Some(session) = self.session.as_mut() else {
            log::debug!("{}: nothing to flush", self.name);
            return Ok(Vec::new());
        };

        log::debug!("{}: flushing engine", self.name);

        let drained = session.engine.flush().map_err(|err| {
            log::error!("{}: failed to flush engine: {}", self.name, err);
            SessionError::EncodeFailed(err)
        })?;

        drained
            .into_iter()
            .map(|d| output_buffer(&d.result.payload, d.timestamp, None, d.result.is_keyframe))
            .collect()
    }

    fn stop(&mut self) {
        log::debug!("{}: stopping encoder", self.name);

        self.teardown();
        self.state = SessionState::Idle;
    }

    fn set_property(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        self.settings.set(name, value).map_err(|err| {
            log::warn!("{}: {}", self.name, err);
            err
        })
    }

    fn property(&self, name: &str) -> Result<ParamValue, ParamError> {
        self.settings.get(name)
    }
}
