// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Dummy engine whose only purpose is to let the session run so we can test it in isolation.
//!
//! Every engine created by a [`Factory`] records its construction and destruction in a shared
//! [`Journal`], which lets tests check the engine lifetimes the session enforces.

use std::cell::RefCell;
use std::rc::Rc;

use crate::encoder::DrainedResult;
use crate::encoder::EncodedResult;
use crate::encoder::EncoderEngine;
use crate::encoder::EncodingConfiguration;
use crate::encoder::EngineError;
use crate::encoder::EngineFactory;
use crate::encoder::EngineResult;
use crate::encoder::RawFrame;
use crate::format::ImageDescriptor;
use crate::Resolution;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Created {
        resolution: Resolution,
        config: EncodingConfiguration,
    },
    Destroyed,
}

#[derive(Default)]
struct JournalInner {
    events: Vec<Event>,
    live: usize,
    max_live: usize,
}

/// Shared record of engine lifetimes.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<JournalInner>>);

impl Journal {
    fn record(&self, event: Event) {
        let mut inner = self.0.borrow_mut();
        match event {
            Event::Created { .. } => {
                inner.live += 1;
                inner.max_live = inner.max_live.max(inner.live);
            }
            Event::Destroyed => inner.live -= 1,
        }
        inner.events.push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    /// Number of engines currently alive.
    pub fn live(&self) -> usize {
        self.0.borrow().live
    }

    /// Largest number of engines that have been alive at the same time.
    pub fn max_live(&self) -> usize {
        self.0.borrow().max_live
    }
}

pub(crate) struct Engine {
    journal: Journal,
    fail_timestamp: Option<u64>,
    unusable_timestamp: Option<u64>,
    trailer: bool,
    last_timestamp: Option<u64>,
}

impl EncoderEngine for Engine {
    fn encode(&mut self, frame: &RawFrame) -> EngineResult<EncodedResult> {
        if self.fail_timestamp == Some(frame.timestamp) {
            return Err(EngineError::Other(anyhow::anyhow!(
                "dummy failure at {}",
                frame.timestamp
            )));
        }
        if self.unusable_timestamp == Some(frame.timestamp) {
            return Err(EngineError::Unusable(format!(
                "dummy engine lost at {}",
                frame.timestamp
            )));
        }

        self.last_timestamp = Some(frame.timestamp);

        Ok(EncodedResult {
            payload: frame.timestamp.to_le_bytes().to_vec(),
            is_keyframe: frame.timestamp == 0,
        })
    }

    fn flush(&mut self) -> EngineResult<Vec<DrainedResult>> {
        match (self.trailer, self.last_timestamp.take()) {
            (true, Some(timestamp)) => Ok(vec![DrainedResult {
                timestamp,
                result: EncodedResult {
                    payload: vec![0xff],
                    is_keyframe: false,
                },
            }]),
            _ => Ok(Vec::new()),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.journal.record(Event::Destroyed);
    }
}

/// Dummy factory. The public fields select the failures its engines inject.
#[derive(Default)]
pub(crate) struct Factory {
    /// Refuse to create any engine
    pub fail_init: bool,
    /// Fail the frame with this timestamp
    pub fail_timestamp: Option<u64>,
    /// Report the engine as unusable on the frame with this timestamp
    pub unusable_timestamp: Option<u64>,
    /// Return a trailing result for the last frame when flushed
    pub trailer: bool,
    pub journal: Journal,
}

impl Factory {
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl EngineFactory for Factory {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn create_engine(
        &mut self,
        descriptor: &ImageDescriptor,
        config: &EncodingConfiguration,
    ) -> EngineResult<Box<dyn EncoderEngine>> {
        if self.fail_init {
            return Err(EngineError::InvalidConfiguration(
                "dummy refuses to start".into(),
            ));
        }

        self.journal.record(Event::Created {
            resolution: descriptor.resolution(),
            config: config.clone(),
        });

        Ok(Box::new(Engine {
            journal: self.journal.clone(),
            fail_timestamp: self.fail_timestamp,
            unusable_timestamp: self.unusable_timestamp,
            trailer: self.trailer,
            last_timestamp: None,
        }))
    }
}
