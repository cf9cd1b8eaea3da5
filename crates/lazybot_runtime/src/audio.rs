//! Headless audio sink
//!
//! Logs every request and keeps a journal that tests and the CLI summary can
//! read back. Durations come from the scene's clip table.

use std::collections::HashMap;
use std::sync::Arc;

use lazybot_core::{AudioRequest, AudioSink, PlaybackHandle};
use parking_lot::Mutex;

/// One recorded sink call
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    Play {
        handle: PlaybackHandle,
        clip: String,
        delay: f32,
    },
    Stop {
        handle: PlaybackHandle,
        delay: f32,
    },
}

/// Journal shared between sinks and their readers
pub type AudioJournal = Arc<Mutex<Vec<AudioEvent>>>;

/// Sink that never plays anything
#[derive(Debug, Clone, Default)]
pub struct LoggingAudioSink {
    next_handle: u64,
    durations: HashMap<String, f32>,
    journal: AudioJournal,
}

impl LoggingAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share a journal with other sinks
    pub fn with_journal(mut self, journal: AudioJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_clip(mut self, clip: impl Into<String>, duration: f32) -> Self {
        self.durations.insert(clip.into(), duration.max(0.0));
        self
    }

    pub fn journal(&self) -> &AudioJournal {
        &self.journal
    }

    fn start(&mut self, request: &AudioRequest, delay: f32) -> PlaybackHandle {
        let handle = PlaybackHandle(self.next_handle);
        self.next_handle += 1;

        if !self.durations.contains_key(&request.clip) {
            log::warn!("Unknown audio clip: {}", request.clip);
        }
        log::debug!(
            "play {} (handle {}, volume {:.2}, delay {:.2}s)",
            request.clip,
            handle.0,
            request.volume,
            delay
        );

        self.journal.lock().push(AudioEvent::Play {
            handle,
            clip: request.clip.clone(),
            delay,
        });
        handle
    }
}

impl AudioSink for LoggingAudioSink {
    fn play(&mut self, request: &AudioRequest) -> PlaybackHandle {
        self.start(request, 0.0)
    }

    fn play_delayed(&mut self, request: &AudioRequest, delay: f32) -> PlaybackHandle {
        self.start(request, delay.max(0.0))
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        self.stop_delayed(handle, 0.0);
    }

    fn stop_delayed(&mut self, handle: PlaybackHandle, delay: f32) {
        log::debug!("stop handle {} after {:.2}s", handle.0, delay);
        self.journal.lock().push(AudioEvent::Stop {
            handle,
            delay: delay.max(0.0),
        });
    }

    fn clip_duration(&self, clip: &str) -> Option<f32> {
        self.durations.get(clip).copied()
    }
}
