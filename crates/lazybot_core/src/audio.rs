//! Audio sink contract
//!
//! Playback itself belongs to the host. Entities only describe what to play
//! and keep the returned handle to stop it later.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Opaque handle to a playing clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackHandle(pub u64);

/// Distance falloff for spatial playback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialParams {
    /// Emitter position in world space
    pub position: Vec3,
    /// Full volume inside this distance
    pub min_distance: f32,
    /// Silent beyond this distance
    pub max_distance: f32,
}

impl SpatialParams {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            min_distance: 1.0,
            max_distance: 50.0,
        }
    }

    pub fn with_distance(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min.max(0.0);
        self.max_distance = max.max(self.min_distance);
        self
    }

    /// Linear attenuation at `listener`, in `[0, 1]`
    pub fn attenuation(&self, listener: Vec3) -> f32 {
        let distance = self.position.distance(listener);
        if distance <= self.min_distance {
            return 1.0;
        }
        if distance >= self.max_distance {
            return 0.0;
        }
        1.0 - (distance - self.min_distance) / (self.max_distance - self.min_distance)
    }
}

/// Everything a sink needs to start a clip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioRequest {
    /// Clip identifier understood by the host
    pub clip: String,
    /// Volume (0.0 - 1.0)
    pub volume: f32,
    /// Pitch multiplier
    pub pitch: f32,
    pub looping: bool,
    /// `None` for non-spatial playback
    pub spatial: Option<SpatialParams>,
}

impl AudioRequest {
    pub fn new(clip: impl Into<String>) -> Self {
        Self {
            clip: clip.into(),
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            spatial: None,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch.max(0.1);
        self
    }

    pub fn with_looping(mut self) -> Self {
        self.looping = true;
        self
    }

    pub fn with_spatial(mut self, spatial: SpatialParams) -> Self {
        self.spatial = Some(spatial);
        self
    }
}

/// Host-side audio playback
pub trait AudioSink: Send {
    /// Start a clip immediately
    fn play(&mut self, request: &AudioRequest) -> PlaybackHandle;

    /// Start a clip after `delay` seconds
    fn play_delayed(&mut self, request: &AudioRequest, delay: f32) -> PlaybackHandle;

    fn stop(&mut self, handle: PlaybackHandle);

    /// Stop a clip after `delay` seconds
    fn stop_delayed(&mut self, handle: PlaybackHandle, delay: f32);

    /// Duration of a clip in seconds, if known
    fn clip_duration(&self, clip: &str) -> Option<f32>;
}
