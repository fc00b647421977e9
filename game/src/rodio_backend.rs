//! Real playback through rodio spatial sinks

use ambience::audio::{AudioBackend, BackendError, CompletionQueue, HandleId, PlayRequest};
use ambience::core::SharedListener;
use glam::Vec3;
use rodio::{Decoder, OutputStreamHandle, SpatialSink};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, trace};

/// Half the distance between the listener's ears
const EAR_OFFSET: f32 = 0.1;

pub struct RodioBackend {
    stream: OutputStreamHandle,
    listener: SharedListener,
    completions: CompletionQueue,
    sinks: HashMap<HandleId, SpatialSink>,
}

impl RodioBackend {
    pub fn new(stream: OutputStreamHandle, listener: SharedListener, completions: CompletionQueue) -> Self {
        Self {
            stream,
            listener,
            completions,
            sinks: HashMap::new(),
        }
    }

    fn ears(&self) -> ([f32; 3], [f32; 3]) {
        let center = self.listener.get().unwrap_or(Vec3::ZERO);
        (
            (center - Vec3::Y * EAR_OFFSET).to_array(),
            (center + Vec3::Y * EAR_OFFSET).to_array(),
        )
    }
}

impl AudioBackend for RodioBackend {
    fn play(&mut self, request: PlayRequest<'_>) -> Result<(), BackendError> {
        let playback_error = |reason: String| BackendError::Playback {
            path: request.sound.path.clone(),
            reason,
        };

        let file = File::open(&request.sound.path).map_err(|e| playback_error(e.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| playback_error(e.to_string()))?;

        let (left_ear, right_ear) = self.ears();
        let sink = SpatialSink::try_new(&self.stream, request.location.to_array(), left_ear, right_ear)
            .map_err(|e| playback_error(e.to_string()))?;
        sink.set_volume(request.volume);
        sink.set_speed(request.pitch);
        sink.append(source);

        debug!(handle = %request.handle, sound = ?request.sound.path, "Started rodio playback");
        self.sinks.insert(request.handle, sink);
        Ok(())
    }

    fn set_volume(&mut self, handle: HandleId, volume: f32) {
        if let Some(sink) = self.sinks.get(&handle) {
            sink.set_volume(volume);
        }
    }

    fn update(&mut self, _delta_time: f32) {
        let (left_ear, right_ear) = self.ears();
        let completions = &self.completions;
        self.sinks.retain(|handle, sink| {
            if sink.empty() {
                trace!(%handle, "Rodio sink drained");
                completions.push(*handle);
                false
            } else {
                sink.set_left_ear_position(left_ear);
                sink.set_right_ear_position(right_ear);
                true
            }
        });
    }
}
