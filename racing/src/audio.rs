//! Engine sound: a synthesized sawtooth whose pitch and volume follow the rpm.

use std::time::Duration;

use bevy::audio::{AddAudioSource, AudioSinkPlayback, Decodable, Source, Volume};
use bevy::prelude::*;
use bevy::reflect::TypePath;

use crate::engine::REDLINE_RPM;
use crate::telemetry::Telemetry;

/// Pitch of the generated waveform at playback speed 1.0.
pub const TONE_BASE_HZ: f32 = 100.0;
pub const TONE_SAMPLE_RATE: u32 = 44_100;

pub const BASE_FREQUENCY_HZ: f32 = 60.0;
pub const FREQUENCY_SPAN_HZ: f32 = 400.0;
pub const BASE_GAIN: f32 = 0.1;
pub const GAIN_SPAN: f32 = 0.2;
/// Time constant for following rpm changes, seconds.
pub const TONE_TIME_CONSTANT: f32 = 0.1;
/// Time constant of the fade-out on stop, seconds.
pub const FADE_TIME_CONSTANT: f32 = 0.5;
/// A voice that has no output sink after this long is given up on.
pub const VOICE_ACQUIRE_TIMEOUT: f32 = 2.0;
/// Gain below which a fading voice is released.
const SILENCE: f32 = 1e-3;

/// Consumer of engine rpm.
pub trait EngineAudio {
    fn set_rpm(&mut self, rpm: f32);
    fn stop(&mut self);
}

pub fn tone_frequency(rpm: f32) -> f32 {
    BASE_FREQUENCY_HZ + (rpm / REDLINE_RPM) * FREQUENCY_SPAN_HZ
}

pub fn tone_gain(rpm: f32) -> f32 {
    BASE_GAIN + (rpm / REDLINE_RPM) * GAIN_SPAN
}

/// Exponential approach of `current` toward `target` over `dt`.
fn approach(current: f32, target: f32, dt: f32, time_constant: f32) -> f32 {
    target + (current - target) * (-dt / time_constant).exp()
}

/// Smoothed tone parameters. Starts silent.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct EngineTone {
    pub frequency: f32,
    pub gain: f32,
    target_frequency: f32,
    target_gain: f32,
    stopping: bool,
}

impl Default for EngineTone {
    fn default() -> Self {
        Self {
            frequency: tone_frequency(0.0),
            gain: 0.0,
            target_frequency: tone_frequency(0.0),
            target_gain: 0.0,
            stopping: false,
        }
    }
}

impl EngineTone {
    pub fn advance(&mut self, dt: f32) {
        let gain_time_constant = if self.stopping {
            FADE_TIME_CONSTANT
        } else {
            TONE_TIME_CONSTANT
        };
        self.frequency = approach(self.frequency, self.target_frequency, dt, TONE_TIME_CONSTANT);
        self.gain = approach(self.gain, self.target_gain, dt, gain_time_constant);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn is_silent(&self) -> bool {
        self.stopping && self.gain < SILENCE
    }

    pub fn playback_speed(&self) -> f32 {
        self.frequency / TONE_BASE_HZ
    }
}

impl EngineAudio for EngineTone {
    fn set_rpm(&mut self, rpm: f32) {
        if self.stopping {
            return;
        }
        self.target_frequency = tone_frequency(rpm);
        self.target_gain = tone_gain(rpm);
    }

    fn stop(&mut self) {
        self.stopping = true;
        self.target_gain = 0.0;
    }
}

/// Endless sawtooth oscillator at a fixed pitch. Playback speed shifts it.
#[derive(Asset, TypePath, Debug, Clone, Copy)]
pub struct EngineToneSource {
    pub frequency: f32,
}

impl Default for EngineToneSource {
    fn default() -> Self {
        Self {
            frequency: TONE_BASE_HZ,
        }
    }
}

impl Decodable for EngineToneSource {
    type DecoderItem = <SawtoothDecoder as Iterator>::Item;
    type Decoder = SawtoothDecoder;

    fn decoder(&self) -> Self::Decoder {
        SawtoothDecoder::new(self.frequency, TONE_SAMPLE_RATE)
    }
}

pub struct SawtoothDecoder {
    phase: f32,
    step: f32,
    sample_rate: u32,
}

impl SawtoothDecoder {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            step: frequency / sample_rate as f32,
            sample_rate,
        }
    }
}

impl Iterator for SawtoothDecoder {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = 2.0 * self.phase - 1.0;
        self.phase = (self.phase + self.step).fract();
        Some(sample)
    }
}

impl Source for SawtoothDecoder {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Engine voice entity. Lives outside the race scene so it can fade after teardown.
#[derive(Component)]
pub struct EngineVoice {
    source: Handle<EngineToneSource>,
    /// Real seconds spent without an output sink.
    waiting: f32,
}

pub struct EngineAudioPlugin;

impl Plugin for EngineAudioPlugin {
    fn build(&self, app: &mut App) {
        app.add_audio_source::<EngineToneSource>()
            .add_systems(Update, (check_engine_voice, play_engine_tone));
    }
}

pub fn spawn_engine_voice(
    commands: &mut Commands,
    sources: &mut Assets<EngineToneSource>,
) -> Entity {
    let source = sources.add(EngineToneSource::default());
    commands
        .spawn((
            AudioPlayer(source.clone()),
            PlaybackSettings::LOOP.with_volume(Volume::Linear(0.0)),
            EngineVoice {
                source,
                waiting: 0.0,
            },
            EngineTone::default(),
        ))
        .id()
}

/// Drop a voice quietly when no output could be acquired for it. The race goes on.
pub fn check_engine_voice(
    mut commands: Commands,
    real_time: Res<Time<Real>>,
    sources: Res<Assets<EngineToneSource>>,
    mut voices: Query<(Entity, &mut EngineVoice, Has<AudioSink>)>,
) {
    for (entity, mut voice, playing) in &mut voices {
        if playing {
            continue;
        }
        voice.waiting += real_time.delta_secs();
        let failure = if !sources.contains(&voice.source) {
            Some("tone source was released")
        } else if voice.waiting > VOICE_ACQUIRE_TIMEOUT {
            Some("no audio output device")
        } else {
            None
        };
        if let Some(reason) = failure {
            warn!("engine audio unavailable, continuing without sound: {reason}");
            commands.entity(entity).despawn();
        }
    }
}

pub fn feed_engine_rpm(mut samples: MessageReader<Telemetry>, mut tones: Query<&mut EngineTone>) {
    let Some(sample) = samples.read().last() else {
        return;
    };
    for mut tone in &mut tones {
        tone.set_rpm(sample.rpm);
    }
}

pub fn play_engine_tone(
    mut commands: Commands,
    time: Res<Time<Real>>,
    mut voices: Query<(Entity, &mut EngineTone, Option<&mut AudioSink>)>,
) {
    let dt = time.delta_secs();
    for (entity, mut tone, sink) in &mut voices {
        tone.advance(dt);
        if tone.is_silent() {
            commands.entity(entity).despawn();
            continue;
        }
        // The sink appears once the source has started playing.
        if let Some(mut sink) = sink {
            sink.set_speed(tone.playback_speed());
            sink.set_volume(Volume::Linear(tone.gain));
        }
    }
}

/// Start the fade-out of every engine voice that is still running.
pub fn stop_engine_audio(mut tones: Query<&mut EngineTone>) {
    for mut tone in &mut tones {
        if !tone.is_stopping() {
            tone.stop();
            debug!("engine voice fading out");
        }
    }
}
