use macroquad::audio::{PlaySoundParams, Sound, load_sound_from_bytes, play_sound};

use crate::session::SessionEvent;

const SAMPLE_RATE: u32 = 44_100;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SoundId {
    Eat,
    GameOver,
}

impl From<SessionEvent> for SoundId {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Ate => SoundId::Eat,
            SessionEvent::Died(_) => SoundId::GameOver,
        }
    }
}

/// A sine beep with a linear fade-out.
#[derive(Copy, Clone, Debug)]
struct Tone {
    frequency_hz: f32,
    seconds: f32,
    amplitude: f32,
}

const EAT_TONE: Tone = Tone { frequency_hz: 880.0, seconds: 0.08, amplitude: 0.6 };
const GAME_OVER_TONE: Tone = Tone { frequency_hz: 110.0, seconds: 0.35, amplitude: 0.7 };

/// Renders `tone` as a mono PCM16 WAV file.
fn tone_wav(tone: Tone) -> Vec<u8> {
    let samples = (tone.seconds * SAMPLE_RATE as f32) as u32;
    let data_size = samples * 2;
    let mut wav = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    // fmt chunk: PCM, mono, 16 bit
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());

    let amplitude = tone.amplitude.clamp(0.0, 1.0) * i16::MAX as f32;
    for i in 0..samples {
        let t = i as f32 / SAMPLE_RATE as f32;
        let fade = 1.0 - i as f32 / samples as f32;
        let sample = (t * tone.frequency_hz * std::f32::consts::TAU).sin() * amplitude * fade;
        wav.extend_from_slice(&(sample as i16).to_le_bytes());
    }
    wav
}

/// Fire-and-forget sound effects.
pub struct Sounds {
    eat: Sound,
    game_over: Sound,
    volume: f32,
}

impl Sounds {
    pub async fn load(volume: f32) -> Result<Self, macroquad::Error> {
        let eat = load_sound_from_bytes(&tone_wav(EAT_TONE)).await?;
        let game_over = load_sound_from_bytes(&tone_wav(GAME_OVER_TONE)).await?;
        Ok(Self { eat, game_over, volume: volume.clamp(0.0, 1.0) })
    }

    pub fn play(&self, id: SoundId) {
        if self.volume <= 0.0 {
            return;
        }
        let (sound, gain) = match id {
            SoundId::Eat => (&self.eat, 0.35),
            SoundId::GameOver => (&self.game_over, 0.6),
        };
        play_sound(sound, PlaySoundParams { looped: false, volume: gain * self.volume });
    }
}
