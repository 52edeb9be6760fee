//! Single voice with MIDI parameter control.

use audio_midi_shell::{AudioGenerator, AudioMidiShell};
use simple_logger::SimpleLogger;

use eratosthenean_dsp::oscillator::additive_oscillator::StretchQuantization;
use eratosthenean_dsp::spectrum::StereoMode;
use eratosthenean_dsp::voice::{Modulations, Patch, Voice};

const SAMPLE_RATE: u32 = 48000;
const BLOCK_SIZE: usize = 32;

fn main() -> ! {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init()
        .unwrap();

    AudioMidiShell::run_forever(SAMPLE_RATE, BLOCK_SIZE, App::new());
}

#[derive(Debug)]
struct App {
    voice: Voice,
    patch: Patch,
    modulations: Modulations,
    level: f32,
    volume: f32,
    fundamental_mix: f32,
}

impl App {
    pub fn new() -> Self {
        Self {
            voice: Voice::new(SAMPLE_RATE as f32, 0),
            patch: Patch::default(),
            modulations: Modulations::default(),
            level: 0.0,
            volume: 1.0,
            fundamental_mix: 0.0,
        }
    }
}

impl AudioGenerator for App {
    fn init(&mut self, _block_size: usize) {
        self.patch.partials = 4.0;
        self.patch.tilt = -0.5;
        self.modulations.right_patched = true;
        self.voice.reset(true);
    }

    fn process(&mut self, samples_left: &mut [f32], samples_right: &mut [f32]) {
        let mut left = vec![0.0; BLOCK_SIZE];
        let mut right = vec![0.0; BLOCK_SIZE];
        let mut fundamental = vec![0.0; BLOCK_SIZE];

        self.voice.render(
            &self.patch,
            &self.modulations,
            &mut left,
            &mut right,
            &mut fundamental,
        );

        let gain = self.level * self.volume;

        for frame in 0..BLOCK_SIZE {
            let sub = fundamental[frame] * self.fundamental_mix;
            samples_left[frame] = (left[frame] * (1.0 - self.fundamental_mix) + sub) * gain;
            samples_right[frame] = (right[frame] * (1.0 - self.fundamental_mix) + sub) * gain;
        }
    }

    fn process_midi(&mut self, message: Vec<u8>) {
        match message[0] & 0xF0 {
            0x80 => {
                // Note off
                self.level = 0.0;
                log::info!("Note off: {}", message[1]);
            }
            0x90 if message[2] != 0 => {
                // Note on, MIDI note 12 is C0.
                self.patch.pitch = (message[1] as f32 - 12.0) / 12.0;
                self.level = message[2] as f32 / 127.0;
                log::info!("Note on: {}", message[1]);
            }
            0xB0 => {
                // Control change
                let value = message[2] as f32 / 127.0;
                match message[1] {
                    21 => {
                        self.patch.stretch = value * 4.0 - 2.0;
                        log::info!("Stretch: {}", self.patch.stretch);
                    }
                    22 => {
                        self.patch.partials = value * 7.0;
                        log::info!("Partials: {}", self.patch.partials);
                    }
                    23 => {
                        self.patch.tilt = value * 2.0 - 1.0;
                        log::info!("Tilt: {}", self.patch.tilt);
                    }
                    24 => {
                        self.patch.sieve = value * 2.0 - 1.0;
                        log::info!("Sieve: {}", self.patch.sieve);
                    }
                    25 => {
                        self.patch.cv_buffer_delay = value;
                        log::info!("Comb: {}", self.patch.cv_buffer_delay);
                    }
                    26 => {
                        self.patch.stereo_mode = match (value * 2.99) as usize {
                            0 => StereoMode::Mono,
                            1 => StereoMode::SoftPan,
                            _ => StereoMode::HardPan,
                        };
                        log::info!("Stereo mode: {:?}", self.patch.stereo_mode);
                    }
                    27 => {
                        self.patch.stretch_quantization = match (value * 2.99) as usize {
                            0 => StretchQuantization::Continuous,
                            1 => StretchQuantization::Consonants,
                            _ => StretchQuantization::Harmonics,
                        };
                        log::info!("Stretch quantization: {:?}", self.patch.stretch_quantization);
                    }
                    28 => {
                        self.volume = value;
                        log::info!("Volume: {}", self.volume);
                    }
                    29 => {
                        self.fundamental_mix = value;
                        log::info!("Fundamental mix: {}", self.fundamental_mix);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}
