/// A segment of decoded audio: interleaved PCM samples normalized to [-1.0, 1.0].
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn silent(duration_ms: u64, sample_rate: u32, channels: u16) -> Self {
        let frames = ms_to_frames(duration_ms, sample_rate);
        Self::new(vec![0.0; frames * channels.max(1) as usize], sample_rate, channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn duration_ms(&self) -> u64 {
        (self.frames() as u64 * 1000) / self.sample_rate.max(1) as u64
    }

    pub fn sample_index_at_time(&self, time: f64) -> usize {
        (time * self.sample_rate as f64 * self.channels as f64) as usize
    }

    /// Copy of `[start_ms, end_ms)`, clamped to the segment bounds.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> AudioSegment {
        let channels = self.channels as usize;
        let frames = self.frames();
        let start = ms_to_frames(start_ms, self.sample_rate).min(frames);
        let end = ms_to_frames(end_ms, self.sample_rate).clamp(start, frames);
        AudioSegment::new(
            self.samples[start * channels..end * channels].to_vec(),
            self.sample_rate,
            self.channels,
        )
    }

    /// New segment with `pad_ms` of silence before and after.
    pub fn padded(&self, pad_ms: u64) -> AudioSegment {
        let pad = ms_to_frames(pad_ms, self.sample_rate) * self.channels as usize;
        let mut samples = Vec::with_capacity(self.samples.len() + 2 * pad);
        samples.resize(pad, 0.0);
        samples.extend_from_slice(&self.samples);
        samples.resize(samples.len() + pad, 0.0);
        AudioSegment::new(samples, self.sample_rate, self.channels)
    }

    pub fn rms(&self) -> f64 {
        rms(&self.samples)
    }

    /// Loudness relative to full scale; negative infinity for digital silence.
    pub fn dbfs(&self) -> f64 {
        amplitude_to_db(self.rms())
    }

    pub fn apply_gain(&mut self, gain_db: f64) {
        let factor = db_to_amplitude(gain_db) as f32;
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    /// Scale to `target_dbfs`. Silent segments are returned unchanged.
    pub fn normalized(mut self, target_dbfs: f64) -> AudioSegment {
        let current = self.dbfs();
        if current.is_finite() {
            self.apply_gain(target_dbfs - current);
        }
        self
    }
}

pub fn ms_to_frames(ms: u64, sample_rate: u32) -> usize {
    (ms as u128 * sample_rate as u128 / 1000) as usize
}

pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

pub fn amplitude_to_db(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * amplitude.log10()
    }
}

pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}
