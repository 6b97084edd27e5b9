use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::clip_writer::ClipWriter;

/// Writes clips as 16-bit PCM WAV via hound.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavClipWriter;

impl ClipWriter for WavClipWriter {
    fn write_clip(&self, path: &Path, audio: &AudioSegment) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = hound::WavWriter::create(path, wav_spec(audio))?;
        write_samples(writer, audio)?;
        Ok(())
    }
}

/// Encode a segment as an in-memory WAV file.
pub fn encode_wav(audio: &AudioSegment) -> Result<Vec<u8>, hound::Error> {
    let mut buffer = Cursor::new(Vec::new());
    let writer = hound::WavWriter::new(&mut buffer, wav_spec(audio))?;
    write_samples(writer, audio)?;
    Ok(buffer.into_inner())
}

fn wav_spec(audio: &AudioSegment) -> hound::WavSpec {
    hound::WavSpec {
        channels: audio.channels(),
        sample_rate: audio.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn write_samples<W: Write + Seek>(
    mut writer: hound::WavWriter<W>,
    audio: &AudioSegment,
) -> Result<(), hound::Error> {
    for &sample in audio.samples() {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32).round() as i16)?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_clip_creates_parent_and_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clips").join("a_chunk_0.wav");
        let audio = AudioSegment::new(vec![0.25; 4410], 44100, 1);
        WavClipWriter.write_clip(&path, &audio).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 4410);
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        let audio = AudioSegment::new(vec![2.0, -3.0], 16000, 1);
        let bytes = encode_wav(&audio).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX]);
    }

    #[test]
    fn test_encode_wav_has_riff_header() {
        let bytes = encode_wav(&AudioSegment::silent(10, 16000, 1)).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
    }
}
