use std::path::Path;

use ffmpeg_next::software::resampling;
use ffmpeg_next::util::frame::audio::Audio;
use ffmpeg_next::{codec, decoder, format, media, ChannelLayout};

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_segment::AudioSegment;

/// Decodes any container ffmpeg understands (wav, mp3, m4a, webm, ...)
/// and downmixes to mono f32.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegAudioReader;

impl AudioReader for FfmpegAudioReader {
    fn read_audio(
        &self,
        path: &Path,
        target_sample_rate: u32,
    ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut ictx = format::input(path)?;
        let Some(stream) = ictx.streams().best(media::Type::Audio) else {
            return Ok(None);
        };
        let stream_index = stream.index();
        let mut decoder = codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .audio()?;

        // Some wav headers carry no layout; derive one from the channel count.
        let layout = if decoder.channel_layout().is_empty() {
            ChannelLayout::default(decoder.channels() as i32)
        } else {
            decoder.channel_layout()
        };
        let mut resampler = resampling::Context::get(
            decoder.format(),
            layout,
            decoder.rate(),
            format::Sample::F32(format::sample::Type::Planar),
            ChannelLayout::MONO,
            target_sample_rate,
        )?;

        let mut samples: Vec<f32> = Vec::new();
        for (packet_stream, packet) in ictx.packets() {
            if packet_stream.index() != stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            drain(&mut decoder, &mut resampler, &mut samples)?;
        }
        decoder.send_eof()?;
        drain(&mut decoder, &mut resampler, &mut samples)?;

        // The resampler may still hold buffered samples.
        let mut tail = Audio::empty();
        if let Ok(Some(delay)) = resampler.flush(&mut tail) {
            if delay.output > 0 {
                extract_f32_samples(&tail, &mut samples);
            }
        }

        Ok(Some(AudioSegment::new(samples, target_sample_rate, 1)))
    }

    fn audio_metadata(
        &self,
        path: &Path,
    ) -> Result<Option<(u32, u16)>, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = format::input(path)?;
        let Some(stream) = ictx.streams().best(media::Type::Audio) else {
            return Ok(None);
        };
        let decoder = codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .audio()?;

        Ok(Some((decoder.rate(), decoder.channels() as u16)))
    }
}

/// Pull every frame the decoder has ready through the resampler.
fn drain(
    decoder: &mut decoder::Audio,
    resampler: &mut resampling::Context,
    out: &mut Vec<f32>,
) -> Result<(), ffmpeg_next::Error> {
    let mut decoded = Audio::empty();
    let mut resampled = Audio::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        resampler.run(&decoded, &mut resampled)?;
        extract_f32_samples(&resampled, out);
    }
    Ok(())
}

/// Extract f32 samples from a planar mono resampled frame.
fn extract_f32_samples(frame: &Audio, out: &mut Vec<f32>) {
    let num_samples = frame.samples();
    if num_samples == 0 {
        return;
    }
    let data = frame.data(0);
    let floats = unsafe { std::slice::from_raw_parts(data.as_ptr() as *const f32, num_samples) };
    out.extend_from_slice(floats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn missing() -> &'static Path {
        if cfg!(windows) {
            Path::new("Z:\\nonexistent\\clip.wav")
        } else {
            Path::new("/nonexistent/clip.wav")
        }
    }

    #[test]
    fn test_read_audio_nonexistent_file() {
        assert!(FfmpegAudioReader.read_audio(missing(), 16000).is_err());
    }

    #[test]
    fn test_audio_metadata_nonexistent_file() {
        assert!(FfmpegAudioReader.audio_metadata(missing()).is_err());
    }

    #[test]
    fn test_read_audio_rejects_non_media_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(FfmpegAudioReader.read_audio_native(&path).is_err());
    }

    #[test]
    fn test_reads_wav_written_by_hound() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..22050 {
            let v = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let meta = FfmpegAudioReader.audio_metadata(&path).unwrap();
        assert_eq!(meta, Some((22050, 2)));

        let audio = FfmpegAudioReader.read_audio(&path, 16000).unwrap().unwrap();
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.sample_rate(), 16000);
        let ms = audio.duration_ms() as i64;
        assert!((ms - 1000).abs() <= 20, "duration {ms} ms");
    }
}
