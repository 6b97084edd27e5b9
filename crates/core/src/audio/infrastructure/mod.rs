pub mod ffmpeg_audio_reader;
pub mod remote_recognizer;
pub mod silero_vad_detector;
pub mod wav_clip_writer;
pub mod whisper_recognizer;
