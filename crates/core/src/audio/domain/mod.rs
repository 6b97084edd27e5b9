pub mod audio_reader;
pub mod audio_segment;
pub mod clip_writer;
pub mod segment_planner;
pub mod silence_splitter;
pub mod speech_recognizer;
pub mod speech_segment;
pub mod transcript;
pub mod voice_activity_detector;
