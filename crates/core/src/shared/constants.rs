pub const SILERO_VAD_MODEL_NAME: &str = "silero_vad.onnx";
pub const SILERO_VAD_MODEL_URL: &str =
    "https://github.com/snakers4/silero-vad/raw/v5.1.2/src/silero_vad/data/silero_vad.onnx";

pub const WHISPER_MODEL_NAME: &str = "ggml-medium.bin";
pub const WHISPER_MODEL_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-medium.bin";

/// Sample rate the voice-activity detector and whisper both expect.
pub const VAD_SAMPLE_RATE: u32 = 16000;

/// Gap below which two speech intervals are treated as continuous speech.
pub const SHORT_GAP_MS: u64 = 200;

pub const DEFAULT_MIN_LEN_MS: u64 = 2000;
pub const DEFAULT_MAX_LEN_MS: u64 = 25000;

/// Silence added on both ends of every exported clip.
pub const CLIP_PADDING_MS: u64 = 50;

/// Loudness every exported clip is normalized to.
pub const TARGET_DBFS: f64 = -20.0;

/// Energy-threshold fallback parameters.
pub const FALLBACK_SILENCE_THRESH_DBFS: f64 = -40.0;
pub const FALLBACK_MIN_SILENCE_MS: u64 = 500;

/// Sentences shorter than this are dropped by the semantic splitter.
pub const SEMANTIC_MIN_SENTENCE_MS: u64 = 1000;

pub const SPLIT_SOURCE_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "m4a"];
pub const TRANSCRIBE_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "m4a", "ogg"];

pub const REMOTE_STT_URL: &str = "https://api.elevenlabs.io/v1/speech-to-text";
pub const REMOTE_STT_MODEL_ID: &str = "scribe_v1";
