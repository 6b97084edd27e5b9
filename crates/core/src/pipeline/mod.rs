pub mod progress_reporter;
pub mod scrape_use_case;
pub mod semantic_split_use_case;
pub mod split_audio_use_case;
pub mod split_sources;
pub mod task_error;
pub mod transcribe_use_case;
