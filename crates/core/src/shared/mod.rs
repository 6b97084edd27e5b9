pub mod constants;
pub mod model_resolver;
pub mod settings;
pub mod storage_layout;
