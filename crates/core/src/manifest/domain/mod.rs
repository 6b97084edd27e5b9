pub mod manifest_error;
pub mod manifest_rows;
