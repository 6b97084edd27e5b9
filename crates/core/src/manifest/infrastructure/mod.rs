pub mod csv_manifest;
