pub mod progress_relay;
