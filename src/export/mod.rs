pub mod png;

pub use png::{export_png, encode_png, timestamped_file_name};
