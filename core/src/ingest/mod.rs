pub mod gps_time;
pub mod reader;
pub mod writer;

pub use gps_time::TimeDecoder;
pub use reader::{read_merged, read_merged_from_reader, read_series, read_series_from_reader, LoadReport};
pub use writer::{write_merged, write_merged_to, write_series, write_series_to};
