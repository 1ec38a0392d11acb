pub mod merge;
pub mod sample;
pub mod stamp;

pub use merge::{merge, slip_angle};
pub use sample::{MergedTimeline, RawSample, ReceiverFix, Sample, SourceSeries, TimelineId};
pub use stamp::GpsStamp;
