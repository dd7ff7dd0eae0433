//! raw_convert - batch RAW to JPEG/WebP conversion
//!
//! Decodes camera RAW files through LibRaw, encodes them at a chosen quality
//! and writes `<stem>_Q<quality>.<ext>` files. A downsampled preview of one
//! sample file gives a size estimate before anything is written.

pub mod batch;
pub mod encode;
pub mod error;
pub mod estimate;
pub mod metrics;
pub mod raw;
pub mod session;

pub use batch::{
    BatchConverter, BatchState, CancelToken, ConversionJob, ConversionResult, ItemOutcome,
    Progress,
};
pub use encode::{EncoderConfig, OutputFormat, Quality};
pub use error::{ConvertError, Result};
pub use estimate::{SizeEstimate, SizeEstimator, PREVIEW_SIZE};
pub use metrics::{ConversionMetrics, MetricsSnapshot};
pub use raw::{DecodedImage, RawDecoder, RawProcessor};
pub use session::{Notification, Session};
