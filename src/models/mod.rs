//! Data models and structures for the device inspector

pub mod config;
pub mod record;
pub mod speed;
pub mod timing;

// Re-export main model types
pub use config::Config;
pub use record::{
    BrowserInfo, DeviceRecord, NetworkInfo, OtherInfo, PerformanceInfo, RecordSection, ScreenInfo,
    StorageInfo, SystemInfo, TimeInfo,
};
pub use speed::SpeedTestResult;
pub use timing::NavigationTiming;
