//! S3 / S3兼容对象存储驱动

mod config;
mod driver;
mod factory;

pub use config::S3Config;
pub use driver::S3Driver;
pub use factory::S3DriverFactory;
