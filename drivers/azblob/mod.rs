//! Azure Blob Storage驱动
//!
//! 通过azure_storage_blobs访问（Shared Key认证），
//! 只读下载链接使用旧版SAS签名。

mod config;
mod driver;
mod factory;
mod signer;

pub use config::{AzureBlobConfig, DEFAULT_API_VERSION, DEFAULT_ROOT_URL};
pub use driver::AzureBlobDriver;
pub use factory::AzureBlobDriverFactory;
pub use signer::{expiry_after, string_to_sign, EXPIRE_SECS};
