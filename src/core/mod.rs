pub mod handler;
pub mod request;

pub use crate::domain::model::{PatchMeta, PatchView};
pub use crate::domain::ports::{ConfigProvider, PatchStore};
pub use crate::utils::error::Result;
