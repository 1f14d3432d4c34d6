pub mod amount;
pub mod encoding;
pub mod result_ext;
pub mod time;

pub use result_ext::ResultExt;
