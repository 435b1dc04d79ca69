//! Meeting vendor adapters.

mod google;
mod microsoft;
mod zoom;

pub use google::{GoogleConfig, GoogleProvider};
pub use microsoft::{MicrosoftConfig, MicrosoftProvider};
pub use zoom::{ZoomConfig, ZoomProvider};
