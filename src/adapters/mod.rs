pub mod cache;
pub mod providers;
pub mod reqwest_client;

pub use cache::*;
pub use providers::*;
pub use reqwest_client::*;
