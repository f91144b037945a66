pub mod client;
pub mod models;
pub mod response;

pub use client::{HttpApiClient, SphereApi};
pub use models::{AskRequest, AskResult, Percentage, RankingItem};
pub use response::{BaseResponse, Rejection};
