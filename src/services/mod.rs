pub mod ai_recommender;
pub mod candidate_selector;
pub mod notification;
pub mod recommendation_service;
pub mod result_service;
pub mod statistics_service;
pub mod sync_service;

pub use ai_recommender::*;
pub use candidate_selector::*;
pub use notification::*;
pub use recommendation_service::*;
pub use result_service::*;
pub use statistics_service::*;
pub use sync_service::*;
