pub mod lotto_draws;
pub mod lotto_recommendations;
pub mod lotto_results;
pub mod pension_draws;
pub mod pension_recommendations;
pub mod pension_results;

pub use lotto_draws as lotto_draw_entity;
pub use lotto_recommendations as lotto_recommendation_entity;
pub use lotto_results as lotto_result_entity;
pub use pension_draws as pension_draw_entity;
pub use pension_recommendations as pension_recommendation_entity;
pub use pension_results as pension_result_entity;
