use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lotto_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub recommendation_id: Uuid,
    pub matched_count: i32,
    pub matched_numbers: Vec<i32>,
    pub has_bonus: bool,
    pub prize_rank: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lotto_recommendations::Entity",
        from = "Column::RecommendationId",
        to = "super::lotto_recommendations::Column::Id",
        on_delete = "Cascade"
    )]
    Recommendation,
}

impl Related<super::lotto_recommendations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recommendation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
