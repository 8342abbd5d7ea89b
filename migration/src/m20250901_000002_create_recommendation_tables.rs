use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum LottoRecommendations {
    Table,
    Id,
    TargetDrawId,
    Source,
    GameNumber,
    Numbers,
    AiReasoning,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LottoResults {
    Table,
    Id,
    RecommendationId,
    MatchedCount,
    MatchedNumbers,
    HasBonus,
    PrizeRank,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PensionRecommendations {
    Table,
    Id,
    TargetDrawId,
    Source,
    GameNumber,
    GroupNo,
    Digits,
    AiReasoning,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PensionResults {
    Table,
    Id,
    RecommendationId,
    PrizeRank,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 推荐来源枚举类型: STATISTICAL / AI
///
/// 唯一索引:
/// - (target_draw_id, source, game_number) 同一回次同一来源的游戏号不重复
/// - 结果表 recommendation_id 一对一
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "DO $$ BEGIN
                    CREATE TYPE recommendation_source AS ENUM ('STATISTICAL', 'AI');
                 EXCEPTION WHEN duplicate_object THEN NULL;
                 END $$;",
            )
            .await?;

        // 6/45 推荐
        manager
            .create_table(
                Table::create()
                    .table(LottoRecommendations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LottoRecommendations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LottoRecommendations::TargetDrawId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LottoRecommendations::Source)
                            .custom(Alias::new("recommendation_source"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LottoRecommendations::GameNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LottoRecommendations::Numbers)
                            .array(ColumnType::Integer)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LottoRecommendations::AiReasoning).text())
                    .col(
                        ColumnDef::new(LottoRecommendations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lotto_recommendations_cycle_game_unique")
                    .table(LottoRecommendations::Table)
                    .col(LottoRecommendations::TargetDrawId)
                    .col(LottoRecommendations::Source)
                    .col(LottoRecommendations::GameNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LottoResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LottoResults::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LottoResults::RecommendationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LottoResults::MatchedCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LottoResults::MatchedNumbers)
                            .array(ColumnType::Integer)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LottoResults::HasBonus)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(LottoResults::PrizeRank).integer())
                    .col(
                        ColumnDef::new(LottoResults::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lotto_results_recommendation")
                            .from(LottoResults::Table, LottoResults::RecommendationId)
                            .to(LottoRecommendations::Table, LottoRecommendations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lotto_results_recommendation_unique")
                    .table(LottoResults::Table)
                    .col(LottoResults::RecommendationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 组号 + 6 位数字推荐
        manager
            .create_table(
                Table::create()
                    .table(PensionRecommendations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PensionRecommendations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PensionRecommendations::TargetDrawId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PensionRecommendations::Source)
                            .custom(Alias::new("recommendation_source"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PensionRecommendations::GameNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PensionRecommendations::GroupNo)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PensionRecommendations::Digits)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PensionRecommendations::AiReasoning).text())
                    .col(
                        ColumnDef::new(PensionRecommendations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pension_recommendations_cycle_game_unique")
                    .table(PensionRecommendations::Table)
                    .col(PensionRecommendations::TargetDrawId)
                    .col(PensionRecommendations::Source)
                    .col(PensionRecommendations::GameNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PensionResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PensionResults::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PensionResults::RecommendationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PensionResults::PrizeRank).integer())
                    .col(
                        ColumnDef::new(PensionResults::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pension_results_recommendation")
                            .from(PensionResults::Table, PensionResults::RecommendationId)
                            .to(PensionRecommendations::Table, PensionRecommendations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pension_results_recommendation_unique")
                    .table(PensionResults::Table)
                    .col(PensionResults::RecommendationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PensionResults::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(PensionRecommendations::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(LottoResults::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(LottoRecommendations::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS recommendation_source")
            .await?;
        Ok(())
    }
}
