use sea_orm_migration::prelude::*;

/// 6/45 开奖记录（回次号即主键）
#[derive(DeriveIden)]
enum LottoDraws {
    Table,
    Id,
    DrawDate,
    Numbers,
    BonusNumber,
    PrizeTiers,
    CreatedAt,
}

/// 组号 + 6 位数字开奖记录，号码未公布时 group_no / digits 为空
#[derive(DeriveIden)]
enum PensionDraws {
    Table,
    Id,
    DrawDate,
    GroupNo,
    Digits,
    PrizeTiers,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LottoDraws::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LottoDraws::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LottoDraws::DrawDate).date().not_null())
                    .col(
                        ColumnDef::new(LottoDraws::Numbers)
                            .array(ColumnType::Integer)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LottoDraws::BonusNumber).integer().not_null())
                    .col(
                        ColumnDef::new(LottoDraws::PrizeTiers)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(LottoDraws::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PensionDraws::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PensionDraws::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PensionDraws::DrawDate).date())
                    .col(ColumnDef::new(PensionDraws::GroupNo).integer())
                    .col(ColumnDef::new(PensionDraws::Digits).string_len(6))
                    .col(
                        ColumnDef::new(PensionDraws::PrizeTiers)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(PensionDraws::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PensionDraws::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LottoDraws::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
