use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20260115_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create tour status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(TourStatus::Enum)
                    .values([
                        TourStatus::Draft,
                        TourStatus::Published,
                        TourStatus::SoldOut,
                        TourStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tour::Table)
                    .if_not_exists()
                    .col(
                        big_integer(Tour::Id)
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(string_len(Tour::Name, 255).not_null())
                    .col(double(Tour::Price).not_null())
                    .col(double_null(Tour::DiscountedPrice))
                    .col(json_binary(Tour::Destinations).not_null())
                    .col(string_len(Tour::DepartureCity, 100).not_null())
                    .col(integer(Tour::DurationDays).not_null())
                    .col(timestamp_with_time_zone(Tour::StartDate).not_null())
                    .col(timestamp_with_time_zone(Tour::EndDate).not_null())
                    .col(timestamp_with_time_zone_null(Tour::BookingDeadline))
                    .col(integer(Tour::MinParticipants).not_null())
                    .col(integer(Tour::MaxParticipants).not_null())
                    .col(integer(Tour::AvailableSeats).not_null())
                    .col(
                        ColumnDef::new(Tour::Status)
                            .custom(TourStatus::Enum)
                            .not_null(),
                    )
                    .col(boolean(Tour::IsActive).not_null().default(true))
                    .col(uuid_null(Tour::CreatedBy))
                    .col(
                        timestamp_with_time_zone(Tour::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Tour::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tour_created_by")
                            .from(Tour::Table, Tour::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tour::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TourStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Tour {
    Table,
    Id,
    Name,
    Price,
    DiscountedPrice,
    Destinations,
    DepartureCity,
    DurationDays,
    StartDate,
    EndDate,
    BookingDeadline,
    MinParticipants,
    MaxParticipants,
    AvailableSeats,
    Status,
    IsActive,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum TourStatus {
    #[sea_orm(iden = "tour_status")]
    Enum,
    #[sea_orm(iden = "draft")]
    Draft,
    #[sea_orm(iden = "published")]
    Published,
    #[sea_orm(iden = "sold_out")]
    SoldOut,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
