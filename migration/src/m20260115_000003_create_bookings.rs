use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20260115_000001_create_users::User;
use super::m20260115_000002_create_tours::Tour;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create booking status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(BookingStatus::Enum)
                    .values([
                        BookingStatus::Pending,
                        BookingStatus::Approved,
                        BookingStatus::Rejected,
                        BookingStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(
                        big_integer(Booking::Id)
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(big_integer(Booking::TourId).not_null())
                    .col(uuid(Booking::UserId).not_null())
                    .col(string_len(Booking::UserName, 100).not_null())
                    .col(string_len(Booking::UserEmail, 255).not_null())
                    .col(string_len_null(Booking::UserPhone, 30))
                    .col(integer(Booking::NumberOfPeople).not_null())
                    .col(
                        ColumnDef::new(Booking::Status)
                            .custom(BookingStatus::Enum)
                            .not_null(),
                    )
                    .col(text_null(Booking::UserMessage))
                    .col(text_null(Booking::AdminNote))
                    .col(uuid_null(Booking::ApprovedBy))
                    .col(timestamp_with_time_zone_null(Booking::ApprovedAt))
                    .col(uuid_null(Booking::RejectedBy))
                    .col(timestamp_with_time_zone_null(Booking::RejectedAt))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_tour")
                            .from(Booking::Table, Booking::TourId)
                            .to(Tour::Table, Tour::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_user")
                            .from(Booking::Table, Booking::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Pending review queue is read oldest-first
        manager
            .create_index(
                Index::create()
                    .name("idx_booking_status_created_at")
                    .table(Booking::Table)
                    .col(Booking::Status)
                    .col(Booking::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_tour_id")
                    .table(Booking::Table)
                    .col(Booking::TourId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(BookingStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    TourId,
    UserId,
    UserName,
    UserEmail,
    UserPhone,
    NumberOfPeople,
    Status,
    UserMessage,
    AdminNote,
    ApprovedBy,
    ApprovedAt,
    RejectedBy,
    RejectedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum BookingStatus {
    #[sea_orm(iden = "booking_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "approved")]
    Approved,
    #[sea_orm(iden = "rejected")]
    Rejected,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
