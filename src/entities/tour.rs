use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "tour_status")]
pub enum TourStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "sold_out")]
    SoldOut,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tour")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub discounted_price: Option<f64>,
    /// JSON array of destination names, in visit order
    #[sea_orm(column_type = "JsonBinary")]
    pub destinations: Json,
    pub departure_city: String,
    pub duration_days: i32,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub booking_deadline: Option<DateTimeWithTimeZone>,
    pub min_participants: i32,
    pub max_participants: i32,
    pub available_seats: i32,
    pub status: TourStatus,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Last instant at which booking requests are still accepted.
    /// Falls back to the tour start when no explicit deadline is set.
    pub fn effective_deadline(&self) -> DateTime<Utc> {
        self.booking_deadline
            .unwrap_or(self.start_date)
            .with_timezone(&Utc)
    }

    /// A tour accepts booking requests only while it is active, published,
    /// has seats left and the deadline has not passed.
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.status == TourStatus::Published
            && self.available_seats > 0
            && now < self.effective_deadline()
    }

    /// Consume `count` seats from the inventory. Reaching zero marks the
    /// tour sold out. The caller is responsible for holding a row lock on
    /// this tour for the duration of check-and-decrement.
    pub fn decrement_seats(&mut self, count: i32) -> Result<(), AppError> {
        if count < 0 {
            return Err(AppError::Validation(
                "Seat count must not be negative".to_string(),
            ));
        }
        if count > self.available_seats {
            return Err(AppError::InsufficientCapacity(format!(
                "Only {} seats available",
                self.available_seats
            )));
        }

        self.available_seats -= count;
        if self.available_seats == 0 {
            self.status = TourStatus::SoldOut;
        }

        Ok(())
    }
}
