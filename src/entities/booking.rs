use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "booking_status")]
pub enum BookingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BookingStatus {
    /// Approved, rejected and cancelled are terminal; only pending
    /// bookings may transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tour_id: i64,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub number_of_people: i32,
    pub status: BookingStatus,
    pub user_message: Option<String>,
    pub admin_note: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tour::Entity",
        from = "Column::TourId",
        to = "super::tour::Column::Id"
    )]
    Tour,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::tour::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tour.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    fn ensure_pending(&self) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Booking {} is no longer pending",
                self.id
            )));
        }
        Ok(())
    }

    /// Approve a pending booking. Seat capacity is checked by the caller
    /// against the locked tour row before this transition is persisted.
    pub fn approve(
        &mut self,
        admin_id: Uuid,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.ensure_pending()?;

        self.status = BookingStatus::Approved;
        self.approved_by = Some(admin_id);
        self.approved_at = Some(now.into());
        self.admin_note = note;

        Ok(())
    }

    /// Reject a pending booking. A non-blank reason is mandatory and is
    /// stored as the admin note.
    pub fn reject(
        &mut self,
        admin_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation(
                "Rejection reason is required".to_string(),
            ));
        }
        self.ensure_pending()?;

        self.status = BookingStatus::Rejected;
        self.rejected_by = Some(admin_id);
        self.rejected_at = Some(now.into());
        self.admin_note = Some(reason.to_string());

        Ok(())
    }

    /// Cancel a pending booking. Only the requesting user may cancel.
    pub fn cancel(&mut self, requester_id: Uuid) -> Result<(), AppError> {
        if self.user_id != requester_id {
            return Err(AppError::Forbidden(
                "You can only cancel your own bookings".to_string(),
            ));
        }
        self.ensure_pending()?;

        self.status = BookingStatus::Cancelled;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_booking(user_id: Uuid) -> Model {
        let now = Utc::now();
        Model {
            id: 7,
            tour_id: 1,
            user_id,
            user_name: "Ada".to_string(),
            user_email: "ada@example.com".to_string(),
            user_phone: Some("+90 555 000 0000".to_string()),
            number_of_people: 2,
            status: BookingStatus::Pending,
            user_message: None,
            admin_note: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn approve_records_approver_and_note() {
        let admin = Uuid::new_v4();
        let now = Utc::now();
        let mut booking = pending_booking(Uuid::new_v4());

        booking
            .approve(admin, Some("Window seats".to_string()), now)
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Approved);
        assert_eq!(booking.approved_by, Some(admin));
        assert_eq!(booking.approved_at, Some(now.into()));
        assert_eq!(booking.admin_note.as_deref(), Some("Window seats"));
    }

    #[test]
    fn approve_twice_fails_with_invalid_state() {
        let admin = Uuid::new_v4();
        let mut booking = pending_booking(Uuid::new_v4());

        booking.approve(admin, None, Utc::now()).unwrap();
        let err = booking.approve(admin, None, Utc::now()).unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(booking.status, BookingStatus::Approved);
    }

    #[test]
    fn reject_requires_a_reason() {
        let mut booking = pending_booking(Uuid::new_v4());
        let err = booking
            .reject(Uuid::new_v4(), "   ", Utc::now())
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn reject_records_rejecter_and_reason() {
        let admin = Uuid::new_v4();
        let now = Utc::now();
        let mut booking = pending_booking(Uuid::new_v4());

        booking.reject(admin, "Tour overbooked", now).unwrap();

        assert_eq!(booking.status, BookingStatus::Rejected);
        assert_eq!(booking.rejected_by, Some(admin));
        assert_eq!(booking.rejected_at, Some(now.into()));
        assert_eq!(booking.admin_note.as_deref(), Some("Tour overbooked"));
    }

    #[test]
    fn reject_approved_booking_fails() {
        let mut booking = pending_booking(Uuid::new_v4());
        booking.approve(Uuid::new_v4(), None, Utc::now()).unwrap();

        let err = booking
            .reject(Uuid::new_v4(), "Too late", Utc::now())
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(booking.status, BookingStatus::Approved);
    }

    #[test]
    fn cancel_by_owner_succeeds() {
        let owner = Uuid::new_v4();
        let mut booking = pending_booking(owner);

        booking.cancel(owner).unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[test]
    fn cancel_by_other_user_is_forbidden() {
        let owner = Uuid::new_v4();
        let mut booking = pending_booking(owner);

        let err = booking.cancel(Uuid::new_v4()).unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn cancel_after_terminal_state_fails() {
        let owner = Uuid::new_v4();
        let mut booking = pending_booking(owner);
        booking.reject(Uuid::new_v4(), "No seats", Utc::now()).unwrap();

        assert!(matches!(
            booking.cancel(owner),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(BookingStatus::Approved.is_terminal());
        assert!(BookingStatus::Rejected.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
    }
}
