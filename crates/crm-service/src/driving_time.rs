//! Driving time service.

use chrono::Utc;
use crm_core::error::CrmResult;
use crm_core::guard::{authorize, list_scope};
use crm_core::identity::IdentityContext;
use crm_core::models::driving_time::{
    AppointmentDrivingTime, CreateDrivingTime, DrivingTimeInput, UpdateDrivingTime,
    round_distance,
};
use crm_core::repository::{AppointmentRepository, DrivingTimeRepository};
use crm_core::validation::validate_driving_time;
use tracing::info;
use uuid::Uuid;

use crate::appointment::referenced_appointment;

pub struct DrivingTimeService<D: DrivingTimeRepository, A: AppointmentRepository> {
    driving_times: D,
    appointments: A,
}

impl<D: DrivingTimeRepository, A: AppointmentRepository> DrivingTimeService<D, A> {
    pub fn new(driving_times: D, appointments: A) -> Self {
        Self {
            driving_times,
            appointments,
        }
    }

    pub async fn list(&self, identity: &IdentityContext) -> CrmResult<Vec<AppointmentDrivingTime>> {
        let scope = list_scope(identity)?;
        self.driving_times.list(scope).await
    }

    pub async fn get(
        &self,
        identity: &IdentityContext,
        id: Uuid,
    ) -> CrmResult<AppointmentDrivingTime> {
        identity.require_authenticated()?;
        let driving_time = self.driving_times.get_by_id(id).await?;
        let appointment = self
            .appointments
            .get_by_id(driving_time.appointment_id)
            .await?;
        authorize(identity, &appointment).into_result()?;
        Ok(driving_time)
    }

    pub async fn create(
        &self,
        identity: &IdentityContext,
        input: DrivingTimeInput,
    ) -> CrmResult<AppointmentDrivingTime> {
        identity.require_authenticated()?;
        referenced_appointment(&self.appointments, identity, input.appointment_id).await?;

        let draft = AppointmentDrivingTime {
            id: Uuid::nil(),
            appointment_id: input.appointment_id,
            distance: input.distance.map(round_distance),
            time: input.time,
            measured_at: input.measured_at.unwrap_or_else(Utc::now),
        };
        validate_driving_time(&draft)?;

        let created = self
            .driving_times
            .create(CreateDrivingTime {
                appointment_id: draft.appointment_id,
                distance: draft.distance,
                time: draft.time,
                measured_at: draft.measured_at,
            })
            .await?;
        info!(
            driving_time_id = %created.id,
            appointment_id = %created.appointment_id,
            "Driving time recorded"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        identity: &IdentityContext,
        id: Uuid,
        update: UpdateDrivingTime,
    ) -> CrmResult<AppointmentDrivingTime> {
        let mut driving_time = self.get(identity, id).await?;
        update.apply_to(&mut driving_time);
        driving_time.distance = driving_time.distance.map(round_distance);
        validate_driving_time(&driving_time)?;

        let updated = self.driving_times.update(&driving_time).await?;
        info!(driving_time_id = %id, "Driving time updated");
        Ok(updated)
    }

    pub async fn delete(&self, identity: &IdentityContext, id: Uuid) -> CrmResult<()> {
        self.get(identity, id).await?;
        self.driving_times.delete(id).await?;
        info!(driving_time_id = %id, "Driving time deleted");
        Ok(())
    }
}
