//! SurrealDB implementation of [`DrivingTimeRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::driving_time::{AppointmentDrivingTime, CreateDrivingTime, round_distance};
use crm_core::repository::DrivingTimeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

const SELECT_DRIVING_TIME: &str = "SELECT meta::id(id) AS record_id, * FROM";

#[derive(Debug, SurrealValue)]
struct DrivingTimeRow {
    record_id: String,
    appointment_id: String,
    distance: Option<f64>,
    time: Option<i64>,
    measured_at: DateTime<Utc>,
}

impl DrivingTimeRow {
    fn try_into_driving_time(self) -> Result<AppointmentDrivingTime, DbError> {
        Ok(AppointmentDrivingTime {
            id: parse_uuid(&self.record_id, "driving time")?,
            appointment_id: parse_uuid(&self.appointment_id, "appointment")?,
            distance: self.distance,
            time: self.time,
            measured_at: self.measured_at,
        })
    }
}

/// SurrealDB implementation of the AppointmentDrivingTime repository.
#[derive(Clone)]
pub struct SurrealDrivingTimeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDrivingTimeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn write(
        &self,
        statement: &str,
        id: Uuid,
        appointment_id: Uuid,
        distance: Option<f64>,
        time: Option<i64>,
        measured_at: DateTime<Utc>,
    ) -> Result<AppointmentDrivingTime, DbError> {
        let id_str = id.to_string();
        let query = format!(
            "{statement} type::record('appointment_driving_time', $id) SET \
             appointment_id = $appointment_id, distance = $distance, \
             time = $time, measured_at = $measured_at; \
             {SELECT_DRIVING_TIME} type::record('appointment_driving_time', $id);"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("appointment_id", appointment_id.to_string()))
            .bind(("distance", distance.map(round_distance)))
            .bind(("time", time))
            .bind(("measured_at", measured_at))
            .await?;

        let mut result = result.check().map_err(DbError::from_statement)?;
        let rows: Vec<DrivingTimeRow> = result.take(1)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("appointment_driving_time", id_str))?
            .try_into_driving_time()
    }
}

impl<C: Connection> DrivingTimeRepository for SurrealDrivingTimeRepository<C> {
    async fn create(&self, input: CreateDrivingTime) -> CrmResult<AppointmentDrivingTime> {
        Ok(self
            .write(
                "CREATE",
                Uuid::new_v4(),
                input.appointment_id,
                input.distance,
                input.time,
                input.measured_at,
            )
            .await?)
    }

    async fn get_by_id(&self, id: Uuid) -> CrmResult<AppointmentDrivingTime> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!(
                "{SELECT_DRIVING_TIME} type::record('appointment_driving_time', $id)"
            ))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DrivingTimeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("appointment_driving_time", id_str))?;
        Ok(row.try_into_driving_time()?)
    }

    async fn update(
        &self,
        driving_time: &AppointmentDrivingTime,
    ) -> CrmResult<AppointmentDrivingTime> {
        Ok(self
            .write(
                "UPDATE",
                driving_time.id,
                driving_time.appointment_id,
                driving_time.distance,
                driving_time.time,
                driving_time.measured_at,
            )
            .await?)
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        self.db
            .query("DELETE type::record('appointment_driving_time', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }

    async fn list(&self, organization_id: Option<Uuid>) -> CrmResult<Vec<AppointmentDrivingTime>> {
        let where_sql = if organization_id.is_some() {
            "WHERE appointment_id IN (\
                 SELECT VALUE meta::id(id) FROM appointment \
                 WHERE organization_id = $organization_id\
             )"
        } else {
            ""
        };

        let mut result = self
            .db
            .query(format!(
                "{SELECT_DRIVING_TIME} appointment_driving_time {where_sql} \
                 ORDER BY measured_at DESC, id ASC"
            ))
            .bind(("organization_id", organization_id.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DrivingTimeRow> = result.take(0).map_err(DbError::from)?;
        let driving_times = rows
            .into_iter()
            .map(|row| row.try_into_driving_time())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(driving_times)
    }
}
