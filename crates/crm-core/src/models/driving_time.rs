//! Driving time domain model.
//!
//! Records how far and/or how long someone drove to an appointment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::double_option;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDrivingTime {
    pub id: Uuid,
    #[serde(rename = "appointment")]
    pub appointment_id: Uuid,
    /// Distance, kept to two fraction digits.
    pub distance: Option<f64>,
    /// Duration in minutes.
    pub time: Option<i64>,
    pub measured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrivingTimeInput {
    #[serde(rename = "appointment")]
    pub appointment_id: Uuid,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub measured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateDrivingTime {
    pub appointment_id: Uuid,
    pub distance: Option<f64>,
    pub time: Option<i64>,
    pub measured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDrivingTime {
    #[serde(default, deserialize_with = "double_option")]
    pub distance: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub time: Option<Option<i64>>,
    pub measured_at: Option<DateTime<Utc>>,
}

impl UpdateDrivingTime {
    pub fn apply_to(self, driving_time: &mut AppointmentDrivingTime) {
        if let Some(v) = self.distance {
            driving_time.distance = v;
        }
        if let Some(v) = self.time {
            driving_time.time = v;
        }
        if let Some(v) = self.measured_at {
            driving_time.measured_at = v;
        }
    }
}

/// Round a distance to the two fraction digits it is stored with.
pub fn round_distance(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}
