use serde::Serialize;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

use super::repo::AttendanceRecord;
use crate::error::{AppError, Result};

const TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub fn format_time(at: OffsetDateTime) -> Result<String> {
    at.format(TIME_FORMAT)
        .map_err(|e| AppError::Internal(e.into()))
}

#[derive(Debug, Serialize)]
pub struct AttendanceView {
    pub email: String,
    pub name: String,
    pub time: String,
}

impl TryFrom<AttendanceRecord> for AttendanceView {
    type Error = AppError;

    fn try_from(r: AttendanceRecord) -> Result<Self> {
        Ok(Self {
            time: format_time(r.marked_at)?,
            email: r.email,
            name: r.name,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    pub message: String,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct AttendanceListResponse {
    pub total_records: usize,
    pub attendance: Vec<AttendanceView>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceCountResponse {
    pub total_attendance_records: i64,
}
