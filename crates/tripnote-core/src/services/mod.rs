mod list;
mod notes;
mod trips;

use serde::Serialize;

use crate::rest::DataResult;

pub use list::{Record, RecordList};
pub use notes::{NewNote, NoteService, NoteUpdate, TripNote};
pub use trips::{NewTrip, Trip, TripService, TripUpdate};

/// `{success, data?, error?}` view of a data call, for callers that want a flat shape.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> From<DataResult<T>> for ServiceResponse<T> {
    fn from(result: DataResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.user_message()),
            },
        }
    }
}
