use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::rest::{DataError, DataResult, Direction, Query, RestClient};

use super::list::Record;

const TABLE: &str = "trip_notes";

/// A dated note attached to a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripNote {
    pub id: String,
    pub trip_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub note_date: NaiveDate,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for TripNote {
    fn id(&self) -> &str {
        &self.id
    }

    fn list_order(&self, other: &Self) -> Ordering {
        self.note_date.cmp(&other.note_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNote {
    pub note_date: NaiveDate,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_date: Option<NaiveDate>,
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.note_date.is_none()
    }
}

impl From<NewNote> for NoteUpdate {
    fn from(note: NewNote) -> Self {
        Self {
            title: Some(note.title),
            content: Some(note.content),
            note_date: Some(note.note_date),
        }
    }
}

#[derive(Serialize)]
struct OwnedNote<'a> {
    trip_id: &'a str,
    user_id: &'a str,
    #[serde(flatten)]
    note: &'a NewNote,
}

#[derive(Clone)]
pub struct NoteService {
    client: RestClient,
}

impl NoteService {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, trip_id: &str, note: &NewNote) -> DataResult<TripNote> {
        let user = self.client.current_user().await?;
        let row = OwnedNote {
            trip_id,
            user_id: &user.id,
            note,
        };
        let rows: Vec<TripNote> = self.client.insert(TABLE, &[row]).await?;
        let created = rows.into_iter().next().ok_or(DataError::NotFound)?;
        info!(note_id = %created.id, trip_id, "note created");
        Ok(created)
    }

    /// Notes of `trip_id` in date order.
    pub async fn list(&self, trip_id: &str) -> DataResult<Vec<TripNote>> {
        let query = Query::new()
            .select("*")
            .eq("trip_id", trip_id)
            .order("note_date", Direction::Asc);
        let notes: Vec<TripNote> = self.client.select(TABLE, &query).await?;
        debug!(trip_id, count = notes.len(), "fetched notes");
        Ok(notes)
    }

    pub async fn get(&self, note_id: &str) -> DataResult<TripNote> {
        let query = Query::new().select("*").eq("id", note_id);
        let rows: Vec<TripNote> = self.client.select(TABLE, &query).await?;
        rows.into_iter().next().ok_or(DataError::NotFound)
    }

    pub async fn update(&self, note_id: &str, update: &NoteUpdate) -> DataResult<TripNote> {
        let rows: Vec<TripNote> = self
            .client
            .update(TABLE, &Query::new().eq("id", note_id), update)
            .await?;
        let updated = rows.into_iter().next().ok_or(DataError::NotFound)?;
        info!(note_id, "note updated");
        Ok(updated)
    }

    pub async fn delete(&self, note_id: &str) -> DataResult<()> {
        self.client
            .delete(TABLE, &Query::new().eq("id", note_id))
            .await?;
        info!(note_id, "note deleted");
        Ok(())
    }
}
