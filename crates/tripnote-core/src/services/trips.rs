use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::rest::{DataError, DataResult, Direction, Query, RestClient};

use super::list::Record;

const TABLE: &str = "trips";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub title: String,
    pub destination: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Trip {
    fn id(&self) -> &str {
        &self.id
    }

    /// Newest first.
    fn list_order(&self, other: &Self) -> Ordering {
        other.created_at.cmp(&self.created_at)
    }
}

/// Fields for a new trip; the owner is filled in from the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTrip {
    pub title: String,
    pub destination: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl From<NewTrip> for TripUpdate {
    fn from(trip: NewTrip) -> Self {
        Self {
            title: Some(trip.title),
            destination: Some(trip.destination),
            description: Some(trip.description),
            start_date: Some(trip.start_date),
            end_date: Some(trip.end_date),
        }
    }
}

#[derive(Serialize)]
struct OwnedTrip<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    trip: &'a NewTrip,
}

/// Trip records owned by the signed-in user.
#[derive(Clone)]
pub struct TripService {
    client: RestClient,
}

impl TripService {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub async fn insert(&self, trip: &NewTrip) -> DataResult<Trip> {
        let user = self.client.current_user().await?;
        let rows: Vec<Trip> = self
            .client
            .insert(TABLE, &[OwnedTrip {
                user_id: &user.id,
                trip,
            }])
            .await?;
        let created = rows.into_iter().next().ok_or(DataError::NotFound)?;
        info!(trip_id = %created.id, "trip created");
        Ok(created)
    }

    /// The signed-in user's trips, newest first.
    pub async fn list(&self) -> DataResult<Vec<Trip>> {
        let user = self.client.current_user().await?;
        let query = Query::new()
            .select("*")
            .eq("user_id", &user.id)
            .order("created_at", Direction::Desc);
        let trips: Vec<Trip> = self.client.select(TABLE, &query).await?;
        debug!(user_id = %user.id, count = trips.len(), "fetched trips");
        Ok(trips)
    }

    pub async fn get(&self, trip_id: &str) -> DataResult<Trip> {
        let query = Query::new().select("*").eq("id", trip_id);
        let rows: Vec<Trip> = self.client.select(TABLE, &query).await?;
        rows.into_iter().next().ok_or(DataError::NotFound)
    }

    pub async fn update(&self, trip_id: &str, update: &TripUpdate) -> DataResult<Trip> {
        let rows: Vec<Trip> = self
            .client
            .update(TABLE, &Query::new().eq("id", trip_id), update)
            .await?;
        let updated = rows.into_iter().next().ok_or(DataError::NotFound)?;
        info!(trip_id = %updated.id, "trip updated");
        Ok(updated)
    }

    pub async fn delete(&self, trip_id: &str) -> DataResult<()> {
        self.client
            .delete(TABLE, &Query::new().eq("id", trip_id))
            .await?;
        info!(trip_id, "trip deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::tests::client;
    use crate::services::RecordList;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;

    fn trip_json(id: &str, created_at: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "user_id": "user-1",
            "title": "Lisbon",
            "destination": "Portugal",
            "description": null,
            "start_date": "2024-05-01",
            "end_date": "2024-05-07",
            "created_at": created_at,
            "updated_at": created_at
        })
    }

    fn new_trip() -> NewTrip {
        NewTrip {
            title: "Lisbon".into(),
            destination: "Portugal".into(),
            description: String::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 7).unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_attaches_owner() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/trips")
                .header("prefer", "return=representation")
                .json_body(serde_json::json!([{
                    "user_id": "user-1",
                    "title": "Lisbon",
                    "destination": "Portugal",
                    "description": "",
                    "start_date": "2024-05-01",
                    "end_date": "2024-05-07"
                }]));
            then.status(201)
                .json_body_obj(&serde_json::json!([trip_json("t1", "2024-04-01T10:00:00+00:00")]));
        });

        let trip = TripService::new(client(&server)).insert(&new_trip()).await.unwrap();
        mock.assert();
        assert_eq!(trip.id, "t1");
        assert_eq!(trip.start_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(trip.description.is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/trips")
                .query_param("user_id", "eq.user-1")
                .query_param("order", "created_at.desc");
            then.status(200).json_body_obj(&serde_json::json!([
                trip_json("newer", "2024-04-02T10:00:00.123456+00:00"),
                trip_json("older", "2024-04-01T10:00:00+00:00")
            ]));
        });

        let trips = TripService::new(client(&server)).list().await.unwrap();
        mock.assert();
        let list = RecordList::new(trips);
        assert_eq!(list.items()[0].id, "newer");
    }

    #[tokio::test]
    async fn update_of_missing_trip_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/trips")
                .query_param("id", "eq.gone")
                .json_body(serde_json::json!({ "title": "Porto" }));
            then.status(200).json_body_obj(&serde_json::json!([]));
        });

        let update = TripUpdate {
            title: Some("Porto".into()),
            ..Default::default()
        };
        let err = TripService::new(client(&server))
            .update("gone", &update)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::NotFound));
    }

    #[tokio::test]
    async fn delete_filters_by_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/trips")
                .query_param("id", "eq.t1");
            then.status(204);
        });

        TripService::new(client(&server)).delete("t1").await.unwrap();
        mock.assert();
    }
}
