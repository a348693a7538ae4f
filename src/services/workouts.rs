use serde::Serialize;
use serde_json::Value as JsonValue;
use time::Date;

use super::{with_date_range, with_filters};
use crate::client::ApiClient;
use crate::error::Error;
use crate::request::ApiRequest;
use crate::storage::Storage;
use crate::types::WorkoutId;

const WORKOUTS: &str = "/workouts/workouts/";

/// Workout CRUD, lifecycle actions and summaries.
pub struct Workouts<'a, S> {
    client: &'a ApiClient<S>,
}

impl<S: Storage> ApiClient<S> {
    #[must_use]
    pub fn workouts(&self) -> Workouts<'_, S> {
        Workouts { client: self }
    }
}

fn workout_path(id: WorkoutId) -> String {
    format!("{WORKOUTS}{id}/")
}

fn action_path(id: WorkoutId, action: &str) -> String {
    format!("{WORKOUTS}{id}/{action}/")
}

impl<S: Storage> Workouts<'_, S> {
    /// List workouts, optionally filtered (e.g. `[("status", "completed")]`).
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<JsonValue, Error> {
        let request = with_filters(ApiRequest::get(WORKOUTS), filters);
        self.client.send_json(&request).await
    }

    pub async fn get(&self, id: WorkoutId) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(workout_path(id))).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, workout: &B) -> Result<JsonValue, Error> {
        let request = ApiRequest::post(WORKOUTS).with_json(workout)?;
        self.client.send_json(&request).await
    }

    /// Replace a workout.
    pub async fn update<B: Serialize + ?Sized>(
        &self,
        id: WorkoutId,
        workout: &B,
    ) -> Result<JsonValue, Error> {
        let request = ApiRequest::put(workout_path(id)).with_json(workout)?;
        self.client.send_json(&request).await
    }

    /// Update only the given fields.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        id: WorkoutId,
        fields: &B,
    ) -> Result<JsonValue, Error> {
        let request = ApiRequest::patch(workout_path(id)).with_json(fields)?;
        self.client.send_json(&request).await
    }

    pub async fn delete(&self, id: WorkoutId) -> Result<(), Error> {
        self.client.send_empty(&ApiRequest::delete(workout_path(id))).await
    }

    pub async fn today(&self) -> Result<JsonValue, Error> {
        self.client
            .send_json(&ApiRequest::get(format!("{WORKOUTS}today/")))
            .await
    }

    pub async fn this_week(&self) -> Result<JsonValue, Error> {
        self.client
            .send_json(&ApiRequest::get(format!("{WORKOUTS}this_week/")))
            .await
    }

    /// Aggregated statistics over an optional date range.
    pub async fn summary(
        &self,
        start_date: Option<Date>,
        end_date: Option<Date>,
    ) -> Result<JsonValue, Error> {
        let request = with_date_range(
            ApiRequest::get(format!("{WORKOUTS}summary/")),
            start_date,
            end_date,
        );
        self.client.send_json(&request).await
    }

    pub async fn start(&self, id: WorkoutId) -> Result<JsonValue, Error> {
        self.client
            .send_json(&ApiRequest::post(action_path(id, "start")))
            .await
    }

    /// Mark a workout completed, optionally with completion details
    /// (duration, calories, notes). An empty object is sent otherwise.
    pub async fn complete(
        &self,
        id: WorkoutId,
        details: Option<&JsonValue>,
    ) -> Result<JsonValue, Error> {
        let empty = JsonValue::Object(serde_json::Map::new());
        let request =
            ApiRequest::post(action_path(id, "complete")).with_json(details.unwrap_or(&empty))?;
        self.client.send_json(&request).await
    }

    pub async fn skip(&self, id: WorkoutId) -> Result<JsonValue, Error> {
        self.client
            .send_json(&ApiRequest::post(action_path(id, "skip")))
            .await
    }
}
