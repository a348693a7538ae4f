use serde::Serialize;
use serde_json::Value as JsonValue;

use super::with_filters;
use crate::client::ApiClient;
use crate::error::Error;
use crate::request::ApiRequest;
use crate::storage::Storage;
use crate::types::{StepRecordId, StepSource};

const DAILY: &str = "/steps/daily/";
const GOALS: &str = "/steps/goals/";
const STREAKS: &str = "/steps/streaks/";

/// Default look-back window of [`Steps::summary`], in days.
pub const DEFAULT_SUMMARY_PERIOD: u32 = 30;
/// Default look-back window of [`Steps::chart_data`], in days.
pub const DEFAULT_CHART_PERIOD: u32 = 7;

#[derive(Serialize)]
struct QuickLog {
    steps: u32,
    source: StepSource,
}

#[derive(Serialize)]
struct GoalUpdate {
    daily_goal: u32,
}

/// Daily step records, goals and streaks.
pub struct Steps<'a, S> {
    client: &'a ApiClient<S>,
}

impl<S: Storage> ApiClient<S> {
    #[must_use]
    pub fn steps(&self) -> Steps<'_, S> {
        Steps { client: self }
    }
}

fn record_path(id: StepRecordId) -> String {
    format!("{DAILY}{id}/")
}

impl<S: Storage> Steps<'_, S> {
    /// List daily records (e.g. `[("start_date", "2024-05-01"), ("goal_achieved", "true")]`).
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<JsonValue, Error> {
        let request = with_filters(ApiRequest::get(DAILY), filters);
        self.client.send_json(&request).await
    }

    pub async fn get(&self, id: StepRecordId) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(record_path(id))).await
    }

    /// Today's record. The backend answers 404 when nothing was logged yet.
    pub async fn today(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(format!("{DAILY}today/"))).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, record: &B) -> Result<JsonValue, Error> {
        let request = ApiRequest::post(DAILY).with_json(record)?;
        self.client.send_json(&request).await
    }

    pub async fn update<B: Serialize + ?Sized>(
        &self,
        id: StepRecordId,
        record: &B,
    ) -> Result<JsonValue, Error> {
        let request = ApiRequest::put(record_path(id)).with_json(record)?;
        self.client.send_json(&request).await
    }

    pub async fn delete(&self, id: StepRecordId) -> Result<(), Error> {
        self.client.send_empty(&ApiRequest::delete(record_path(id))).await
    }

    /// Add steps to today's record, creating it if needed.
    pub async fn quick_log(&self, steps: u32, source: StepSource) -> Result<JsonValue, Error> {
        let request =
            ApiRequest::post(format!("{DAILY}quick_log/")).with_json(&QuickLog { steps, source })?;
        self.client.send_json(&request).await
    }

    pub async fn weekly(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(format!("{DAILY}weekly/"))).await
    }

    pub async fn monthly(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(format!("{DAILY}monthly/"))).await
    }

    /// Totals and averages over the last `period` days (default 30).
    pub async fn summary(&self, period: Option<u32>) -> Result<JsonValue, Error> {
        let request = ApiRequest::get(format!("{DAILY}summary/"))
            .with_query("period", period.unwrap_or(DEFAULT_SUMMARY_PERIOD));
        self.client.send_json(&request).await
    }

    /// Chart series for the last `period` days (default 7).
    pub async fn chart_data(&self, period: Option<u32>) -> Result<JsonValue, Error> {
        let request = ApiRequest::get(format!("{DAILY}chart_data/"))
            .with_query("period", period.unwrap_or(DEFAULT_CHART_PERIOD));
        self.client.send_json(&request).await
    }

    pub async fn current_goal(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(format!("{GOALS}current/"))).await
    }

    pub async fn set_goal(&self, daily_goal: u32) -> Result<JsonValue, Error> {
        let request = ApiRequest::post(GOALS).with_json(&GoalUpdate { daily_goal })?;
        self.client.send_json(&request).await
    }

    pub async fn current_streak(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(format!("{STREAKS}current/"))).await
    }

    /// Ask the backend to recompute the streak from the daily records.
    pub async fn refresh_streak(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::post(format!("{STREAKS}refresh/"))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_log_body() {
        let body = serde_json::to_value(QuickLog {
            steps: 2500,
            source: StepSource::default(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"steps": 2500, "source": "manual"}));
    }

    #[test]
    fn record_paths() {
        assert_eq!(record_path(StepRecordId(9)), "/steps/daily/9/");
    }
}
