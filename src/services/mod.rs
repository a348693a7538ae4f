//! Resource services for the fitness backend.
//!
//! Each operation is one REST call through [`ApiClient`](crate::ApiClient),
//! so all of them share bearer authentication and token refresh. Results are
//! returned as raw JSON; the backend owns their shape.
//!
//! ```rust,ignore
//! let today = client.steps().today().await?;
//! let streak = client.steps().current_streak().await?;
//! let summary = client.meals().summary(Some(week_start), None).await?;
//! ```

mod meals;
mod steps;
mod workouts;

pub use meals::Meals;
pub use steps::Steps;
pub use workouts::Workouts;

use time::Date;

use crate::request::ApiRequest;

/// Add an optional `start_date`/`end_date` pair as ISO dates.
pub(crate) fn with_date_range(
    request: ApiRequest,
    start_date: Option<Date>,
    end_date: Option<Date>,
) -> ApiRequest {
    request
        .with_optional_query("start_date", start_date)
        .with_optional_query("end_date", end_date)
}

/// Add free-form list filters (`status`, `meal_type`, `goal_achieved`, ...).
pub(crate) fn with_filters(mut request: ApiRequest, filters: &[(&str, &str)]) -> ApiRequest {
    for (key, value) in filters {
        request = request.with_query(*key, *value);
    }
    request
}
