use serde::Serialize;
use serde_json::Value as JsonValue;
use time::Date;

use super::{with_date_range, with_filters};
use crate::client::ApiClient;
use crate::error::Error;
use crate::request::ApiRequest;
use crate::storage::Storage;
use crate::types::{FoodItemId, MealId};

const MEALS: &str = "/meals/meals/";
const FOOD_ITEMS: &str = "/meals/food-items/";

/// Meal CRUD, nutrition summaries and the food item catalogue.
pub struct Meals<'a, S> {
    client: &'a ApiClient<S>,
}

impl<S: Storage> ApiClient<S> {
    #[must_use]
    pub fn meals(&self) -> Meals<'_, S> {
        Meals { client: self }
    }
}

fn meal_path(id: MealId) -> String {
    format!("{MEALS}{id}/")
}

impl<S: Storage> Meals<'_, S> {
    /// List meals, optionally filtered (e.g. `[("meal_type", "breakfast")]`).
    pub async fn list(&self, filters: &[(&str, &str)]) -> Result<JsonValue, Error> {
        let request = with_filters(ApiRequest::get(MEALS), filters);
        self.client.send_json(&request).await
    }

    pub async fn get(&self, id: MealId) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(meal_path(id))).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, meal: &B) -> Result<JsonValue, Error> {
        let request = ApiRequest::post(MEALS).with_json(meal)?;
        self.client.send_json(&request).await
    }

    pub async fn update<B: Serialize + ?Sized>(
        &self,
        id: MealId,
        meal: &B,
    ) -> Result<JsonValue, Error> {
        let request = ApiRequest::put(meal_path(id)).with_json(meal)?;
        self.client.send_json(&request).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        id: MealId,
        fields: &B,
    ) -> Result<JsonValue, Error> {
        let request = ApiRequest::patch(meal_path(id)).with_json(fields)?;
        self.client.send_json(&request).await
    }

    pub async fn delete(&self, id: MealId) -> Result<(), Error> {
        self.client.send_empty(&ApiRequest::delete(meal_path(id))).await
    }

    pub async fn today(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(format!("{MEALS}today/"))).await
    }

    pub async fn yesterday(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(format!("{MEALS}yesterday/"))).await
    }

    pub async fn this_week(&self) -> Result<JsonValue, Error> {
        self.client.send_json(&ApiRequest::get(format!("{MEALS}this_week/"))).await
    }

    pub async fn by_date(&self, date: Date) -> Result<JsonValue, Error> {
        let request = ApiRequest::get(format!("{MEALS}by_date/")).with_query("date", date);
        self.client.send_json(&request).await
    }

    /// Macro and calorie totals over an optional date range.
    pub async fn summary(
        &self,
        start_date: Option<Date>,
        end_date: Option<Date>,
    ) -> Result<JsonValue, Error> {
        let request = with_date_range(
            ApiRequest::get(format!("{MEALS}summary/")),
            start_date,
            end_date,
        );
        self.client.send_json(&request).await
    }

    /// Per-day nutrition totals.
    pub async fn daily_summary(
        &self,
        start_date: Option<Date>,
        end_date: Option<Date>,
    ) -> Result<JsonValue, Error> {
        let request = with_date_range(
            ApiRequest::get(format!("{MEALS}daily_summary/")),
            start_date,
            end_date,
        );
        self.client.send_json(&request).await
    }

    /// Browse the food catalogue (e.g. `[("category", "fruit"), ("search", "apple")]`).
    pub async fn food_items(&self, filters: &[(&str, &str)]) -> Result<JsonValue, Error> {
        let request = with_filters(ApiRequest::get(FOOD_ITEMS), filters);
        self.client.send_json(&request).await
    }

    pub async fn food_item(&self, id: FoodItemId) -> Result<JsonValue, Error> {
        self.client
            .send_json(&ApiRequest::get(format!("{FOOD_ITEMS}{id}/")))
            .await
    }

    pub async fn food_categories(&self) -> Result<JsonValue, Error> {
        self.client
            .send_json(&ApiRequest::get(format!("{FOOD_ITEMS}categories/")))
            .await
    }
}
