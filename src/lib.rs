#![doc = include_str!("../README.md")]

mod auth;
mod client;
pub mod config;
pub mod error;
pub mod navigator;
mod refresh;
pub mod request;
pub mod session;
#[cfg(feature = "services")]
pub mod services;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use auth::{Auth, GENERIC_LOGIN_ERROR};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{Error, StorageError};
pub use navigator::{Navigator, NoopNavigator};
pub use refresh::RefreshState;
pub use request::ApiRequest;
pub use session::SessionStore;
#[cfg(feature = "services")]
pub use services::{Meals, Steps, Workouts};
#[cfg(feature = "file-store")]
pub use storage::FileStorage;
pub use storage::{MemoryStorage, Storage};
pub use types::{
    AccessToken, Credentials, FoodItemId, LoginResponse, MealId, RefreshToken, Session,
    StepRecordId, StepSource, TokenPair, UserProfile, WorkoutId,
};
