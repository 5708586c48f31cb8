//! Per-client weather session and the provider port it fetches through.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{Database, HISTORY_LIMIT, lock};
use crate::error::{AppError, Result};
use crate::models::{
    CurrentWeather, ForecastDay, NewSavedLocation, SavedLocation, WeatherHistory, WeatherView,
};
use crate::openweather::{
    FORECAST_DAYS, parse_forecast, parse_weather_data, weather_icon_url, wind_direction_name,
};

/// Source of raw OpenWeatherMap-shaped JSON.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_weather(&self, city: &str) -> Result<Value>;

    async fn weather_at(&self, latitude: f64, longitude: f64) -> Result<Value>;

    /// 3-hourly samples covering `days` days.
    async fn forecast(&self, city: &str, days: u32) -> Result<Value>;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WeatherSession {
    pub current_weather: Option<CurrentWeather>,
    pub forecast_data: Vec<ForecastDay>,
    pub saved_locations: Vec<SavedLocation>,
    pub weather_history: Vec<WeatherHistory>,
    pub search_city: String,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub current_view: WeatherView,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WeatherCommand {
    Search,
    SearchAt { latitude: f64, longitude: f64 },
    GetForecast,
    SaveLocation,
    DeleteLocation { id: i64 },
    LoadHistory,
    LoadSavedLocations,
    LoadForLocation { city: String },
    SetSearchCity { value: String },
    SetView { value: WeatherView },
    ClearMessages,
}

impl WeatherCommand {
    fn action(&self) -> &'static str {
        match self {
            Self::Search | Self::SearchAt { .. } | Self::LoadForLocation { .. } => "fetch weather",
            Self::GetForecast => "fetch forecast",
            Self::SaveLocation => "save location",
            Self::DeleteLocation { .. } => "delete location",
            Self::LoadHistory => "load weather history",
            Self::LoadSavedLocations => "load saved locations",
            _ => "update view",
        }
    }
}

impl WeatherSession {
    /// A fresh session with history and saved locations loaded from `db`.
    pub fn new(db: &Mutex<Database>) -> Result<Self> {
        let mut session = Self::default();
        session.load_history(db)?;
        session.load_saved_locations(db)?;
        Ok(session)
    }

    /// Run one command, recording the outcome in the session messages.
    pub async fn apply(
        &mut self,
        provider: &dyn WeatherProvider,
        db: &Mutex<Database>,
        command: WeatherCommand,
    ) -> Result<()> {
        let action = command.action();
        let result = match command {
            WeatherCommand::Search => self.search(provider, db).await,
            WeatherCommand::SearchAt {
                latitude,
                longitude,
            } => self.search_at(provider, db, latitude, longitude).await,
            WeatherCommand::GetForecast => self.get_forecast(provider).await,
            WeatherCommand::SaveLocation => self.save_current_location(db).map(|_| ()),
            WeatherCommand::DeleteLocation { id } => self.delete_location(db, id).map(|_| ()),
            WeatherCommand::LoadHistory => self.load_history(db),
            WeatherCommand::LoadSavedLocations => self.load_saved_locations(db),
            WeatherCommand::LoadForLocation { city } => {
                self.load_for_location(provider, db, city).await
            }
            WeatherCommand::SetSearchCity { value } => {
                self.set_search_city(value);
                Ok(())
            }
            WeatherCommand::SetView { value } => {
                self.current_view = value;
                Ok(())
            }
            WeatherCommand::ClearMessages => {
                self.clear_messages();
                Ok(())
            }
        };

        self.is_loading = false;
        if let Err(err) = &result {
            self.error_message = Some(err.user_message(action));
            self.success_message = None;
        }
        result
    }

    fn begin(&mut self) {
        self.is_loading = true;
        self.error_message = None;
        self.success_message = None;
    }

    /// Fetch current weather for `search_city`.
    pub async fn search(
        &mut self,
        provider: &dyn WeatherProvider,
        db: &Mutex<Database>,
    ) -> Result<()> {
        let city = self.search_city.trim().to_string();
        if city.is_empty() {
            return Err(AppError::validation("Please enter a city name"));
        }
        self.begin();
        let fetched = match provider.current_weather(&city).await {
            Ok(raw) => parse_weather_data(&raw),
            Err(err) => Err(err),
        };
        self.show_weather(fetched, db)
    }

    /// Fetch current weather at a coordinate pair.
    pub async fn search_at(
        &mut self,
        provider: &dyn WeatherProvider,
        db: &Mutex<Database>,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::validation(
                "Latitude must be within -90..90 and longitude within -180..180",
            ));
        }
        self.begin();
        let fetched = match provider.weather_at(latitude, longitude).await {
            Ok(raw) => parse_weather_data(&raw),
            Err(err) => Err(err),
        };
        if let Ok(weather) = &fetched {
            self.search_city.clone_from(&weather.city);
        }
        self.show_weather(fetched, db)
    }

    fn show_weather(
        &mut self,
        fetched: Result<CurrentWeather>,
        db: &Mutex<Database>,
    ) -> Result<()> {
        self.is_loading = false;
        let weather = match fetched {
            Ok(weather) => weather,
            Err(err) => {
                self.current_weather = None;
                return Err(err);
            }
        };

        {
            let db = lock(db);
            if let Err(err) = db.insert_weather_history(&weather) {
                tracing::warn!(
                    error = %err,
                    city = %weather.city,
                    "failed to record weather history"
                );
            }
            match db.recent_weather_history(HISTORY_LIMIT) {
                Ok(history) => self.weather_history = history,
                Err(err) => tracing::warn!(error = %err, "failed to reload weather history"),
            }
        }

        tracing::info!(city = %weather.city, country = %weather.country, "weather loaded");
        self.success_message = Some(format!("Weather data loaded for {}", weather.city));
        self.current_weather = Some(weather);
        self.current_view = WeatherView::Current;
        Ok(())
    }

    /// Fetch the daily forecast for the city currently shown.
    pub async fn get_forecast(&mut self, provider: &dyn WeatherProvider) -> Result<()> {
        let Some(city) = self.current_weather.as_ref().map(|w| w.city.clone()) else {
            return Err(AppError::validation("Please search for a city first"));
        };
        self.begin();
        let fetched = match provider.forecast(&city, FORECAST_DAYS).await {
            Ok(raw) => parse_forecast(&raw),
            Err(err) => Err(err),
        };
        self.is_loading = false;
        match fetched {
            Ok(days) => {
                self.forecast_data = days;
                self.current_view = WeatherView::Forecast;
                self.success_message = Some(format!("Forecast loaded for {city}"));
                Ok(())
            }
            Err(err) => {
                self.forecast_data.clear();
                Err(err)
            }
        }
    }

    /// Bookmark the city currently shown, unless it is already saved.
    pub fn save_current_location(&mut self, db: &Mutex<Database>) -> Result<SavedLocation> {
        let Some(weather) = &self.current_weather else {
            return Err(AppError::validation("No current weather data to save"));
        };
        let location = NewSavedLocation::from(weather);

        let db = lock(db);
        if db
            .find_saved_location(&location.city, location.country.as_deref())?
            .is_some()
        {
            return Err(AppError::validation("Location already saved"));
        }
        let saved = db.insert_saved_location(&location)?;
        self.saved_locations = db.list_saved_locations()?;
        self.error_message = None;
        self.success_message = Some(format!("Location {} saved!", saved.city));
        Ok(saved)
    }

    /// Delete a saved location. Returns `false` for an unknown id.
    pub fn delete_location(&mut self, db: &Mutex<Database>, id: i64) -> Result<bool> {
        let db = lock(db);
        if !db.delete_saved_location(id)? {
            return Ok(false);
        }
        self.saved_locations = db.list_saved_locations()?;
        self.error_message = None;
        self.success_message = Some("Location deleted successfully!".to_string());
        Ok(true)
    }

    pub fn load_history(&mut self, db: &Mutex<Database>) -> Result<()> {
        self.weather_history = lock(db).recent_weather_history(HISTORY_LIMIT)?;
        Ok(())
    }

    pub fn load_saved_locations(&mut self, db: &Mutex<Database>) -> Result<()> {
        self.saved_locations = lock(db).list_saved_locations()?;
        Ok(())
    }

    pub async fn load_for_location(
        &mut self,
        provider: &dyn WeatherProvider,
        db: &Mutex<Database>,
        city: String,
    ) -> Result<()> {
        self.search_city = city;
        self.search(provider, db).await
    }

    pub fn set_search_city(&mut self, value: String) {
        self.search_city = value;
        self.error_message = None;
    }

    pub fn clear_messages(&mut self) {
        self.error_message = None;
        self.success_message = None;
    }

    #[must_use]
    pub fn has_current_weather(&self) -> bool {
        self.current_weather.is_some()
    }

    #[must_use]
    pub fn weather_icon_url(&self) -> Option<String> {
        self.current_weather
            .as_ref()
            .map(|w| weather_icon_url(&w.icon))
    }

    #[must_use]
    pub fn wind_direction_name(&self) -> &'static str {
        self.current_weather
            .as_ref()
            .and_then(|w| w.wind_direction)
            .map_or("N/A", wind_direction_name)
    }
}
