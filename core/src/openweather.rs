//! Normalization of OpenWeatherMap responses into flat records.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{CurrentWeather, ForecastDay};

/// Forecast samples are 3 hours apart, so 8 make a day.
pub const SAMPLES_PER_DAY: usize = 8;

pub const FORECAST_DAYS: u32 = 5;

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

#[derive(Debug, Deserialize)]
pub struct RawCurrentWeather {
    pub name: String,
    pub sys: RawSys,
    pub main: RawMain,
    pub wind: RawWind,
    pub weather: Vec<RawCondition>,
    pub timezone: i64,
    pub coord: RawCoord,
}

#[derive(Debug, Deserialize)]
pub struct RawSys {
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct RawMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: i64,
    #[serde(default)]
    pub pressure: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawWind {
    #[serde(default)]
    pub speed: f64,
    pub deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawCondition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Deserialize)]
pub struct RawCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawForecast {
    pub list: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawForecastItem {
    pub dt_txt: String,
    pub main: RawMain,
    pub wind: RawWind,
    pub weather: Vec<RawCondition>,
}

fn format_error(detail: impl std::fmt::Display) -> AppError {
    AppError::upstream(format!("Invalid weather data format: {detail}"))
}

fn first_condition(conditions: Vec<RawCondition>) -> Result<RawCondition> {
    conditions
        .into_iter()
        .next()
        .ok_or_else(|| format_error("missing weather[0]"))
}

/// Round to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Capitalize the first letter of every alphabetic run and lowercase the rest.
#[must_use]
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Flatten a current-weather response. Any missing key is a format error.
pub fn parse_weather_data(raw: &Value) -> Result<CurrentWeather> {
    let data = RawCurrentWeather::deserialize(raw).map_err(format_error)?;
    let condition = first_condition(data.weather)?;
    let pressure = data
        .main
        .pressure
        .ok_or_else(|| format_error("missing field `pressure`"))?;

    Ok(CurrentWeather {
        city: data.name,
        country: data.sys.country,
        temperature: round1(data.main.temp),
        feels_like: round1(data.main.feels_like),
        humidity: data.main.humidity,
        pressure,
        wind_speed: data.wind.speed,
        wind_direction: data.wind.deg.map(|deg| deg.round() as i64),
        weather_main: condition.main,
        weather_description: title_case(&condition.description),
        icon: condition.icon,
        timezone: data.timezone,
        latitude: data.coord.lat,
        longitude: data.coord.lon,
    })
}

/// Every `SAMPLES_PER_DAY`-th sample, starting with the first.
pub fn bucket_daily<T>(samples: &[T]) -> impl Iterator<Item = &T> {
    samples.iter().step_by(SAMPLES_PER_DAY)
}

fn parse_forecast_item(raw: &Value) -> Result<ForecastDay> {
    let item = RawForecastItem::deserialize(raw).map_err(format_error)?;
    let condition = first_condition(item.weather)?;

    Ok(ForecastDay {
        date: item.dt_txt.chars().take(10).collect(),
        temperature: round1(item.main.temp),
        feels_like: round1(item.main.feels_like),
        humidity: item.main.humidity,
        weather_main: condition.main,
        weather_description: title_case(&condition.description),
        icon: condition.icon,
        wind_speed: item.wind.speed,
    })
}

/// Reduce a 3-hourly forecast response to one sample per day.
///
/// Only the selected samples are parsed; the provider's nominal time of day
/// is kept as-is.
pub fn parse_forecast(raw: &Value) -> Result<Vec<ForecastDay>> {
    let forecast = RawForecast::deserialize(raw).map_err(format_error)?;
    bucket_daily(&forecast.list).map(parse_forecast_item).collect()
}

/// 16-point compass label for a wind bearing in degrees.
#[must_use]
pub fn wind_direction_name(degrees: i64) -> &'static str {
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    let index = ((degrees as f64 / 22.5).round() as i64).rem_euclid(16) as usize;
    COMPASS_POINTS[index]
}

#[must_use]
pub fn weather_icon_url(icon: &str) -> String {
    format!("{ICON_BASE_URL}/{icon}@2x.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn london() -> Value {
        json!({
            "coord": {"lon": -0.1257, "lat": 51.5085},
            "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
            "main": {"temp": 12.34, "feels_like": 11.66, "humidity": 81, "pressure": 1012},
            "wind": {"speed": 4.12, "deg": 230},
            "sys": {"country": "GB"},
            "timezone": 3600,
            "name": "London"
        })
    }

    fn forecast_sample(i: usize) -> Value {
        json!({
            "dt_txt": format!("2024-06-{:02} {:02}:00:00", 1 + i / 8, (i % 8) * 3),
            "main": {"temp": i as f64 + 0.04, "feels_like": i as f64, "humidity": 50 + i},
            "wind": {"speed": 1.5},
            "weather": [{"main": "Rain", "description": "light rain", "icon": "10d"}]
        })
    }

    #[test]
    fn test_parse_weather_data_complete() {
        let w = parse_weather_data(&london()).unwrap();
        assert_eq!(w.city, "London");
        assert_eq!(w.country, "GB");
        assert!((w.temperature - 12.3).abs() < 1e-9);
        assert!((w.feels_like - 11.7).abs() < 1e-9);
        assert_eq!(w.humidity, 81);
        assert_eq!(w.pressure, 1012);
        assert!((w.wind_speed - 4.12).abs() < 1e-9);
        assert_eq!(w.wind_direction, Some(230));
        assert_eq!(w.weather_main, "Clouds");
        assert_eq!(w.weather_description, "Broken Clouds");
        assert_eq!(w.icon, "04d");
        assert_eq!(w.timezone, 3600);
        assert!((w.latitude - 51.5085).abs() < 1e-9);
    }

    #[test]
    fn test_parse_weather_data_wind_defaults() {
        let mut raw = london();
        raw["wind"] = json!({});
        let w = parse_weather_data(&raw).unwrap();
        assert_eq!(w.wind_speed, 0.0);
        assert_eq!(w.wind_direction, None);
    }

    #[test]
    fn test_parse_weather_data_missing_key() {
        let mut raw = london();
        raw.as_object_mut().unwrap().remove("sys");
        let err = parse_weather_data(&raw).unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert!(err.to_string().starts_with("Invalid weather data format"));
        assert!(err.to_string().contains("sys"));
    }

    #[test]
    fn test_parse_weather_data_missing_pressure_and_conditions() {
        let mut raw = london();
        raw["main"].as_object_mut().unwrap().remove("pressure");
        assert!(parse_weather_data(&raw).is_err());

        let mut raw = london();
        raw["weather"] = json!([]);
        let err = parse_weather_data(&raw).unwrap_err();
        assert!(err.to_string().contains("weather[0]"));
    }

    #[test]
    fn test_bucket_daily_forty_samples() {
        let samples: Vec<usize> = (0..40).collect();
        let picked: Vec<usize> = bucket_daily(&samples).copied().collect();
        assert_eq!(picked, vec![0, 8, 16, 24, 32]);
    }

    #[test]
    fn test_bucket_daily_short_and_empty() {
        let empty: Vec<u8> = Vec::new();
        assert_eq!(bucket_daily(&empty).count(), 0);
        let nine: Vec<usize> = (0..9).collect();
        assert_eq!(bucket_daily(&nine).copied().collect::<Vec<_>>(), vec![0, 8]);
    }

    #[test]
    fn test_parse_forecast_forty_samples() {
        let raw = json!({"list": (0..40).map(forecast_sample).collect::<Vec<_>>()});
        let days = parse_forecast(&raw).unwrap();

        assert_eq!(days.len(), 5);
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(
            dates,
            vec!["2024-06-01", "2024-06-02", "2024-06-03", "2024-06-04", "2024-06-05"]
        );
        let humidity: Vec<i64> = days.iter().map(|d| d.humidity).collect();
        assert_eq!(humidity, vec![50, 58, 66, 74, 82]);
        assert!((days[1].temperature - 8.0).abs() < 1e-9);
        assert_eq!(days[0].weather_description, "Light Rain");
    }

    #[test]
    fn test_parse_forecast_ignores_unselected_samples() {
        let mut list: Vec<Value> = (0..16).map(forecast_sample).collect();
        list[3] = json!({"garbage": true});
        let days = parse_forecast(&json!({"list": list})).unwrap();
        assert_eq!(days.len(), 2);
    }

    #[test]
    fn test_parse_forecast_missing_list() {
        assert!(parse_forecast(&json!({"cod": "200"})).is_err());
    }

    #[test]
    fn test_wind_direction_cardinal_points() {
        assert_eq!(wind_direction_name(0), "N");
        assert_eq!(wind_direction_name(90), "E");
        assert_eq!(wind_direction_name(180), "S");
        assert_eq!(wind_direction_name(270), "W");
        assert_eq!(wind_direction_name(359), "N");
    }

    #[test]
    fn test_wind_direction_intermediate_points() {
        assert_eq!(wind_direction_name(23), "NNE");
        assert_eq!(wind_direction_name(45), "NE");
        assert_eq!(wind_direction_name(230), "SW");
        assert_eq!(wind_direction_name(337), "NNW");
        assert_eq!(wind_direction_name(720), "N");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("broken clouds"), "Broken Clouds");
        assert_eq!(title_case("THUNDERSTORM with rain"), "Thunderstorm With Rain");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_round1() {
        assert!((round1(12.34) - 12.3).abs() < 1e-9);
        assert!((round1(-3.26) - -3.3).abs() < 1e-9);
    }

    #[test]
    fn test_weather_icon_url() {
        assert_eq!(
            weather_icon_url("10d"),
            "https://openweathermap.org/img/wn/10d@2x.png"
        );
    }
}
