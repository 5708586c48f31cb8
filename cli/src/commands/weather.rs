use std::path::Path;
use std::sync::Mutex;

use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use dashkit_core::db::{Database, HISTORY_LIMIT, lock};
use dashkit_core::error::AppError;
use dashkit_core::models::CurrentWeather;
use dashkit_core::openweather::{FORECAST_DAYS, parse_forecast, wind_direction_name};
use dashkit_core::weather::{WeatherProvider, WeatherSession};
use dashkit_core::weather_page::{self, weather_page};

use super::helpers::{export_page, json_error, local_time, or_dash, print_json};

fn require_city(city: &str) -> Result<&str> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::validation("Please enter a city name").into());
    }
    Ok(city)
}

/// Search through a session so the lookup lands in the search history.
async fn search(
    provider: &dyn WeatherProvider,
    db: &Mutex<Database>,
    city: &str,
) -> Result<WeatherSession> {
    let mut session = WeatherSession::new(db)?;
    session.set_search_city(require_city(city)?.to_string());
    session.search(provider, db).await?;
    Ok(session)
}

fn print_current(w: &CurrentWeather) {
    println!("{}, {}: {}", w.city, w.country, w.weather_description);
    println!(
        "  Temperature: {:.1}°C (feels like {:.1}°C)",
        w.temperature, w.feels_like
    );
    println!("  Humidity:    {}%", w.humidity);
    println!("  Pressure:    {} hPa", w.pressure);
    match w.wind_direction {
        Some(degrees) => println!(
            "  Wind:        {} m/s {} ({degrees}°)",
            w.wind_speed,
            wind_direction_name(degrees)
        ),
        None => println!("  Wind:        {} m/s", w.wind_speed),
    }
}

pub(crate) async fn cmd_weather_current(
    provider: &dyn WeatherProvider,
    db: &Mutex<Database>,
    city: &str,
    json: bool,
) -> Result<()> {
    let session = search(provider, db, city).await?;
    let Some(weather) = &session.current_weather else {
        bail!("No weather data returned for {city}");
    };
    if json {
        print_json(weather)
    } else {
        print_current(weather);
        Ok(())
    }
}

pub(crate) async fn cmd_weather_forecast(
    provider: &dyn WeatherProvider,
    city: &str,
    json: bool,
) -> Result<()> {
    let raw = provider.forecast(require_city(city)?, FORECAST_DAYS).await?;
    let days = parse_forecast(&raw)?;

    if json {
        return print_json(&days);
    }

    #[derive(Tabled)]
    struct ForecastRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Conditions")]
        conditions: String,
        #[tabled(rename = "Temp (°C)")]
        temperature: String,
        #[tabled(rename = "Feels like")]
        feels_like: String,
        #[tabled(rename = "Humidity")]
        humidity: String,
        #[tabled(rename = "Wind (m/s)")]
        wind: String,
    }

    let rows: Vec<ForecastRow> = days
        .iter()
        .map(|d| ForecastRow {
            date: d.date.clone(),
            conditions: d.weather_description.clone(),
            temperature: format!("{:.1}", d.temperature),
            feels_like: format!("{:.1}", d.feels_like),
            humidity: format!("{}%", d.humidity),
            wind: format!("{:.1}", d.wind_speed),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_weather_history(db: &Mutex<Database>, json: bool) -> Result<()> {
    let records = lock(db).recent_weather_history(HISTORY_LIMIT)?;

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        eprintln!("No search history yet. Use `dashkit weather current <city>` to search.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Searched")]
        searched: String,
        #[tabled(rename = "City")]
        city: String,
        #[tabled(rename = "Country")]
        country: String,
        #[tabled(rename = "Temp (°C)")]
        temperature: String,
        #[tabled(rename = "Conditions")]
        conditions: String,
    }

    let rows: Vec<HistoryRow> = records
        .iter()
        .map(|r| HistoryRow {
            searched: local_time(&r.created_at),
            city: r.city.clone(),
            country: or_dash(r.country.as_deref()),
            temperature: format!("{:.1}", r.temperature),
            conditions: r.weather_description.clone(),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_weather_locations(db: &Mutex<Database>, json: bool) -> Result<()> {
    let locations = lock(db).list_saved_locations()?;

    if json {
        return print_json(&locations);
    }
    if locations.is_empty() {
        eprintln!("No saved locations. Use `dashkit weather save <city>` to add one.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct LocationRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "City")]
        city: String,
        #[tabled(rename = "Country")]
        country: String,
        #[tabled(rename = "Lat")]
        latitude: String,
        #[tabled(rename = "Lon")]
        longitude: String,
    }

    let rows: Vec<LocationRow> = locations
        .iter()
        .map(|l| LocationRow {
            id: l.id,
            name: l.nickname.clone().unwrap_or_else(|| l.city.clone()),
            city: l.city.clone(),
            country: or_dash(l.country.as_deref()),
            latitude: or_dash(l.latitude.map(|v| format!("{v:.2}"))),
            longitude: or_dash(l.longitude.map(|v| format!("{v:.2}"))),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) async fn cmd_weather_save(
    provider: &dyn WeatherProvider,
    db: &Mutex<Database>,
    city: &str,
    json: bool,
) -> Result<()> {
    let mut session = search(provider, db, city).await?;
    let saved = session.save_current_location(db)?;

    if json {
        print_json(&saved)
    } else {
        println!("Saved location {}: {}", saved.id, saved.city);
        Ok(())
    }
}

pub(crate) fn cmd_weather_forget(db: &Mutex<Database>, id: i64, json: bool) -> Result<()> {
    let mut session = WeatherSession::new(db)?;
    if !session.delete_location(db, id)? {
        if json {
            println!("{}", json_error(&format!("Location {id} not found")));
            return Ok(());
        }
        bail!("Location {id} not found");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted saved location {id}");
    }
    Ok(())
}

/// Render the dashboard to a static file, optionally with a city loaded.
pub(crate) async fn cmd_weather_export(
    provider: &dyn WeatherProvider,
    db: &Mutex<Database>,
    path: &Path,
    city: Option<&str>,
) -> Result<()> {
    let session = match city {
        Some(city) => {
            let mut session = search(provider, db, city).await?;
            session.get_forecast(provider).await?;
            session
        }
        None => WeatherSession::new(db)?,
    };
    export_page(path, weather_page::TITLE, &weather_page(&session))?;
    println!("Exported weather dashboard to {}", path.display());
    Ok(())
}
