//! The weather dashboard page, projected from a [`WeatherSession`].

use crate::components::{
    SpinnerSize, action_form, empty_state, error_message, heading, hstack, label,
    loading_spinner, navigation_bar, page_header, success_message, themed_button, themed_card,
    themed_input, vstack,
};
use crate::models::{CurrentWeather, ForecastDay, SavedLocation, WeatherHistory, WeatherView};
use crate::openweather::weather_icon_url;
use crate::theme::{ButtonVariant, DARK_THEME, base_style};
use crate::view::{Element, Node};
use crate::weather::WeatherSession;

pub const TITLE: &str = "Weather Dashboard";

pub const SEARCH_ROUTE: &str = "/search";
pub const COORDINATES_ROUTE: &str = "/search/coordinates";
pub const FORECAST_ROUTE: &str = "/forecast";
pub const VIEW_ROUTE: &str = "/view";
pub const SAVE_ROUTE: &str = "/locations";
pub const LOAD_LOCATION_ROUTE: &str = "/locations/load";

#[must_use]
pub fn delete_location_route(id: i64) -> String {
    format!("/locations/{id}/delete")
}

/// `created_at` trimmed to minutes, with a space instead of the `T`.
fn short_timestamp(created_at: &str) -> String {
    created_at.chars().take(16).collect::<String>().replace('T', " ")
}

fn icon(code: &str, size: &str, alt: &str) -> Element {
    Element::new("img")
        .attr("src", weather_icon_url(code))
        .attr("alt", alt)
        .css("width", size)
        .css("height", size)
}

fn search_card(session: &WeatherSession) -> Node {
    let search = Element::new("form")
        .attr("method", "post")
        .attr("action", SEARCH_ROUTE)
        .css("display", "flex")
        .css("gap", "1rem")
        .child(themed_input("city", "Enter city name...", &session.search_city).css("flex", "1"))
        .child(themed_button("Search", ButtonVariant::Primary).flag("disabled", session.is_loading))
        .maybe_child(session.is_loading.then(|| loading_spinner(SpinnerSize::Md)));

    let coordinates = Element::new("form")
        .attr("method", "post")
        .attr("action", COORDINATES_ROUTE)
        .css("display", "flex")
        .css("gap", "1rem")
        .child(themed_input("latitude", "Latitude", "").css("flex", "1"))
        .child(themed_input("longitude", "Longitude", "").css("flex", "1"))
        .child(themed_button("Use Coordinates", ButtonVariant::Outline));

    themed_card([vstack("1rem").child(search).child(coordinates).into()]).into()
}

fn view_buttons(session: &WeatherSession) -> Node {
    let variant = |view: WeatherView| {
        if session.current_view == view {
            ButtonVariant::Primary
        } else {
            ButtonVariant::Outline
        }
    };
    let switch = |text: &str, view: WeatherView| -> Node {
        action_form(
            VIEW_ROUTE,
            &[("view", view.as_str().to_string())],
            themed_button(text, variant(view)),
        )
        .into()
    };

    hstack("0.75rem")
        .css("justify_content", "center")
        .css("flex_wrap", "wrap")
        .child(switch("Current", WeatherView::Current))
        .child(action_form(
            FORECAST_ROUTE,
            &[],
            themed_button("Forecast", variant(WeatherView::Forecast))
                .flag("disabled", !session.has_current_weather()),
        ))
        .child(switch("History", WeatherView::History))
        .child(switch("Saved", WeatherView::Locations))
        .into()
}

fn detail(title: &str, value: String) -> Node {
    vstack("0.25rem")
        .css("background_color", DARK_THEME.surface_variant)
        .css("border_radius", "8px")
        .css("padding", "1rem")
        .child(label(title, DARK_THEME.text_secondary).css("font_size", "0.875rem"))
        .child(
            label(value, DARK_THEME.text_primary)
                .css("font_size", "1.25rem")
                .css("font_weight", "600"),
        )
        .into()
}

fn current_view(session: &WeatherSession, weather: &CurrentWeather) -> Node {
    let summary = hstack("1.5rem")
        .child(icon(&weather.icon, "100px", &weather.weather_description))
        .child(
            vstack("0.25rem")
                .child(heading("h2", format!("{}, {}", weather.city, weather.country), "1.75rem"))
                .child(
                    Element::new("span")
                        .css("font_size", "3rem")
                        .css("font_weight", "bold")
                        .css("color", DARK_THEME.primary)
                        .child(format!("{:.1}°C", weather.temperature)),
                )
                .child(label(weather.weather_description.as_str(), DARK_THEME.text_secondary))
                .child(label(
                    format!("Feels like {:.1}°C", weather.feels_like),
                    DARK_THEME.text_muted,
                )),
        );

    let details = Element::new("div")
        .css("display", "grid")
        .css("grid_template_columns", "repeat(auto-fit, minmax(150px, 1fr))")
        .css("gap", "1rem")
        .child(detail("Humidity", format!("{}%", weather.humidity)))
        .child(detail("Pressure", format!("{} hPa", weather.pressure)))
        .child(detail("Wind Speed", format!("{} m/s", weather.wind_speed)))
        .child(detail(
            "Wind Direction",
            match weather.wind_direction {
                Some(degrees) => format!("{} ({degrees}°)", session.wind_direction_name()),
                None => session.wind_direction_name().to_string(),
            },
        ));

    let actions = hstack("1rem")
        .child(action_form(
            SAVE_ROUTE,
            &[],
            themed_button("Save Location", ButtonVariant::Secondary),
        ))
        .child(action_form(
            FORECAST_ROUTE,
            &[],
            themed_button("Get Forecast", ButtonVariant::Outline),
        ));

    themed_card([vstack("1.5rem")
        .child(summary)
        .child(details)
        .child(actions)
        .into()])
    .into()
}

fn forecast_card(day: &ForecastDay) -> Node {
    themed_card([vstack("0.5rem")
        .css("align_items", "center")
        .child(heading("h4", day.date.as_str(), "1rem"))
        .child(icon(&day.icon, "64px", &day.weather_description))
        .child(
            label(format!("{:.1}°C", day.temperature), DARK_THEME.text_primary)
                .css("font_size", "1.5rem")
                .css("font_weight", "bold"),
        )
        .child(label(day.weather_description.as_str(), DARK_THEME.text_secondary))
        .child(label(format!("Humidity: {}%", day.humidity), DARK_THEME.text_muted))
        .child(label(format!("Wind: {} m/s", day.wind_speed), DARK_THEME.text_muted))
        .into()])
    .into()
}

fn forecast_view(session: &WeatherSession) -> Node {
    let body: Node = if session.forecast_data.is_empty() {
        empty_state("No forecast data available").into()
    } else {
        Element::new("div")
            .css("display", "grid")
            .css("grid_template_columns", "repeat(auto-fit, minmax(140px, 1fr))")
            .css("gap", "1rem")
            .children(session.forecast_data.iter().map(forecast_card))
            .into()
    };
    vstack("1rem")
        .child(heading("h2", "5-Day Forecast", "1.5rem"))
        .child(body)
        .into()
}

fn load_button(city: &str, text: &str, variant: ButtonVariant) -> Element {
    action_form(
        LOAD_LOCATION_ROUTE,
        &[("city", city.to_string())],
        themed_button(text, variant).css("padding", "0.5rem 1rem"),
    )
}

fn history_item(entry: &WeatherHistory) -> Node {
    let place = match &entry.country {
        Some(country) => format!("{}, {country}", entry.city),
        None => entry.city.clone(),
    };
    themed_card([hstack("1rem")
        .child(
            vstack("0.25rem")
                .css("flex", "1")
                .child(label(place, DARK_THEME.text_primary).css("font_weight", "600"))
                .child(label(
                    format!("{:.1}°C · {}", entry.temperature, entry.weather_description),
                    DARK_THEME.text_secondary,
                ))
                .child(
                    label(short_timestamp(&entry.created_at), DARK_THEME.text_muted)
                        .css("font_size", "0.75rem"),
                ),
        )
        .child(load_button(&entry.city, "View", ButtonVariant::Outline))
        .into()])
    .into()
}

fn history_view(session: &WeatherSession) -> Node {
    let body: Node = if session.weather_history.is_empty() {
        empty_state("No search history available").into()
    } else {
        vstack("0.75rem")
            .children(session.weather_history.iter().map(history_item))
            .into()
    };
    vstack("1rem")
        .child(heading("h2", "Recent Searches", "1.5rem"))
        .child(body)
        .into()
}

fn location_item(location: &SavedLocation) -> Node {
    let name = location.nickname.as_deref().unwrap_or(&location.city);
    let coordinates = match (location.latitude, location.longitude) {
        (Some(lat), Some(lon)) => Some(format!("Lat: {lat:.2}, Lon: {lon:.2}")),
        _ => None,
    };

    themed_card([hstack("1rem")
        .child(
            vstack("0.25rem")
                .css("flex", "1")
                .child(label(name, DARK_THEME.text_primary).css("font_weight", "600"))
                .maybe_child(
                    location.country.as_deref().map(|c| {
                        label(format!("{}, {c}", location.city), DARK_THEME.text_secondary)
                    }),
                )
                .maybe_child(coordinates.map(|c| {
                    label(c, DARK_THEME.text_muted).css("font_size", "0.75rem")
                })),
        )
        .child(load_button(&location.city, "Load Weather", ButtonVariant::Primary))
        .child(action_form(
            &delete_location_route(location.id),
            &[],
            themed_button("Delete", ButtonVariant::Outline)
                .css("color", DARK_THEME.error)
                .css("padding", "0.5rem 1rem"),
        ))
        .into()])
    .into()
}

fn locations_view(session: &WeatherSession) -> Node {
    let body: Node = if session.saved_locations.is_empty() {
        empty_state("No saved locations").into()
    } else {
        vstack("0.75rem")
            .children(session.saved_locations.iter().map(location_item))
            .into()
    };
    vstack("1rem")
        .child(heading("h2", "Saved Locations", "1.5rem"))
        .child(body)
        .into()
}

fn content(session: &WeatherSession) -> Node {
    match session.current_view {
        WeatherView::Current => match &session.current_weather {
            Some(weather) => current_view(session, weather),
            None => empty_state("Search for a city to see weather data").into(),
        },
        WeatherView::Forecast => forecast_view(session),
        WeatherView::History => history_view(session),
        WeatherView::Locations => locations_view(session),
    }
}

/// The whole page for one session.
#[must_use]
pub fn weather_page(session: &WeatherSession) -> Node {
    let main = vstack("1.5rem")
        .css("max_width", "1000px")
        .css("margin", "0 auto")
        .css("padding", "2rem 1rem")
        .child(page_header(
            TITLE,
            Some("Get current weather, forecasts, and save your favorite locations"),
        ))
        .maybe_child(session.error_message.as_deref().map(error_message))
        .maybe_child(session.success_message.as_deref().map(success_message))
        .child(search_card(session))
        .child(view_buttons(session))
        .child(content(session));

    Element::new("div")
        .style(base_style())
        .css("min_height", "100vh")
        .child(navigation_bar("Weather App", &[("Dashboard", "/"), ("API", "/api/state")]))
        .child(main)
        .into()
}
