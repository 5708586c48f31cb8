use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use dashkit_core::components::CLEAR_MESSAGES_ROUTE;
use dashkit_core::db::{Database, HISTORY_LIMIT, lock};
use dashkit_core::error::AppError;
use dashkit_core::models::{CurrentWeather, ForecastDay, SavedLocation, WeatherHistory};
use dashkit_core::openweather::{FORECAST_DAYS, parse_forecast, parse_weather_data};
use dashkit_core::view::Node;
use dashkit_core::weather::{WeatherCommand, WeatherProvider, WeatherSession};
use dashkit_core::weather_page::{self, weather_page};

use super::{
    ApiError, MAX_SESSIONS, SessionHandle, SessionStore, back_home, page, with_common_layers,
};

#[derive(Clone)]
pub struct WeatherState {
    db: Arc<Mutex<Database>>,
    provider: Arc<dyn WeatherProvider>,
    sessions: Arc<SessionStore<WeatherSession>>,
}

impl WeatherState {
    pub fn new(db: Database, provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            provider,
            sessions: Arc::new(SessionStore::new(MAX_SESSIONS)),
        }
    }

    fn session(&self, headers: &HeaderMap) -> Result<SessionHandle<WeatherSession>, ApiError> {
        SessionHandle::resolve(&self.sessions, headers, || WeatherSession::new(&self.db))
    }

    /// Run form commands in order, stopping at the first failure, then
    /// redirect back to the page where the outcome is shown.
    async fn run_form(
        &self,
        headers: &HeaderMap,
        commands: Vec<WeatherCommand>,
    ) -> Result<Response, ApiError> {
        let handle = self.session(headers)?;
        {
            let mut session = handle.state.lock().await;
            for command in commands {
                if session
                    .apply(self.provider.as_ref(), &self.db, command)
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
        Ok(handle.respond(back_home()))
    }

    async fn record_error(
        &self,
        headers: &HeaderMap,
        err: &AppError,
        action: &str,
    ) -> Result<Response, ApiError> {
        let handle = self.session(headers)?;
        {
            let mut session = handle.state.lock().await;
            session.error_message = Some(err.user_message(action));
            session.success_message = None;
        }
        Ok(handle.respond(back_home()))
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CityForm {
    city: String,
}

#[derive(Deserialize)]
struct CoordinatesForm {
    latitude: String,
    longitude: String,
}

#[derive(Deserialize)]
struct ViewForm {
    view: String,
}

#[derive(Deserialize)]
struct CityQuery {
    city: String,
}

#[derive(Serialize)]
struct StateResponse {
    session: WeatherSession,
    has_current_weather: bool,
    weather_icon_url: Option<String>,
    wind_direction_name: &'static str,
}

impl StateResponse {
    fn from_session(session: &WeatherSession) -> Self {
        Self {
            session: session.clone(),
            has_current_weather: session.has_current_weather(),
            weather_icon_url: session.weather_icon_url(),
            wind_direction_name: session.wind_direction_name(),
        }
    }
}

fn parse_coordinates(form: &CoordinatesForm) -> Result<(f64, f64), AppError> {
    let parse = |raw: &str| raw.trim().parse::<f64>();
    match (parse(&form.latitude), parse(&form.longitude)) {
        (Ok(lat), Ok(lon)) => Ok((lat, lon)),
        _ => Err(AppError::validation("Latitude and longitude must be numbers")),
    }
}

// --- HTML handlers ---

async fn index(
    State(state): State<WeatherState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let html = {
        let session = handle.state.lock().await;
        page(weather_page::TITLE, &weather_page(&session))
    };
    Ok(handle.respond(html))
}

async fn search_form(
    State(state): State<WeatherState>,
    headers: HeaderMap,
    Form(form): Form<CityForm>,
) -> Result<Response, ApiError> {
    let commands = vec![
        WeatherCommand::SetSearchCity { value: form.city },
        WeatherCommand::Search,
    ];
    state.run_form(&headers, commands).await
}

async fn coordinates_form(
    State(state): State<WeatherState>,
    headers: HeaderMap,
    Form(form): Form<CoordinatesForm>,
) -> Result<Response, ApiError> {
    match parse_coordinates(&form) {
        Ok((latitude, longitude)) => {
            let command = WeatherCommand::SearchAt {
                latitude,
                longitude,
            };
            state.run_form(&headers, vec![command]).await
        }
        Err(err) => state.record_error(&headers, &err, "fetch weather").await,
    }
}

async fn forecast_form(
    State(state): State<WeatherState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.run_form(&headers, vec![WeatherCommand::GetForecast]).await
}

async fn view_form(
    State(state): State<WeatherState>,
    headers: HeaderMap,
    Form(form): Form<ViewForm>,
) -> Result<Response, ApiError> {
    match form.view.parse() {
        Ok(value) => {
            state
                .run_form(&headers, vec![WeatherCommand::SetView { value }])
                .await
        }
        Err(err) => state.record_error(&headers, &err, "update view").await,
    }
}

async fn save_form(
    State(state): State<WeatherState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.run_form(&headers, vec![WeatherCommand::SaveLocation]).await
}

async fn load_location_form(
    State(state): State<WeatherState>,
    headers: HeaderMap,
    Form(form): Form<CityForm>,
) -> Result<Response, ApiError> {
    let command = WeatherCommand::LoadForLocation { city: form.city };
    state.run_form(&headers, vec![command]).await
}

async fn delete_location_form(
    State(state): State<WeatherState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state
        .run_form(&headers, vec![WeatherCommand::DeleteLocation { id }])
        .await
}

async fn clear_messages(
    State(state): State<WeatherState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.run_form(&headers, vec![WeatherCommand::ClearMessages]).await
}

// --- JSON handlers ---

async fn api_state(
    State(state): State<WeatherState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let body = {
        let session = handle.state.lock().await;
        Json(StateResponse::from_session(&session))
    };
    Ok(handle.respond(body))
}

async fn api_view(
    State(state): State<WeatherState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let tree: Node = {
        let session = handle.state.lock().await;
        weather_page(&session)
    };
    Ok(handle.respond(Json(tree)))
}

async fn api_command(
    State(state): State<WeatherState>,
    headers: HeaderMap,
    Json(command): Json<WeatherCommand>,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let body = {
        let mut session = handle.state.lock().await;
        session
            .apply(state.provider.as_ref(), &state.db, command)
            .await?;
        Json(StateResponse::from_session(&session))
    };
    Ok(handle.respond(body))
}

/// Current weather for one city, without touching any session or history.
async fn current_weather(
    State(state): State<WeatherState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<CurrentWeather>, ApiError> {
    let city = query.city.trim();
    if city.is_empty() {
        return Err(AppError::validation("Please enter a city name").into());
    }
    let raw = state.provider.current_weather(city).await?;
    Ok(Json(parse_weather_data(&raw)?))
}

async fn forecast(
    State(state): State<WeatherState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<Vec<ForecastDay>>, ApiError> {
    let city = query.city.trim();
    if city.is_empty() {
        return Err(AppError::validation("Please enter a city name").into());
    }
    let raw = state.provider.forecast(city, FORECAST_DAYS).await?;
    Ok(Json(parse_forecast(&raw)?))
}

async fn history(State(state): State<WeatherState>) -> Result<Json<Vec<WeatherHistory>>, ApiError> {
    let records = lock(&state.db).recent_weather_history(HISTORY_LIMIT)?;
    Ok(Json(records))
}

async fn locations(
    State(state): State<WeatherState>,
) -> Result<Json<Vec<SavedLocation>>, ApiError> {
    let saved = lock(&state.db).list_saved_locations()?;
    Ok(Json(saved))
}

async fn delete_location(
    State(state): State<WeatherState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let handle = state.session(&headers)?;
    let deleted = {
        let mut session = handle.state.lock().await;
        session.delete_location(&state.db, id)?
    };
    if !deleted {
        return Err(ApiError::NotFound(format!("Location {id} not found")));
    }
    Ok(handle.respond(StatusCode::NO_CONTENT))
}

pub fn build_router(state: WeatherState) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route(weather_page::SEARCH_ROUTE, post(search_form))
        .route(weather_page::COORDINATES_ROUTE, post(coordinates_form))
        .route(weather_page::FORECAST_ROUTE, post(forecast_form))
        .route(weather_page::VIEW_ROUTE, post(view_form))
        .route(weather_page::SAVE_ROUTE, post(save_form))
        .route(weather_page::LOAD_LOCATION_ROUTE, post(load_location_form))
        .route("/locations/{id}/delete", post(delete_location_form))
        .route(CLEAR_MESSAGES_ROUTE, post(clear_messages))
        .route("/api/state", get(api_state))
        .route("/api/view", get(api_view))
        .route("/api/commands", post(api_command))
        .route("/api/weather", get(current_weather))
        .route("/api/forecast", get(forecast))
        .route("/api/history", get(history))
        .route("/api/locations", get(locations))
        .route("/api/locations/{id}", delete(delete_location))
        .with_state(state);
    with_common_layers(router)
}

pub async fn start_server(
    db: Database,
    provider: Arc<dyn WeatherProvider>,
    bind: &str,
    port: u16,
) -> anyhow::Result<()> {
    let app = build_router(WeatherState::new(db, provider));
    super::serve(app, "weather app", bind, port).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use dashkit_core::db::Schema;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    /// Serves fixed payloads; "Nowhere" fails and no key means a config error.
    struct StubProvider {
        configured: bool,
    }

    fn current(city: &str) -> Value {
        json!({
            "coord": {"lon": 13.4, "lat": 52.52},
            "weather": [{"main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {"temp": 14.26, "feels_like": 13.9, "humidity": 88, "pressure": 1009},
            "wind": {"speed": 5.5, "deg": 200},
            "sys": {"country": "DE"},
            "timezone": 7200,
            "name": city
        })
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current_weather(&self, city: &str) -> dashkit_core::error::Result<Value> {
            if !self.configured {
                return Err(AppError::Config("OpenWeatherMap API key not found.".to_string()));
            }
            if city == "Nowhere" {
                return Err(AppError::upstream("HTTP 404 Not Found: city not found"));
            }
            Ok(current(city))
        }

        async fn weather_at(&self, _lat: f64, _lon: f64) -> dashkit_core::error::Result<Value> {
            Ok(current("Berlin"))
        }

        async fn forecast(&self, _city: &str, days: u32) -> dashkit_core::error::Result<Value> {
            let list: Vec<Value> = (0..days * 8)
                .map(|i| {
                    json!({
                        "dt_txt": format!("2024-03-{:02} 00:00:00", 10 + i / 8),
                        "main": {"temp": 9.0, "feels_like": 7.5, "humidity": 70},
                        "wind": {"speed": 3.0},
                        "weather": [{"main": "Clouds", "description": "overcast clouds", "icon": "04d"}]
                    })
                })
                .collect();
            Ok(json!({"list": list}))
        }
    }

    fn test_app_with(configured: bool) -> Router {
        let db = Database::open_in_memory(Schema::Weather).unwrap();
        build_router(WeatherState::new(db, Arc::new(StubProvider { configured })))
    }

    fn test_app() -> Router {
        test_app_with(true)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let set = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        set.split(';').next().unwrap().to_string()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn form_post(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn state_of(app: &Router, cookie: &str) -> Value {
        let response = app
            .clone()
            .oneshot(
                Request::get("/api/state")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        body_json(response).await
    }

    #[tokio::test]
    async fn index_renders_empty_dashboard() {
        let response = test_app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let csp = response.headers().get("content-security-policy").unwrap();
        assert!(csp.to_str().unwrap().starts_with("default-src 'none'"));
        let html = body_text(response).await;
        assert!(html.contains("Weather Dashboard"));
        assert!(html.contains("Search for a city to see weather data"));
    }

    #[tokio::test]
    async fn search_save_and_duplicate_flow() {
        let app = test_app();
        let cookie = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(form_post("/search", &cookie, "city=Berlin"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let state = state_of(&app, &cookie).await;
        assert_eq!(state["session"]["current_weather"]["city"], "Berlin");
        assert_eq!(state["session"]["success_message"], "Weather data loaded for Berlin");
        assert_eq!(state["wind_direction_name"], "SSW");
        assert_eq!(state["session"]["weather_history"].as_array().unwrap().len(), 1);

        app.clone()
            .oneshot(form_post("/locations", &cookie, ""))
            .await
            .unwrap();
        let state = state_of(&app, &cookie).await;
        assert_eq!(state["session"]["success_message"], "Location Berlin saved!");

        app.clone()
            .oneshot(form_post("/locations", &cookie, ""))
            .await
            .unwrap();
        let state = state_of(&app, &cookie).await;
        assert_eq!(state["session"]["error_message"], "Location already saved");
        assert_eq!(state["session"]["saved_locations"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn forecast_form_switches_view() {
        let app = test_app();
        let cookie = new_session(&app).await;
        app.clone()
            .oneshot(form_post("/forecast", &cookie, ""))
            .await
            .unwrap();
        let state = state_of(&app, &cookie).await;
        assert_eq!(state["session"]["error_message"], "Please search for a city first");

        app.clone()
            .oneshot(form_post("/search", &cookie, "city=Berlin"))
            .await
            .unwrap();
        app.clone()
            .oneshot(form_post("/forecast", &cookie, ""))
            .await
            .unwrap();
        let state = state_of(&app, &cookie).await;
        assert_eq!(state["session"]["current_view"], "forecast");
        assert_eq!(state["session"]["forecast_data"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn bad_coordinates_record_error() {
        let app = test_app();
        let cookie = new_session(&app).await;
        app.clone()
            .oneshot(form_post("/search/coordinates", &cookie, "latitude=north&longitude=1"))
            .await
            .unwrap();
        let state = state_of(&app, &cookie).await;
        assert_eq!(
            state["session"]["error_message"],
            "Latitude and longitude must be numbers"
        );
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let app = test_app();
        let alice = new_session(&app).await;
        let bob = new_session(&app).await;
        app.clone()
            .oneshot(form_post("/search", &alice, "city=Berlin"))
            .await
            .unwrap();

        assert_eq!(state_of(&app, &alice).await["has_current_weather"], true);
        assert_eq!(state_of(&app, &bob).await["has_current_weather"], false);
        assert_eq!(state_of(&app, &bob).await["wind_direction_name"], "N/A");
    }

    #[tokio::test]
    async fn api_weather_status_mapping() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(get_request("/api/weather?city=Nowhere"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = app
            .clone()
            .oneshot(get_request("/api/weather?city=%20"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test_app_with(false)
            .oneshot(get_request("/api/weather?city=Berlin"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app
            .oneshot(get_request("/api/weather?city=Berlin"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["city"], "Berlin");
        assert_eq!(json["weather_description"], "Light Rain");
    }

    #[tokio::test]
    async fn api_forecast_returns_five_days() {
        let response = test_app()
            .oneshot(get_request("/api/forecast?city=Berlin"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 5);
        assert_eq!(json[4]["date"], "2024-03-14");
    }

    #[tokio::test]
    async fn api_command_and_delete_location() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/commands")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"command":"load_for_location","city":"Berlin"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        let cookie = set.split(';').next().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/commands")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"command":"save_location"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        let id = json["session"]["saved_locations"][0]["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/locations/{id}"))
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::delete(format!("/api/locations/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_command_error_maps_to_status() {
        let response = test_app()
            .oneshot(
                Request::post("/api/commands")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"command":"save_location"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No current weather data to save");
    }
}
