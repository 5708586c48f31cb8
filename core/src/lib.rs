pub mod components;
pub mod db;
pub mod error;
pub mod models;
pub mod openweather;
pub mod theme;
pub mod todo;
pub mod todo_page;
pub mod view;
pub mod weather;
pub mod weather_page;
