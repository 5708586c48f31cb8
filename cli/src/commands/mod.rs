mod helpers;
mod todo;
mod weather;

use anyhow::Result;

use crate::config::Config;
use dashkit_core::db::Schema;

pub(crate) use todo::{
    cmd_todo_add, cmd_todo_delete, cmd_todo_export, cmd_todo_list, cmd_todo_toggle,
};
pub(crate) use weather::{
    cmd_weather_current, cmd_weather_export, cmd_weather_forecast, cmd_weather_forget,
    cmd_weather_history, cmd_weather_locations, cmd_weather_save,
};

/// Create the data directory and both app databases.
pub(crate) fn cmd_init(config: &Config) -> Result<()> {
    for schema in [Schema::Todo, Schema::Weather] {
        config.open_db(schema)?;
        println!(
            "Initialized {} database at {}",
            schema.app_name(),
            config.db_path(schema).display()
        );
    }
    if config.api_key.is_none() {
        eprintln!("Note: set OPENWEATHER_API_KEY (or add it to .env) to fetch weather data.");
    }
    Ok(())
}
