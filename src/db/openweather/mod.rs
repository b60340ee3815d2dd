pub mod client;
pub mod current_weather_archive;
pub mod extract;
pub mod transform;
