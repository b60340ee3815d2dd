pub mod openweather;
pub mod prod_db;
