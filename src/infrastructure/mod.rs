// Infrastructure layer - External dependencies and adapters
pub mod canvas_board;
pub mod comtrade;
pub mod config;
pub mod http;
pub mod openweather;
#[cfg(test)]
pub mod test_support;
pub mod who_gho;
pub mod world_bank;
