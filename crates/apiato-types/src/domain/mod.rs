pub mod http;
pub mod params;
pub mod results;
