/// [FRED API](https://fred.stlouisfed.org/docs/api/fred/series_observations.html)
pub mod fred;
