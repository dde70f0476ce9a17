//! Weather lookup tool
//!
//! Resolves a city name to coordinates, then fetches the current weather at
//! those coordinates. The lookups sit behind [`WeatherService`]; the default
//! implementation talks to the Open-Meteo geocoding and forecast APIs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::WeatherConfig;
use crate::error::{ChatlineError, Result, ToolError};

use super::{ParameterSpec, Tool, ToolArguments};

const TOOL_NAME: &str = "getWeather";

/// A resolved location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions at a location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentWeather {
    /// Degrees Celsius
    pub temperature: f64,
    /// WMO weather interpretation code
    pub weather_code: i64,
}

/// Geocoding and current-weather lookups.
///
/// `Ok(None)` means the service answered but had nothing for the query;
/// `Err` means the service could not be reached or refused the request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn geocode(&self, city: &str) -> Result<Option<Coordinates>>;

    async fn current_weather(&self, at: Coordinates) -> Result<Option<CurrentWeather>>;
}

/// Human-readable description for a WMO weather code.
///
/// # Example
/// ```
/// use chatline::tools::weather::describe_weather_code;
///
/// assert_eq!(describe_weather_code(0), "Clear sky");
/// assert_eq!(describe_weather_code(63), "Rain: Moderate");
/// assert_eq!(describe_weather_code(12), "Unknown weather condition");
/// ```
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Drizzle: Light",
        53 => "Drizzle: Moderate",
        55 => "Drizzle: Dense intensity",
        56 => "Freezing Drizzle: Light",
        57 => "Freezing Drizzle: Dense intensity",
        61 => "Rain: Slight",
        63 => "Rain: Moderate",
        65 => "Rain: Heavy intensity",
        66 => "Freezing Rain: Light",
        67 => "Freezing Rain: Heavy intensity",
        71 => "Snow fall: Slight",
        73 => "Snow fall: Moderate",
        75 => "Snow fall: Heavy intensity",
        77 => "Snow grains",
        80 => "Rain showers: Slight",
        81 => "Rain showers: Moderate",
        82 => "Rain showers: Violent",
        85 => "Snow showers: Slight",
        86 => "Snow showers: Heavy",
        95 => "Thunderstorm: Slight or moderate",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown weather condition",
    }
}

// ============================================================================
// Open-Meteo client
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<ForecastCurrent>,
}

#[derive(Debug, Deserialize)]
struct ForecastCurrent {
    temperature: f64,
    weathercode: i64,
}

impl GeocodingResponse {
    /// Best match; Open-Meteo omits `results` entirely when nothing matches.
    fn first(self) -> Option<Coordinates> {
        self.results.into_iter().next().map(|r| Coordinates {
            latitude: r.latitude,
            longitude: r.longitude,
        })
    }
}

impl ForecastResponse {
    fn current(self) -> Option<CurrentWeather> {
        self.current_weather.map(|c| CurrentWeather {
            temperature: c.temperature,
            weather_code: c.weathercode,
        })
    }
}

/// [`WeatherService`] backed by the Open-Meteo HTTP APIs.
pub struct OpenMeteoClient {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                ToolError::execution(
                    TOOL_NAME,
                    format!(
                        "An error occurred while connecting to the weather service: {}",
                        e
                    ),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution(
                TOOL_NAME,
                format!("Error fetching {} (HTTP {})", what, status.as_u16()),
            )
            .into());
        }

        response.json::<T>().await.map_err(|e| {
            ChatlineError::from(ToolError::execution(
                TOOL_NAME,
                format!("Unreadable {} response: {}", what, e),
            ))
        })
    }
}

#[async_trait]
impl WeatherService for OpenMeteoClient {
    async fn geocode(&self, city: &str) -> Result<Option<Coordinates>> {
        let body: GeocodingResponse = self
            .get_json(
                &self.geocoding_url,
                &[("name", city.to_string()), ("count", "1".to_string())],
                &format!("coordinates for {}", city),
            )
            .await?;

        Ok(body.first())
    }

    async fn current_weather(&self, at: Coordinates) -> Result<Option<CurrentWeather>> {
        let body: ForecastResponse = self
            .get_json(
                &self.forecast_url,
                &[
                    ("latitude", at.latitude.to_string()),
                    ("longitude", at.longitude.to_string()),
                    ("current_weather", "true".to_string()),
                ],
                "weather data",
            )
            .await?;

        Ok(body.current())
    }
}

// ============================================================================
// Tool
// ============================================================================

/// `getWeather(city)`: current temperature and conditions for a city.
pub struct WeatherTool {
    service: Arc<dyn WeatherService>,
}

impl WeatherTool {
    pub fn new(service: Arc<dyn WeatherService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Get the current weather for a specified city or town."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "city",
            "Name of the city or town, e.g. 'Oslo'",
        )]
    }

    async fn execute(&self, args: &ToolArguments) -> Result<String> {
        let city = args.require("city")?;

        let Some(coordinates) = self.service.geocode(city).await? else {
            return Ok(format!(
                "Could not find coordinates for {}. Please try a different city name.",
                city
            ));
        };
        debug!(city, lat = coordinates.latitude, lon = coordinates.longitude, "Geocoded city");

        let Some(current) = self.service.current_weather(coordinates).await? else {
            return Ok(format!("No current weather data available for {}", city));
        };

        Ok(format!(
            "The current weather in {} is {} with a temperature of {:.1}°C.",
            city,
            describe_weather_code(current.weather_code),
            current.temperature
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_geocoding_without_results_key_is_none() {
        let body: GeocodingResponse =
            serde_json::from_str(r#"{"generationtime_ms": 0.4}"#).unwrap();
        assert_eq!(body.first(), None);
    }

    #[test]
    fn test_geocoding_empty_results_is_none() {
        let body: GeocodingResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert_eq!(body.first(), None);
    }

    #[test]
    fn test_geocoding_takes_first_result() {
        let body: GeocodingResponse = serde_json::from_str(
            r#"{"results": [
                {"id": 3936456, "name": "Lima", "latitude": -12.04318, "longitude": -77.02824},
                {"id": 4517009, "name": "Lima", "latitude": 40.74255, "longitude": -84.10523}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            body.first(),
            Some(Coordinates {
                latitude: -12.04318,
                longitude: -77.02824
            })
        );
    }

    #[test]
    fn test_forecast_without_current_weather_is_none() {
        let body: ForecastResponse =
            serde_json::from_str(r#"{"latitude": -12.0, "longitude": -77.0, "elevation": 154.0}"#)
                .unwrap();
        assert_eq!(body.current(), None);
    }

    #[test]
    fn test_forecast_current_weather_maps_code() {
        let body: ForecastResponse = serde_json::from_str(
            r#"{"current_weather": {"temperature": 18.4, "windspeed": 9.7, "weathercode": 3, "time": "2024-05-01T12:00"}}"#,
        )
        .unwrap();
        assert_eq!(
            body.current(),
            Some(CurrentWeather {
                temperature: 18.4,
                weather_code: 3
            })
        );
    }

    const TABLE: &[(i64, &str)] = &[
        (0, "Clear sky"),
        (1, "Mainly clear"),
        (2, "Partly cloudy"),
        (3, "Overcast"),
        (45, "Fog"),
        (48, "Depositing rime fog"),
        (51, "Drizzle: Light"),
        (53, "Drizzle: Moderate"),
        (55, "Drizzle: Dense intensity"),
        (56, "Freezing Drizzle: Light"),
        (57, "Freezing Drizzle: Dense intensity"),
        (61, "Rain: Slight"),
        (63, "Rain: Moderate"),
        (65, "Rain: Heavy intensity"),
        (66, "Freezing Rain: Light"),
        (67, "Freezing Rain: Heavy intensity"),
        (71, "Snow fall: Slight"),
        (73, "Snow fall: Moderate"),
        (75, "Snow fall: Heavy intensity"),
        (77, "Snow grains"),
        (80, "Rain showers: Slight"),
        (81, "Rain showers: Moderate"),
        (82, "Rain showers: Violent"),
        (85, "Snow showers: Slight"),
        (86, "Snow showers: Heavy"),
        (95, "Thunderstorm: Slight or moderate"),
        (96, "Thunderstorm with slight hail"),
        (99, "Thunderstorm with heavy hail"),
    ];

    fn args(city: &str) -> ToolArguments {
        ToolArguments::from_pairs(TOOL_NAME, &[("city", city)])
    }

    #[test]
    fn test_weather_code_table() {
        for (code, description) in TABLE {
            assert_eq!(describe_weather_code(*code), *description, "code {}", code);
        }
        for code in (-1..=100).filter(|c| !TABLE.iter().any(|(k, _)| k == c)) {
            assert_eq!(describe_weather_code(code), "Unknown weather condition");
        }
    }

    #[tokio::test]
    async fn test_reports_current_weather() {
        let mut service = MockWeatherService::new();
        let oslo = Coordinates {
            latitude: 59.91,
            longitude: 10.75,
        };
        service
            .expect_geocode()
            .with(eq("Oslo"))
            .times(1)
            .returning(move |_| Ok(Some(oslo)));
        service
            .expect_current_weather()
            .with(eq(oslo))
            .times(1)
            .returning(|_| {
                Ok(Some(CurrentWeather {
                    temperature: 7.26,
                    weather_code: 63,
                }))
            });

        let tool = WeatherTool::new(Arc::new(service));
        let text = tool.execute(&args("Oslo")).await.unwrap();
        assert_eq!(
            text,
            "The current weather in Oslo is Rain: Moderate with a temperature of 7.3°C."
        );
    }

    #[tokio::test]
    async fn test_unknown_city_is_text_not_failure() {
        let mut service = MockWeatherService::new();
        service.expect_geocode().returning(|_| Ok(None));
        service.expect_current_weather().never();

        let tool = WeatherTool::new(Arc::new(service));
        let text = tool
            .execute(&args("Nowhere-Does-Not-Exist"))
            .await
            .unwrap();
        assert_eq!(
            text,
            "Could not find coordinates for Nowhere-Does-Not-Exist. Please try a different city name."
        );
    }

    #[tokio::test]
    async fn test_missing_current_weather() {
        let mut service = MockWeatherService::new();
        service.expect_geocode().returning(|_| {
            Ok(Some(Coordinates {
                latitude: 0.0,
                longitude: 0.0,
            }))
        });
        service.expect_current_weather().returning(|_| Ok(None));

        let tool = WeatherTool::new(Arc::new(service));
        let text = tool.execute(&args("Null Island")).await.unwrap();
        assert_eq!(text, "No current weather data available for Null Island");
    }

    #[tokio::test]
    async fn test_service_failure_is_execution_error() {
        let mut service = MockWeatherService::new();
        service.expect_geocode().returning(|_| {
            Err(ToolError::execution(TOOL_NAME, "Error fetching coordinates for Lima (HTTP 503)").into())
        });

        let tool = WeatherTool::new(Arc::new(service));
        let err = tool.execute(&args("Lima")).await.unwrap_err();
        assert!(matches!(
            err,
            ChatlineError::Tool(ToolError::Execution { .. })
        ));
    }

    #[test]
    fn test_descriptor() {
        let tool = WeatherTool::new(Arc::new(MockWeatherService::new()));
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.name, "getWeather");
        assert_eq!(descriptor.parameters.len(), 1);
        assert!(descriptor.parameters[0].required);
    }

    #[test]
    fn test_open_meteo_client_from_config() {
        let client = OpenMeteoClient::new(&WeatherConfig::default()).unwrap();
        assert!(client.geocoding_url.contains("geocoding-api.open-meteo.com"));
        assert!(client.forecast_url.contains("api.open-meteo.com"));
    }
}
