//! Forecast response parsing.

use serde::Deserialize;
use serde_json::Value;

use crate::dates::DAY_IN_MILLIS;
use crate::types::{CityInfo, ParsedForecast, WeatherError, WeatherValues};

const HTTP_OK: i64 = 200;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    city: ApiCity,
    list: Vec<ApiDay>,
}

#[derive(Debug, Deserialize)]
struct ApiCity {
    name: Option<String>,
    coord: ApiCoord,
}

#[derive(Debug, Deserialize)]
struct ApiCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ApiDay {
    temp: ApiTemperature,
    pressure: f64,
    humidity: f64,
    speed: f64,
    deg: f64,
    weather: Vec<ApiCondition>,
}

#[derive(Debug, Deserialize)]
struct ApiTemperature {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    id: i32,
}

/// Read the embedded `cod` status, which the API sends as a number or a
/// numeric string.
fn message_code(body: &Value) -> Result<Option<i64>, WeatherError> {
    match body.get("cod") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| WeatherError::Parse(format!("invalid cod: {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| WeatherError::Parse(format!("invalid cod: {}", s))),
        Some(other) => Err(WeatherError::Parse(format!("invalid cod: {}", other))),
    }
}

/// Parse a forecast response body into storable rows.
///
/// Returns `Ok(None)` when the server embedded a non-200 `cod` (for example
/// 404 for an unknown location): there is no forecast to store. The `i`-th
/// list element is assigned the date `today_normalized + i days`.
pub fn parse_forecast(
    json: &str,
    today_normalized: i64,
) -> Result<Option<ParsedForecast>, WeatherError> {
    if json.trim().is_empty() {
        return Err(WeatherError::EmptyResponse);
    }

    let body: Value = serde_json::from_str(json)?;

    if let Some(code) = message_code(&body)? {
        if code != HTTP_OK {
            tracing::warn!("Forecast response carried status code {}", code);
            return Ok(None);
        }
    }

    let response: ForecastResponse = serde_json::from_value(body)?;

    let entries = response
        .list
        .into_iter()
        .enumerate()
        .map(|(i, day)| {
            let condition = day.weather.first().ok_or_else(|| {
                WeatherError::Parse(format!("forecast day {} has no weather condition", i))
            })?;
            let offset = i64::try_from(i)
                .map_err(|_| WeatherError::Parse("forecast list too long".to_string()))?;

            Ok(WeatherValues {
                date: today_normalized + DAY_IN_MILLIS * offset,
                weather_id: condition.id,
                min: day.temp.min,
                max: day.temp.max,
                humidity: day.humidity,
                pressure: day.pressure,
                wind_speed: day.speed,
                degrees: day.deg,
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    tracing::debug!("Parsed {} forecast entries", entries.len());

    Ok(Some(ParsedForecast {
        city: CityInfo {
            name: response.city.name,
            latitude: response.city.coord.lat,
            longitude: response.city.coord.lon,
        },
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::is_date_normalized;

    const TODAY: i64 = 1_717_804_800_000; // 2024-06-08T00:00:00Z

    fn sample() -> serde_json::Value {
        serde_json::json!({
            "city": {
                "id": 5375480,
                "name": "Mountain View",
                "coord": { "lat": 37.4056, "lon": -122.0775 },
                "country": "US"
            },
            "cod": "200",
            "cnt": 2,
            "list": [
                {
                    "dt": 1717862400,
                    "temp": { "day": 20.1, "min": 12.5, "max": 24.3 },
                    "pressure": 1013.2,
                    "humidity": 81,
                    "weather": [{ "id": 800, "main": "Clear", "description": "sky is clear" }],
                    "speed": 3.4,
                    "deg": 290
                },
                {
                    "dt": 1717948800,
                    "temp": { "day": 18.0, "min": 11.0, "max": 19.5 },
                    "pressure": 1010.0,
                    "humidity": 70,
                    "weather": [{ "id": 501, "main": "Rain", "description": "moderate rain" }],
                    "speed": 5.1,
                    "deg": 45
                }
            ]
        })
    }

    #[test]
    fn test_parse_assigns_consecutive_normalized_dates() {
        let parsed = parse_forecast(&sample().to_string(), TODAY).unwrap().unwrap();

        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].date, TODAY);
        assert_eq!(parsed.entries[1].date, TODAY + DAY_IN_MILLIS);
        assert!(parsed.entries.iter().all(|e| is_date_normalized(e.date)));
    }

    #[test]
    fn test_parse_extracts_fields() {
        let parsed = parse_forecast(&sample().to_string(), TODAY).unwrap().unwrap();
        let first = &parsed.entries[0];

        assert_eq!(first.weather_id, 800);
        assert_eq!(first.min, 12.5);
        assert_eq!(first.max, 24.3);
        assert_eq!(first.humidity, 81.0);
        assert_eq!(first.pressure, 1013.2);
        assert_eq!(first.wind_speed, 3.4);
        assert_eq!(first.degrees, 290.0);

        assert_eq!(parsed.city.name.as_deref(), Some("Mountain View"));
        assert_eq!(parsed.city.latitude, 37.4056);
        assert_eq!(parsed.city.longitude, -122.0775);
    }

    #[test]
    fn test_numeric_ok_code_is_accepted() {
        let mut body = sample();
        body["cod"] = serde_json::json!(200);
        assert!(parse_forecast(&body.to_string(), TODAY).unwrap().is_some());
    }

    #[test]
    fn test_missing_code_is_accepted() {
        let mut body = sample();
        body.as_object_mut().unwrap().remove("cod");
        assert!(parse_forecast(&body.to_string(), TODAY).unwrap().is_some());
    }

    #[test]
    fn test_not_found_code_means_no_data() {
        let body = serde_json::json!({ "cod": "404", "message": "city not found" });
        assert!(parse_forecast(&body.to_string(), TODAY).unwrap().is_none());
    }

    #[test]
    fn test_server_error_code_means_no_data() {
        let body = serde_json::json!({ "cod": 500 });
        assert!(parse_forecast(&body.to_string(), TODAY).unwrap().is_none());
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let mut body = sample();
        body["list"][1].as_object_mut().unwrap().remove("pressure");
        let err = parse_forecast(&body.to_string(), TODAY).unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[test]
    fn test_empty_weather_array_is_parse_error() {
        let mut body = sample();
        body["list"][0]["weather"] = serde_json::json!([]);
        let err = parse_forecast(&body.to_string(), TODAY).unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_forecast("{not json", TODAY),
            Err(WeatherError::Parse(_))
        ));
        assert!(matches!(
            parse_forecast("   ", TODAY),
            Err(WeatherError::EmptyResponse)
        ));
    }
}
