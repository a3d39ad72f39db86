//! Display formatting for stored forecast values.

use crate::types::UnitSystem;

const KMH_TO_MPH: f64 = 0.621_371_192_237_334;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

/// Round and suffix a Celsius temperature in the requested unit system.
pub fn format_temperature(celsius: f64, units: UnitSystem) -> String {
    let value = match units {
        UnitSystem::Metric => celsius,
        UnitSystem::Imperial => celsius_to_fahrenheit(celsius),
    };
    format!("{:.0}\u{00B0}", value)
}

pub fn format_high_low(high: f64, low: f64, units: UnitSystem) -> String {
    format!(
        "{} / {}",
        format_temperature(high, units),
        format_temperature(low, units)
    )
}

/// Compass point for a wind bearing in degrees (8 sectors, N centred on 0).
pub fn wind_direction(degrees: f64) -> &'static str {
    let degrees = degrees.rem_euclid(360.0);
    if !(22.5..337.5).contains(&degrees) {
        "N"
    } else if degrees < 67.5 {
        "NE"
    } else if degrees < 112.5 {
        "E"
    } else if degrees < 157.5 {
        "SE"
    } else if degrees < 202.5 {
        "S"
    } else if degrees < 247.5 {
        "SW"
    } else if degrees < 292.5 {
        "W"
    } else {
        "NW"
    }
}

pub fn format_wind(speed_kmh: f64, degrees: f64, units: UnitSystem) -> String {
    let direction = wind_direction(degrees);
    match units {
        UnitSystem::Metric => format!("{:.0} km/h {}", speed_kmh, direction),
        UnitSystem::Imperial => format!("{:.0} mph {}", speed_kmh * KMH_TO_MPH, direction),
    }
}

pub fn format_humidity(humidity: f64) -> String {
    format!("{:.0} %", humidity)
}

pub fn format_pressure(pressure: f64) -> String {
    format!("{:.0} hPa", pressure)
}

/// Human description for an OpenWeatherMap condition id.
pub fn description_for_weather_id(id: i32) -> String {
    let text = match id {
        200..=232 => match id {
            200 => "Thunderstorm with light rain",
            201 => "Thunderstorm with rain",
            202 => "Thunderstorm with heavy rain",
            210 => "Light thunderstorm",
            211 => "Thunderstorm",
            212 => "Heavy thunderstorm",
            221 => "Ragged thunderstorm",
            230 => "Thunderstorm with light drizzle",
            231 => "Thunderstorm with drizzle",
            232 => "Thunderstorm with heavy drizzle",
            _ => "Thunderstorm",
        },
        300..=321 => match id {
            300 => "Light intensity drizzle",
            301 => "Drizzle",
            302 => "Heavy intensity drizzle",
            310 => "Light intensity drizzle rain",
            311 => "Drizzle rain",
            312 => "Heavy intensity drizzle rain",
            313 => "Shower rain and drizzle",
            314 => "Heavy shower rain and drizzle",
            321 => "Shower drizzle",
            _ => "Drizzle",
        },
        500 => "Light rain",
        501 => "Moderate rain",
        502 => "Heavy intensity rain",
        503 => "Very heavy rain",
        504 => "Extreme rain",
        511 => "Freezing rain",
        520 => "Light intensity shower rain",
        521 => "Shower rain",
        522 => "Heavy intensity shower rain",
        531 => "Ragged shower rain",
        600 => "Light snow",
        601 => "Snow",
        602 => "Heavy snow",
        611 => "Sleet",
        612 => "Shower sleet",
        615 => "Light rain and snow",
        616 => "Rain and snow",
        620 => "Light shower snow",
        621 => "Shower snow",
        622 => "Heavy shower snow",
        701 => "Mist",
        711 => "Smoke",
        721 => "Haze",
        731 => "Sand, dust whirls",
        741 => "Fog",
        751 => "Sand",
        761 => "Dust",
        762 => "Volcanic ash",
        771 => "Squalls",
        781 => "Tornado",
        800 => "Clear",
        801 => "Mostly clear",
        802 => "Scattered clouds",
        803 => "Broken clouds",
        804 => "Overcast clouds",
        900 => "Tornado",
        901 => "Tropical storm",
        902 => "Hurricane",
        903 => "Cold",
        904 => "Hot",
        905 => "Windy",
        906 => "Hail",
        951 => "Calm",
        952 => "Light breeze",
        953 => "Gentle breeze",
        954 => "Breeze",
        955 => "Fresh breeze",
        956 => "Strong breeze",
        957 => "High wind",
        958 => "Gale",
        959 => "Severe gale",
        960 => "Storm",
        961 => "Violent storm",
        962 => "Hurricane",
        _ => return format!("Unknown Condition ({})", id),
    };
    text.to_string()
}
