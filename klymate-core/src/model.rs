use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt::Display;
use tracing::warn;

/// Placeholder shown for an absent metric.
pub const MISSING_METRIC: &str = "--";
/// Placeholder shown for absent coordinates and descriptions.
pub const MISSING_TEXT: &str = "N/A";
/// Placeholder shown when the backend did not name the location.
pub const MISSING_CITY: &str = "Selected Location";

const ICON_BASE_URL: &str = "http://openweathermap.org/img/wn";

/// Render an optional field, substituting `placeholder` when it is absent.
pub fn display_or<T: Display>(value: Option<T>, placeholder: &str) -> String {
    match value {
        Some(v) => v.to_string(),
        None => placeholder.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A value exactly as the backend sent it.
///
/// Deserializing never fails: numbers keep their JSON spelling (`21.0` stays
/// `21.0`), strings are shown without quotes, anything else as compact JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading(Value);

impl Reading {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Integral numeric value; `3` and `3.0` both yield 3, strings yield nothing.
    pub fn as_whole_number(&self) -> Option<i64> {
        let Value::Number(n) = &self.0 else {
            return None;
        };

        n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        })
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Reading)
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading(Value::from(value))
    }
}

impl From<i64> for Reading {
    fn from(value: i64) -> Self {
        Reading(Value::from(value))
    }
}

impl From<&str> for Reading {
    fn from(value: &str) -> Self {
        Reading(Value::from(value))
    }
}

/// Text field that accepts any JSON scalar; `null` is absent.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Reading>::deserialize(deserializer)?.map(|r| r.to_string()))
}

/// A section that is not a JSON object is treated as absent.
fn lenient_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => match serde_json::from_value(value) {
            Ok(section) => Ok(Some(section)),
            Err(e) => {
                warn!(error = %e, "ignoring malformed section");
                Ok(None)
            }
        },
        other => {
            warn!(value = %other, "ignoring section that is not an object");
            Ok(None)
        }
    }
}

/// Body of `GET /data/now`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NowResponse {
    #[serde(deserialize_with = "lenient_section")]
    pub location: Option<LocationSnapshot>,
    #[serde(deserialize_with = "lenient_section")]
    pub current_weather: Option<WeatherSnapshot>,
    #[serde(deserialize_with = "lenient_section")]
    pub current_aqi: Option<AirQualitySnapshot>,
    #[serde(deserialize_with = "lenient_text")]
    pub error_message: Option<String>,
}

/// Location as reported by the backend; may differ from the requested coordinates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocationSnapshot {
    #[serde(deserialize_with = "lenient_text")]
    pub city: Option<String>,
    pub latitude: Option<Reading>,
    pub longitude: Option<Reading>,
}

impl LocationSnapshot {
    pub fn city_or_placeholder(&self) -> &str {
        self.city.as_deref().unwrap_or(MISSING_CITY)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherSnapshot {
    pub temperature: Option<Reading>,
    pub feels_like: Option<Reading>,
    pub humidity: Option<Reading>,
    pub wind_speed: Option<Reading>,
    #[serde(deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub icon: Option<String>,
    pub temp_min: Option<Reading>,
    pub temp_max: Option<Reading>,
    pub pressure: Option<Reading>,
}

impl WeatherSnapshot {
    /// True when no known field carries a value.
    ///
    /// Unknown keys are dropped during parsing and `null` counts as absent, so an
    /// object holding only those is empty and its section shows the
    /// "could not be retrieved" warning rather than a row of placeholders.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Description with the first letter upper-cased and the rest lower-cased.
    pub fn condition(&self) -> String {
        let Some(text) = self.description.as_deref() else {
            return MISSING_TEXT.to_string();
        };
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_deref()
            .filter(|code| !code.is_empty())
            .map(|code| format!("{ICON_BASE_URL}/{code}@2x.png"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AirQualitySnapshot {
    pub aqi: Option<Reading>,
    pub pm2_5: Option<Reading>,
    pub pm10: Option<Reading>,
    pub o3: Option<Reading>,
    pub no2: Option<Reading>,
    pub so2: Option<Reading>,
    pub co: Option<Reading>,
}

impl AirQualitySnapshot {
    /// Same rule as [`WeatherSnapshot::is_empty`].
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn category(&self) -> Option<AqiCategory> {
        self.aqi.as_ref().and_then(Reading::as_whole_number).and_then(AqiCategory::from_index)
    }
}

/// OpenWeatherMap air-quality scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AqiCategory {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
}

impl AqiCategory {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            1 => Some(AqiCategory::Good),
            2 => Some(AqiCategory::Fair),
            3 => Some(AqiCategory::Moderate),
            4 => Some(AqiCategory::Poor),
            5 => Some(AqiCategory::VeryPoor),
            _ => None,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            AqiCategory::Good => 1,
            AqiCategory::Fair => 2,
            AqiCategory::Moderate => 3,
            AqiCategory::Poor => 4,
            AqiCategory::VeryPoor => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Fair => "Fair",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Poor => "Poor",
            AqiCategory::VeryPoor => "Very Poor",
        }
    }

    /// Qualitative health impact; only categories 3 to 5 carry one.
    pub fn health_note(&self) -> Option<&'static str> {
        match self {
            AqiCategory::Good | AqiCategory::Fair => None,
            AqiCategory::Moderate => Some("Potential minor impact"),
            AqiCategory::Poor => Some("Potential health impact"),
            AqiCategory::VeryPoor => Some("Significant health impact"),
        }
    }

    pub const fn all() -> &'static [AqiCategory] {
        &[
            AqiCategory::Good,
            AqiCategory::Fair,
            AqiCategory::Moderate,
            AqiCategory::Poor,
            AqiCategory::VeryPoor,
        ]
    }
}

impl std::fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which dashboard section a backend error note belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Weather,
    AirQuality,
}

impl Section {
    fn note_marker(&self) -> &'static str {
        match self {
            Section::Weather => "Weather Error",
            Section::AirQuality => "AQI Error",
        }
    }
}

/// Free-text note the backend attaches to `/data/now` when an upstream fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendNote(pub String);

impl BackendNote {
    pub fn concerns(&self, section: Section) -> bool {
        self.0.contains(section.note_marker())
    }
}

/// Body of `GET /predict/nextday/temperature`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictionResult {
    #[serde(rename = "predicted_temperature_next_day")]
    pub predicted_temperature: Option<Reading>,
    #[serde(deserialize_with = "lenient_text")]
    pub error_message: Option<String>,
}
