//! View controller: one interaction cycle from coordinates to a render-ready view.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};

use crate::{
    Config,
    backend::{BackendClient, Endpoint},
    error::FetchError,
    model::{
        AirQualitySnapshot, BackendNote, Coordinates, LocationSnapshot, NowResponse,
        PredictionResult, Section, WeatherSnapshot,
    },
};

/// Everything needed to draw the dashboard after a successful first call.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub requested: Coordinates,
    pub location: LocationSnapshot,
    pub weather: WeatherSnapshot,
    pub air_quality: AirQualitySnapshot,
    pub backend_note: Option<BackendNote>,
    pub prediction: Result<PredictionResult, FetchError>,
    pub fetched_at: DateTime<Utc>,
}

impl DashboardView {
    /// Backend note to show under the "could not be retrieved" warning of `section`.
    pub fn note_for(&self, section: Section) -> Option<&BackendNote> {
        let empty = match section {
            Section::Weather => self.weather.is_empty(),
            Section::AirQuality => self.air_quality.is_empty(),
        };

        self.backend_note.as_ref().filter(|note| empty && note.concerns(section))
    }
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The current-conditions call failed; nothing else was attempted.
    Aborted(FetchError),
    Rendered(Box<DashboardView>),
}

impl CycleOutcome {
    pub fn view(&self) -> Option<&DashboardView> {
        match self {
            CycleOutcome::Rendered(view) => Some(view.as_ref()),
            CycleOutcome::Aborted(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchError> {
        match self {
            CycleOutcome::Aborted(err) => Some(err),
            CycleOutcome::Rendered(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Dashboard {
    client: BackendClient,
}

impl Dashboard {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(BackendClient::from_config(config)?))
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Run one interaction cycle.
    ///
    /// The two calls are strictly sequential. A failure of the current-conditions
    /// call aborts the cycle before the prediction call is issued; a failure of the
    /// prediction call is kept in the view and does not discard the first result.
    pub async fn run_cycle(&self, coords: Coordinates) -> CycleOutcome {
        let span = info_span!("cycle", lat = coords.latitude, lon = coords.longitude);
        self.run_cycle_inner(coords).instrument(span).await
    }

    async fn run_cycle_inner(&self, coords: Coordinates) -> CycleOutcome {
        let now: NowResponse = match self.fetch(Endpoint::Now, coords).await {
            Ok(now) => now,
            Err(err) => {
                warn!(kind = %err.kind(), "cycle aborted: {err}");
                return CycleOutcome::Aborted(err);
            }
        };

        let prediction: Result<PredictionResult, FetchError> =
            self.fetch(Endpoint::NextDayTemperature, coords).await;
        if let Err(err) = &prediction {
            warn!(kind = %err.kind(), "prediction unavailable: {err}");
        }

        let view = DashboardView {
            requested: coords,
            location: now.location.unwrap_or_default(),
            weather: now.current_weather.unwrap_or_default(),
            air_quality: now.current_aqi.unwrap_or_default(),
            backend_note: now.error_message.map(BackendNote),
            prediction,
            fetched_at: Utc::now(),
        };

        info!(
            weather = !view.weather.is_empty(),
            aqi = !view.air_quality.is_empty(),
            prediction = view.prediction.is_ok(),
            "cycle complete"
        );

        CycleOutcome::Rendered(Box::new(view))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        coords: Coordinates,
    ) -> Result<T, FetchError> {
        let value = self.client.fetch_json(endpoint, coords).await?;
        extract(endpoint, value)
    }
}

/// Map a JSON body onto a snapshot. Fields are lenient, so only a body that is not an
/// object is unclassified.
fn extract<T: DeserializeOwned>(endpoint: Endpoint, value: Value) -> Result<T, FetchError> {
    if !value.is_object() {
        return Err(FetchError::Unclassified(format!(
            "Unexpected response from {endpoint}: expected a JSON object"
        )));
    }

    serde_json::from_value(value).map_err(|e| {
        FetchError::Unclassified(format!("Unexpected response from {endpoint}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{TransportError, testing::ScriptedTransport},
        error::{ErrorDetail, FailureKind},
        model::{AqiCategory, Reading},
    };

    const BENGALURU: Coordinates = Coordinates { latitude: 12.9716, longitude: 77.5946 };

    const FULL_NOW: &str = r#"{
        "location": { "city": "Bengaluru", "latitude": 12.97, "longitude": 77.59 },
        "current_weather": {
            "temperature": 28.5, "feels_like": 30.1, "humidity": 65, "wind_speed": 3.6,
            "description": "scattered clouds", "icon": "03d",
            "temp_min": 27.0, "temp_max": 29.9, "pressure": 1012
        },
        "current_aqi": {
            "aqi": 3, "pm2_5": 35.2, "pm10": 48.1, "o3": 60.0,
            "no2": 12.3, "so2": 4.1, "co": 400.5
        }
    }"#;

    fn dashboard(transport: &ScriptedTransport) -> Dashboard {
        Dashboard::new(transport.client())
    }

    #[tokio::test]
    async fn full_cycle_extracts_every_field() {
        let transport = ScriptedTransport::new()
            .reply(200, FULL_NOW)
            .reply(200, r#"{"predicted_temperature_next_day": 29.5}"#);

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should render");

        assert_eq!(view.location.city.as_deref(), Some("Bengaluru"));
        assert_eq!(view.location.latitude, Some(Reading::from(12.97)));
        assert_eq!(view.weather.temperature, Some(Reading::from(28.5)));
        assert_eq!(view.weather.humidity, Some(Reading::from(65_i64)));
        assert_eq!(view.weather.pressure, Some(Reading::from(1012_i64)));
        assert_eq!(view.air_quality.category(), Some(AqiCategory::Moderate));
        assert_eq!(view.air_quality.co, Some(Reading::from(400.5)));
        assert!(view.backend_note.is_none());

        let prediction = view.prediction.as_ref().expect("prediction ok");
        assert_eq!(prediction.predicted_temperature, Some(Reading::from(29.5)));

        let paths: Vec<_> = transport.requests().iter().map(|u| u.path().to_string()).collect();
        assert_eq!(paths, vec!["/data/now", "/predict/nextday/temperature"]);
    }

    #[tokio::test]
    async fn missing_sections_default_to_empty() {
        let transport = ScriptedTransport::new().reply(200, "{}").reply(200, "{}");

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should render");

        assert_eq!(view.location.city_or_placeholder(), "Selected Location");
        assert!(view.weather.is_empty());
        assert!(view.air_quality.is_empty());
        assert_eq!(view.prediction.as_ref().ok(), Some(&PredictionResult::default()));
    }

    #[tokio::test]
    async fn first_call_timeout_skips_prediction() {
        let transport = ScriptedTransport::new()
            .fail(TransportError::Timeout)
            .reply(200, r#"{"predicted_temperature_next_day": 29.5}"#);

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;

        assert_eq!(outcome.failure().map(FetchError::kind), Some(FailureKind::Timeout));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn first_call_http_error_skips_prediction() {
        let transport = ScriptedTransport::new().reply(500, r#"{"detail":"boom"}"#);

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;

        assert_eq!(outcome.failure().map(FetchError::kind), Some(FailureKind::Http));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn non_json_first_response_is_format_failure() {
        let transport = ScriptedTransport::new().reply(200, "Service waking up");

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;

        assert!(outcome.view().is_none());
        assert_eq!(outcome.failure().map(FetchError::kind), Some(FailureKind::Format));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn non_object_body_is_unclassified() {
        let transport = ScriptedTransport::new().reply(200, r#"["not", "an", "object"]"#);
        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;

        assert_eq!(outcome.failure().map(FetchError::kind), Some(FailureKind::Unclassified));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn mistyped_fields_do_not_abort() {
        let body = r#"{
            "location": "Bengaluru",
            "current_weather": { "temperature": 21.0, "humidity": "65" },
            "current_aqi": { "aqi": 3.0, "pm10": null }
        }"#;
        let transport = ScriptedTransport::new()
            .reply(200, body)
            .reply(200, r#"{"predicted_temperature_next_day": "n/a"}"#);

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should render");

        assert_eq!(view.location.city_or_placeholder(), "Selected Location");
        assert_eq!(view.weather.temperature.as_ref().map(ToString::to_string).as_deref(), Some("21.0"));
        assert_eq!(view.weather.humidity, Some(Reading::from("65")));
        assert_eq!(view.air_quality.category(), Some(AqiCategory::Moderate));
        assert_eq!(view.air_quality.pm10, None);

        let prediction = view.prediction.as_ref().expect("prediction ok");
        assert_eq!(prediction.predicted_temperature, Some(Reading::from("n/a")));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn prediction_failure_keeps_current_conditions() {
        let transport = ScriptedTransport::new()
            .reply(200, FULL_NOW)
            .reply(500, "Internal Server Error");

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should still render");

        assert_eq!(view.weather.temperature, Some(Reading::from(28.5)));
        assert_eq!(view.air_quality.aqi, Some(Reading::from(3_i64)));
        match &view.prediction {
            Err(FetchError::Http { status, detail }) => {
                assert_eq!(*status, 500);
                assert_eq!(detail, &ErrorDetail::Text("Internal Server Error".into()));
            }
            other => panic!("expected HTTP failure, got {other:?}"),
        }
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn prediction_network_failure_is_reported_in_place() {
        let transport = ScriptedTransport::new()
            .reply(200, FULL_NOW)
            .fail(TransportError::Connect("connection reset".into()));

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should still render");

        assert_eq!(
            view.prediction.as_ref().err().map(FetchError::kind),
            Some(FailureKind::Network)
        );
    }

    #[tokio::test]
    async fn prediction_timeout_is_reported_in_place() {
        let transport = ScriptedTransport::new()
            .reply(200, FULL_NOW)
            .fail(TransportError::Timeout);

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should still render");

        assert_eq!(view.weather.temperature, Some(Reading::from(28.5)));
        assert_eq!(
            view.prediction.as_ref().err().map(FetchError::kind),
            Some(FailureKind::Timeout)
        );
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn prediction_non_json_is_format_failure() {
        let transport = ScriptedTransport::new()
            .reply(200, FULL_NOW)
            .reply(200, "<html>Bad Gateway</html>");

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should still render");

        assert_eq!(view.air_quality.category(), Some(AqiCategory::Moderate));
        assert_eq!(
            view.prediction.as_ref().err().map(FetchError::kind),
            Some(FailureKind::Format)
        );
    }

    #[tokio::test]
    async fn aqi_note_is_scoped_to_empty_aqi_section() {
        let body = r#"{
            "location": { "city": "Delhi" },
            "current_weather": { "temperature": 31.0 },
            "current_aqi": {},
            "error_message": "AQI Error: provider unavailable"
        }"#;
        let transport = ScriptedTransport::new().reply(200, body).reply(200, "{}");

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should render");

        let note = view.note_for(Section::AirQuality).expect("AQI note expected");
        assert_eq!(note.0, "AQI Error: provider unavailable");
        assert!(view.note_for(Section::Weather).is_none());
        assert!(!view.weather.is_empty());
    }

    #[tokio::test]
    async fn note_is_hidden_when_section_has_data() {
        let body = r#"{
            "current_weather": { "temperature": 31.0 },
            "error_message": "Weather Error: stale data"
        }"#;
        let transport = ScriptedTransport::new().reply(200, body).reply(200, "{}");

        let outcome = dashboard(&transport).run_cycle(BENGALURU).await;
        let view = outcome.view().expect("cycle should render");

        assert!(view.note_for(Section::Weather).is_none());
    }

    #[tokio::test]
    async fn repeated_cycles_classify_identically() {
        let transport = ScriptedTransport::new()
            .reply(503, "down")
            .reply(503, "down");
        let dashboard = dashboard(&transport);

        let first = dashboard.run_cycle(BENGALURU).await;
        let second = dashboard.run_cycle(BENGALURU).await;

        assert_eq!(first.failure().map(FetchError::kind), second.failure().map(FetchError::kind));
        assert_eq!(transport.requests()[0], transport.requests()[1]);
    }
}
