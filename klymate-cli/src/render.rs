//! Terminal rendering of a cycle outcome.

use std::io::{self, Write};

use klymate_core::{
    AqiCategory, CycleOutcome, DashboardView, ErrorDetail, FetchError, Section,
    model::{
        AirQualitySnapshot, LocationSnapshot, MISSING_METRIC, MISSING_TEXT, PredictionResult,
        WeatherSnapshot, display_or,
    },
};

const RULE: &str = "────────────────────────────────────────────";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Hide the expandable detail panels.
    pub compact: bool,
}

pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Kly-mate Weather Dashboard")?;
    writeln!(out, "Real-time weather, air quality index (AQI), and placeholder forecast.")?;
    writeln!(out, "{RULE}")
}

pub fn write_footer<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "Kly-mate Demo | Terminal dashboard")
}

pub fn write_outcome<W: Write>(
    out: &mut W,
    outcome: &CycleOutcome,
    opts: RenderOptions,
) -> io::Result<()> {
    match outcome {
        CycleOutcome::Aborted(err) => write_failure(out, err, ""),
        CycleOutcome::Rendered(view) => write_view(out, view, opts),
    }
}

fn write_view<W: Write>(out: &mut W, view: &DashboardView, opts: RenderOptions) -> io::Result<()> {
    write_location(out, &view.location)?;

    writeln!(out)?;
    writeln!(out, "Weather")?;
    if view.weather.is_empty() {
        writeln!(out, "  ! Weather data could not be retrieved.")?;
        if let Some(note) = view.note_for(Section::Weather) {
            writeln!(out, "    Backend Note: {}", note.0)?;
        }
    } else {
        write_weather(out, &view.weather, opts)?;
    }

    writeln!(out)?;
    writeln!(out, "Air Quality Index (AQI)")?;
    if view.air_quality.is_empty() {
        writeln!(out, "  ! AQI data could not be retrieved.")?;
        if let Some(note) = view.note_for(Section::AirQuality) {
            writeln!(out, "    Backend Note: {}", note.0)?;
        }
    } else {
        write_air_quality(out, &view.air_quality, opts)?;
    }

    writeln!(out)?;
    writeln!(out, "Placeholder Temperature Prediction")?;
    match &view.prediction {
        Ok(prediction) => write_prediction(out, prediction)?,
        Err(err) => write_failure(out, err, "  ")?,
    }

    writeln!(out)?;
    writeln!(out, "Done! (fetched {})", view.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"))
}

fn write_location<W: Write>(out: &mut W, location: &LocationSnapshot) -> io::Result<()> {
    writeln!(out, "Current Conditions for {}", location.city_or_placeholder())?;
    writeln!(
        out,
        "  Lat: {}, Lon: {}",
        display_or(location.latitude.as_ref(), MISSING_TEXT),
        display_or(location.longitude.as_ref(), MISSING_TEXT),
    )
}

fn write_weather<W: Write>(
    out: &mut W,
    weather: &WeatherSnapshot,
    opts: RenderOptions,
) -> io::Result<()> {
    writeln!(
        out,
        "  Temperature  {}°C ({}°C Feels Like)",
        display_or(weather.temperature.as_ref(), MISSING_METRIC),
        display_or(weather.feels_like.as_ref(), MISSING_METRIC),
    )?;
    writeln!(out, "  Humidity     {}%", display_or(weather.humidity.as_ref(), MISSING_METRIC))?;
    writeln!(out, "  Wind         {} m/s", display_or(weather.wind_speed.as_ref(), MISSING_METRIC))?;

    match weather.icon_url() {
        Some(icon) => writeln!(out, "  Condition: {} [icon: {icon}]", weather.condition())?,
        None => writeln!(out, "  Condition: {}", weather.condition())?,
    }

    if !opts.compact {
        writeln!(out, "  More Weather Details")?;
        writeln!(
            out,
            "    - Min/Max Temp: {}°C / {}°C",
            display_or(weather.temp_min.as_ref(), MISSING_METRIC),
            display_or(weather.temp_max.as_ref(), MISSING_METRIC),
        )?;
        writeln!(out, "    - Pressure: {} hPa", display_or(weather.pressure.as_ref(), MISSING_METRIC))?;
    }

    Ok(())
}

fn aqi_label(aqi: &AirQualitySnapshot) -> String {
    match (aqi.aqi.as_ref(), aqi.category()) {
        (Some(value), Some(category)) => match category.health_note() {
            Some(note) => format!("{value} ({category}) - {note}"),
            None => format!("{value} ({category})"),
        },
        (value, _) => display_or(value, MISSING_METRIC),
    }
}

fn write_air_quality<W: Write>(
    out: &mut W,
    aqi: &AirQualitySnapshot,
    opts: RenderOptions,
) -> io::Result<()> {
    writeln!(out, "  AQI: {}", aqi_label(aqi))?;

    let scale: Vec<_> = AqiCategory::all()
        .iter()
        .map(|c| format!("{}={}", c.index(), c.label()))
        .collect();
    writeln!(out, "  Scale: {}", scale.join(", "))?;

    if !opts.compact {
        writeln!(out, "  Pollutant Details (μg/m³)")?;
        let pollutants = [
            ("PM2.5", aqi.pm2_5.as_ref()),
            ("PM10", aqi.pm10.as_ref()),
            ("O₃ (Ozone)", aqi.o3.as_ref()),
            ("NO₂ (Nitrogen Dioxide)", aqi.no2.as_ref()),
            ("SO₂ (Sulphur Dioxide)", aqi.so2.as_ref()),
            ("CO (Carbon Monoxide)", aqi.co.as_ref()),
        ];
        for (name, value) in pollutants {
            writeln!(out, "    - {name}: {}", display_or(value, MISSING_METRIC))?;
        }
    }

    Ok(())
}

fn write_prediction<W: Write>(out: &mut W, prediction: &PredictionResult) -> io::Result<()> {
    if let Some(message) = &prediction.error_message {
        writeln!(out, "  ! Prediction Error: {message}")
    } else if let Some(temp) = &prediction.predicted_temperature {
        writeln!(out, "  Predicted Temp (Next Day - Placeholder): {temp}°C")
    } else {
        writeln!(out, "  Prediction data not available.")
    }
}

fn write_failure<W: Write>(out: &mut W, err: &FetchError, indent: &str) -> io::Result<()> {
    writeln!(out, "{indent}x {}", err.user_message())?;
    writeln!(out, "{indent}  {}", err.hint())?;

    match err.detail() {
        Some(ErrorDetail::Json(value)) => {
            writeln!(out, "{indent}  Backend error details:")?;
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            for line in pretty.lines() {
                writeln!(out, "{indent}    {line}")?;
            }
        }
        Some(ErrorDetail::Text(text)) => {
            writeln!(out, "{indent}  Backend response (non-JSON):")?;
            for line in text.lines() {
                writeln!(out, "{indent}    {line}")?;
            }
        }
        Some(ErrorDetail::Empty) | None => {}
    }

    Ok(())
}
