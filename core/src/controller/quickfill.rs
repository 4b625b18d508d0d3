use crate::controller::form::{FormField, OperatorForm};
use crate::target::class::TargetClass;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"[-+]?\d*\.?\d+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Text(FormField),
    ShipType,
    Class,
}

const ALIASES: &[(&str, Target)] = &[
    ("mmsi", Target::Text(FormField::MobileId)),
    ("lat", Target::Text(FormField::Latitude)),
    ("lon", Target::Text(FormField::Longitude)),
    ("lng", Target::Text(FormField::Longitude)),
    ("sog", Target::Text(FormField::Speed)),
    ("cog", Target::Text(FormField::Course)),
    ("name", Target::Text(FormField::VesselName)),
    ("ship type", Target::ShipType),
    ("target class", Target::Class),
    ("target type", Target::Class),
];

/// Outcome of a quick fill: fields written and fields skipped because they
/// were locked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickFill {
    pub filled: Vec<String>,
    pub skipped: Vec<String>,
}

fn labels() -> Vec<(String, Target)> {
    let fields = [
        FormField::Id,
        FormField::MobileId,
        FormField::SatelliteId,
        FormField::VesselName,
        FormField::SatelliteName,
        FormField::Longitude,
        FormField::Latitude,
        FormField::Speed,
        FormField::Course,
        FormField::Length,
        FormField::MaxLength,
        FormField::RadarSources,
        FormField::AisSources,
        FormField::SatelliteSources,
        FormField::PublishInterval,
    ];
    let mut labels: Vec<(String, Target)> = fields
        .iter()
        .map(|field| (field.label().to_lowercase(), Target::Text(*field)))
        .chain(
            ALIASES
                .iter()
                .map(|(alias, target)| (alias.to_string(), *target)),
        )
        .collect();
    // "Max length" must win over "Length", "Satellite ID" over "ID".
    labels.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    labels
}

fn first_number(text: &str) -> Option<&str> {
    NUMBER_RE.find(text).map(|m| m.as_str())
}

fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// Fills form fields from pasted "Label: value" lines.
///
/// Numeric fields take the first number on the line, the rest take the
/// first whitespace-delimited token. Unrecognised lines are ignored.
pub fn quick_fill(form: &mut OperatorForm, text: &str) -> QuickFill {
    let labels = labels();
    let mut outcome = QuickFill::default();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lowered = line.to_lowercase();
        let Some((label, target)) = labels
            .iter()
            .find(|(label, _)| lowered.starts_with(label.as_str()))
        else {
            debug!("quick fill ignored {:?}", line);
            continue;
        };
        let rest = line
            .get(label.len()..)
            .unwrap_or_default()
            .trim_start_matches(|c: char| c == ':' || c == '：' || c.is_whitespace());

        match *target {
            Target::Text(field) => {
                let value = if field.is_numeric() {
                    first_number(rest)
                } else {
                    first_token(rest)
                };
                let value = value.unwrap_or_default();
                match form.set_text(field, value) {
                    Ok(()) => outcome.filled.push(field.label().to_string()),
                    Err(err) => {
                        warn!("quick fill: {}", err);
                        outcome.skipped.push(field.label().to_string());
                    }
                }
            }
            Target::ShipType => {
                if let Some(ship_type) = first_number(rest).and_then(|v| v.parse().ok()) {
                    form.ship_type = ship_type;
                    outcome.filled.push("Ship type".to_string());
                }
            }
            Target::Class => {
                let class = first_number(rest)
                    .and_then(|v| v.parse().ok())
                    .and_then(TargetClass::from_code);
                if let Some(class) = class {
                    form.class = class;
                    outcome.filled.push("Target class".to_string());
                }
            }
        }
    }
    outcome
}
