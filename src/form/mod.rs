pub mod field;

pub use field::MeasurementField;

use crate::prediction::PredictionRequest;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldErrorKind {
    Missing,
    NotANumber(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: MeasurementField,
    pub kind: FieldErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldErrorKind::Missing => write!(f, "{} is required", self.field.label()),
            FieldErrorKind::NotANumber(raw) => {
                write!(f, "{} must be a number (got \"{}\")", self.field.label(), raw)
            }
        }
    }
}

/// 表单校验失败，收集全部字段错误
#[derive(Debug, Clone, PartialEq)]
pub struct FormError {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} invalid field(s): {}",
            self.errors.len(),
            summarize(&self.errors)
        )
    }
}

impl std::error::Error for FormError {}

impl FormError {
    pub fn for_field(&self, field: MeasurementField) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 用户输入的原始文本，按字段保存
#[derive(Debug, Clone, Default)]
pub struct MeasurementForm {
    values: HashMap<MeasurementField, String>,
}

impl MeasurementForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖字段的原始值，不做任何校验
    pub fn update_field(&mut self, field: MeasurementField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn value(&self, field: MeasurementField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_complete(&self) -> bool {
        MeasurementField::ALL
            .iter()
            .filter(|f| f.is_required())
            .all(|f| !self.value(*f).trim().is_empty())
    }

    fn parse_number(&self, field: MeasurementField, errors: &mut Vec<FieldError>) -> f64 {
        let raw = self.value(field).trim();
        if raw.is_empty() {
            errors.push(FieldError {
                field,
                kind: FieldErrorKind::Missing,
            });
            return 0.0;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                errors.push(FieldError {
                    field,
                    kind: FieldErrorKind::NotANumber(raw.to_string()),
                });
                0.0
            }
        }
    }

    /// 构造请求体；任一字段为空或无法解析为有限浮点数时拒绝
    pub fn to_request(&self) -> Result<PredictionRequest, FormError> {
        let mut errors = Vec::new();
        let mut numbers = HashMap::new();

        // 按展示顺序校验，错误顺序与表单一致
        for field in MeasurementField::ALL {
            if field.is_numeric() {
                numbers.insert(field, self.parse_number(field, &mut errors));
            } else if field.is_required() && self.value(field).trim().is_empty() {
                errors.push(FieldError {
                    field,
                    kind: FieldErrorKind::Missing,
                });
            }
        }

        if !errors.is_empty() {
            return Err(FormError { errors });
        }

        let number = |field: MeasurementField| numbers.get(&field).copied().unwrap_or_default();
        Ok(PredictionRequest {
            rainfall: number(MeasurementField::Rainfall),
            river_discharge: number(MeasurementField::RiverDischarge),
            water_level: number(MeasurementField::WaterLevel),
            temperature: number(MeasurementField::Temperature),
            humidity: number(MeasurementField::Humidity),
            // soil_type 原样透传，只要求非空
            soil_type: self.value(MeasurementField::SoilType).to_string(),
            elevation: number(MeasurementField::Elevation),
            latitude: number(MeasurementField::Latitude),
            longitude: number(MeasurementField::Longitude),
            station: Some(self.value(MeasurementField::Station).trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FILLED: [(MeasurementField, &str); 9] = [
        (MeasurementField::Rainfall, "120.5"),
        (MeasurementField::RiverDischarge, "300"),
        (MeasurementField::WaterLevel, "4.2"),
        (MeasurementField::Temperature, "27"),
        (MeasurementField::Humidity, "85"),
        (MeasurementField::SoilType, "Clay"),
        (MeasurementField::Elevation, "12"),
        (MeasurementField::Latitude, "19.07"),
        (MeasurementField::Longitude, "72.87"),
    ];

    fn filled_form() -> MeasurementForm {
        let mut form = MeasurementForm::new();
        for (field, value) in FILLED {
            form.update_field(field, value);
        }
        form
    }

    #[test]
    fn rainfall_is_sent_as_a_number() {
        let req = filled_form().to_request().unwrap();
        assert_eq!(req.rainfall, 120.5);

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["rainfall"], serde_json::json!(120.5));
        assert!(body["rainfall"].is_number());
        assert_eq!(body["soil_type"], "Clay");
        assert!(body.get("station").is_none());
    }

    #[test]
    fn soil_type_passes_through_unchanged() {
        let mut form = filled_form();
        form.update_field(MeasurementField::SoilType, " sandy loam ");
        let req = form.to_request().unwrap();
        assert_eq!(req.soil_type, " sandy loam ");
    }

    #[test]
    fn camel_case_alias_updates_canonical_field() {
        let mut form = filled_form();
        form.update_field("riverDischarge".parse().unwrap(), "999");
        assert_eq!(form.value(MeasurementField::RiverDischarge), "999");
        assert_eq!(form.to_request().unwrap().river_discharge, 999.0);
    }

    #[test]
    fn unparseable_numbers_are_rejected_before_dispatch() {
        let mut form = filled_form();
        form.update_field(MeasurementField::Humidity, "12abc");
        form.update_field(MeasurementField::Latitude, "NaN");
        form.update_field(MeasurementField::Longitude, "inf");

        let err = form.to_request().unwrap_err();
        assert_eq!(err.errors.len(), 3);
        assert_eq!(
            err.for_field(MeasurementField::Humidity).map(|e| &e.kind),
            Some(&FieldErrorKind::NotANumber("12abc".to_string()))
        );
        assert!(err.for_field(MeasurementField::Latitude).is_some());
        assert!(err.for_field(MeasurementField::Longitude).is_some());
    }

    #[test]
    fn empty_required_fields_are_reported_as_missing() {
        let mut form = filled_form();
        form.update_field(MeasurementField::Rainfall, "   ");
        form.update_field(MeasurementField::SoilType, "");
        assert!(!form.is_complete());

        let err = form.to_request().unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                FieldError {
                    field: MeasurementField::Rainfall,
                    kind: FieldErrorKind::Missing,
                },
                FieldError {
                    field: MeasurementField::SoilType,
                    kind: FieldErrorKind::Missing,
                },
            ]
        );
        assert!(err.to_string().starts_with("2 invalid field(s)"));
    }

    #[test]
    fn station_is_optional_and_trimmed() {
        let mut form = filled_form();
        assert!(form.is_complete());
        form.update_field(MeasurementField::Station, " Station1 ");
        let req = form.to_request().unwrap();
        assert_eq!(req.station.as_deref(), Some("Station1"));
    }

    #[test]
    fn errors_follow_form_order() {
        let mut form = filled_form();
        form.update_field(MeasurementField::Longitude, "");
        form.update_field(MeasurementField::SoilType, "");
        form.update_field(MeasurementField::Rainfall, "x");
        let fields: Vec<_> = form
            .to_request()
            .unwrap_err()
            .errors
            .iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                MeasurementField::Rainfall,
                MeasurementField::SoilType,
                MeasurementField::Longitude,
            ]
        );
    }
}
