use std::fmt;
use std::str::FromStr;

/// 表单中可识别的测量字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementField {
    Rainfall,
    RiverDischarge,
    WaterLevel,
    Temperature,
    Humidity,
    SoilType,
    Elevation,
    Latitude,
    Longitude,
    Station,
}

impl MeasurementField {
    /// 表单展示顺序
    pub const ALL: [MeasurementField; 10] = [
        MeasurementField::Rainfall,
        MeasurementField::RiverDischarge,
        MeasurementField::WaterLevel,
        MeasurementField::Temperature,
        MeasurementField::Humidity,
        MeasurementField::SoilType,
        MeasurementField::Elevation,
        MeasurementField::Latitude,
        MeasurementField::Longitude,
        MeasurementField::Station,
    ];

    /// 请求体中的规范字段名
    pub fn name(&self) -> &'static str {
        match self {
            MeasurementField::Rainfall => "rainfall",
            MeasurementField::RiverDischarge => "river_discharge",
            MeasurementField::WaterLevel => "water_level",
            MeasurementField::Temperature => "temperature",
            MeasurementField::Humidity => "humidity",
            MeasurementField::SoilType => "soil_type",
            MeasurementField::Elevation => "elevation",
            MeasurementField::Latitude => "latitude",
            MeasurementField::Longitude => "longitude",
            MeasurementField::Station => "station",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MeasurementField::Rainfall => "Rainfall",
            MeasurementField::RiverDischarge => "River Discharge",
            MeasurementField::WaterLevel => "Water Level",
            MeasurementField::Temperature => "Temperature",
            MeasurementField::Humidity => "Humidity",
            MeasurementField::SoilType => "Soil Type",
            MeasurementField::Elevation => "Elevation",
            MeasurementField::Latitude => "Latitude",
            MeasurementField::Longitude => "Longitude",
            MeasurementField::Station => "Station",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            MeasurementField::Rainfall => Some("mm"),
            MeasurementField::RiverDischarge => Some("m³/s"),
            MeasurementField::WaterLevel => Some("m"),
            MeasurementField::Temperature => Some("°C"),
            MeasurementField::Humidity => Some("%"),
            MeasurementField::Elevation => Some("m"),
            MeasurementField::Latitude | MeasurementField::Longitude => Some("deg"),
            MeasurementField::SoilType | MeasurementField::Station => None,
        }
    }

    /// 参数说明（Parameters 视图）
    pub fn description(&self) -> &'static str {
        match self {
            MeasurementField::Rainfall => {
                "Amount of precipitation. Higher values indicate increased flood risk."
            }
            MeasurementField::RiverDischarge => {
                "Volume of water flowing through rivers. Critical indicator of flood potential."
            }
            MeasurementField::WaterLevel => {
                "Current height of water bodies. Exceeding normal levels signals danger."
            }
            MeasurementField::Temperature => {
                "Ambient temperature affecting evaporation and rainfall patterns."
            }
            MeasurementField::Humidity => {
                "Moisture content in air. High humidity often precedes heavy rainfall."
            }
            MeasurementField::SoilType => {
                "Ground composition, e.g. Clay, Sandy or Loam. Sent to the service as typed."
            }
            MeasurementField::Elevation => {
                "Height above sea level. Lower elevations are more flood-prone."
            }
            MeasurementField::Latitude | MeasurementField::Longitude => {
                "Geographical location for region-specific flood risk assessment."
            }
            MeasurementField::Station => {
                "Optional monitoring station identifier. Omitted from the request when empty."
            }
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, MeasurementField::SoilType | MeasurementField::Station)
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, MeasurementField::Station)
    }
}

impl fmt::Display for MeasurementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for MeasurementField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // riverDischarge 是旧页面使用的驼峰写法
        match s.trim() {
            "rainfall" => Ok(MeasurementField::Rainfall),
            "river_discharge" | "riverDischarge" => Ok(MeasurementField::RiverDischarge),
            "water_level" | "waterLevel" => Ok(MeasurementField::WaterLevel),
            "temperature" => Ok(MeasurementField::Temperature),
            "humidity" => Ok(MeasurementField::Humidity),
            "soil_type" | "soilType" => Ok(MeasurementField::SoilType),
            "elevation" => Ok(MeasurementField::Elevation),
            "latitude" => Ok(MeasurementField::Latitude),
            "longitude" => Ok(MeasurementField::Longitude),
            "station" => Ok(MeasurementField::Station),
            other => Err(UnknownField(other.to_string())),
        }
    }
}
