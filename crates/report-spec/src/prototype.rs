use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::EngineResult,
    flatten::{self, ResultPass},
    header::{self, HeaderPass},
    spec::{SubtestResult, SubtestSpec},
};

/// The closed set of subtest types the engines understand.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Prototype {
    Location,
    Datetime,
    Consent,
    Id,
    Survey,
    Grid,
    Gps,
    Camera,
}

pub const DATETIME_FIELDS: [&str; 4] = ["year", "month", "day", "assess_time"];
pub const CONSENT_FIELD: &str = "consent";
pub const ID_FIELD: &str = "participant_id";
pub const GRID_FIELDS: [&str; 6] = [
    "auto_stop",
    "time_remain",
    "capture_item_at_time",
    "attempted",
    "time_intermediate_captured",
    "time_allowed",
];
pub const GPS_FIELDS: [&str; 7] = [
    "latitude",
    "longitude",
    "accuracy",
    "altitude",
    "altitudeAccuracy",
    "heading",
    "speed",
];
pub const CAMERA_FIELDS: [&str; 2] = ["photo_captured", "photo_url"];

impl Prototype {
    pub const ALL: [Prototype; 8] = [
        Prototype::Location,
        Prototype::Datetime,
        Prototype::Consent,
        Prototype::Id,
        Prototype::Survey,
        Prototype::Grid,
        Prototype::Gps,
        Prototype::Camera,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Prototype::Location => "location",
            Prototype::Datetime => "datetime",
            Prototype::Consent => "consent",
            Prototype::Id => "id",
            Prototype::Survey => "survey",
            Prototype::Grid => "grid",
            Prototype::Gps => "gps",
            Prototype::Camera => "camera",
        }
    }

    /// Position in [`Prototype::ALL`] and in the handler table.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Columns every subtest of this prototype emits regardless of configuration.
    ///
    /// `location` and `survey` columns come from configuration and grid item
    /// columns from collected data, so they are not listed here.
    pub fn fixed_fields(&self) -> &'static [&'static str] {
        match self {
            Prototype::Location | Prototype::Survey => &[],
            Prototype::Datetime => &DATETIME_FIELDS,
            Prototype::Consent => &[CONSENT_FIELD],
            Prototype::Id => &[ID_FIELD],
            Prototype::Grid => &GRID_FIELDS,
            Prototype::Gps => &GPS_FIELDS,
            Prototype::Camera => &CAMERA_FIELDS,
        }
    }

    /// Whether the shared timestamp counter advances by the item count instead of one.
    pub fn counts_items(&self) -> bool {
        matches!(self, Prototype::Grid)
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPrototype(pub String);

impl fmt::Display for UnknownPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown prototype '{}'", self.0)
    }
}

impl std::error::Error for UnknownPrototype {}

impl FromStr for Prototype {
    type Err = UnknownPrototype;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Prototype::ALL
            .into_iter()
            .find(|prototype| prototype.as_str() == value.trim())
            .ok_or_else(|| UnknownPrototype(value.to_string()))
    }
}

pub type HeaderHandler = fn(&mut HeaderPass<'_>, &SubtestSpec) -> EngineResult<()>;
pub type ResultHandler = fn(&mut ResultPass, &SubtestResult);

/// Header and result handler pair registered for one prototype.
pub struct Handlers {
    pub prototype: Prototype,
    pub header: HeaderHandler,
    pub result: ResultHandler,
}

static REGISTRY: [Handlers; 8] = [
    Handlers {
        prototype: Prototype::Location,
        header: header::location_headers,
        result: flatten::location_result,
    },
    Handlers {
        prototype: Prototype::Datetime,
        header: header::datetime_headers,
        result: flatten::datetime_result,
    },
    Handlers {
        prototype: Prototype::Consent,
        header: header::consent_headers,
        result: flatten::consent_result,
    },
    Handlers {
        prototype: Prototype::Id,
        header: header::id_headers,
        result: flatten::id_result,
    },
    Handlers {
        prototype: Prototype::Survey,
        header: header::survey_headers,
        result: flatten::survey_result,
    },
    Handlers {
        prototype: Prototype::Grid,
        header: header::grid_headers,
        result: flatten::grid_result,
    },
    Handlers {
        prototype: Prototype::Gps,
        header: header::gps_headers,
        result: flatten::gps_result,
    },
    Handlers {
        prototype: Prototype::Camera,
        header: header::camera_headers,
        result: flatten::camera_result,
    },
];

pub fn handlers(prototype: Prototype) -> &'static Handlers {
    &REGISTRY[prototype.index()]
}

/// Catalogue entry describing a prototype's output shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PrototypeInfo {
    pub prototype: Prototype,
    pub fixed_fields: Vec<String>,
    /// `"1"` or `"items"`.
    pub timestamp_cost: String,
}

pub fn describe() -> Vec<PrototypeInfo> {
    Prototype::ALL
        .iter()
        .map(|prototype| PrototypeInfo {
            prototype: *prototype,
            fixed_fields: prototype
                .fixed_fields()
                .iter()
                .map(|field| field.to_string())
                .collect(),
            timestamp_cost: if prototype.counts_items() {
                "items".into()
            } else {
                "1".into()
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_indexed_by_prototype() {
        for prototype in Prototype::ALL {
            assert_eq!(handlers(prototype).prototype, prototype);
        }
    }

    #[test]
    fn parses_known_tags_and_rejects_others() {
        assert_eq!("gps".parse::<Prototype>(), Ok(Prototype::Gps));
        assert_eq!(" grid ".parse::<Prototype>(), Ok(Prototype::Grid));
        assert_eq!(
            "audio".parse::<Prototype>(),
            Err(UnknownPrototype("audio".into()))
        );
    }

    #[test]
    fn describe_reports_grid_item_cost() {
        let catalogue = describe();
        assert_eq!(catalogue.len(), 8);
        let grid = catalogue
            .iter()
            .find(|info| info.prototype == Prototype::Grid)
            .expect("grid entry");
        assert_eq!(grid.timestamp_cost, "items");
        assert_eq!(grid.fixed_fields.len(), 6);
    }
}
