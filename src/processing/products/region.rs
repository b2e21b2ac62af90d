// src/processing/products/region.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Regions of interest cut out of the global grid.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    #[serde(rename = "AFRI")]
    Africa,
    #[serde(rename = "SOAM")]
    SouthAmerica,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSpec {
    pub code: &'static str,
    pub name: &'static str,
    /// Scope segment of the product URN.
    pub urn_scope: &'static str,
    /// Upper-left pixel centre used to locate the window.
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub width: usize,
    pub height: usize,
    /// Corner coordinates reported in the product description.
    pub ul_lat: f64,
    pub ul_lon: f64,
    pub lr_lat: f64,
    pub lr_lon: f64,
}

static AFRICA: RegionSpec = RegionSpec {
    code: "AFRI",
    name: "Africa",
    urn_scope: "africa",
    origin_lat: 40.001488095238095,
    origin_lon: -30.001488095238102,
    width: 30240,
    height: 26880,
    ul_lat: 40.0,
    ul_lon: -30.0,
    lr_lat: -40.0,
    lr_lon: 60.0,
};

static SOUTH_AMERICA: RegionSpec = RegionSpec {
    code: "SOAM",
    name: "South-America",
    urn_scope: "south-america",
    origin_lat: 20.001488095238095,
    origin_lon: -110.001488095238102,
    width: 26880,
    height: 26880,
    ul_lat: 20.0,
    ul_lon: -110.0,
    lr_lat: -60.0,
    lr_lon: -30.0,
};

impl Region {
    pub const ALL: [Region; 2] = [Region::Africa, Region::SouthAmerica];

    pub fn spec(self) -> &'static RegionSpec {
        match self {
            Region::Africa => &AFRICA,
            Region::SouthAmerica => &SOUTH_AMERICA,
        }
    }

    pub fn code(self) -> &'static str {
        self.spec().code
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown region '{s}' (expected AFRI or SOAM)"))
    }
}
