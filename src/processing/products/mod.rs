// src/processing/products/mod.rs
pub mod dekad;
pub mod region;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use dekad::{target_date, time_coverage, DekadConvention, TimeCoverage};
pub use region::{Region, RegionSpec};

/// CLMS 300 m vegetation product families.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Product {
    Ndvi,
    Dmp,
    Fapar,
    Fcover,
    Lai,
}

/// Quicklook rendering defaults of a product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuicklookDefaults {
    pub band: &'static str,
    pub min: u8,
    pub max: u8,
    pub nodata: u8,
    pub subsample: [i64; 2],
    pub src_range: Option<(f64, f64)>,
    /// (flag band, flag value, replacement byte)
    pub qflag: Option<(&'static str, f64, u8)>,
    /// Flag values outside valid_range are rendered as nodata.
    pub honour_valid_range: bool,
    pub color_table: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductSpec {
    pub code: &'static str,
    /// File name stem, e.g. `LAI300-RT0`.
    pub stem: &'static str,
    pub version: &'static str,
    pub collection: &'static str,
    /// URN scope shared by every region; `None` uses the region's own scope.
    pub urn_scope: Option<&'static str>,
    pub variables: &'static [&'static str],
    pub chunk_overrides: &'static [(&'static str, usize)],
    pub quicklook: QuicklookDefaults,
    pub source_root: &'static str,
    pub dekad: DekadConvention,
}

static NDVI: ProductSpec = ProductSpec {
    code: "NDVI",
    stem: "NDVI300",
    version: "V2.0.1",
    collection: "ndvi300_v2_333m",
    urn_scope: Some("continents"),
    variables: &["NDVI", "NDVI_unc", "LENGTH_BEFORE", "NOBS", "QFLAG"],
    chunk_overrides: &[("NDVI_unc", 1415)],
    quicklook: QuicklookDefaults {
        band: "NDVI",
        min: 0,
        max: 255,
        nodata: 255,
        subsample: [5, 5],
        src_range: Some((0.0, 255.0)),
        qflag: Some(("QFLAG", 128.0, 254)),
        honour_valid_range: false,
        color_table: "ColorTable_NDVI300_V2.txt",
    },
    source_root: "/eodata/CLMS/bio-geophysical/vegetation_indices/ndvi_global_300m_10daily_v2",
    dekad: DekadConvention::PeriodStart,
};

static DMP: ProductSpec = ProductSpec {
    code: "DMP",
    stem: "DMP300-RT0",
    version: "V1.1.1",
    collection: "dmp300_v1_333m",
    urn_scope: None,
    variables: &["DMP", "QFLAG"],
    chunk_overrides: &[],
    quicklook: QuicklookDefaults {
        band: "DMP",
        min: 0,
        max: 250,
        nodata: 255,
        subsample: [5, 5],
        src_range: None,
        qflag: None,
        honour_valid_range: true,
        color_table: "cgl_colorTable_DMP.txt",
    },
    source_root: "/eodata/CLMS/bio-geophysical/dry-gross_dry_matter_productivity/dmp_global_300m_10daily_v1",
    dekad: DekadConvention::PeriodEnd,
};

const FAPAR_VARIABLES: &[&str] = &["FAPAR", "LENGTH_AFTER", "LENGTH_BEFORE", "NOBS", "QFLAG", "RMSE"];
const FCOVER_VARIABLES: &[&str] = &["FCOVER", "LENGTH_AFTER", "LENGTH_BEFORE", "NOBS", "QFLAG", "RMSE"];
const LAI_VARIABLES: &[&str] = &["LAI", "LENGTH_AFTER", "LENGTH_BEFORE", "NOBS", "QFLAG", "RMSE"];

const fn biopar(
    code: &'static str,
    stem: &'static str,
    collection: &'static str,
    variables: &'static [&'static str],
    ql_max: u8,
    color_table: &'static str,
    source_root: &'static str,
) -> ProductSpec {
    ProductSpec {
        code,
        stem,
        version: "V1.1.1",
        collection,
        urn_scope: None,
        variables,
        chunk_overrides: &[],
        quicklook: QuicklookDefaults {
            band: code,
            min: 0,
            max: ql_max,
            nodata: 255,
            subsample: [5, 5],
            src_range: None,
            qflag: None,
            honour_valid_range: false,
            color_table,
        },
        source_root,
        dekad: DekadConvention::PeriodEnd,
    }
}

static FAPAR: ProductSpec = biopar(
    "FAPAR",
    "FAPAR300-RT0",
    "fapar300_v1_333m",
    FAPAR_VARIABLES,
    235,
    "cgl_colorTable_FAPAR.txt",
    "/eodata/CLMS/bio-geophysical/vegetation_properties/fapar_global_300m_10daily_v1",
);

static FCOVER: ProductSpec = biopar(
    "FCOVER",
    "FCOVER300-RT0",
    "fcover300_v1_333m",
    FCOVER_VARIABLES,
    250,
    "cgl_colorTable_FCOVER.txt",
    "/eodata/CLMS/bio-geophysical/vegetation_properties/fcover_global_300m_10daily_v1",
);

static LAI: ProductSpec = biopar(
    "LAI",
    "LAI300-RT0",
    "lai300_v1_333m",
    LAI_VARIABLES,
    210,
    "cgl_colorTable_LAI.txt",
    "/eodata/CLMS/bio-geophysical/vegetation_properties/lai_global_300m_10daily_v1",
);

impl Product {
    pub const ALL: [Product; 5] = [Product::Ndvi, Product::Dmp, Product::Fapar, Product::Fcover, Product::Lai];

    /// Daily run order of the automation driver.
    pub const SCHEDULE: [(Product, Region); 10] = [
        (Product::Ndvi, Region::Africa),
        (Product::Ndvi, Region::SouthAmerica),
        (Product::Fapar, Region::SouthAmerica),
        (Product::Fapar, Region::Africa),
        (Product::Fcover, Region::Africa),
        (Product::Fcover, Region::SouthAmerica),
        (Product::Lai, Region::Africa),
        (Product::Lai, Region::SouthAmerica),
        (Product::Dmp, Region::Africa),
        (Product::Dmp, Region::SouthAmerica),
    ];

    pub fn spec(self) -> &'static ProductSpec {
        match self {
            Product::Ndvi => &NDVI,
            Product::Dmp => &DMP,
            Product::Fapar => &FAPAR,
            Product::Fcover => &FCOVER,
            Product::Lai => &LAI,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().code)
    }
}

impl FromStr for Product {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Product::ALL
            .into_iter()
            .find(|p| p.spec().code.eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown product '{s}' (expected NDVI, DMP, FAPAR, FCOVER or LAI)"))
    }
}

impl ProductSpec {
    /// `V2` out of `V2.0.1`.
    pub fn major_version(&self) -> &'static str {
        self.version.split('.').next().unwrap_or(self.version)
    }

    fn scope(&self, region: Region) -> &'static str {
        self.urn_scope.unwrap_or(region.spec().urn_scope)
    }

    pub fn parent_identifier(&self, region: Region) -> String {
        format!("urn:cgls:{}:{}", self.scope(region), self.collection)
    }

    /// `<stem>_<date>_<ROI>_OLCI_<version>`, `date` being `YYYYMMDDHHMM`.
    pub fn alternate_title(&self, region: Region, date: &str) -> String {
        format!("{}_{date}_{}_OLCI_{}", self.stem, region.code(), self.version)
    }

    pub fn identifier(&self, region: Region, date: &str) -> String {
        format!("{}:{}", self.parent_identifier(region), self.alternate_title(region, date))
    }

    pub fn template_name(&self, region: Region) -> String {
        format!(
            "CGLS_{}300_{}_S3_ProductSet_PDF_{}.xml",
            self.code,
            self.major_version(),
            region.code()
        )
    }

    pub fn description_name(&self, region: Region, date: &str) -> String {
        format!(
            "c_gls_{}_PROD-DESC_{date}_{}_OLCI_{}.xml",
            self.stem,
            region.code(),
            self.version
        )
    }

    /// Global source file name for a product date.
    pub fn source_file_name(&self, date: NaiveDate) -> String {
        format!(
            "c_gls_{}_{}0000_GLOBE_OLCI_{}.nc",
            self.stem,
            date.format("%Y%m%d"),
            self.version
        )
    }

    /// `<name>_nc/<name>.nc`, the form recorded in the input ledger.
    pub fn ledger_key(&self, date: NaiveDate) -> String {
        let name = self.source_file_name(date);
        format!("{}_nc/{name}", name.trim_end_matches(".nc"))
    }

    /// `<root>/YYYY/MM/DD/<name>_nc/<name>.nc`
    pub fn source_path(&self, root: &Path, date: NaiveDate) -> PathBuf {
        root.join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(date.format("%d").to_string())
            .join(self.ledger_key(date))
    }

    pub fn default_source_root(&self) -> &'static Path {
        Path::new(self.source_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lai_soam_names() {
        let lai = Product::Lai.spec();
        let r = Region::SouthAmerica;
        assert_eq!(
            lai.identifier(r, "202505100000"),
            "urn:cgls:south-america:lai300_v1_333m:LAI300-RT0_202505100000_SOAM_OLCI_V1.1.1"
        );
        assert_eq!(lai.template_name(r), "CGLS_LAI300_V1_S3_ProductSet_PDF_SOAM.xml");
        assert_eq!(
            lai.description_name(r, "202505100000"),
            "c_gls_LAI300-RT0_PROD-DESC_202505100000_SOAM_OLCI_V1.1.1.xml"
        );
    }

    #[test]
    fn test_ndvi_names() {
        let ndvi = Product::Ndvi.spec();
        assert_eq!(
            ndvi.identifier(Region::Africa, "202505010000"),
            "urn:cgls:continents:ndvi300_v2_333m:NDVI300_202505010000_AFRI_OLCI_V2.0.1"
        );
        assert_eq!(ndvi.template_name(Region::SouthAmerica), "CGLS_NDVI300_V2_S3_ProductSet_PDF_SOAM.xml");

        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert_eq!(
            ndvi.source_path(Path::new("/root"), date),
            Path::new("/root/2025/05/01/c_gls_NDVI300_202505010000_GLOBE_OLCI_V2.0.1_nc/c_gls_NDVI300_202505010000_GLOBE_OLCI_V2.0.1.nc")
        );
    }

    #[test]
    fn test_ledger_key_keeps_folder() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let dmp = Product::Dmp.spec();
        assert_eq!(
            dmp.ledger_key(date),
            "c_gls_DMP300-RT0_202505100000_GLOBE_OLCI_V1.1.1_nc/c_gls_DMP300-RT0_202505100000_GLOBE_OLCI_V1.1.1.nc"
        );
        assert!(dmp.source_path(Path::new("/eodata"), date).ends_with(dmp.ledger_key(date)));
    }

    #[test]
    fn test_only_dmp_masks_flags() {
        for product in Product::ALL {
            assert_eq!(
                product.spec().quicklook.honour_valid_range,
                product == Product::Dmp,
                "{product}"
            );
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("lai".parse::<Product>().unwrap(), Product::Lai);
        assert_eq!("SOAM".parse::<Region>().unwrap(), Region::SouthAmerica);
        assert!("EURO".parse::<Region>().is_err());
    }
}
