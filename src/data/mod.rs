//! Salary dataset: typed observations, schema checks and load manifest.

pub mod source;

use anyhow::{bail, Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

pub use source::{load, source_from_config, DatasetSource, FileSource, HttpSource};

/// Columns every source must carry. Additional columns are kept verbatim.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "ano",
    "senioridade",
    "contrato",
    "tamanho_empresa",
    "cargo",
    "usd",
    "remoto",
    "residencia_iso3",
];

/// One salary observation, validated at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename(deserialize = "ano"), deserialize_with = "year_from_number")]
    pub year: i32,
    #[serde(rename(deserialize = "senioridade"))]
    pub seniority: String,
    #[serde(rename(deserialize = "contrato"))]
    pub contract: String,
    #[serde(rename(deserialize = "tamanho_empresa"))]
    pub company_size: String,
    #[serde(rename(deserialize = "cargo"))]
    pub job_title: String,
    #[serde(rename(deserialize = "usd"))]
    pub salary_usd: f64,
    #[serde(rename(deserialize = "remoto"))]
    pub remote: String,
    #[serde(rename(deserialize = "residencia_iso3"))]
    pub residence_iso3: String,
}

// Exports sometimes write integer columns as "2023.0".
fn year_from_number<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    let raw = f64::deserialize(d)?;
    if raw.fract() != 0.0 || raw < i32::MIN as f64 || raw > i32::MAX as f64 {
        return Err(D::Error::custom(format!("year {} is not an integer", raw)));
    }
    Ok(raw as i32)
}

/// A loaded row: the typed view plus every source cell in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub obs: Observation,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
    pub message: String,
}

impl SchemaReport {
    pub fn check(columns: &[String]) -> Self {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|req| !columns.iter().any(|c| c == *req))
            .map(|s| s.to_string())
            .collect();
        let ok = missing.is_empty();
        let message = if ok {
            "schema ok".to_string()
        } else {
            format!("schema mismatch: missing {:?} in {:?}", missing, columns)
        };
        Self {
            columns: columns.to_vec(),
            missing,
            ok,
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub origin: String,
    pub hash_sha256: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    /// Distinct value counts for each filterable dimension.
    pub distinct: BTreeMap<String, usize>,
}

/// The full, immutable salary table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    origin: String,
    hash_sha256: String,
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Parse CSV bytes. Schema violations and malformed rows are errors.
    pub fn from_csv_bytes(origin: &str, bytes: &[u8]) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);
        let headers = rdr
            .headers()
            .with_context(|| format!("reading header of {}", origin))?
            .clone();
        let columns: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let schema = SchemaReport::check(&columns);
        if !schema.ok {
            bail!("{}: {}", origin, schema.message);
        }

        let mut records = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            // header is line 1
            let line = idx + 2;
            let raw =
                result.with_context(|| format!("{}: malformed row at line {}", origin, line))?;
            let obs: Observation = raw
                .deserialize(Some(&headers))
                .with_context(|| format!("{}: bad row at line {}", origin, line))?;
            if !obs.salary_usd.is_finite() || obs.salary_usd < 0.0 {
                bail!(
                    "{}: bad row at line {}: salary {} is not a non-negative number",
                    origin,
                    line,
                    obs.salary_usd
                );
            }
            records.push(Record {
                obs,
                cells: raw.iter().map(|c| c.to_string()).collect(),
            });
        }

        Ok(Self {
            origin: origin.to_string(),
            hash_sha256: bytes_sha256(bytes),
            columns,
            records,
        })
    }

    /// Build a table directly from observations, using the required columns as
    /// the source layout.
    pub fn from_observations(origin: &str, observations: Vec<Observation>) -> Self {
        let records = observations
            .into_iter()
            .map(|obs| {
                let cells = vec![
                    obs.year.to_string(),
                    obs.seniority.clone(),
                    obs.contract.clone(),
                    obs.company_size.clone(),
                    obs.job_title.clone(),
                    obs.salary_usd.to_string(),
                    obs.remote.clone(),
                    obs.residence_iso3.clone(),
                ];
                Record { obs, cells }
            })
            .collect();
        Self {
            origin: origin.to_string(),
            hash_sha256: String::new(),
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.records.iter().map(|r| &r.obs)
    }

    pub fn manifest(&self) -> DatasetManifest {
        let mut distinct = BTreeMap::new();
        distinct.insert(
            "ano".to_string(),
            self.observations().map(|o| o.year).collect::<BTreeSet<_>>().len(),
        );
        distinct.insert(
            "senioridade".to_string(),
            self.observations().map(|o| o.seniority.as_str()).collect::<BTreeSet<_>>().len(),
        );
        distinct.insert(
            "contrato".to_string(),
            self.observations().map(|o| o.contract.as_str()).collect::<BTreeSet<_>>().len(),
        );
        distinct.insert(
            "tamanho_empresa".to_string(),
            self.observations().map(|o| o.company_size.as_str()).collect::<BTreeSet<_>>().len(),
        );
        DatasetManifest {
            origin: self.origin.clone(),
            hash_sha256: self.hash_sha256.clone(),
            row_count: self.records.len(),
            columns: self.columns.clone(),
            distinct,
        }
    }
}

pub fn bytes_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ano,senioridade,contrato,tamanho_empresa,cargo,salario,moeda,usd,residencia,remoto,empresa,residencia_iso3
2023,senior,integral,grande,Data Scientist,150000,USD,150000,US,remoto,US,USA
2024.0,junior,integral,media,Data Engineer,60000,EUR,64000,ES,hibrido,ES,ESP
";

    #[test]
    fn test_parse_keeps_extra_columns_in_order() {
        let ds = Dataset::from_csv_bytes("sample", SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.columns().len(), 12);
        assert_eq!(ds.columns()[5], "salario");
        let first = &ds.records()[0];
        assert_eq!(first.obs.year, 2023);
        assert_eq!(first.obs.job_title, "Data Scientist");
        assert_eq!(first.obs.residence_iso3, "USA");
        assert_eq!(first.cells[6], "USD");
        assert_eq!(ds.records()[1].obs.year, 2024);
        assert_eq!(ds.records()[1].obs.salary_usd, 64000.0);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let csv = "ano,senioridade,contrato,cargo,usd,remoto,residencia_iso3\n2023,a,b,c,1,d,BRA\n";
        let err = Dataset::from_csv_bytes("broken", csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("tamanho_empresa"), "{}", err);
    }

    #[test]
    fn test_bad_salary_is_fatal() {
        let csv = "\
ano,senioridade,contrato,tamanho_empresa,cargo,usd,remoto,residencia_iso3
2023,senior,integral,grande,Data Scientist,abc,remoto,USA
";
        let err = Dataset::from_csv_bytes("bad", csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
    }

    #[test]
    fn test_negative_salary_is_fatal() {
        let csv = "\
ano,senioridade,contrato,tamanho_empresa,cargo,usd,remoto,residencia_iso3
2023,senior,integral,grande,Data Scientist,-5,remoto,USA
";
        assert!(Dataset::from_csv_bytes("neg", csv.as_bytes()).is_err());
    }

    #[test]
    fn test_fractional_year_rejected() {
        let csv = "\
ano,senioridade,contrato,tamanho_empresa,cargo,usd,remoto,residencia_iso3
2023.5,senior,integral,grande,Data Scientist,10,remoto,USA
";
        assert!(Dataset::from_csv_bytes("year", csv.as_bytes()).is_err());
    }

    #[test]
    fn test_schema_report() {
        let cols: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        assert!(SchemaReport::check(&cols).ok);
        let report = SchemaReport::check(&cols[1..]);
        assert!(!report.ok);
        assert_eq!(report.missing, vec!["ano".to_string()]);
    }

    #[test]
    fn test_manifest() {
        let ds = Dataset::from_csv_bytes("sample", SAMPLE.as_bytes()).unwrap();
        let m = ds.manifest();
        assert_eq!(m.row_count, 2);
        assert_eq!(m.hash_sha256, bytes_sha256(SAMPLE.as_bytes()));
        assert_eq!(m.hash_sha256.len(), 64);
        assert_eq!(m.distinct["ano"], 2);
        assert_eq!(m.distinct["contrato"], 1);
    }
}
