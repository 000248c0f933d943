//! Filter selections over the four categorical dimensions and the subset
//! they produce.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::data::{Dataset, Observation, Record};
use crate::logging::log_subset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Year,
    Seniority,
    Contract,
    CompanySize,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Year,
        Dimension::Seniority,
        Dimension::Contract,
        Dimension::CompanySize,
    ];

    /// Query-string key for this dimension.
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Year => "year",
            Dimension::Seniority => "seniority",
            Dimension::Contract => "contract",
            Dimension::CompanySize => "size",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Year => "Year",
            Dimension::Seniority => "Seniority Level",
            Dimension::Contract => "Contract Type",
            Dimension::CompanySize => "Company Size",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.key() == key)
    }
}

/// Query marker sent by the dashboard form. Once present, a dimension that is
/// missing from the query means "nothing selected" instead of "everything".
pub const APPLIED_KEY: &str = "applied";

/// Sorted distinct values of each dimension, as offered in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub seniorities: Vec<String>,
    pub contracts: Vec<String>,
    pub company_sizes: Vec<String>,
}

impl FilterOptions {
    pub fn from_dataset(table: &Dataset) -> Self {
        let years: BTreeSet<i32> = table.observations().map(|o| o.year).collect();
        let seniorities: BTreeSet<&str> =
            table.observations().map(|o| o.seniority.as_str()).collect();
        let contracts: BTreeSet<&str> = table.observations().map(|o| o.contract.as_str()).collect();
        let sizes: BTreeSet<&str> = table
            .observations()
            .map(|o| o.company_size.as_str())
            .collect();
        Self {
            years: years.into_iter().collect(),
            seniorities: seniorities.into_iter().map(String::from).collect(),
            contracts: contracts.into_iter().map(String::from).collect(),
            company_sizes: sizes.into_iter().map(String::from).collect(),
        }
    }

    /// Option values of one dimension rendered as strings.
    pub fn values(&self, dim: Dimension) -> Vec<String> {
        match dim {
            Dimension::Year => self.years.iter().map(|y| y.to_string()).collect(),
            Dimension::Seniority => self.seniorities.clone(),
            Dimension::Contract => self.contracts.clone(),
            Dimension::CompanySize => self.company_sizes.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub years: BTreeSet<i32>,
    pub seniorities: BTreeSet<String>,
    pub contracts: BTreeSet<String>,
    pub company_sizes: BTreeSet<String>,
}

impl FilterSelection {
    /// Everything observed in the table; the initial selection.
    pub fn all(options: &FilterOptions) -> Self {
        Self {
            years: options.years.iter().copied().collect(),
            seniorities: options.seniorities.iter().cloned().collect(),
            contracts: options.contracts.iter().cloned().collect(),
            company_sizes: options.company_sizes.iter().cloned().collect(),
        }
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        self.years.contains(&obs.year)
            && self.seniorities.contains(&obs.seniority)
            && self.contracts.contains(&obs.contract)
            && self.company_sizes.contains(&obs.company_size)
    }

    pub fn contains(&self, dim: Dimension, value: &str) -> bool {
        match dim {
            Dimension::Year => value.parse().map(|y| self.years.contains(&y)).unwrap_or(false),
            Dimension::Seniority => self.seniorities.contains(value),
            Dimension::Contract => self.contracts.contains(value),
            Dimension::CompanySize => self.company_sizes.contains(value),
        }
    }

    /// Replace one dimension with the given values. Years that do not parse
    /// are dropped; they could never match a row.
    pub fn set<I, S>(&mut self, dim: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = values.into_iter().map(|v| v.as_ref().trim().to_string());
        match dim {
            Dimension::Year => self.years = values.filter_map(|v| v.parse().ok()).collect(),
            Dimension::Seniority => self.seniorities = values.collect(),
            Dimension::Contract => self.contracts = values.collect(),
            Dimension::CompanySize => self.company_sizes = values.collect(),
        }
    }

    /// Decode a selection from a url query string.
    ///
    /// Each dimension uses a repeatable key (`year=2023&year=2024`). A
    /// dimension absent from the query keeps every option unless the
    /// [`APPLIED_KEY`] marker is present. A key with an empty value selects
    /// nothing for that dimension.
    pub fn from_query(query: &str, options: &FilterOptions) -> Self {
        let mut applied = false;
        let mut given: [Option<Vec<String>>; 4] = Default::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == APPLIED_KEY {
                applied = true;
                continue;
            }
            let Some(dim) = Dimension::from_key(&key) else {
                continue;
            };
            let slot = given[dim_index(dim)].get_or_insert_with(Vec::new);
            if !value.trim().is_empty() {
                slot.push(value.into_owned());
            }
        }

        let mut selection = if applied {
            Self::default()
        } else {
            Self::all(options)
        };
        for dim in Dimension::ALL {
            if let Some(values) = given[dim_index(dim)].take() {
                selection.set(dim, values);
            }
        }
        selection
    }

    /// Encode as a query string that [`FilterSelection::from_query`] reads back.
    pub fn to_query(&self) -> String {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        ser.append_pair(APPLIED_KEY, "1");
        for y in &self.years {
            ser.append_pair(Dimension::Year.key(), &y.to_string());
        }
        for (dim, set) in [
            (Dimension::Seniority, &self.seniorities),
            (Dimension::Contract, &self.contracts),
            (Dimension::CompanySize, &self.company_sizes),
        ] {
            for v in set {
                ser.append_pair(dim.key(), v);
            }
        }
        ser.finish()
    }
}

fn dim_index(dim: Dimension) -> usize {
    match dim {
        Dimension::Year => 0,
        Dimension::Seniority => 1,
        Dimension::Contract => 2,
        Dimension::CompanySize => 3,
    }
}

/// Rows of a table in their original order. Borrows the table; never copies
/// or mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Subset<'a> {
    records: Vec<&'a Record>,
}

impl<'a> Subset<'a> {
    pub fn full(table: &'a Dataset) -> Self {
        Self {
            records: table.records().iter().collect(),
        }
    }

    pub fn refine(&self, selection: &FilterSelection) -> Subset<'a> {
        Subset {
            records: self
                .records
                .iter()
                .copied()
                .filter(|r| selection.matches(&r.obs))
                .collect(),
        }
    }

    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    pub fn observations(&self) -> impl Iterator<Item = &'a Observation> + '_ {
        self.records.iter().map(|r| &r.obs)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Rows matching every dimension of the selection, in table order.
pub fn apply<'a>(table: &'a Dataset, selection: &FilterSelection) -> Subset<'a> {
    let subset = Subset::full(table).refine(selection);
    log_subset(table.len(), subset.len());
    subset
}
