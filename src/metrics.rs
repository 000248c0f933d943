use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filter::Subset;

/// Headline figures for the filtered subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub mean_salary: f64,
    pub max_salary: f64,
    pub count: usize,
    pub most_frequent_title: String,
}

impl SummaryMetrics {
    /// Values shown when no row survives the filters.
    pub fn empty() -> Self {
        Self {
            mean_salary: 0.0,
            max_salary: 0.0,
            count: 0,
            most_frequent_title: String::new(),
        }
    }
}

pub fn summarize(subset: &Subset<'_>) -> SummaryMetrics {
    if subset.is_empty() {
        return SummaryMetrics::empty();
    }

    let mut total = 0.0;
    let mut max = f64::MIN;
    let mut title_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for obs in subset.observations() {
        total += obs.salary_usd;
        max = max.max(obs.salary_usd);
        *title_counts.entry(obs.job_title.as_str()).or_insert(0) += 1;
    }

    SummaryMetrics {
        // summation error must not push the mean past the max
        mean_salary: (total / subset.len() as f64).min(max),
        max_salary: max,
        count: subset.len(),
        most_frequent_title: most_frequent(&title_counts).to_string(),
    }
}

// Ties resolve to the alphabetically first title: the map iterates in key
// order and only a strictly larger count replaces the current pick.
fn most_frequent<'a>(counts: &BTreeMap<&'a str, usize>) -> &'a str {
    let mut best: Option<(&'a str, usize)> = None;
    for (title, n) in counts {
        match best {
            Some((_, best_n)) if *n <= best_n => {}
            _ => best = Some((*title, *n)),
        }
    }
    best.map(|(t, _)| t).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, Observation};
    use crate::filter::{apply, Dimension, FilterOptions, FilterSelection};

    fn obs(year: i32, title: &str, usd: f64) -> Observation {
        Observation {
            year,
            seniority: "senior".to_string(),
            contract: "integral".to_string(),
            company_size: "media".to_string(),
            job_title: title.to_string(),
            salary_usd: usd,
            remote: "remoto".to_string(),
            residence_iso3: "BRA".to_string(),
        }
    }

    #[test]
    fn test_empty_subset_defaults() {
        let t = Dataset::from_observations("t", vec![obs(2023, "Data Scientist", 10.0)]);
        let mut sel = FilterSelection::all(&FilterOptions::from_dataset(&t));
        sel.set(Dimension::Year, Vec::<String>::new());
        let m = summarize(&apply(&t, &sel));
        assert_eq!(m, SummaryMetrics::empty());
        assert_eq!(m.mean_salary, 0.0);
        assert_eq!(m.max_salary, 0.0);
        assert_eq!(m.count, 0);
        assert_eq!(m.most_frequent_title, "");
    }

    #[test]
    fn test_mean_max_count() {
        let t = Dataset::from_observations(
            "t",
            vec![
                obs(2023, "Data Scientist", 1000.0),
                obs(2023, "Data Engineer", 5000.0),
                obs(2023, "Data Engineer", 3000.0),
            ],
        );
        let m = summarize(&Subset::full(&t));
        assert_eq!(m.count, 3);
        assert_eq!(m.max_salary, 5000.0);
        assert_eq!(m.mean_salary, 3000.0);
        assert!(m.mean_salary <= m.max_salary);
        assert_eq!(m.most_frequent_title, "Data Engineer");
    }

    #[test]
    fn test_mode_tie_takes_alphabetical_first() {
        let t = Dataset::from_observations(
            "t",
            vec![
                obs(2023, "ML Engineer", 1.0),
                obs(2023, "Data Analyst", 1.0),
                obs(2023, "ML Engineer", 1.0),
                obs(2023, "Data Analyst", 1.0),
            ],
        );
        assert_eq!(summarize(&Subset::full(&t)).most_frequent_title, "Data Analyst");
    }

    #[test]
    fn test_mean_never_exceeds_max() {
        let t = Dataset::from_observations(
            "t",
            vec![obs(2023, "A", 0.1), obs(2023, "A", 0.1), obs(2023, "A", 0.1)],
        );
        let m = summarize(&Subset::full(&t));
        assert!(m.mean_salary <= m.max_salary);
    }

    #[test]
    fn test_zero_salaries() {
        let t = Dataset::from_observations("t", vec![obs(2023, "Intern", 0.0)]);
        let m = summarize(&Subset::full(&t));
        assert_eq!(m.max_salary, 0.0);
        assert_eq!(m.mean_salary, 0.0);
        assert_eq!(m.count, 1);
    }
}
