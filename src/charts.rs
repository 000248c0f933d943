//! Chart builders. Each one derives a small table from the filtered subset
//! and pairs it with the chart description the renderer needs.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::filter::Subset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSettings {
    pub top_n: usize,
    pub histogram_bins: usize,
    /// Job title the geographic chart is restricted to.
    pub focus_title: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            top_n: 10,
            histogram_bins: 30,
            focus_title: "Data Scientist".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartKind {
    HorizontalBar,
    Histogram,
    Donut { hole: f64 },
    Choropleth { color_scale: &'static str },
    Table,
}

/// Everything the front end needs besides the data itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    /// Visual channel -> data field, e.g. `x -> mean_salary`.
    pub encoding: BTreeMap<&'static str, &'static str>,
    /// Data field -> axis or legend label. An empty label hides it.
    pub labels: BTreeMap<&'static str, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartView<T> {
    Ready { spec: ChartSpec, data: T },
    /// The filtered subset had no rows; show the notice instead of a chart.
    Empty { notice: String },
}

impl<T> ChartView<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            ChartView::Ready { data, .. } => Some(data),
            ChartView::Empty { .. } => None,
        }
    }

    pub fn spec(&self) -> Option<&ChartSpec> {
        match self {
            ChartView::Ready { spec, .. } => Some(spec),
            ChartView::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ChartView::Empty { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleMean {
    pub job_title: String,
    pub mean_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub width: f64,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: usize,
    /// Fraction of the subset, 0..=1.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryMean {
    pub iso3: String,
    pub mean_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn labels(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

fn empty<T>(what: &str) -> ChartView<T> {
    ChartView::Empty {
        notice: format!("No data available to display the {}.", what),
    }
}

/// Running (sum, count) per key, iterated in key order.
fn group_means<K, I>(items: I) -> BTreeMap<K, f64>
where
    K: Ord,
    I: Iterator<Item = (K, f64)>,
{
    let mut acc: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for (key, value) in items {
        let slot = acc.entry(key).or_insert((0.0, 0));
        slot.0 += value;
        slot.1 += 1;
    }
    acc.into_iter()
        .map(|(k, (sum, n))| (k, sum / n as f64))
        .collect()
}

/// Job titles with the highest mean salary, listed ascending for a
/// horizontal bar chart. Equal means keep alphabetical order.
pub fn top_titles_by_mean(subset: &Subset<'_>, n: usize) -> ChartView<Vec<TitleMean>> {
    if subset.is_empty() {
        return empty("job title chart");
    }

    let mut groups: Vec<TitleMean> = group_means(
        subset
            .observations()
            .map(|o| (o.job_title.as_str(), o.salary_usd)),
    )
    .into_iter()
    .map(|(title, mean)| TitleMean {
        job_title: title.to_string(),
        mean_salary: mean,
    })
    .collect();

    groups.sort_by(|a, b| b.mean_salary.total_cmp(&a.mean_salary));
    groups.truncate(n);
    groups.sort_by(|a, b| a.mean_salary.total_cmp(&b.mean_salary));

    ChartView::Ready {
        spec: ChartSpec {
            kind: ChartKind::HorizontalBar,
            title: format!("Top {} Job Titles by Mean Salary", n),
            encoding: BTreeMap::from([("x", "mean_salary"), ("y", "job_title")]),
            labels: labels(&[
                ("mean_salary", "Mean annual salary (USD)"),
                ("job_title", ""),
            ]),
        },
        data: groups,
    }
}

/// Equal-width salary bins spanning the subset's own min and max.
pub fn salary_histogram(subset: &Subset<'_>, bins: usize) -> ChartView<Histogram> {
    if subset.is_empty() {
        return empty("salary distribution chart");
    }
    let bins = bins.max(1);

    let (min, max) = subset
        .observations()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
            (lo.min(o.salary_usd), hi.max(o.salary_usd))
        });
    let span = max - min;
    // a single distinct salary still gets a drawable unit-width layout
    let width = if span > 0.0 { span / bins as f64 } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for obs in subset.observations() {
        let idx = ((obs.salary_usd - min) / width).floor() as usize;
        counts[idx.min(bins - 1)] += 1;
    }

    let edge = |i: usize| -> f64 {
        if i == bins && span > 0.0 {
            max
        } else {
            min + i as f64 * width
        }
    };
    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            lower: edge(i),
            upper: edge(i + 1),
            count,
        })
        .collect();

    ChartView::Ready {
        spec: ChartSpec {
            kind: ChartKind::Histogram,
            title: "Annual Salary Distribution".to_string(),
            encoding: BTreeMap::from([("x", "salary_usd"), ("y", "count")]),
            labels: labels(&[("salary_usd", "Salary range (USD)"), ("count", "")]),
        },
        data: Histogram {
            min,
            max,
            width,
            bins,
        },
    }
}

/// Row count per remote-work category, largest first. Equal counts keep the
/// order in which the categories first appear.
pub fn remote_share(subset: &Subset<'_>) -> ChartView<Vec<CategoryShare>> {
    if subset.is_empty() {
        return empty("work arrangement chart");
    }

    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for obs in subset.observations() {
        let slot = *index.entry(obs.remote.as_str()).or_insert_with(|| {
            order.push((obs.remote.as_str(), 0));
            order.len() - 1
        });
        order[slot].1 += 1;
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let total = subset.len() as f64;
    let data = order
        .into_iter()
        .map(|(category, count)| CategoryShare {
            category: category.to_string(),
            count,
            share: count as f64 / total,
        })
        .collect();

    ChartView::Ready {
        spec: ChartSpec {
            kind: ChartKind::Donut { hole: 0.5 },
            title: "Work Arrangement Share".to_string(),
            encoding: BTreeMap::from([("names", "category"), ("values", "count")]),
            labels: labels(&[("category", "Work arrangement"), ("count", "Records")]),
        },
        data,
    }
}

/// Mean salary per residence country for one job title. A title with no rows
/// in the subset yields an empty table, not a notice.
pub fn country_means(subset: &Subset<'_>, title: &str) -> ChartView<Vec<CountryMean>> {
    if subset.is_empty() {
        return empty("salary map");
    }

    let data = group_means(
        subset
            .observations()
            .filter(|o| o.job_title == title)
            .map(|o| (o.residence_iso3.as_str(), o.salary_usd)),
    )
    .into_iter()
    .map(|(iso3, mean)| CountryMean {
        iso3: iso3.to_string(),
        mean_salary: mean,
    })
    .collect();

    ChartView::Ready {
        spec: ChartSpec {
            kind: ChartKind::Choropleth {
                color_scale: "rdylgn",
            },
            title: format!("Mean {} Salary by Country", title),
            encoding: BTreeMap::from([("locations", "iso3"), ("color", "mean_salary")]),
            labels: labels(&[("mean_salary", "Mean salary (USD)"), ("iso3", "Country")]),
        },
        data,
    }
}

/// The filtered rows with every source column, in source order.
pub fn detail_table(subset: &Subset<'_>, columns: &[String]) -> ChartView<DetailTable> {
    if subset.is_empty() {
        return empty("detailed table");
    }

    ChartView::Ready {
        spec: ChartSpec {
            kind: ChartKind::Table,
            title: "Detailed Data Table".to_string(),
            encoding: BTreeMap::new(),
            labels: BTreeMap::new(),
        },
        data: DetailTable {
            columns: columns.to_vec(),
            rows: subset.records().iter().map(|r| r.cells.clone()).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, Observation};
    use crate::filter::{apply, Dimension, FilterOptions, FilterSelection};

    fn obs(year: i32, title: &str, usd: f64, remote: &str, iso3: &str) -> Observation {
        Observation {
            year,
            seniority: "senior".to_string(),
            contract: "integral".to_string(),
            company_size: "media".to_string(),
            job_title: title.to_string(),
            salary_usd: usd,
            remote: remote.to_string(),
            residence_iso3: iso3.to_string(),
        }
    }

    fn table() -> Dataset {
        Dataset::from_observations(
            "t",
            vec![
                obs(2023, "Data Scientist", 1000.0, "remoto", "BRA"),
                obs(2023, "Data Scientist", 3000.0, "presencial", "BRA"),
                obs(2024, "Data Engineer", 5000.0, "hibrido", "USA"),
                obs(2024, "Data Scientist", 9000.0, "remoto", "USA"),
                obs(2024, "Data Analyst", 2000.0, "presencial", "PRT"),
            ],
        )
    }

    fn empty_subset(t: &Dataset) -> Subset<'_> {
        let mut sel = FilterSelection::all(&FilterOptions::from_dataset(t));
        sel.set(Dimension::Seniority, Vec::<String>::new());
        apply(t, &sel)
    }

    #[test]
    fn test_every_builder_reports_empty_input() {
        let t = table();
        let s = empty_subset(&t);
        assert!(top_titles_by_mean(&s, 10).is_empty());
        assert!(salary_histogram(&s, 30).is_empty());
        assert!(remote_share(&s).is_empty());
        assert!(country_means(&s, "Data Scientist").is_empty());
        assert!(detail_table(&s, t.columns()).is_empty());
        match remote_share(&s) {
            ChartView::Empty { notice } => assert!(notice.starts_with("No data available")),
            other => panic!("expected notice, got {:?}", other),
        }
    }

    #[test]
    fn test_top_titles_not_padded_and_ascending() {
        let t = table();
        let view = top_titles_by_mean(&Subset::full(&t), 10);
        let data = view.data().unwrap();
        assert_eq!(data.len(), 3);
        let titles: Vec<&str> = data.iter().map(|g| g.job_title.as_str()).collect();
        // Analyst 2000, DS (1000+3000+9000)/3 = 4333.3, Engineer 5000
        assert_eq!(titles, vec!["Data Analyst", "Data Scientist", "Data Engineer"]);
        assert!(data.windows(2).all(|w| w[0].mean_salary <= w[1].mean_salary));
    }

    #[test]
    fn test_top_titles_keeps_largest() {
        let rows = (0..15)
            .map(|i| obs(2023, &format!("Title {:02}", i), 100.0 * i as f64, "remoto", "BRA"))
            .collect();
        let t = Dataset::from_observations("t", rows);
        let view = top_titles_by_mean(&Subset::full(&t), 10);
        let data = view.data().unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(data[0].job_title, "Title 05");
        assert_eq!(data[9].job_title, "Title 14");
        assert_eq!(view.spec().unwrap().title, "Top 10 Job Titles by Mean Salary");
    }

    #[test]
    fn test_top_titles_tie_order() {
        let t = Dataset::from_observations(
            "t",
            vec![
                obs(2023, "Zeta", 500.0, "remoto", "BRA"),
                obs(2023, "Alpha", 500.0, "remoto", "BRA"),
                obs(2023, "Mid", 100.0, "remoto", "BRA"),
            ],
        );
        let view = top_titles_by_mean(&Subset::full(&t), 2);
        let titles: Vec<&str> = view.data().unwrap().iter().map(|g| g.job_title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_histogram_counts_and_edges() {
        let t = table();
        let view = salary_histogram(&Subset::full(&t), 4);
        let h = view.data().unwrap();
        assert_eq!(h.min, 1000.0);
        assert_eq!(h.max, 9000.0);
        assert_eq!(h.width, 2000.0);
        assert_eq!(h.bins.len(), 4);
        let counts: Vec<usize> = h.bins.iter().map(|b| b.count).collect();
        // [1000,3000) [3000,5000) [5000,7000) [7000,9000]
        assert_eq!(counts, vec![2, 1, 1, 1]);
        assert_eq!(h.bins[0].lower, 1000.0);
        assert_eq!(h.bins[3].upper, 9000.0);
        assert_eq!(counts.iter().sum::<usize>(), t.len());
    }

    #[test]
    fn test_histogram_edges_follow_subset() {
        let t = table();
        let full = salary_histogram(&Subset::full(&t), 30);
        let mut sel = FilterSelection::all(&FilterOptions::from_dataset(&t));
        sel.set(Dimension::Year, ["2023"]);
        let narrow = salary_histogram(&apply(&t, &sel), 30);

        let (f, n) = (full.data().unwrap(), narrow.data().unwrap());
        assert_eq!(f.bins.len(), 30);
        assert_eq!(n.bins.len(), 30);
        assert_eq!(n.min, 1000.0);
        assert_eq!(n.max, 3000.0);
        assert_ne!(f.width, n.width);
        assert_ne!(f.bins[1].lower, n.bins[1].lower);
    }

    #[test]
    fn test_histogram_single_value() {
        let t = Dataset::from_observations(
            "t",
            vec![obs(2023, "A", 700.0, "remoto", "BRA"), obs(2023, "B", 700.0, "remoto", "BRA")],
        );
        let view = salary_histogram(&Subset::full(&t), 30);
        let h = view.data().unwrap();
        assert_eq!(h.bins.len(), 30);
        assert_eq!(h.bins[0].count, 2);
        assert_eq!(h.bins[0].lower, 700.0);
        assert_eq!(h.bins[0].upper, 701.0);
    }

    #[test]
    fn test_remote_share_order_and_share() {
        let t = table();
        let view = remote_share(&Subset::full(&t));
        let data = view.data().unwrap();
        let cats: Vec<(&str, usize)> = data
            .iter()
            .map(|c| (c.category.as_str(), c.count))
            .collect();
        // remoto and presencial tie at 2; remoto appears first
        assert_eq!(cats, vec![("remoto", 2), ("presencial", 2), ("hibrido", 1)]);
        let total: f64 = data.iter().map(|c| c.share).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(matches!(view.spec().unwrap().kind, ChartKind::Donut { hole } if hole == 0.5));
    }

    #[test]
    fn test_country_means_for_focus_title() {
        let t = table();
        let view = country_means(&Subset::full(&t), "Data Scientist");
        let data = view.data().unwrap();
        assert_eq!(
            data,
            &vec![
                CountryMean { iso3: "BRA".to_string(), mean_salary: 2000.0 },
                CountryMean { iso3: "USA".to_string(), mean_salary: 9000.0 },
            ]
        );
    }

    #[test]
    fn test_country_means_absent_title_is_empty_table() {
        let t = table();
        let view = country_means(&Subset::full(&t), "Chief Data Officer");
        assert!(!view.is_empty());
        assert!(view.data().unwrap().is_empty());
    }

    #[test]
    fn test_detail_table_preserves_rows() {
        let t = table();
        let mut sel = FilterSelection::all(&FilterOptions::from_dataset(&t));
        sel.set(Dimension::Year, ["2024"]);
        let view = detail_table(&apply(&t, &sel), t.columns());
        let table = view.data().unwrap();
        assert_eq!(table.columns, t.columns());
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][4], "Data Engineer");
        assert_eq!(table.rows[2][7], "PRT");
    }

    #[test]
    fn test_chart_view_serializes_with_status() {
        let t = table();
        let json = serde_json::to_value(remote_share(&Subset::full(&t))).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["spec"]["kind"]["type"], "donut");
        let json = serde_json::to_value(remote_share(&empty_subset(&t))).unwrap();
        assert_eq!(json["status"], "empty");
    }
}
