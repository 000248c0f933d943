//! One render pass: filter, summarize, build every chart.

use serde::Serialize;
use serde_json::json;

use crate::charts::{
    self, CategoryShare, ChartSettings, ChartView, CountryMean, DetailTable, Histogram, TitleMean,
};
use crate::data::Dataset;
use crate::filter::{self, FilterSelection};
use crate::logging::{log, obj, v_num, Domain, Level, ProfileScope};
use crate::metrics::{self, SummaryMetrics};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub selection: FilterSelection,
    pub total_rows: usize,
    pub metrics: SummaryMetrics,
    pub cards: Vec<MetricCard>,
    pub top_titles: ChartView<Vec<TitleMean>>,
    pub salary_histogram: ChartView<Histogram>,
    pub remote_share: ChartView<Vec<CategoryShare>>,
    pub country_means: ChartView<Vec<CountryMean>>,
    pub detail: ChartView<DetailTable>,
}

/// Pure function of the table and the selection. Nothing is cached between
/// calls and the table is only read.
pub fn render(table: &Dataset, selection: &FilterSelection, settings: &ChartSettings) -> Dashboard {
    let _scope = ProfileScope::new("render");
    let subset = filter::apply(table, selection);
    let summary = metrics::summarize(&subset);

    let dashboard = Dashboard {
        selection: selection.clone(),
        total_rows: table.len(),
        cards: metric_cards(&summary),
        metrics: summary,
        top_titles: charts::top_titles_by_mean(&subset, settings.top_n),
        salary_histogram: charts::salary_histogram(&subset, settings.histogram_bins),
        remote_share: charts::remote_share(&subset),
        country_means: charts::country_means(&subset, &settings.focus_title),
        detail: charts::detail_table(&subset, table.columns()),
    };

    log(
        Level::Debug,
        Domain::Render,
        "dashboard",
        obj(&[
            ("rows", json!(dashboard.metrics.count)),
            ("mean_salary", v_num(dashboard.metrics.mean_salary)),
            ("empty", json!(subset.is_empty())),
        ]),
    );
    dashboard
}

pub fn metric_cards(m: &SummaryMetrics) -> Vec<MetricCard> {
    vec![
        MetricCard {
            label: "Mean Salary",
            value: format_usd(m.mean_salary),
        },
        MetricCard {
            label: "Max Salary",
            value: format_usd(m.max_salary),
        },
        MetricCard {
            label: "Total Records",
            value: format_count(m.count),
        },
        MetricCard {
            label: "Most Frequent Title",
            value: m.most_frequent_title.clone(),
        },
    ]
}

/// Whole dollars with thousands separators, e.g. `$123,457`.
pub fn format_usd(value: f64) -> String {
    let rounded = value.round();
    let digits = group_thousands(&format!("{:.0}", rounded.abs()));
    if rounded < 0.0 {
        format!("-${}", digits)
    } else {
        format!("${}", digits)
    }
}

pub fn format_count(n: usize) -> String {
    group_thousands(&n.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
