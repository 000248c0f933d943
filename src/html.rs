//! HTML page for a rendered [`Dashboard`]. Charts are emitted as Plotly
//! figure JSON in `data-figure` attributes and drawn client side.

use serde_json::{json, Value};

use crate::charts::{ChartKind, ChartSpec, ChartView, DetailTable};
use crate::dashboard::Dashboard;
use crate::filter::{Dimension, FilterOptions, APPLIED_KEY};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;display:flex;color:#222}\
aside{width:240px;padding:16px;background:#f3f4f6;min-height:100vh;box-sizing:border-box}\
aside select{width:100%;margin-bottom:12px}\
main{flex:1;padding:16px 24px;overflow-x:auto}\
.cards{display:grid;grid-template-columns:repeat(4,1fr);gap:12px}\
.card{border:1px solid #ddd;border-radius:6px;padding:10px}\
.card .label{font-size:.8em;color:#555}.card .value{font-size:1.6em}\
.grid{display:grid;grid-template-columns:1fr 1fr;gap:12px}\
.chart{min-height:380px}\
.notice{background:#fff4d6;border:1px solid #f0c36d;padding:10px;border-radius:6px}\
table{border-collapse:collapse;font-size:.85em}td,th{border:1px solid #ddd;padding:3px 6px}";

// Minimal writer with deterministic push order.
struct Html {
    buf: String,
}

impl Html {
    fn new() -> Self {
        Self {
            buf: String::with_capacity(64 * 1024),
        }
    }
    fn push<S: AsRef<str>>(&mut self, s: S) {
        self.buf.push_str(s.as_ref());
    }
    fn finish(self) -> String {
        self.buf
    }
}

pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn render_page(d: &Dashboard, options: &FilterOptions) -> String {
    let mut w = Html::new();
    w.push("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    w.push("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
    w.push("<title>Data Industry Salary Dashboard</title>");
    w.push(format!("<style>{}</style>", STYLE));
    w.push(format!("<script src=\"{}\"></script></head><body>", PLOTLY_CDN));

    sidebar(&mut w, d, options);

    w.push("<main><h1>Data Industry Salary Dashboard</h1>");
    w.push(
        "<p>Explore data-industry salaries by year, seniority level, \
         contract type and company size.</p>",
    );

    w.push("<h2>Key Metrics (salary in USD)</h2><div class=\"cards\">");
    for card in &d.cards {
        w.push(format!(
            "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
            esc(card.label),
            esc(&card.value)
        ));
    }
    w.push("</div><hr><h2>Charts</h2><div class=\"grid\">");

    chart_panel(&mut w, &d.top_titles, |spec, data| {
        let label = spec.labels.get("mean_salary").cloned().unwrap_or_default();
        figure(
            spec,
            json!([{
                "type": "bar",
                "orientation": "h",
                "x": data.iter().map(|g| g.mean_salary).collect::<Vec<_>>(),
                "y": data.iter().map(|g| g.job_title.as_str()).collect::<Vec<_>>(),
            }]),
            json!({
                "xaxis": { "title": { "text": label } },
                "yaxis": { "categoryorder": "total ascending" },
            }),
        )
    });
    chart_panel(&mut w, &d.salary_histogram, |spec, h| {
        let label = spec.labels.get("salary_usd").cloned().unwrap_or_default();
        figure(
            spec,
            json!([{
                "type": "bar",
                "x": h.bins.iter().map(|b| (b.lower + b.upper) / 2.0).collect::<Vec<_>>(),
                "y": h.bins.iter().map(|b| b.count).collect::<Vec<_>>(),
                "width": h.width,
            }]),
            json!({ "xaxis": { "title": { "text": label } }, "bargap": 0.02 }),
        )
    });
    chart_panel(&mut w, &d.remote_share, |spec, data| {
        let hole = match spec.kind {
            ChartKind::Donut { hole } => hole,
            _ => 0.0,
        };
        figure(
            spec,
            json!([{
                "type": "pie",
                "labels": data.iter().map(|c| c.category.as_str()).collect::<Vec<_>>(),
                "values": data.iter().map(|c| c.count).collect::<Vec<_>>(),
                "hole": hole,
                "textinfo": "percent+label",
            }]),
            json!({}),
        )
    });
    chart_panel(&mut w, &d.country_means, |spec, data| {
        let scale = match spec.kind {
            ChartKind::Choropleth { color_scale } => color_scale,
            _ => "viridis",
        };
        let label = spec.labels.get("mean_salary").cloned().unwrap_or_default();
        figure(
            spec,
            json!([{
                "type": "choropleth",
                "locationmode": "ISO-3",
                "locations": data.iter().map(|c| c.iso3.as_str()).collect::<Vec<_>>(),
                "z": data.iter().map(|c| c.mean_salary).collect::<Vec<_>>(),
                "colorscale": plotly_scale(scale),
                "colorbar": { "title": { "text": label } },
            }]),
            json!({}),
        )
    });
    w.push("</div>");

    w.push("<h2>Detailed Data Table</h2>");
    match &d.detail {
        ChartView::Ready { data, .. } => detail_table(&mut w, data),
        ChartView::Empty { notice } => {
            w.push(format!("<div class=\"notice\">{}</div>", esc(notice)));
        }
    }

    w.push("</main><script>");
    w.push("document.querySelectorAll('[data-figure]').forEach(function(el){");
    w.push("var f=JSON.parse(el.dataset.figure);");
    w.push("Plotly.newPlot(el,f.data,f.layout,{responsive:true});});");
    w.push("</script></body></html>");
    w.finish()
}

fn sidebar(w: &mut Html, d: &Dashboard, options: &FilterOptions) {
    w.push("<aside><h3>Filters</h3><form method=\"get\" action=\"/\">");
    w.push(format!("<input type=\"hidden\" name=\"{}\" value=\"1\">", APPLIED_KEY));
    for dim in Dimension::ALL {
        let values = options.values(dim);
        w.push(format!(
            "<label for=\"f-{key}\">{label}</label>\
             <select multiple id=\"f-{key}\" name=\"{key}\" size=\"{size}\">",
            key = dim.key(),
            label = esc(dim.label()),
            size = values.len().clamp(2, 8)
        ));
        for v in &values {
            let selected = if d.selection.contains(dim, v) {
                " selected"
            } else {
                ""
            };
            w.push(format!(
                "<option value=\"{v}\"{selected}>{v}</option>",
                v = esc(v),
                selected = selected
            ));
        }
        w.push("</select>");
    }
    w.push("<button type=\"submit\">Apply</button> <a href=\"/\">Reset</a></form></aside>");
}

fn chart_panel<T, F>(w: &mut Html, view: &ChartView<T>, build: F)
where
    F: Fn(&ChartSpec, &T) -> Value,
{
    match view {
        ChartView::Ready { spec, data } => {
            let fig = build(spec, data);
            w.push(format!(
                "<div class=\"chart\" data-figure=\"{}\"></div>",
                esc(&fig.to_string())
            ));
        }
        ChartView::Empty { notice } => {
            w.push(format!("<div class=\"notice\">{}</div>", esc(notice)));
        }
    }
}

fn figure(spec: &ChartSpec, data: Value, mut layout: Value) -> Value {
    if let Value::Object(map) = &mut layout {
        map.insert("title".to_string(), json!({ "text": spec.title, "x": 0.1 }));
    }
    json!({ "data": data, "layout": layout })
}

// Plotly's named scales are case sensitive.
fn plotly_scale(name: &str) -> &str {
    match name {
        "rdylgn" => "RdYlGn",
        "viridis" => "Viridis",
        other => other,
    }
}

fn detail_table(w: &mut Html, table: &DetailTable) {
    w.push("<table><thead><tr>");
    for col in &table.columns {
        w.push(format!("<th>{}</th>", esc(col)));
    }
    w.push("</tr></thead><tbody>");
    for row in &table.rows {
        w.push("<tr>");
        for cell in row {
            w.push(format!("<td>{}</td>", esc(cell)));
        }
        w.push("</tr>");
    }
    w.push("</tbody></table>");
}
