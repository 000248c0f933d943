//! Render one dashboard without the server.
//!
//! Usage: snapshot [--year Y]... [--seniority S]... [--contract C]... [--size Z]... [--html]
//!
//! A dimension given at least once replaces its default of "all values".

use anyhow::{bail, Result};
use salarydash::dashboard::render;
use salarydash::data::{load, source_from_config};
use salarydash::filter::{Dimension, FilterOptions, FilterSelection};
use salarydash::html::render_page;
use salarydash::state::Config;
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<()> {
    let mut html = false;
    let mut given: HashMap<Dimension, Vec<String>> = HashMap::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--html" {
            html = true;
            continue;
        }
        let Some(dim) = arg.strip_prefix("--").and_then(Dimension::from_key) else {
            bail!("unknown argument {}", arg);
        };
        let Some(value) = args.next() else {
            bail!("{} needs a value", arg);
        };
        given.entry(dim).or_default().push(value);
    }

    let cfg = Config::from_env();
    let source = source_from_config(&cfg)?;
    let dataset = load(source.as_ref()).await?;
    let options = FilterOptions::from_dataset(&dataset);

    let mut selection = FilterSelection::all(&options);
    for (dim, values) in given {
        selection.set(dim, values);
    }

    let dashboard = render(&dataset, &selection, &cfg.chart_settings());
    if html {
        println!("{}", render_page(&dashboard, &options));
    } else {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    }
    Ok(())
}
