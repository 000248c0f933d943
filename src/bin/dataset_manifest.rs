use salarydash::data::{load, source_from_config, SchemaReport};
use salarydash::filter::FilterOptions;
use salarydash::state::Config;
use serde_json::json;

#[tokio::main]
async fn main() {
    let cfg = Config::from_env();
    let source = match source_from_config(&cfg) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("bad source config: {:#}", err);
            std::process::exit(1);
        }
    };

    let dataset = match load(source.as_ref()).await {
        Ok(ds) => ds,
        Err(err) => {
            eprintln!("load failed: {:#}", err);
            std::process::exit(2);
        }
    };

    let payload = json!({
        "manifest": dataset.manifest(),
        "schema": SchemaReport::check(dataset.columns()),
        "options": FilterOptions::from_dataset(&dataset),
    });
    match serde_json::to_string_pretty(&payload) {
        Ok(s) => println!("{}", s),
        Err(err) => {
            eprintln!("failed to encode manifest: {}", err);
            std::process::exit(3);
        }
    }
}
