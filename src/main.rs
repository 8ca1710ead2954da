use anyhow::{anyhow, Context};
use clap::Parser;
use rfsnap::{HtmlDocument, SnapshotConfig, Snapshotter, Viewport};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Snapshot an element of a web page as a self-contained SVG data URL
#[derive(Parser, Debug)]
#[command(name = "rfsnap", version)]
struct Args {
    /// Page to load
    url: String,
    /// CSS selector of the element to snapshot
    #[arg(long, default_value = "body")]
    selector: String,
    #[arg(long)]
    background_color: Option<String>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Append a timestamp to every fetched reference
    #[arg(long)]
    cache_bust: bool,
    #[arg(long)]
    user_agent: Option<String>,
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,
    /// Extra request header, as `Name: value` (repeatable)
    #[arg(long = "header")]
    headers: Vec<String>,
    /// Data URL to use for images that cannot be fetched
    #[arg(long)]
    image_placeholder: Option<String>,
    /// Write the data URL here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Print a JSON report instead of the bare data URL
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    url: &'a str,
    selector: &'a str,
    width: u32,
    height: u32,
    failures: Vec<String>,
    data_url: &'a str,
}

fn parse_headers(raw: &[String]) -> anyhow::Result<HashMap<String, String>> {
    raw.iter()
        .map(|h| {
            let (name, value) = h
                .split_once(':')
                .ok_or_else(|| anyhow!("header {:?} is not `Name: value`", h))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = SnapshotConfig {
        background_color: args.background_color.clone(),
        width: args.width,
        height: args.height,
        cache_bust: args.cache_bust,
        timeout_ms: args.timeout_ms,
        headers: parse_headers(&args.headers)?,
        image_placeholder: args.image_placeholder.clone(),
        ..Default::default()
    };
    if let Some(ua) = &args.user_agent {
        config.user_agent = ua.clone();
    }
    let viewport: Viewport = config.viewport;

    let url = url::Url::parse(&args.url).with_context(|| format!("invalid URL {}", args.url))?;
    let snapshotter = Snapshotter::new(config)?;
    let doc = HtmlDocument::load(&url, snapshotter.fetcher(), viewport).await?;
    let node = doc
        .select(&args.selector)?
        .ok_or_else(|| anyhow!("no element matches {:?}", args.selector))?;

    let snapshot = snapshotter.to_svg(&doc, node).await?;
    log::info!("{} resource(s) could not be embedded", snapshot.failures.len());

    let out = if args.json {
        let report = Report {
            url: url.as_str(),
            selector: &args.selector,
            width: snapshot.width,
            height: snapshot.height,
            failures: snapshot.failures.iter().map(|e| e.to_string()).collect(),
            data_url: &snapshot.data_url,
        };
        serde_json::to_string_pretty(&report)?
    } else {
        snapshot.data_url.clone()
    };

    match &args.output {
        Some(path) => std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", out),
    }
    Ok(())
}
