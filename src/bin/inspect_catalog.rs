use anyhow::{Context, Result, anyhow};
use i94_pipeline::catalog::{CatalogLayout, CatalogParser, CodeCatalog, PlaceholderPolicy};
use i94_pipeline::processor::PortResolver;
use serde_json::json;
use std::env;
use std::path::PathBuf;

fn print_json(catalog: &CodeCatalog, city: Option<&str>) -> Result<()> {
    let resolved = city.map(|c| PortResolver::new(catalog).resolve(c));
    let report = json!({
        "countries": catalog.country_count(),
        "ports": catalog.port_count(),
        "placeholders": {
            "countries": catalog.countries().iter().filter(|e| e.placeholder)
                .map(|e| json!({ "code": e.code, "label": e.label })).collect::<Vec<_>>(),
            "ports": catalog.ports().iter().filter(|e| e.placeholder)
                .map(|e| json!({ "code": e.code, "label": e.label })).collect::<Vec<_>>(),
        },
        "city": city,
        "resolved_port": resolved.flatten(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    let mut as_json = false;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--json" {
            as_json = true;
        } else {
            positional.push(arg);
        }
    }

    let path = positional
        .first()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: inspect_catalog [--json] <labels-file> [city]"))?;
    let city = positional.get(1).map(String::as_str);

    let parser = CatalogParser::new(CatalogLayout::default(), PlaceholderPolicy::Retain);
    let catalog = parser
        .parse_file(&path)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if as_json {
        return print_json(&catalog, city);
    }

    println!("=== I-94 CODE CATALOG: {} ===\n", path.display());
    println!("Countries: {}", catalog.country_count());
    println!("Ports:     {}", catalog.port_count());
    println!("Placeholder entries: {}", catalog.placeholder_count());

    println!("\nPlaceholder countries:");
    for entry in catalog.countries().iter().filter(|e| e.placeholder) {
        println!("   {:>4} = {}", entry.code, entry.label);
    }
    println!("\nPlaceholder ports:");
    for entry in catalog.ports().iter().filter(|e| e.placeholder) {
        println!("   {:>4} = {}", entry.code, entry.label);
    }

    if let Some(city) = city {
        match PortResolver::new(&catalog).resolve(city) {
            Some(port) => println!("\n'{}' resolves to port {}", city, port),
            None => println!("\n'{}' does not match any port label", city),
        }
    }

    Ok(())
}
