//! Prepare an actor and print its derived sheet
//!
//! Loads `actors/<name>.ron|json` (plus referenced catalog items), runs one
//! preparation pass and displays totals, modifier breakdowns, overrides and
//! the pass report.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;

use ruleset_content::ContentFactory;
use ruleset_core::{AttributeTarget, EngineConfig, PreparationReport, PreparedActor};

use crate::dirs;

/// Prepare an actor and print the derived sheet
#[derive(Parser)]
pub struct Prepare {
    /// Actor file name without extension (e.g., brienne)
    #[arg(value_name = "ACTOR")]
    actor: String,

    /// Custom data directory (defaults to RULESET_DATA_DIR or platform location)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Ignore the actor's catalog item references
    #[arg(long)]
    no_catalog: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Totals, modifier breakdowns and report
    Summary,
    /// Full JSON output (system, overrides, report)
    Json,
}

impl Prepare {
    pub fn execute(self) -> Result<()> {
        let factory = ContentFactory::new(dirs::data_dir(self.data_dir.as_deref())?);

        let actor = if self.no_catalog {
            factory.load_actor(&self.actor)?
        } else {
            factory.load_actor_with_catalog(&self.actor)?
        };

        let preparer = super::preparer(&factory)?;
        let (prepared, report) = preparer.prepare_with_report(&actor);

        match self.format {
            OutputFormat::Summary => print_summary(&prepared, &report),
            OutputFormat::Json => print_json(&prepared, &report)?,
        }

        Ok(())
    }
}

fn print_summary(prepared: &PreparedActor, report: &PreparationReport) {
    println!(
        "{} {} ({}, {})",
        style("Actor:").bold().cyan(),
        prepared.name,
        prepared.id,
        prepared.actor_type
    );
    println!(
        "{} {}  {} {}",
        style("Level:").bold().cyan(),
        display(prepared, "details.level"),
        style("Proficiency:").bold().cyan(),
        display(prepared, "attributes.prof"),
    );
    println!();

    println!("{}", style("Abilities:").bold().yellow());
    for ability in EngineConfig::ABILITIES {
        println!(
            "  {:<4} {:>3}  ({:+})",
            ability.to_uppercase(),
            display(prepared, &format!("abilities.{ability}.value")),
            prepared
                .get(&format!("abilities.{ability}.mod"))
                .and_then(|v| v.as_f64())
                .unwrap_or_default()
        );
    }
    println!();

    println!("{}", style("Attributes:").bold().yellow());
    println!(
        "  HP  {}/{}",
        display(prepared, "attributes.hp.value"),
        display(prepared, "attributes.hp.max")
    );
    println!("  AC  {}", display(prepared, "attributes.ac.value"));
    println!("  Init {:+}", prepared.total(AttributeTarget::Init));
    if let Some(walk) = prepared.get("attributes.movement.walk") {
        println!("  Walk {}", walk);
    }
    if prepared.get("attributes.spelldc").is_some() {
        println!(
            "  Spell DC {}  Spell attack {}",
            display(prepared, "attributes.spelldc"),
            display(prepared, "attributes.spellattack")
        );
    }
    println!();

    println!("{}", style("Modifiers:").bold().yellow());
    let ctx = prepared.roll_data();
    for (target, set) in prepared.modifiers.iter() {
        if set.is_empty() {
            continue;
        }
        println!("  {} = {}", style(target).bold(), set.total(ctx));
        for modifier in set.iter() {
            let origin = match modifier.source() {
                Some(source) => format!(" <- {source}"),
                None if modifier.is_user() => " <- user".to_string(),
                None => String::new(),
            };
            println!(
                "    {:+6} {} [{}]{}",
                modifier.evaluate(ctx),
                modifier.name(),
                modifier.category(),
                style(origin).dim()
            );
        }
    }
    println!();

    if !prepared.overrides.is_empty() {
        println!("{}", style("Overrides:").bold().yellow());
        for (path, value) in &prepared.overrides {
            println!("  {} = {}", path, value);
        }
        println!();
    }

    if let Some(scale) = prepared.get("scale").and_then(|v| v.as_object())
        && !scale.is_empty()
    {
        println!("{}", style("Scale values:").bold().yellow());
        for (class, values) in scale {
            if let Some(values) = values.as_object() {
                for (identifier, value) in values {
                    println!("  {}.{} = {}", class, identifier, value);
                }
            }
        }
        println!();
    }

    print_report(report);
}

fn print_report(report: &PreparationReport) {
    println!("{}", style("Report:").bold().yellow());
    println!(
        "  built {}  applied {}  disabled {}  ignored {}  dropped {}",
        report.rules_built,
        report.rules_applied,
        report.disabled,
        report.ignored,
        report.dropped.len()
    );
    for dropped in &report.dropped {
        println!(
            "  {} {}#{} ({}) [{}] {}",
            style("✗").red(),
            dropped.item_id,
            dropped.index,
            dropped.kind,
            dropped.code,
            dropped.error
        );
        tracing::debug!(context = ?dropped.context(), "dropped rule");
    }
}

fn print_json(prepared: &PreparedActor, report: &PreparationReport) -> Result<()> {
    let output = serde_json::json!({
        "id": prepared.id,
        "name": prepared.name,
        "type": prepared.actor_type,
        "system": prepared.system,
        "overrides": prepared.overrides,
        "report": report,
    });
    let json =
        serde_json::to_string_pretty(&output).context("Failed to serialize prepared actor")?;
    println!("{}", json);
    Ok(())
}

fn display(prepared: &PreparedActor, path: &str) -> String {
    prepared
        .get(path)
        .map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
        .unwrap_or_else(|| "-".to_string())
}
