//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use wifi_map_access_point_models::{ConditionRank, legend};
use wifi_map_classify::{
    ClassificationStore, ClassifiedDataset, ClassifyError, SelectionPolicy,
};
use wifi_map_dataset::DatasetSnapshot;
use wifi_map_district::{PointFilter, stats};
use wifi_map_generate::ExportOptions;
use wifi_map_speed::{SortMode, UserLocation, rank_nearby};

use crate::config::AppConfig;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Classifies `snapshot`, or returns `None` with a warning when the data
/// cannot support three groups. Integrity failures still propagate.
fn classify_or_fallback(
    store: &mut ClassificationStore,
    snapshot: &DatasetSnapshot,
) -> Result<Option<Arc<ClassifiedDataset>>, ClassifyError> {
    match store.get_or_classify(snapshot) {
        Ok(classified) => Ok(Some(classified)),
        Err(ClassifyError::InsufficientData { reason }) => {
            log::warn!("Showing unclassified view: {reason}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn rank_cell(rank: Option<ConditionRank>) -> String {
    rank.map_or_else(|| "-".to_string(), |r| r.label_ko().to_string())
}

pub fn classify(
    store: &mut ClassificationStore,
    snapshot: &DatasetSnapshot,
    view: SelectionPolicy,
    filter: &PointFilter,
    json: bool,
) -> CommandResult {
    let classified = store.get_or_classify(snapshot)?;
    let filter = filter.resolve(snapshot)?;
    let selected: Vec<&wifi_map_classify::ClassifiedAccessPoint> = classified
        .select(view)
        .into_iter()
        .filter(|record| filter.matches(&record.access_point))
        .collect();

    if json {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output<'a> {
            version: &'a str,
            groups: &'a [wifi_map_classify::GroupStats],
            rank_counts: [usize; 3],
            view: SelectionPolicy,
            access_points: Vec<&'a wifi_map_classify::ClassifiedAccessPoint>,
        }
        return print_json(&Output {
            version: classified.version().as_str(),
            groups: classified.mapping().groups(),
            rank_counts: classified.rank_counts(),
            view,
            access_points: selected,
        });
    }

    println!(
        "Dataset {} ({} APs), inertia {:.4}",
        classified.version().short(),
        classified.records().len(),
        classified.inertia()
    );
    println!();
    println!(
        "{:<8} {:<18} {:>6} {:>7} {:>7} {:>7} {:>7}",
        "GROUP", "RANK", "APS", "AGE", "USAGE", "DENSITY", "RISK"
    );
    println!("{}", "-".repeat(66));
    for group in classified.mapping().groups() {
        println!(
            "{:<8} {:<18} {:>6} {:>7.3} {:>7.3} {:>7.3} {:>7.3}",
            group.cluster,
            group.rank.label(),
            group.members,
            group.mean.age,
            group.mean.usage,
            group.mean.density,
            group.risk_score
        );
    }

    println!();
    for entry in legend() {
        println!("  {} {} ({})", entry.color, entry.label_ko, entry.label);
    }

    println!();
    println!("{} APs in view '{view}':", selected.len());
    println!("{:<16} {:<10} {:<18} {:>10} {:>11}", "AP", "GU", "RANK", "LAT", "LON");
    println!("{}", "-".repeat(69));
    for record in selected {
        let ap = &record.access_point;
        println!(
            "{:<16} {:<10} {:<18} {:>10.5} {:>11.5}",
            ap.ap_id,
            ap.gu,
            record.rank.label(),
            ap.lat,
            ap.lon
        );
    }
    Ok(())
}

pub fn districts(
    store: &mut ClassificationStore,
    snapshot: &DatasetSnapshot,
    json: bool,
) -> CommandResult {
    let classified = classify_or_fallback(store, snapshot)?;
    let summaries = wifi_map_district::summarize(snapshot, classified.as_deref())?;

    if json {
        return print_json(&summaries);
    }

    println!(
        "{:<10} {:>6} {:>7} {:>7} {:>7} {:<16} {:<16}",
        "GU", "APS", "AGE", "USAGE", "DENSITY", "MEAN RANK", "MODAL RANK"
    );
    println!("{}", "-".repeat(76));
    for s in &summaries {
        let (mean, modal) = s.rank.as_ref().map_or((None, None), |r| {
            (Some(r.rank), Some(r.modal_rank))
        });
        println!(
            "{:<10} {:>6} {:>7.3} {:>7.3} {:>7.3} {:<16} {:<16}",
            s.gu,
            s.ap_count,
            s.mean_features.age,
            s.mean_features.usage,
            s.mean_features.density,
            rank_cell(mean),
            rank_cell(modal)
        );
    }
    Ok(())
}

pub fn stats(snapshot: &DatasetSnapshot, config: &AppConfig, json: bool) -> CommandResult {
    let top = stats::top_install_counts(snapshot.access_points(), config.district.top_n);
    let low = stats::low_usage(snapshot.access_points(), config.district.low_usage_quantile)?;

    if json {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output<'a> {
            top_install_counts: &'a [wifi_map_district_models::DistrictCount],
            low_usage: &'a wifi_map_district_models::LowUsageReport,
        }
        return print_json(&Output {
            top_install_counts: &top,
            low_usage: &low,
        });
    }

    println!("Top {} districts by installed APs:", top.len());
    for (i, entry) in top.iter().enumerate() {
        println!("  {:>2}. {:<10} {:>6}", i + 1, entry.gu, entry.count);
    }

    println!();
    println!(
        "Low usage (bottom {:.0}%, usage <= {:.4}): {} APs",
        low.quantile * 100.0,
        low.threshold,
        low.total
    );
    for entry in &low.by_district {
        println!("  {:<10} {:>6}", entry.gu, entry.count);
    }
    Ok(())
}

pub fn nearby(
    snapshot: &DatasetSnapshot,
    config: &AppConfig,
    gu: &str,
    location: Option<(f64, f64)>,
    sort: SortMode,
    json: bool,
) -> CommandResult {
    let location = match location {
        Some((lat, lon)) => UserLocation::new(lat, lon)?,
        None => UserLocation::default(),
    };
    let candidates = snapshot.in_district(gu);
    if candidates.is_empty() {
        return Err(format!("No APs in district: {gu}").into());
    }

    let ranked = rank_nearby(candidates, location, sort, &config.speed);

    if json {
        return print_json(&ranked);
    }

    println!(
        "{} APs in {gu} by {sort} from ({:.4}, {:.4}):",
        ranked.len(),
        location.lat,
        location.lon
    );
    println!(
        "{:<16} {:>10} {:>8} {:>8} {}",
        "AP", "DIST (m)", "QUALITY", "SCORE", "ADDRESS"
    );
    println!("{}", "-".repeat(72));
    for estimate in &ranked {
        let ap = &estimate.access_point;
        println!(
            "{:<16} {:>10.0} {:>8.3} {:>8.4} {}",
            ap.ap_id,
            estimate.distance_m,
            estimate.quality,
            estimate.score,
            ap.address.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub fn export(
    store: &mut ClassificationStore,
    snapshot: &DatasetSnapshot,
    out: &Path,
    options: &ExportOptions,
) -> CommandResult {
    let classified = classify_or_fallback(store, snapshot)?;
    let summary = wifi_map_generate::export_all(out, snapshot, classified.as_deref(), options)?;

    log::info!(
        "Exported {} APs across {} districts ({})",
        summary.access_points,
        summary.districts,
        if summary.classified {
            "classified"
        } else {
            "unclassified"
        }
    );
    for file in &summary.files {
        println!("{}", file.display());
    }
    Ok(())
}

pub fn access_point(
    store: &mut ClassificationStore,
    snapshot: &DatasetSnapshot,
    gu: &str,
    ap_id: &str,
) -> CommandResult {
    let ap = snapshot
        .find(gu, ap_id)
        .ok_or_else(|| format!("AP {ap_id} not found in {gu}"))?;
    let rank = classify_or_fallback(store, snapshot)?.and_then(|c| c.rank_of(&ap.ap_id));

    println!("AP {} ({})", ap.ap_id, ap.gu);
    println!("  Position:     {:.6}, {:.6}", ap.lat, ap.lon);
    if let Some(address) = &ap.address {
        println!("  Address:      {address}");
    }
    println!(
        "  Install type: {}",
        ap.install_type_label().as_deref().unwrap_or("-")
    );
    if let Some(year) = ap.install_year {
        println!("  Installed:    {year}");
    }
    if let Some(place) = &ap.indoor_outdoor {
        println!("  Placement:    {place}");
    }
    if let Some(usage) = ap.usage_gb {
        println!("  Usage:        {usage:.1} GB");
    }
    println!(
        "  Scores:       age {:.3}, usage {:.3}, density {:.3}",
        ap.features.age, ap.features.usage, ap.features.density
    );
    match rank {
        Some(rank) => println!("  Condition:    {} ({})", rank.label_ko(), rank.color()),
        None => println!("  Condition:    {}", rank_cell(None)),
    }
    Ok(())
}
