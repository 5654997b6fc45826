//! Builds `GeoJSON` feature collections for each map layer.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use wifi_map_access_point_models::AccessPoint;
use wifi_map_classify::{ClassifiedDataset, SelectionPolicy};
use wifi_map_district::ResolvedFilter;
use wifi_map_district::color::NO_DATA;
use wifi_map_district_models::{ChoroplethMetric, ChoroplethValue, DistrictMarker};

/// Boundary property that holds the district name.
pub const DISTRICT_NAME_PROPERTY: &str = "SIG_KOR_NM";

/// Marker color for APs without a rank.
pub const UNCLASSIFIED_COLOR: &str = "#3388FF";

fn point_feature(lat: f64, lon: f64, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![lon, lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn base_properties(ap: &AccessPoint) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("apId".into(), ap.ap_id.clone().into());
    props.insert("gu".into(), ap.gu.clone().into());
    props.insert(
        "installType".into(),
        ap.install_type_label().map_or(JsonValue::Null, JsonValue::from),
    );
    props.insert("age".into(), ap.features.age.into());
    props.insert("usage".into(), ap.features.usage.into());
    props.insert("density".into(), ap.features.density.into());
    props
}

/// Point layer of classified APs, selected and ordered by `policy`, then
/// narrowed by `filter`.
#[must_use]
pub fn classified_points(
    classified: &ClassifiedDataset,
    policy: SelectionPolicy,
    filter: &ResolvedFilter,
) -> FeatureCollection {
    let features = classified
        .select(policy)
        .into_iter()
        .filter(|record| filter.matches(&record.access_point))
        .map(|record| {
            let ap = &record.access_point;
            let mut props = base_properties(ap);
            props.insert("rank".into(), record.rank.value().into());
            props.insert("label".into(), record.rank.label().into());
            props.insert("color".into(), record.rank.color().into());
            props.insert("radius".into(), record.rank.marker_radius().into());
            point_feature(ap.lat, ap.lon, props)
        })
        .collect();
    collection(features)
}

/// Point layer of every AP passing `filter`, with no rank fields and a
/// neutral color.
#[must_use]
pub fn unclassified_points(aps: &[AccessPoint], filter: &ResolvedFilter) -> FeatureCollection {
    let features = aps
        .iter()
        .filter(|ap| filter.matches(ap))
        .map(|ap| {
            let mut props = base_properties(ap);
            props.insert("color".into(), UNCLASSIFIED_COLOR.into());
            point_feature(ap.lat, ap.lon, props)
        })
        .collect();
    collection(features)
}

/// District count markers.
#[must_use]
pub fn district_markers(markers: &[DistrictMarker]) -> FeatureCollection {
    let features = markers
        .iter()
        .map(|m| {
            let mut props = JsonObject::new();
            props.insert("gu".into(), m.gu.clone().into());
            props.insert("count".into(), m.count.into());
            props.insert("color".into(), m.color.clone().into());
            point_feature(m.lat, m.lon, props)
        })
        .collect();
    collection(features)
}

/// Attaches `metric`, `caption`, `value` and `fillColor` to each boundary
/// feature, joined on [`DISTRICT_NAME_PROPERTY`]. Boundaries with no matching district get a
/// `null` value and [`NO_DATA`] fill.
#[must_use]
pub fn district_choropleth(
    mut boundaries: FeatureCollection,
    values: &[ChoroplethValue],
    metric: ChoroplethMetric,
) -> FeatureCollection {
    let mut unmatched = 0usize;
    for feature in &mut boundaries.features {
        let name = feature
            .property(DISTRICT_NAME_PROPERTY)
            .and_then(JsonValue::as_str)
            .map(str::to_owned);
        let value = name
            .as_deref()
            .and_then(|gu| values.iter().find(|v| v.gu == gu));

        let (number, fill) = value.map_or_else(
            || (JsonValue::Null, NO_DATA.to_string()),
            |v| {
                let number = serde_json::Number::from_f64(v.value)
                    .map_or(JsonValue::Null, JsonValue::Number);
                (number, v.color.clone())
            },
        );
        if value.is_none() {
            unmatched += 1;
        }

        feature.set_property("metric", metric.to_string());
        feature.set_property("caption", metric.caption());
        feature.set_property("value", number);
        feature.set_property("fillColor", fill);
    }

    if unmatched > 0 {
        log::warn!(
            "{unmatched} of {} boundaries had no {metric} value",
            boundaries.features.len()
        );
    }
    boundaries
}
