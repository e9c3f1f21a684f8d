//! Distance annotation, ordering and top-N selection.

use crate::config::RankingConfig;
use crate::geo::distance_km;
use crate::models::{Coordinates, Marker, RankedShop, ShopAxes, ShopRecord};

/// Writes `distance` into every record, measured from `origin`.
pub fn annotate_distances(records: &mut [ShopRecord], origin: Coordinates, axes: ShopAxes) {
    for record in records.iter_mut() {
        record.distance = Some(distance_km(origin, record.coordinates(axes)));
    }
}

/// Display label for a shop name: the text after the last `prefix`.
pub fn display_label(name: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(p) if !p.is_empty() => name.rsplit(p).next().unwrap_or(name).to_string(),
        _ => name.to_string(),
    }
}

/// The `config.top_n` shops closest to `origin`, closest first.
///
/// Records get their `distance` written in place but stay in the order the
/// API sent them. Ranking works on a stable sort of indices, so shops at the
/// same distance keep API order no matter how often this runs.
pub fn rank_shops(
    records: &mut [ShopRecord],
    origin: Coordinates,
    config: &RankingConfig,
) -> Vec<RankedShop> {
    annotate_distances(records, origin, config.axes);
    let distance = |i: usize| records[i].distance.unwrap_or(f64::INFINITY);
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| distance(a).total_cmp(&distance(b)));

    order
        .into_iter()
        .take(config.top_n)
        .map(|i| {
            let record = &records[i];
            RankedShop {
                label: display_label(&record.name, config.name_strip_prefix.as_deref()),
                coordinates: record.coordinates(config.axes),
                distance_km: record.distance.unwrap_or_default(),
            }
        })
        .collect()
}

/// Presenter input: one marker per ranked shop and a trailing user marker.
///
/// An empty ranking yields no markers at all, not even the user's.
pub fn build_markers(ranked: &[RankedShop], user: Coordinates) -> Vec<Marker> {
    if ranked.is_empty() {
        return Vec::new();
    }
    let mut markers: Vec<Marker> = ranked.iter().map(Marker::shop).collect();
    markers.push(Marker::user(user));
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop(name: &str, x: f64, y: f64) -> ShopRecord {
        ShopRecord {
            name: name.to_string(),
            x,
            y,
            distance: None,
            extra: serde_json::Map::new(),
        }
    }

    fn config(top_n: usize, prefix: Option<&str>) -> RankingConfig {
        RankingConfig {
            top_n,
            name_strip_prefix: prefix.map(str::to_string),
            axes: ShopAxes::XLatitude,
        }
    }

    const ORIGIN: Coordinates = Coordinates {
        latitude: 0.0,
        longitude: 0.0,
    };

    #[test]
    fn orders_ascending_by_distance() {
        // One degree of latitude is ~111.19 km.
        let mut records = vec![
            shop("far", 3.0, 0.0),
            shop("near", 1.0, 0.0),
            shop("mid", 2.0, 0.0),
        ];
        let ranked = rank_shops(&mut records, ORIGIN, &config(10, None));

        let labels: Vec<_> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["near", "mid", "far"]);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn ties_keep_api_order() {
        let mut records = vec![
            shop("north", 1.0, 0.0),
            shop("south", -1.0, 0.0),
            shop("origin", 0.0, 0.0),
            shop("east", 0.0, 1.0),
        ];
        let ranked = rank_shops(&mut records, ORIGIN, &config(10, None));

        let labels: Vec<_> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels[0], "origin");
        // north, south and east are all the same distance from the origin.
        assert_eq!(labels[1..], ["north", "south", "east"]);
    }

    #[test]
    fn keeps_only_top_n_closest() {
        let mut records: Vec<_> = (0..12u32)
            .rev()
            .map(|i| shop(&format!("shop {i}"), f64::from(i) * 0.1, 0.0))
            .collect();
        let ranked = rank_shops(&mut records, ORIGIN, &config(3, None));

        assert_eq!(ranked.len(), 3);
        let labels: Vec<_> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["shop 0", "shop 1", "shop 2"]);
    }

    #[test]
    fn top_n_larger_than_list_returns_everything() {
        let mut records = vec![shop("a", 1.0, 1.0), shop("b", 2.0, 2.0)];
        assert_eq!(rank_shops(&mut records, ORIGIN, &config(10, None)).len(), 2);
    }

    #[test]
    fn annotates_records_without_reordering_them() {
        let mut records = vec![shop("quarter", 0.0, 90.0), shop("home", 0.0, 0.0)];
        let ranked = rank_shops(&mut records, ORIGIN, &config(1, None));

        assert_eq!(ranked[0].label, "home");
        assert_eq!(records[0].name, "quarter");
        assert_eq!(records[0].distance, Some(10007.54));
        assert_eq!(records[1].distance, Some(0.0));
    }

    #[test]
    fn reranking_from_new_origin_restores_api_order_for_ties() {
        let mut records = vec![shop("A", 2.0, 0.0), shop("B", 0.0, 0.0)];
        let first = rank_shops(&mut records, ORIGIN, &config(2, None));
        assert_eq!(first[0].label, "B");

        // Both shops are one degree of latitude from here.
        let ranked = rank_shops(&mut records, Coordinates::new(1.0, 0.0), &config(2, None));
        assert_eq!(ranked[0].distance_km, ranked[1].distance_km);
        let labels: Vec<_> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["A", "B"]);
    }

    #[test]
    fn respects_axis_mapping() {
        let mut records = vec![shop("a", 0.0, 90.0)];
        let mut cfg = config(1, None);
        cfg.axes = ShopAxes::XLongitude;
        let ranked = rank_shops(&mut records, ORIGIN, &cfg);
        assert_eq!(ranked[0].coordinates, Coordinates::new(90.0, 0.0));
        assert_eq!(ranked[0].distance_km, 10007.54);
    }

    #[test]
    fn label_strips_through_last_prefix() {
        let prefix = Some("Blue Bottle ");
        assert_eq!(display_label("Blue Bottle Hayes Valley", prefix), "Hayes Valley");
        assert_eq!(display_label("Mint Plaza", prefix), "Mint Plaza");
        assert_eq!(
            display_label("Blue Bottle Blue Bottle Annex", prefix),
            "Annex"
        );
        assert_eq!(display_label("Blue Bottle ", prefix), "");
        assert_eq!(display_label("Blue Bottle Hayes", None), "Blue Bottle Hayes");
        assert_eq!(display_label("Blue Bottle Hayes", Some("")), "Blue Bottle Hayes");
    }

    #[test]
    fn markers_end_with_user() {
        let ranked = vec![
            RankedShop {
                label: "Hayes Valley".into(),
                coordinates: Coordinates::new(37.776, -122.423),
                distance_km: 0.37,
            },
            RankedShop {
                label: "Mint Plaza".into(),
                coordinates: Coordinates::new(37.782, -122.407),
                distance_km: 1.2,
            },
        ];
        let user = Coordinates::new(37.7749, -122.4194);
        let markers = build_markers(&ranked, user);

        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].label, "Hayes Valley");
        assert_eq!(markers[0].custom_tooltip.as_deref(), Some("0.37 km"));
        assert_eq!(markers[1].color, "#03dac6");
        let last = &markers[2];
        assert!(last.is_user());
        assert_eq!(last.color, "#3700b3");
        assert_eq!((last.latitude, last.longitude), (37.7749, -122.4194));
    }

    #[test]
    fn empty_ranking_has_no_user_marker() {
        assert!(build_markers(&[], Coordinates::new(1.0, 1.0)).is_empty());
    }
}
