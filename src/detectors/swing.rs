//! Swing-high extraction and greedy resistance clustering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::helpers::within_tolerance;
use crate::series::PriceSeries;

/// Local maximum of bar highs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub price: f64,
    pub index: usize,
    pub timestamp: DateTime<Utc>,
}

/// Swing highs judged to be testing the same price level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResistanceCluster {
    /// Mean price of the member swing points
    pub level: f64,
    /// Members in chronological order
    pub touches: Vec<SwingPoint>,
    pub count: usize,
}

impl ResistanceCluster {
    fn seed(point: SwingPoint) -> Self {
        Self { level: point.price, touches: vec![point], count: 1 }
    }

    fn admit(&mut self, point: SwingPoint) {
        self.touches.push(point);
        self.count = self.touches.len();
        self.level = self.touches.iter().map(|p| p.price).sum::<f64>() / self.count as f64;
    }

    /// Chronologically latest member
    pub fn last_touch(&self) -> Option<&SwingPoint> {
        self.touches.iter().max_by_key(|p| p.index)
    }
}

/// Bars whose high strictly exceeds the highs of `order` bars on each side.
///
/// Bars closer than `order` to either end are never swing highs.
pub fn find_swing_highs(series: &PriceSeries, order: usize) -> Vec<SwingPoint> {
    let bars = series.bars();
    let n = bars.len();
    // Fewer than `2 * order + 1` bars leaves no interior bar to test.
    if order == 0 || order.checked_mul(2).map_or(true, |w| n <= w) {
        return Vec::new();
    }

    (order..n - order)
        .filter(|&i| {
            let high = bars[i].high;
            bars[i - order..i]
                .iter()
                .chain(&bars[i + 1..=i + order])
                .all(|b| high > b.high)
        })
        .map(|i| SwingPoint { price: bars[i].high, index: i, timestamp: bars[i].timestamp })
        .collect()
}

/// Greedy single-pass clustering.
///
/// Each unassigned point seeds a cluster, then every later unassigned point
/// within `tolerance` of the cluster's running mean joins it. The mean moves
/// after every admission, so the assignment depends on encounter order.
pub fn cluster_swing_points(points: &[SwingPoint], tolerance: f64) -> Vec<ResistanceCluster> {
    let mut assigned = vec![false; points.len()];
    let mut clusters = Vec::new();

    for i in 0..points.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut cluster = ResistanceCluster::seed(points[i]);

        for j in i + 1..points.len() {
            if !assigned[j] && within_tolerance(points[j].price, cluster.level, tolerance) {
                cluster.admit(points[j]);
                assigned[j] = true;
            }
        }
        clusters.push(cluster);
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap()
    }

    fn point(price: f64, index: usize) -> SwingPoint {
        SwingPoint { price, index, timestamp: t0() + Duration::weeks(index as i64) }
    }

    fn series_from_highs(highs: &[f64]) -> PriceSeries {
        let bars = highs
            .iter()
            .enumerate()
            .map(|(i, &h)| Bar::new(t0() + Duration::weeks(i as i64), h - 1.0, h, h - 2.0, h - 1.0, 1.0))
            .collect();
        PriceSeries::new(bars, 1).unwrap()
    }

    #[test]
    fn test_swing_highs_strict() {
        let s = series_from_highs(&[10.0, 11.0, 12.0, 15.0, 12.0, 11.0, 10.0, 11.0, 11.0, 10.0]);
        let swings = find_swing_highs(&s, 3);
        assert_eq!(swings.len(), 1);
        assert_eq!(swings[0].index, 3);
        assert_eq!(swings[0].price, 15.0);
    }

    #[test]
    fn test_flat_ties_are_not_swings() {
        let s = series_from_highs(&[10.0, 11.0, 12.0, 15.0, 15.0, 12.0, 11.0, 10.0]);
        assert!(find_swing_highs(&s, 2).is_empty());
    }

    #[test]
    fn test_edges_excluded() {
        let s = series_from_highs(&[20.0, 10.0, 10.5, 10.0, 11.0, 10.0, 30.0]);
        let swings = find_swing_highs(&s, 1);
        assert_eq!(swings.iter().map(|p| p.index).collect::<Vec<_>>(), vec![2, 4]);
        assert!(find_swing_highs(&series_from_highs(&[10.0, 20.0]), 1).is_empty());
    }

    #[test]
    fn test_huge_order_finds_nothing() {
        let s = series_from_highs(&[10.0, 11.0, 15.0, 11.0, 10.0]);
        assert!(find_swing_highs(&s, usize::MAX / 2 + 1).is_empty());
        assert!(find_swing_highs(&s, usize::MAX).is_empty());
    }

    #[test]
    fn test_clusters_by_running_mean() {
        let points: Vec<_> = [100.0, 101.0, 99.0, 150.0, 151.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| point(p, i * 10))
            .collect();

        let clusters = cluster_swing_points(&points, 0.02);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count, 3);
        assert!((clusters[0].level - 100.0).abs() < 1e-12);
        assert_eq!(clusters[1].count, 2);
        assert!((clusters[1].level - 150.5).abs() < 1e-12);
        assert_eq!(clusters[0].last_touch().map(|p| p.index), Some(20));
    }

    #[test]
    fn test_running_mean_is_order_dependent() {
        // 102.8 is 2.8% above the seed, but after 101.8 joins the mean is
        // 100.9 and 102.8 sits within 2% of it.
        let forward = [point(100.0, 0), point(101.8, 1), point(102.8, 2)];
        let clusters = cluster_swing_points(&forward, 0.02);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count, 3);

        // Seeded at 102.8 the mean only falls to 102.3, leaving 100 out.
        let reversed = [point(102.8, 0), point(101.8, 1), point(100.0, 2)];
        let clusters = cluster_swing_points(&reversed, 0.02);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count, 2);
        assert_eq!(clusters[1].count, 1);
    }

    #[test]
    fn test_every_point_in_exactly_one_cluster() {
        let points: Vec<_> =
            [50.0, 80.0, 51.0, 79.0, 52.0, 120.0].iter().enumerate().map(|(i, &p)| point(p, i)).collect();
        let clusters = cluster_swing_points(&points, 0.03);
        let total: usize = clusters.iter().map(|c| c.count).sum();
        assert_eq!(total, points.len());
    }
}
