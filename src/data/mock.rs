use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::model::{Row, RowId, Status};

/// Shape of the generated history.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub tables: Vec<String>,
    pub rows_per_table: usize,
    pub seed: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            tables: vec!["A".into(), "B".into(), "C".into()],
            rows_per_table: 100,
            seed: 42,
        }
    }
}

/// First timestamp of every generated table.
pub fn history_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Generate hourly measurements per table.
///
/// Ids run consecutively across tables, metrics are integers drawn uniformly
/// from `1..50`, and every row starts out `used`.
pub fn history_data(config: &MockConfig) -> Vec<Row> {
    let mut rng = SimpleRng::new(config.seed);
    let start = history_start();
    let mut rows = Vec::with_capacity(config.tables.len() * config.rows_per_table);
    let mut next_id: RowId = 0;

    for table in &config.tables {
        for i in 0..config.rows_per_table {
            rows.push(Row {
                id: next_id,
                inserted_at: start + Duration::hours(i as i64),
                metric: rng.range(1, 50) as f64,
                table_name: table.clone(),
                status: Status::Used,
            });
            next_id += 1;
        }
    }
    rows
}

/// Minimal deterministic PRNG (xoshiro256**)
pub struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform integer in `low..high` (`low` when the range is empty).
    pub fn range(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        low + self.next_u64() % (high - low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn ids_are_unique_across_tables() {
        let rows = history_data(&MockConfig::default());
        assert_eq!(rows.len(), 300);
        let ids: BTreeSet<RowId> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 300);
        assert_eq!(rows[100].id, 100);
        assert_eq!(rows[100].table_name, "B");
    }

    #[test]
    fn metrics_and_timestamps_follow_the_shape() {
        let rows = history_data(&MockConfig {
            tables: vec!["X".into()],
            rows_per_table: 24,
            seed: 7,
        });
        assert!(rows.iter().all(|r| (1.0..50.0).contains(&r.metric) && r.metric.fract() == 0.0));
        assert!(rows.iter().all(|r| r.status == Status::Used));
        assert_eq!(rows[23].inserted_at - rows[0].inserted_at, Duration::hours(23));
    }

    #[test]
    fn same_seed_same_data() {
        let config = MockConfig::default();
        assert_eq!(history_data(&config), history_data(&config));
    }
}
