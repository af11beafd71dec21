/// Data layer: core types, storage, filtering and control limits.
///
/// Architecture:
/// ```text
///  mock generator / .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────────┐
///   │ DatasetStore  │  Vec<Row>, status is the only mutable field
///   └──────────────┘
///        │
///        ├──────────────────────┐
///        ▼                      ▼
///   ┌──────────┐          ┌───────────┐
///   │  query    │          │ threshold  │  mean ± 3σ over `used` rows
///   └──────────┘          └───────────┘
///   restrict → filter (parsed by `filter`) → sort → paginate
/// ```

pub mod filter;
pub mod loader;
pub mod mock;
pub mod model;
pub mod query;
pub mod store;
pub mod threshold;
