/// Data layer: core types and the analysis pipeline stages.
///
/// Architecture:
/// ```text
///   dataset.zip (one CSV)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  unzip, decode, parse → raw TrackTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  drop index artifact, incomplete rows, duplicate ids
///   └──────────┘
///        │   (cached, immutable)
///        ▼
///   ┌──────────┐
///   │  filter   │  genre selection → FilteredView (row indices)
///   └──────────┘
///        │
///        ├──────────────┬──────────────┐
///        ▼              ▼              ▼
///   ┌─────────┐  ┌─────────────┐  ┌────────────┐
///   │  stats   │  │ correlation │  │ regression │
///   └─────────┘  └─────────────┘  └────────────┘
/// ```

pub mod clean;
pub mod correlation;
pub mod filter;
pub mod loader;
pub mod model;
pub mod regression;
pub mod stats;
