//! Output generation for period-partitioned article batches.
//!
//! One JSON artifact per period, named for its year and zero-padded month:
//!
//! ```text
//! output_dir/
//! ├── articles_2024_07.json
//! └── articles_2024_08.json
//! ```

pub mod json;
