// src/lib.rs

pub mod config;
pub mod error;
pub mod telemetry;
pub mod trade;

pub mod calc_clock;
pub mod validator;
pub mod window;
pub mod weighted_median;
pub mod outlier;
pub mod bucket;
pub mod aggregator;
pub mod processor;

pub mod session;
pub mod source;
pub mod data_extractor;
pub mod sink;
pub mod rate_manager;
pub mod rate_manager_pool;

pub use config::{load_config, parse_config, CalculationConfig, Frequency, RunConfig};
pub use error::{ConfigError, RateError, SinkError, SourceError};
pub use telemetry::{init_logging, LogFormat};
pub use trade::{DayBatch, Trade, TradeFlag, TradeRecord, ValidatedBatch};

pub use aggregator::{BucketRecord, IndexAggregator, IndexPoint};
pub use bucket::{Bucket, BucketPartitioner};
pub use calc_clock::CalculationClock;
pub use outlier::{PedOutlierDetector, PedReport};
pub use processor::{InstantResult, Processor};
pub use validator::TradeValidator;
pub use weighted_median::{VolumeWeightedMedian, WeightedMedianResult};
pub use window::{AnalysisWindow, WindowExtractor};

pub use data_extractor::{FetchOutcome, TradeDataExtractor};
pub use rate_manager::{RateManager, RunSummary};
pub use rate_manager_pool::RateManagerPool;
pub use session::HttpSession;
pub use sink::{CsvSink, MemorySink, OutputSink};
pub use source::{HttpJsonSource, LocalJsonSource, TradeSource};
