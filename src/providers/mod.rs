//! Concrete provider backends. AWS is the only one today.

pub mod aws;

pub use aws::{
    verify_credentials, AwsInventory, AwsMetrics, AwsPriceList, S3ReportStore, SnsNotifier,
};
