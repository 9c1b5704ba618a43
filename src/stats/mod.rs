pub mod histogram;
pub mod mean;
pub mod quantile;
pub mod timevar;
pub mod variance;

pub use histogram::Histogram;
pub use histogram::PrecisionHistogram;
pub use histogram::SimpleHistogram;
pub use mean::Mean;
pub use quantile::Quantile;
pub use timevar::TimeVariance;
pub use variance::Variance;
