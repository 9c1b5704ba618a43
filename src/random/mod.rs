pub mod prng;
pub mod stream;

pub use prng::reset_prng_cache;
pub use prng::Seeds;
pub use prng::WichmannHill;
pub use stream::Draw;
pub use stream::Erlang;
pub use stream::Exponential;
pub use stream::HyperExponential;
pub use stream::Normal;
pub use stream::Triangular;
pub use stream::Uniform;
pub use stream::Variate;
